/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A simple, mutable, in-memory graph backed by a vector of successor
//! vectors: supplemented in-memory fixture graphs.
//!
//! Arcs must be added to a given node in strictly increasing successor
//! order; this keeps [`RandomAccessLabeling::labels`] a plain slice
//! iterator with no sorting step at read time.

use crate::prelude::*;
use lender::prelude::*;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// An arc with a label, stored as a pair (target, label).
struct LabeledArc<L>(usize, L);

impl<L> From<(usize, L)> for LabeledArc<L> {
    fn from((v, l): (usize, L)) -> Self {
        Self(v, l)
    }
}

impl<L> From<LabeledArc<L>> for (usize, L) {
    fn from(value: LabeledArc<L>) -> (usize, L) {
        (value.0, value.1)
    }
}

/// A mutable [`LabeledRandomAccessGraph`] implementation based on a vector of
/// vectors.
///
/// Arcs can be added only in increasing successor order; this makes random
/// access to a node's successors a bare slice scan with no per-read sort.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledVecGraph<L: Clone + 'static> {
    /// The number of arcs in the graph.
    num_arcs: u64,
    /// For each node, its list of successors.
    succ: Vec<Vec<LabeledArc<L>>>,
}

impl<L: Clone + 'static> core::default::Default for LabeledVecGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Clone + 'static> LabeledVecGraph<L> {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            num_arcs: 0,
            succ: vec![],
        }
    }

    /// Creates a new empty graph with `n` nodes.
    pub fn empty(n: usize) -> Self {
        Self {
            num_arcs: 0,
            succ: Vec::from_iter((0..n).map(|_| Vec::new())),
        }
    }

    /// Adds an isolated node to the graph and returns true if it is a new node.
    pub fn add_node(&mut self, node: usize) -> bool {
        let len = self.succ.len();
        self.succ.extend((len..=node).map(|_| Vec::new()));
        len <= node
    }

    /// Adds an arc to the graph.
    ///
    /// New arcs must be added in increasing successor order, or this method
    /// will panic.
    ///
    /// # Panics
    ///
    /// This method will panic:
    /// - if one of the given nodes is greater or equal than the number of nodes
    ///   in the graph;
    /// - if the successor is lesser than or equal to the current last successor
    ///   of the source node.
    pub fn add_arc(&mut self, u: usize, v: usize, l: L) {
        let max = u.max(v);
        if max >= self.succ.len() {
            panic!(
                "Node {} does not exist (the graph has {} nodes)",
                max,
                self.succ.len(),
            );
        }
        let succ = &mut self.succ[u];

        match succ.last() {
            None => {
                succ.push((v, l).into());
                self.num_arcs += 1;
            }
            Some(LabeledArc(last, _label)) => {
                if v <= *last {
                    panic!(
                        "Error adding arc ({u}, {v}): successor is not increasing; the last arc inserted was ({u}, {last})"
                    );
                }
                succ.push((v, l).into());
                self.num_arcs += 1;
            }
        }
    }

    /// Adds arcs from an [`IntoIterator`], adding new nodes as needed.
    ///
    /// The items must be labeled pairs of the form `((usize, usize), l)`
    /// specifying an arc and its label.
    pub fn add_arcs(&mut self, arcs: impl IntoIterator<Item = ((usize, usize), L)>) {
        let mut arcs = arcs.into_iter().collect::<Vec<_>>();
        arcs.sort_by_key(|x| x.0);
        for ((u, v), l) in arcs {
            self.add_node(u);
            self.add_node(v);
            self.add_arc(u, v, l);
        }
    }

    /// Creates a new graph from an [`IntoIterator`].
    ///
    /// The items must be labeled pairs of the form `((usize, usize), l)`
    /// specifying an arc and its label.
    pub fn from_arcs(arcs: impl IntoIterator<Item = ((usize, usize), L)>) -> Self {
        let mut g = Self::new();
        g.add_arcs(arcs);
        g
    }

    /// Adds nodes and successors from anything yielding `(node, successors)`
    /// pairs in node order, sorting successors per node as needed.
    pub fn add_lender<I>(&mut self, iter_nodes: I) -> &mut Self
    where
        I: IntoLender,
        I::Lender: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
    {
        let mut arcs = Vec::new();
        for_!( (node, succ) in iter_nodes {
            self.add_node(node);
            for (v, l) in succ {
                arcs.push((v, l));
                self.add_node(v);
            }
            arcs.sort_by_key(|x| x.0);
            for (v, l) in arcs.drain(..) {
                self.add_arc(node, v, l);
            }
        });
        self
    }

    /// Creates a new graph from anything yielding `(node, successors)` pairs.
    pub fn from_lender<I>(iter_nodes: I) -> Self
    where
        I: IntoLender,
        I::Lender: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
    {
        let mut g = Self::new();
        g.add_lender(iter_nodes);
        g
    }

    /// Shrinks the capacity of the graph to fit its current size.
    pub fn shrink_to_fit(&mut self) {
        self.succ.shrink_to_fit();
        for s in self.succ.iter_mut() {
            s.shrink_to_fit();
        }
    }
}

type LabeledSucc<'succ, L> =
    core::iter::Map<core::iter::Cloned<core::slice::Iter<'succ, LabeledArc<L>>>, fn(LabeledArc<L>) -> (usize, L)>;

impl<L: Clone + 'static> SequentialLabeling for LabeledVecGraph<L> {
    type Label = (usize, L);
    type Lender<'a>
        = Iter<'a, L>
    where
        Self: 'a;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.succ.len()
    }

    #[inline(always)]
    fn num_arcs_hint(&self) -> Option<u64> {
        Some(self.num_arcs)
    }

    #[inline(always)]
    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        Iter {
            graph: self,
            node: from,
        }
    }
}

impl<'a, L: Clone + 'static> IntoLender for &'a LabeledVecGraph<L> {
    type Lender = <LabeledVecGraph<L> as SequentialLabeling>::Lender<'a>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

impl<L: Clone + 'static> LabeledSequentialGraph<L> for LabeledVecGraph<L> {}

impl<L: Clone + 'static> RandomAccessLabeling for LabeledVecGraph<L> {
    type Labels<'succ> = LabeledSucc<'succ, L>;

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    #[inline(always)]
    fn outdegree(&self, node: usize) -> usize {
        self.succ[node].len()
    }

    #[inline(always)]
    fn labels(&self, node: usize) -> <Self as RandomAccessLabeling>::Labels<'_> {
        self.succ[node].iter().cloned().map(Into::into)
    }
}

impl<L: Clone + 'static> LabeledRandomAccessGraph<L> for LabeledVecGraph<L> {}

/// Lender over the node/successors pairs of a [`LabeledVecGraph`].
pub struct Iter<'a, L: Clone + 'static> {
    graph: &'a LabeledVecGraph<L>,
    node: usize,
}

impl<'lend, L: Clone + 'static> Lending<'lend> for Iter<'_, L> {
    type Lend = (usize, LabeledSucc<'lend, L>);
}

impl<L: Clone + 'static> Lender for Iter<'_, L> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.node >= self.graph.succ.len() {
            return None;
        }
        let node = self.node;
        self.node += 1;
        Some((node, self.graph.succ[node].iter().cloned().map(Into::into)))
    }
}

impl<'lend, L: Clone + 'static> NodeLabelsLender<'lend> for Iter<'_, L> {
    type Label = (usize, L);
    type IntoIterator = LabeledSucc<'lend, L>;
}

unsafe impl<L: Clone + 'static> SortedLender for Iter<'_, L> {}
unsafe impl<L> SortedIterator for LabeledSucc<'_, L> {}

/// A mutable [`RandomAccessGraph`] implementation based on a vector of
/// vectors.
///
/// This is just a newtype for a [`LabeledVecGraph`] with `()` labels. All
/// mutation methods are delegated.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VecGraph(LabeledVecGraph<()>);

impl VecGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        LabeledVecGraph::new().into()
    }

    /// Creates a new empty graph with `n` nodes.
    pub fn empty(n: usize) -> Self {
        LabeledVecGraph::empty(n).into()
    }

    /// Adds an isolated node to the graph and returns true if it is a new node.
    pub fn add_node(&mut self, node: usize) -> bool {
        self.0.add_node(node)
    }

    /// Adds an arc to the graph.
    ///
    /// New arcs must be added in increasing successor order, or this method
    /// will panic.
    pub fn add_arc(&mut self, u: usize, v: usize) {
        self.0.add_arc(u, v, ())
    }

    /// Adds arcs from an [`IntoIterator`], adding new nodes as needed.
    ///
    /// The items must be pairs of the form `(usize, usize)` specifying an arc.
    pub fn add_arcs(&mut self, arcs: impl IntoIterator<Item = (usize, usize)>) {
        self.0.add_arcs(arcs.into_iter().map(|pair| (pair, ())));
    }

    /// Creates a new graph from an [`IntoIterator`].
    ///
    /// The items must be pairs of the form `(usize, usize)` specifying an arc.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut g = Self::new();
        g.add_arcs(arcs);
        g
    }

    /// Adds nodes and successors from anything yielding `(node, successors)`
    /// pairs of plain successor ids.
    pub fn add_lender<I>(&mut self, iter_nodes: I) -> &mut Self
    where
        I: IntoLender,
        I::Lender: for<'next> NodeLabelsLender<'next, Label = usize>,
    {
        let mut lender = iter_nodes.into_lender();
        for_!( (node, succ) in lender {
            self.add_node(node);
            let mut arcs: Vec<usize> = succ.into_iter().collect();
            arcs.sort_unstable();
            for v in arcs {
                self.add_node(v);
                self.add_arc(node, v);
            }
        });
        self
    }

    /// Creates a new graph from anything yielding `(node, successors)` pairs.
    pub fn from_lender<I>(iter_nodes: I) -> Self
    where
        I: IntoLender,
        I::Lender: for<'next> NodeLabelsLender<'next, Label = usize>,
    {
        let mut g = Self::new();
        g.add_lender(iter_nodes);
        g
    }

    /// Shrinks the capacity of the graph to fit its current size.
    pub fn shrink_to_fit(&mut self) {
        self.0.shrink_to_fit();
    }
}

impl<'a> IntoLender for &'a VecGraph {
    type Lender = <VecGraph as SequentialLabeling>::Lender<'a>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

type UnlabeledSucc<'succ> =
    core::iter::Map<core::iter::Copied<core::slice::Iter<'succ, LabeledArc<()>>>, fn(LabeledArc<()>) -> usize>;

impl SequentialLabeling for VecGraph {
    type Label = usize;
    type Lender<'a> = VecGraphIter<'a>;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    #[inline(always)]
    fn num_arcs_hint(&self) -> Option<u64> {
        self.0.num_arcs_hint()
    }

    #[inline(always)]
    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        VecGraphIter {
            graph: self,
            node: from,
        }
    }
}

impl SequentialGraph for VecGraph {}

impl RandomAccessLabeling for VecGraph {
    type Labels<'succ> = UnlabeledSucc<'succ>;

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.0.num_arcs()
    }

    #[inline(always)]
    fn outdegree(&self, node: usize) -> usize {
        self.0.outdegree(node)
    }

    #[inline(always)]
    fn labels(&self, node: usize) -> <Self as RandomAccessLabeling>::Labels<'_> {
        self.0.succ[node].iter().copied().map(|LabeledArc(x, _)| x)
    }
}

impl RandomAccessGraph for VecGraph {}

impl From<LabeledVecGraph<()>> for VecGraph {
    fn from(g: LabeledVecGraph<()>) -> Self {
        VecGraph(g)
    }
}

/// Lender over the node/successors pairs of a [`VecGraph`].
pub struct VecGraphIter<'a> {
    graph: &'a VecGraph,
    node: usize,
}

impl<'lend> Lending<'lend> for VecGraphIter<'_> {
    type Lend = (usize, UnlabeledSucc<'lend>);
}

impl Lender for VecGraphIter<'_> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.node >= self.graph.num_nodes() {
            return None;
        }
        let node = self.node;
        self.node += 1;
        Some((
            node,
            self.graph.0.succ[node].iter().copied().map(|LabeledArc(x, _)| x),
        ))
    }
}

impl<'lend> NodeLabelsLender<'lend> for VecGraphIter<'_> {
    type Label = usize;
    type IntoIterator = UnlabeledSucc<'lend>;
}

unsafe impl SortedLender for VecGraphIter<'_> {}
unsafe impl SortedIterator for UnlabeledSucc<'_> {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_vec_graph() {
        let mut arcs = vec![
            ((0, 1), Some(1.0)),
            ((0, 2), None),
            ((1, 2), Some(2.0)),
            ((2, 4), Some(f64::INFINITY)),
            ((3, 4), Some(f64::NEG_INFINITY)),
            ((1, 3), Some(f64::NAN)),
        ];
        let g = LabeledVecGraph::<_>::from_arcs(arcs.iter().copied());
        assert_ne!(
            g, g,
            "The label contains a NaN which is not equal to itself so the graph must be not equal to itself"
        );

        arcs.pop();
        let g = LabeledVecGraph::<_>::from_arcs(arcs);
        assert_eq!(g, g, "Without NaN the graph should be equal to itself");
    }

    #[test]
    fn test_vec_graph_roundtrip() {
        let arcs = [(0, 1), (0, 2), (1, 2), (2, 0)];
        let g = VecGraph::from_arcs(arcs);
        assert_eq!(g.num_nodes(), 3);
        assert_eq!(g.num_arcs(), 4);
        assert_eq!(g.successors(0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(g.successors(2).collect::<Vec<_>>(), vec![0]);

        let g2 = VecGraph::from_lender(g.iter());
        assert_eq!(g, g2);
    }

    #[test]
    #[should_panic]
    fn test_vec_graph_out_of_order_panics() {
        let mut g = VecGraph::empty(3);
        g.add_arc(0, 2);
        g.add_arc(0, 1);
    }
}
