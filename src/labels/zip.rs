/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Combining an unlabelled successor structure with a bare label sequence
//! into one `(usize, L)`-labelled graph, the inverse of
//! [`super::proj::Left`]/[`super::proj::Right`].

use anyhow::{bail, ensure, Result};
use lender::*;

use crate::prelude::*;

/// Pairs a graph's successors with a parallel label sequence, node by node.
///
/// `0` supplies the successors, `1` the labels; both must be traversed in
/// the same node order and agree on the outdegree of every node, which
/// [`verify`](Zip::verify) checks but the accessors below assume.
#[derive(Debug, Clone)]
pub struct Zip<G, L>(pub G, pub L);

impl<G: SequentialGraph, L: SequentialLabeling> Zip<G, L> {
    /// Scans both sides once, checking node count, node order, and
    /// per-node successor/label count agreement. Does not inspect label
    /// content.
    pub fn verify(&self) -> Result<()> {
        ensure!(
            self.0.num_nodes() == self.1.num_nodes(),
            "graph has {} nodes but labels have {}",
            self.0.num_nodes(),
            self.1.num_nodes()
        );
        let mut g_lender = self.0.iter();
        let mut l_lender = self.1.iter();
        loop {
            match (g_lender.next(), l_lender.next()) {
                (None, None) => break,
                (Some((gn, succ)), Some((ln, labels))) => {
                    ensure!(gn == ln, "node order mismatch while zipping: {gn} vs {ln}");
                    let succ_count = succ.into_iter().count();
                    let label_count = labels.into_iter().count();
                    ensure!(
                        succ_count == label_count,
                        "node {gn}: {succ_count} successors but {label_count} labels"
                    );
                }
                _ => bail!("graph and labels disagree on the total number of nodes"),
            }
        }
        Ok(())
    }
}

impl<G: SequentialGraph, L: SequentialLabeling> SequentialLabeling for Zip<G, L> {
    type Label = (usize, L::Label);
    type Lender<'a>
        = ZipLender<G::Lender<'a>, L::Lender<'a>>
    where
        Self: 'a;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.0.num_nodes()
    }

    #[inline(always)]
    fn num_arcs_hint(&self) -> Option<u64> {
        self.1.num_arcs_hint().or_else(|| self.0.num_arcs_hint())
    }

    #[inline(always)]
    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        ZipLender(self.0.iter_from(from), self.1.iter_from(from))
    }
}

impl<G: RandomAccessGraph, L: RandomAccessLabeling> RandomAccessLabeling for Zip<G, L> {
    type Labels<'succ>
        = ZipSucc<<G::Labels<'succ> as IntoIterator>::IntoIter, <L::Labels<'succ> as IntoIterator>::IntoIter>
    where
        Self: 'succ;

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.1.num_arcs()
    }

    #[inline(always)]
    fn outdegree(&self, node_id: usize) -> usize {
        self.0.outdegree(node_id)
    }

    #[inline(always)]
    fn labels(&self, node_id: usize) -> Self::Labels<'_> {
        ZipSucc {
            g: self.0.successors(node_id).into_iter(),
            l: self.1.labels(node_id).into_iter(),
        }
    }
}

pub struct ZipLender<Lg, Ll>(Lg, Ll);

/// Per-node `(successor, label)` iterator, panicking on a count mismatch
/// between the two sides (a violation of the invariant [`Zip::verify`]
/// checks up front).
pub struct ZipSucc<Ig, Il> {
    g: Ig,
    l: Il,
}

impl<Ig: Iterator<Item = usize>, Il: Iterator> Iterator for ZipSucc<Ig, Il> {
    type Item = (usize, Il::Item);

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        match (self.g.next(), self.l.next()) {
            (Some(s), Some(l)) => Some((s, l)),
            (None, None) => None,
            _ => panic!("successor/label count mismatch while zipping"),
        }
    }
}

unsafe impl<Ig: SortedIterator<Item = usize>, Il: Iterator> SortedIterator for ZipSucc<Ig, Il> {}

impl<'lend, Lg, Ll, LL> Lending<'lend> for ZipLender<Lg, Ll>
where
    Lg: for<'next> NodeLabelsLender<'next, Label = usize>,
    Ll: for<'next> NodeLabelsLender<'next, Label = LL>,
{
    type Lend = (usize, ZipSucc<LenderIntoIter<'lend, Lg>, LenderIntoIter<'lend, Ll>>);
}

impl<Lg, Ll, LL> Lender for ZipLender<Lg, Ll>
where
    Lg: for<'next> NodeLabelsLender<'next, Label = usize>,
    Ll: for<'next> NodeLabelsLender<'next, Label = LL>,
{
    #[inline(always)]
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        match (self.0.next(), self.1.next()) {
            (Some((gn, succ)), Some((ln, labels))) => {
                debug_assert_eq!(gn, ln, "graph/label node order mismatch while zipping");
                Some((
                    gn,
                    ZipSucc {
                        g: succ.into_iter(),
                        l: labels.into_iter(),
                    },
                ))
            }
            (None, None) => None,
            _ => panic!("graph and labels have a different number of nodes"),
        }
    }
}

impl<'lend, Lg, Ll, LL> NodeLabelsLender<'lend> for ZipLender<Lg, Ll>
where
    Lg: for<'next> NodeLabelsLender<'next, Label = usize>,
    Ll: for<'next> NodeLabelsLender<'next, Label = LL>,
{
    type Label = (usize, LL);
    type IntoIterator = ZipSucc<LenderIntoIter<'lend, Lg>, LenderIntoIter<'lend, Ll>>;
}

unsafe impl<Lg, Ll, LL> SortedLender for ZipLender<Lg, Ll>
where
    Lg: SortedLender + for<'next> NodeLabelsLender<'next, Label = usize>,
    Ll: for<'next> NodeLabelsLender<'next, Label = LL>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::vec_graph::{LabeledVecGraph, VecGraph};
    use crate::labels::proj::{Left, Right};

    #[test]
    fn zip_reconstructs_labeled_pairs() {
        let arcs = [((0usize, 1usize), "a"), ((0, 2), "b"), ((1, 2), "c")];
        let labeled = LabeledVecGraph::from_arcs(arcs);
        let left = Left(labeled.clone());
        let right = Right(labeled);
        let zipped = Zip(left, right);
        zipped.verify().unwrap();

        let mut lender = zipped.iter();
        let (node, pairs) = lender.next().unwrap();
        assert_eq!(node, 0);
        assert_eq!(pairs.collect::<Vec<_>>(), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn verify_rejects_count_mismatch() {
        let mut g = VecGraph::empty(3);
        g.add_arcs([(0, 1)]);
        let labeled = LabeledVecGraph::from_arcs([((0usize, 1usize), "x"), ((0, 2usize), "y")]);
        // `g` has one arc out of node 0, but `Right(labeled)` carries two labels for it.
        let zipped = Zip(g, Right(labeled));
        assert!(zipped.verify().is_err());
    }
}
