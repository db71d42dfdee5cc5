/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Projections between a labelled graph and its unlabelled successor
//! structure or bare label sequence.
//!
//! [`Left`] drops the label and keeps the successor, turning any
//! `(usize, L)`-labelled sequential graph into a plain [`SequentialGraph`].
//! [`Right`] does the opposite, keeping only the label sequence.

use crate::prelude::*;
use lender::*;

/// Projects a `(usize, L)`-labelled sequential labeling to its successors,
/// discarding the label of each arc.
#[derive(Debug, Clone)]
pub struct Left<G>(pub G);

impl<G, L> SequentialLabeling for Left<G>
where
    G: SequentialLabeling<Label = (usize, L)>,
{
    type Label = usize;
    type Lender<'a>
        = LeftLender<G::Lender<'a>>
    where
        Self: 'a;

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
        LeftLender(self.0.iter_from(from))
    }
}

// `Left<G>` implements `SequentialLabeling<Label = usize>` above, so it
// already gets `SequentialGraph` from the blanket impl in `traits::graph`;
// a second explicit impl here would conflict with it (E0119).

impl<'a, G, L> IntoLender for &'a Left<G>
where
    G: SequentialLabeling<Label = (usize, L)>,
{
    type Lender = LeftLender<G::Lender<'a>>;

    #[inline(always)]
    fn into_lender(self) -> Self::Lender {
        self.iter()
    }
}

pub struct LeftLender<Ln>(Ln);

pub struct LeftSucc<I>(I);

impl<L, I: Iterator<Item = (usize, L)>> Iterator for LeftSucc<I> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(v, _)| v)
    }
}

unsafe impl<L, I: SortedIterator<Item = (usize, L)>> SortedIterator for LeftSucc<I> {}

impl<'lend, Ln, L> Lending<'lend> for LeftLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    type Lend = (usize, LeftSucc<LenderIntoIter<'lend, Ln>>);
}

impl<Ln, L> Lender for LeftLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    #[inline(always)]
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        self.0.next().map(|(n, succ)| (n, LeftSucc(succ.into_iter())))
    }
}

impl<'lend, Ln, L> NodeLabelsLender<'lend> for LeftLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    type Label = usize;
    type IntoIterator = LeftSucc<LenderIntoIter<'lend, Ln>>;
}

unsafe impl<Ln: SortedLender> SortedLender for LeftLender<Ln> where
    Ln: for<'next> NodeLabelsLender<'next>
{
}

/// Projects a `(usize, L)`-labelled sequential labeling to its labels,
/// discarding the successor of each arc.
#[derive(Debug, Clone)]
pub struct Right<G>(pub G);

impl<G, L> SequentialLabeling for Right<G>
where
    G: SequentialLabeling<Label = (usize, L)>,
{
    type Label = L;
    type Lender<'a>
        = RightLender<G::Lender<'a>>
    where
        Self: 'a;

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
        RightLender(self.0.iter_from(from))
    }
}

pub struct RightLender<Ln>(Ln);

pub struct RightSucc<I>(I);

impl<L, I: Iterator<Item = (usize, L)>> Iterator for RightSucc<I> {
    type Item = L;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, l)| l)
    }
}

impl<'lend, Ln, L> Lending<'lend> for RightLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    type Lend = (usize, RightSucc<LenderIntoIter<'lend, Ln>>);
}

impl<Ln, L> Lender for RightLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    #[inline(always)]
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        self.0
            .next()
            .map(|(n, succ)| (n, RightSucc(succ.into_iter())))
    }
}

impl<'lend, Ln, L> NodeLabelsLender<'lend> for RightLender<Ln>
where
    Ln: for<'next> NodeLabelsLender<'next, Label = (usize, L)>,
{
    type Label = L;
    type IntoIterator = RightSucc<LenderIntoIter<'lend, Ln>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::vec_graph::LabeledVecGraph;

    #[test]
    fn test_left() {
        let arcs = [((0, 1), "a"), ((0, 2), "b"), ((1, 2), "c")];
        let g = LabeledVecGraph::from_arcs(arcs);
        let left = Left(g);
        assert_eq!(left.num_nodes(), 3);
        let mut lender = left.iter();
        let (node, succ) = lender.next().unwrap();
        assert_eq!(node, 0);
        assert_eq!(succ.collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_right() {
        let arcs = [((0, 1), "a"), ((0, 2), "b")];
        let g = LabeledVecGraph::from_arcs(arcs);
        let right = Right(g);
        let mut lender = right.iter();
        let (node, labels) = lender.next().unwrap();
        assert_eq!(node, 0);
        assert_eq!(labels.collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
