/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The immutable-graph capability contract.
//!
//! A [`SequentialGraph`] is a [`SequentialLabeling`] whose label is `usize`
//! (a successor node id). A [`RandomAccessGraph`] adds random access to
//! `outdegree`/`successors`. Labelled variants carry a `(usize, L)` pair
//! instead, used by the arc-labelled overlay.

use super::labels::{RandomAccessLabeling, SequentialLabeling};
use super::lenders::SortedLender;
use lender::for_;

/// A graph that can be accessed sequentially, node by node, successors in
/// whatever order the underlying source provides.
pub trait SequentialGraph: SequentialLabeling<Label = usize> {}

impl<S: SequentialLabeling<Label = usize> + ?Sized> SequentialGraph for S {}

/// A [`SequentialGraph`] with, additionally, random access to successor
/// lists.
pub trait RandomAccessGraph: RandomAccessLabeling<Label = usize> + SequentialGraph {
    /// Returns the successors of `node_id`.
    fn successors(&self, node_id: usize) -> <Self as RandomAccessLabeling>::Labels<'_> {
        <Self as RandomAccessLabeling>::labels(self, node_id)
    }

    /// Whether there is an arc `src_node_id -> dst_node_id`.
    ///
    /// The default implementation performs a linear scan of the (sorted)
    /// successor list.
    fn has_arc(&self, src_node_id: usize, dst_node_id: usize) -> bool {
        for succ in self.successors(src_node_id) {
            if succ == dst_node_id {
                return true;
            }
            if succ > dst_node_id {
                break;
            }
        }
        false
    }
}

impl<R: RandomAccessLabeling<Label = usize> + SequentialGraph + ?Sized> RandomAccessGraph for R {}

/// A sequential graph whose label is a pair `(usize, L)`: a successor and its
/// arc label.
pub trait LabeledSequentialGraph<L>: SequentialLabeling<Label = (usize, L)> {}

impl<S: SequentialLabeling<Label = (usize, L)> + ?Sized, L> LabeledSequentialGraph<L> for S {}

/// A random-access labelled graph.
pub trait LabeledRandomAccessGraph<L>: RandomAccessLabeling<Label = (usize, L)> {
    /// Returns the pairs (successor, label) of `node_id`.
    fn successors(&self, node_id: usize) -> <Self as RandomAccessLabeling>::Labels<'_> {
        <Self as RandomAccessLabeling>::labels(self, node_id)
    }

    fn has_arc(&self, src: usize, dst: usize) -> bool {
        for (succ, _) in self.successors(src) {
            if succ == dst {
                return true;
            }
        }
        false
    }
}

impl<R: RandomAccessLabeling<Label = (usize, L)> + ?Sized, L> LabeledRandomAccessGraph<L> for R {}

/// Returns whether two graphs whose lenders are [sorted](SortedLender) have
/// the same node count and, for every node, the same (sorted) successor set.
pub fn eq<G0: SequentialGraph, G1: SequentialGraph>(g0: &G0, g1: &G1) -> bool
where
    for<'a> G0::Lender<'a>: SortedLender,
    for<'a> G1::Lender<'a>: SortedLender,
{
    if g0.num_nodes() != g1.num_nodes() {
        return false;
    }
    let mut ok = true;
    for_!(((node0, succ0), (node1, succ1)) in g0.iter().zip(g1.iter()) {
        debug_assert_eq!(node0, node1);
        let mut s0 = succ0.into_iter().collect::<Vec<_>>();
        let mut s1 = succ1.into_iter().collect::<Vec<_>>();
        s0.sort_unstable();
        s1.sort_unstable();
        if s0 != s1 {
            ok = false;
        }
    });
    ok
}
