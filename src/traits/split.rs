/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Splitting a sequential labeling into disjoint, independently-iterable
//! chunks.
//!
//! This is the mechanism that lets parallel algorithms (out of scope for
//! this crate) partition a graph across threads while only depending on
//! the sequential-access contract.

use super::labels::SequentialLabeling;
use super::lenders::{NodeLabelsLender, SortedLender};
use lender::{Lend, Lender, Lending};

/// A [`SequentialLabeling`] that can produce a fixed number of disjoint
/// lenders whose concatenation, in order, equals a full [`iter`](SequentialLabeling::iter).
pub trait SplitLabeling: SequentialLabeling {
    /// Splits `self` into at most `how_many` lenders covering disjoint,
    /// contiguous node ranges whose union is `[0, num_nodes)`.
    ///
    /// `how_many` is clamped to `[1, num_nodes().max(1)]`; trailing empty
    /// lenders are permitted when `how_many` exceeds `num_nodes()`.
    fn split_iter(&self, how_many: usize) -> Vec<Bounded<Self::Lender<'_>>> {
        let n = self.num_nodes();
        let how_many = how_many.max(1);
        let chunk = n.div_ceil(how_many).max(1);
        let mut out = Vec::with_capacity(how_many);
        let mut start = 0;
        while out.len() < how_many {
            let end = (start + chunk).min(n);
            let len = end.saturating_sub(start);
            out.push(Bounded {
                lender: self.iter_from(start),
                remaining: len,
            });
            start = end;
        }
        out
    }
}

impl<S: SequentialLabeling + ?Sized> SplitLabeling for S {}

/// A lender bounded to yield at most `remaining` more nodes.
///
/// Wraps an inner lender positioned at the start of a node range and stops
/// once that many nodes have been returned, regardless of how long the
/// inner lender would otherwise run.
#[derive(Debug)]
pub struct Bounded<L> {
    lender: L,
    remaining: usize,
}

impl<'lend, L> Lending<'lend> for Bounded<L>
where
    L: Lender + for<'next> NodeLabelsLender<'next>,
{
    type Lend = <L as Lending<'lend>>::Lend;
}

impl<L> Lender for Bounded<L>
where
    L: Lender + for<'next> NodeLabelsLender<'next>,
{
    #[inline]
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.lender.next()
    }
}

impl<'lend, L> NodeLabelsLender<'lend> for Bounded<L>
where
    L: for<'next> NodeLabelsLender<'next>,
{
    type Label = <L as NodeLabelsLender<'lend>>::Label;
    type IntoIterator = <L as NodeLabelsLender<'lend>>::IntoIterator;
}

unsafe impl<L: SortedLender> SortedLender for Bounded<L> where L: for<'next> NodeLabelsLender<'next> {}
