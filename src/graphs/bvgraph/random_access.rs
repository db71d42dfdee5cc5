/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The random-access BV adjacency decoder: `successors(node)`
//! seeks the graph bit stream to `offsets.get(node)` and decodes lazily,
//! chasing copy references by recursively calling back into `successors`
//! on the referenced node — exactly as many levels deep as the encoder's
//! `max_ref_count` allowed, and no further, since the format guarantees a
//! reference chain terminates within the compression window.
//!
//! The three sources of a node's successors — the copied reference list,
//! the intervals, and the residuals — are merged lazily, one minimum-of-
//! three comparison per `next()` call, rather than collected and sorted;
//! this keeps random access to a single node's successors proportional to
//! its own outdegree plus the length of the reference chain, not to the
//! whole graph.

use std::io;
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lender::{Lend, Lender, Lending};

use crate::traits::{NodeLabelsLender, RandomAccessLabeling, SequentialLabeling, SortedIterator, SortedLender};
use crate::utils::{ArcMmapHelper, MmapHelper};

use super::codec::{BitRead, BitSeek, MemBitReader};
use super::comp_flags::CompFlags;
use super::decode::{read_intervals, read_prefix, read_residuals};
use super::masked_iter::MaskedIter;
use super::offsets::Offsets;

/// A source of fresh, independently-seekable bit-stream decoders, one per
/// call to [`BvGraph::successors`]/[`labels`](RandomAccessLabeling::labels)
/// (and one more per level of reference chasing).
///
/// Implementations are expected to be cheap to clone and share their
/// backing bytes (an `Arc<[u8]>` or a memory map), which is what makes
/// [`BvGraph::copy`] a flyweight operation: cloning the factory and the
/// offsets does not copy the graph's bytes.
pub trait RandomAccessDecoderFactory {
    type Decoder<'a>: BitRead + BitSeek
    where
        Self: 'a;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>>;
}

/// In-memory backing (`STANDARD` load mode): an `Arc<[u8]>` shared across
/// every flyweight copy of the graph.
#[derive(Clone)]
pub struct MemoryFactory {
    data: Arc<[u8]>,
}

impl MemoryFactory {
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data }
    }
}

impl RandomAccessDecoderFactory for MemoryFactory {
    type Decoder<'a> = MemBitReader<&'a [u8]>;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>> {
        Ok(MemBitReader::new(self.data.as_ref()))
    }
}

/// Memory-mapped backing (`MAPPED` load mode): the graph file's pages are
/// faulted in on demand by the OS rather than read eagerly.
#[derive(Clone)]
pub struct MmapFactory {
    mmap: ArcMmapHelper<u8>,
}

impl MmapFactory {
    pub fn new(mmap: Arc<MmapHelper<u8>>) -> Self {
        Self {
            mmap: ArcMmapHelper(mmap),
        }
    }
}

impl RandomAccessDecoderFactory for MmapFactory {
    type Decoder<'a> = MemBitReader<&'a [u8]>;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>> {
        Ok(MemBitReader::new(self.mmap.0.as_ref().as_ref()))
    }
}

/// A random-access graph over a BV-compressed adjacency stream.
///
/// Cheap to clone (a "flyweight copy"): `F` and the offsets are
/// both reference-counted or otherwise shared, so `copy()` never touches
/// the graph's bytes, only the small struct of handles naming them. Each
/// clone decodes independently and can be handed to a different thread.
pub struct BvGraph<F: RandomAccessDecoderFactory, O: Offsets> {
    factory: F,
    offsets: Arc<O>,
    flags: CompFlags,
    num_nodes: usize,
    num_arcs: u64,
}

impl<F: RandomAccessDecoderFactory, O: Offsets> BvGraph<F, O> {
    pub fn new(factory: F, offsets: Arc<O>, flags: CompFlags, num_nodes: usize, num_arcs: u64) -> Self {
        Self {
            factory,
            offsets,
            flags,
            num_nodes,
            num_arcs,
        }
    }

    pub fn flags(&self) -> &CompFlags {
        &self.flags
    }

    /// Returns the outdegree of `node_id` without decoding its successor
    /// list (just the first code word at the node's offset).
    pub fn outdegree(&self, node_id: usize) -> usize {
        let mut decoder = self
            .factory
            .new_decoder()
            .expect("could not open a fresh decoder for outdegree lookup");
        decoder
            .set_bit_pos(self.offsets.get(node_id))
            .expect("offset out of range");
        self.flags.outdegrees.read(&mut decoder).expect("truncated outdegree") as usize
    }

    /// Returns `self` with the backing bytes and offsets shared rather than
    /// copied; safe to hand to another thread.
    pub fn copy(&self) -> Self
    where
        F: Clone,
    {
        Self {
            factory: self.factory.clone(),
            offsets: Arc::clone(&self.offsets),
            flags: self.flags,
            num_nodes: self.num_nodes,
            num_arcs: self.num_arcs,
        }
    }
}

impl<F: RandomAccessDecoderFactory, O: Offsets> SequentialLabeling for BvGraph<F, O> {
    type Label = usize;
    type Lender<'node>
        = Iter<'node, F, O>
    where
        Self: 'node;

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_arcs_hint(&self) -> Option<u64> {
        Some(self.num_arcs)
    }

    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        Iter { graph: self, node: from }
    }
}

impl<F: RandomAccessDecoderFactory, O: Offsets> RandomAccessLabeling for BvGraph<F, O> {
    type Labels<'succ>
        = Succ<'succ, F, O>
    where
        Self: 'succ;

    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    fn outdegree(&self, node_id: usize) -> usize {
        BvGraph::outdegree(self, node_id)
    }

    fn labels(&self, node_id: usize) -> Self::Labels<'_> {
        Succ::new(self, node_id)
    }
}

/// Lender over the node/successors pairs of a [`BvGraph`], built directly on
/// top of [`RandomAccessLabeling::labels`] (one fresh decode per node; see
/// [`super::sequential::BvGraphSeq`] for the windowed, allocation-light
/// sequential path).
pub struct Iter<'a, F: RandomAccessDecoderFactory, O: Offsets> {
    graph: &'a BvGraph<F, O>,
    node: usize,
}

impl<'lend, F: RandomAccessDecoderFactory, O: Offsets> Lending<'lend> for Iter<'_, F, O> {
    type Lend = (usize, Succ<'lend, F, O>);
}

impl<F: RandomAccessDecoderFactory, O: Offsets> Lender for Iter<'_, F, O> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.node >= self.graph.num_nodes {
            return None;
        }
        let node = self.node;
        self.node += 1;
        Some((node, self.graph.labels(node)))
    }
}

impl<'lend, F: RandomAccessDecoderFactory, O: Offsets> NodeLabelsLender<'lend> for Iter<'_, F, O> {
    type Label = usize;
    type IntoIterator = Succ<'lend, F, O>;
}

unsafe impl<F: RandomAccessDecoderFactory, O: Offsets> SortedLender for Iter<'_, F, O> {}
unsafe impl<F: RandomAccessDecoderFactory, O: Offsets> SortedIterator for Succ<'_, F, O> {}

/// Lazy successor iterator for one node: merges the copied reference list,
/// the intervals, and the residuals, all three already individually
/// ascending, via a running minimum-of-three so the merged output is
/// ascending too — without collecting or sorting anything.
pub struct Succ<'a, F: RandomAccessDecoderFactory, O: Offsets> {
    copied: Option<Peekable<MaskedIter<Succ<'a, F, O>>>>,
    intervals: Vec<(usize, usize)>,
    interval_idx: usize,
    interval_next: usize,
    residuals: Vec<usize>,
    residual_idx: usize,
}

impl<'a, F: RandomAccessDecoderFactory, O: Offsets> Succ<'a, F, O> {
    fn new(graph: &'a BvGraph<F, O>, node_id: usize) -> Self {
        let mut decoder = graph
            .factory
            .new_decoder()
            .expect("could not open a fresh decoder for random access");
        decoder
            .set_bit_pos(graph.offsets.get(node_id))
            .expect("offset out of range");
        Self::decode(graph, &mut decoder, node_id)
    }

    fn decode(graph: &'a BvGraph<F, O>, decoder: &mut (impl BitRead + BitSeek), node_id: usize) -> Self {
        let prefix = read_prefix(decoder, &graph.flags, graph.flags.compression_window)
            .expect("truncated node prefix");
        if prefix.outdegree == 0 {
            return Self::empty();
        }
        let copied = if prefix.reference != 0 {
            let ref_node = node_id - prefix.reference;
            let parent = Succ::new(graph, ref_node);
            Some(MaskedIter::new(parent, prefix.blocks).peekable())
        } else {
            None
        };
        let copied_count = prefix.copied_count();
        let extra = prefix.outdegree - copied_count;
        let (intervals, residuals) = if extra > 0 {
            let intervals = read_intervals(decoder, &graph.flags, node_id).expect("truncated intervals");
            let interval_total: usize = intervals.iter().map(|&(_, l)| l).sum();
            let residual_count = extra - interval_total;
            let residuals =
                read_residuals(decoder, &graph.flags, node_id, residual_count).expect("truncated residuals");
            (intervals, residuals)
        } else {
            (Vec::new(), Vec::new())
        };
        let interval_next = intervals.first().map(|&(left, _)| left).unwrap_or(0);
        Self {
            copied,
            intervals,
            interval_idx: 0,
            interval_next,
            residuals,
            residual_idx: 0,
        }
    }

    fn empty() -> Self {
        Self {
            copied: None,
            intervals: Vec::new(),
            interval_idx: 0,
            interval_next: 0,
            residuals: Vec::new(),
            residual_idx: 0,
        }
    }

    fn peek_interval(&self) -> Option<usize> {
        if self.interval_idx < self.intervals.len() {
            Some(self.interval_next)
        } else {
            None
        }
    }

    fn advance_interval(&mut self) {
        let (left, len) = self.intervals[self.interval_idx];
        self.interval_next += 1;
        if self.interval_next >= left + len {
            self.interval_idx += 1;
            if self.interval_idx < self.intervals.len() {
                self.interval_next = self.intervals[self.interval_idx].0;
            }
        }
    }

    fn peek_residual(&self) -> Option<usize> {
        self.residuals.get(self.residual_idx).copied()
    }
}

impl<'a, F: RandomAccessDecoderFactory, O: Offsets> Iterator for Succ<'a, F, O> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let next_copied = self.copied.as_mut().and_then(|it| it.peek().copied());
        let next_interval = self.peek_interval();
        let next_residual = self.peek_residual();

        let next_extra = match (next_interval, next_residual) {
            (Some(i), Some(r)) => Some(i.min(r)),
            (Some(i), None) => Some(i),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        };

        match (next_extra, next_copied) {
            (None, None) => None,
            (Some(e), None) => {
                self.take_extra(e);
                Some(e)
            }
            (None, Some(c)) => {
                self.copied.as_mut().unwrap().next();
                Some(c)
            }
            (Some(e), Some(c)) => {
                if e <= c {
                    self.take_extra(e);
                    Some(e)
                } else {
                    self.copied.as_mut().unwrap().next();
                    Some(c)
                }
            }
        }
    }
}

impl<'a, F: RandomAccessDecoderFactory, O: Offsets> Succ<'a, F, O> {
    /// Consumes whichever of intervals/residuals produced `value` (the
    /// two sets are disjoint by format invariant).
    fn take_extra(&mut self, value: usize) {
        if self.peek_interval() == Some(value) {
            self.advance_interval();
        } else {
            debug_assert_eq!(self.peek_residual(), Some(value));
            self.residual_idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::bvgraph::encoder::BvComp;
    use crate::graphs::bvgraph::offsets::build_ef;
    use crate::graphs::vec_graph::VecGraph;
    use crate::traits::{RandomAccessGraph, SequentialGraph};

    fn build_graph(arcs: &[(usize, usize)], num_nodes: usize, flags: CompFlags) -> BvGraph<MemoryFactory, super::super::offsets::EF> {
        let mut g = VecGraph::empty(num_nodes);
        g.add_arcs(arcs.iter().copied());
        let mut comp = BvComp::new(Vec::new(), Vec::new(), flags, 0).unwrap();
        comp.extend(&g).unwrap();
        let (stats, graph_bytes, offsets_bytes) = comp.flush().unwrap();

        let mut offsets_reader = MemBitReader::new(offsets_bytes);
        let sentinel = offsets_reader.read_gamma().unwrap();
        debug_assert_eq!(sentinel, 0);
        let mut offsets = Vec::with_capacity(num_nodes + 1);
        let mut acc = 0u64;
        offsets.push(0u64);
        for _ in 0..num_nodes {
            acc += offsets_reader.read_gamma().unwrap();
            offsets.push(acc);
        }
        debug_assert_eq!(*offsets.last().unwrap(), stats.written_bits);

        let ef = build_ef(&offsets);
        BvGraph::new(
            MemoryFactory::new(graph_bytes.into()),
            Arc::new(ef),
            flags,
            num_nodes,
            stats.num_arcs,
        )
    }

    #[test]
    fn random_access_matches_input_small() {
        let n = 10;
        let mut arcs = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if j != i && (i + j) % 2 == 0 {
                    arcs.push((i, j));
                }
            }
        }
        let flags = CompFlags::default();
        let g = build_graph(&arcs, n, flags);

        let mut expected: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in &arcs {
            expected[u].push(v);
        }
        for s in expected.iter_mut() {
            s.sort_unstable();
        }

        for node in 0..n {
            let got: Vec<usize> = g.successors(node).collect();
            assert_eq!(got, expected[node], "node {node}");
            assert_eq!(g.outdegree(node), expected[node].len());
        }
    }

    #[test]
    fn random_access_with_references_and_intervals() {
        let n = 16;
        let mut arcs = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if j != i && (j + i) % 3 != 0 {
                    arcs.push((i, j));
                }
            }
        }
        let flags = CompFlags {
            min_interval_length: 2,
            compression_window: 7,
            max_ref_count: 3,
            ..CompFlags::default()
        };
        let g = build_graph(&arcs, n, flags);

        let mut expected: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in &arcs {
            expected[u].push(v);
        }
        for s in expected.iter_mut() {
            s.sort_unstable();
        }

        for node in 0..n {
            let got: Vec<usize> = g.successors(node).collect();
            assert_eq!(got, expected[node], "node {node}");
        }
    }

    #[test]
    fn copy_is_independent_and_consistent() {
        let n = 6;
        let arcs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let flags = CompFlags::default();
        let g = build_graph(&arcs, n, flags);
        let g2 = g.copy();
        for node in 0..n {
            assert_eq!(
                g.successors(node).collect::<Vec<_>>(),
                g2.successors(node).collect::<Vec<_>>()
            );
        }
    }
}
