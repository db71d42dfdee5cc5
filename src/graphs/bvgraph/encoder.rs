/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The BV adjacency encoder.
//!
//! For every node, tries every candidate reference in the compression
//! window (skipping nodes whose reference-chain depth already hit
//! `max_ref_count`), picks whichever yields the fewest bits, and writes the
//! copy list / interval list / residual list for that choice. Offsets are
//! emitted in lockstep as γ-coded deltas on a second stream.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Write;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dsi_progress_logger::prelude::*;
use lender::for_;

use crate::traits::{NodeLabelsLender, SequentialGraph, SequentialLabeling};

use super::codec::{fold_signed, BitWrite, BitWriter, CodeWrite};
use super::comp_flags::{write_properties, CompFlags};
use super::{GRAPH_EXTENSION, OFFSETS_EXTENSION, PROPERTIES_EXTENSION};

/// Ring buffer indexed by absolute node id modulo capacity.
#[derive(Debug)]
struct CircularBuffer<T> {
    data: Vec<T>,
}

impl<T: Default + Clone> CircularBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity.max(1)],
        }
    }
}

impl<T> Index<usize> for CircularBuffer<T> {
    type Output = T;
    fn index(&self, node: usize) -> &T {
        &self.data[node % self.data.len()]
    }
}

impl<T> IndexMut<usize> for CircularBuffer<T> {
    fn index_mut(&mut self, node: usize) -> &mut T {
        let len = self.data.len();
        &mut self.data[node % len]
    }
}

/// A [`BitWrite`] that only counts bits, used to price candidate references
/// without touching the real bitstream.
#[derive(Default)]
struct CountingWriter {
    bits: u64,
}

impl BitWrite for CountingWriter {
    fn write_bit(&mut self, _bit: u32) -> std::io::Result<usize> {
        self.bits += 1;
        Ok(1)
    }
    fn bit_pos(&self) -> u64 {
        self.bits
    }
}

/// Writes the offsets stream: a leading sentinel `γ(0)` followed by one
/// γ-coded per-node bit-length delta.
struct OffsetsWriter<W: Write> {
    writer: BitWriter<W>,
}

impl<W: Write> OffsetsWriter<W> {
    fn new(inner: W) -> std::io::Result<Self> {
        let mut writer = BitWriter::new(inner);
        writer.write_gamma(0)?;
        Ok(Self { writer })
    }

    fn push(&mut self, written_bits: u64) -> std::io::Result<usize> {
        self.writer.write_gamma(written_bits)
    }

    fn finish(self) -> std::io::Result<W> {
        self.writer.finish()
    }
}

/// Staging area for one node's compressed representation, reused across
/// pushes to avoid reallocating on every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compressor {
    outdegree: usize,
    blocks: Vec<usize>,
    extra_nodes: Vec<usize>,
    left_interval: Vec<usize>,
    len_interval: Vec<usize>,
    residuals: Vec<usize>,
}

impl Compressor {
    const NO_INTERVALS: usize = 0;

    fn clear(&mut self) {
        self.outdegree = 0;
        self.blocks.clear();
        self.extra_nodes.clear();
        self.left_interval.clear();
        self.len_interval.clear();
        self.residuals.clear();
    }

    fn compress(&mut self, curr_list: &[usize], ref_list: Option<&[usize]>, min_interval_length: usize) {
        self.clear();
        self.outdegree = curr_list.len();
        if self.outdegree == 0 {
            return;
        }
        if let Some(ref_list) = ref_list {
            self.diff_comp(curr_list, ref_list);
        } else {
            self.extra_nodes.extend_from_slice(curr_list);
        }
        if !self.extra_nodes.is_empty() {
            if min_interval_length != Self::NO_INTERVALS {
                self.intervalize(min_interval_length);
            } else {
                self.residuals.extend_from_slice(&self.extra_nodes);
            }
        }
    }

    /// Extracts maximal runs of consecutive integers of length at least
    /// `min_interval_length` from `extra_nodes`, putting the rest in
    /// `residuals`.
    fn intervalize(&mut self, min_interval_length: usize) {
        let vl = self.extra_nodes.len();
        let mut i = 0;
        while i < vl {
            let mut j = 0;
            if i < vl - 1 && self.extra_nodes[i] + 1 == self.extra_nodes[i + 1] {
                j += 1;
                while i + j < vl - 1 && self.extra_nodes[i + j] + 1 == self.extra_nodes[i + j + 1] {
                    j += 1;
                }
                j += 1;
                if j >= min_interval_length {
                    self.left_interval.push(self.extra_nodes[i]);
                    self.len_interval.push(j);
                    i += j - 1;
                }
            }
            if j < min_interval_length {
                self.residuals.push(self.extra_nodes[i]);
            }
            i += 1;
        }
    }

    /// Computes the copy-block run-length list by walking `curr_list` and
    /// `ref_list` in lockstep: a block is a maximal run during which
    /// `curr_list` either matches (`copying`) or doesn't match `ref_list`.
    /// The first block is always a copy block, by convention, even if empty;
    /// everything else not copied lands in `extra_nodes`.
    fn diff_comp(&mut self, curr_list: &[usize], ref_list: &[usize]) {
        let mut j = 0;
        let mut k = 0;
        let mut curr_block_len = 0;
        let mut copying = true;
        while j < curr_list.len() && k < ref_list.len() {
            if copying {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        self.blocks.push(curr_block_len);
                        copying = false;
                        curr_block_len = 0;
                    }
                    Ordering::Less => {
                        self.extra_nodes.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        j += 1;
                        k += 1;
                        curr_block_len += 1;
                    }
                }
            } else {
                match curr_list[j].cmp(&ref_list[k]) {
                    Ordering::Greater => {
                        k += 1;
                        curr_block_len += 1;
                    }
                    Ordering::Less => {
                        self.extra_nodes.push(curr_list[j]);
                        j += 1;
                    }
                    Ordering::Equal => {
                        self.blocks.push(curr_block_len);
                        copying = true;
                        curr_block_len = 0;
                    }
                }
            }
        }
        if copying && k < ref_list.len() {
            self.blocks.push(curr_block_len);
        }
        while j < curr_list.len() {
            self.extra_nodes.push(curr_list[j]);
            j += 1;
        }
        if !self.blocks.is_empty() {
            self.blocks[0] += 1;
        }
    }

    /// Writes this node's block (outdegree, reference part, intervals,
    /// residuals) and returns the number of bits written.
    fn write<W: BitWrite>(
        &self,
        w: &mut W,
        flags: &CompFlags,
        curr_node: usize,
        reference: Option<usize>,
    ) -> std::io::Result<u64> {
        let mut bits = 0u64;
        bits += flags.outdegrees.write(w, self.outdegree as u64)? as u64;
        if self.outdegree != 0 {
            if let Some(r) = reference {
                bits += flags.references.write(w, r as u64)? as u64;
                if r != 0 {
                    bits += flags.blocks.write(w, self.blocks.len() as u64)? as u64;
                    for &b in &self.blocks {
                        bits += flags.blocks.write(w, (b - 1) as u64)? as u64;
                    }
                }
            }
        }
        if !self.extra_nodes.is_empty() && flags.min_interval_length != Compressor::NO_INTERVALS {
            bits += flags.intervals.write(w, self.left_interval.len() as u64)? as u64;
            if !self.left_interval.is_empty() {
                bits += flags.intervals.write(
                    w,
                    fold_signed(self.left_interval[0] as i64 - curr_node as i64),
                )? as u64;
                bits += flags.intervals.write(
                    w,
                    (self.len_interval[0] - flags.min_interval_length) as u64,
                )? as u64;
                let mut prev = self.left_interval[0] + self.len_interval[0];
                for i in 1..self.left_interval.len() {
                    bits += flags
                        .intervals
                        .write(w, (self.left_interval[i] - prev - 1) as u64)?
                        as u64;
                    bits += flags.intervals.write(
                        w,
                        (self.len_interval[i] - flags.min_interval_length) as u64,
                    )? as u64;
                    prev = self.left_interval[i] + self.len_interval[i];
                }
            }
        }
        if !self.residuals.is_empty() {
            bits += flags.residuals.write(
                w,
                fold_signed(self.residuals[0] as i64 - curr_node as i64),
            )? as u64;
            for i in 1..self.residuals.len() {
                bits += flags
                    .residuals
                    .write(w, (self.residuals[i] - self.residuals[i - 1] - 1) as u64)?
                    as u64;
            }
        }
        Ok(bits)
    }
}

/// Compression statistics for a completed [`BvComp`] run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompStats {
    pub num_nodes: usize,
    pub num_arcs: u64,
    pub written_bits: u64,
    pub offsets_written_bits: u64,
}

/// Streaming BV-format compressor: push successor lists in node order, then
/// [`flush`](BvComp::flush).
pub struct BvComp<WG: Write, WO: Write> {
    backrefs: CircularBuffer<Vec<usize>>,
    ref_counts: CircularBuffer<usize>,
    encoder: BitWriter<WG>,
    offsets_writer: OffsetsWriter<WO>,
    compressors: Vec<Compressor>,
    flags: CompFlags,
    curr_node: usize,
    start_node: usize,
    stats: CompStats,
}

impl<WG: Write, WO: Write> BvComp<WG, WO> {
    pub fn new(graph_out: WG, offsets_out: WO, flags: CompFlags, start_node: usize) -> std::io::Result<Self> {
        let window = flags.compression_window;
        Ok(BvComp {
            backrefs: CircularBuffer::new(window + 1),
            ref_counts: CircularBuffer::new(window + 1),
            encoder: BitWriter::new(graph_out),
            offsets_writer: OffsetsWriter::new(offsets_out)?,
            compressors: (0..window + 1).map(|_| Compressor::default()).collect(),
            flags,
            curr_node: start_node,
            start_node,
            stats: CompStats::default(),
        })
    }

    /// Pushes the successors of the next node (nodes must be pushed in
    /// order; a node with no successors still needs an empty call).
    pub fn push(&mut self, succ_iter: impl IntoIterator<Item = usize>) -> Result<()> {
        {
            let succ_vec = &mut self.backrefs[self.curr_node];
            succ_vec.clear();
            succ_vec.extend(succ_iter);
        }
        self.stats.num_nodes += 1;
        self.stats.num_arcs += self.backrefs[self.curr_node].len() as u64;

        {
            let curr_list = &self.backrefs[self.curr_node];
            let compressor = &mut self.compressors[0];
            compressor.compress(curr_list, None, self.flags.min_interval_length);
        }

        if self.flags.compression_window == 0 {
            let written_bits = self.compressors[0].write(&mut self.encoder, &self.flags, self.curr_node, None)?;
            self.curr_node += 1;
            self.stats.offsets_written_bits += self.offsets_writer.push(written_bits)? as u64;
            self.stats.written_bits += written_bits;
            return Ok(());
        }

        let mut ref_delta = 0usize;
        let mut min_bits = {
            let mut counter = CountingWriter::default();
            self.compressors[0].write(&mut counter, &self.flags, self.curr_node, Some(0))?;
            counter.bits
        };
        let mut ref_count = 0usize;

        let deltas = 1 + self.flags.compression_window.min(self.curr_node - self.start_node);
        for delta in 1..deltas {
            let ref_node = self.curr_node - delta;
            if self.ref_counts[ref_node] >= self.flags.max_ref_count {
                continue;
            }
            if self.backrefs[ref_node].is_empty() {
                continue;
            }
            let bits = {
                let curr_list = &self.backrefs[self.curr_node];
                let ref_list = &self.backrefs[ref_node];
                let compressor = &mut self.compressors[delta];
                compressor.compress(curr_list, Some(ref_list), self.flags.min_interval_length);
                let mut counter = CountingWriter::default();
                compressor.write(&mut counter, &self.flags, self.curr_node, Some(delta))?;
                counter.bits
            };
            if bits < min_bits {
                min_bits = bits;
                ref_delta = delta;
                ref_count = self.ref_counts[ref_node] + 1;
            }
        }

        let written_bits =
            self.compressors[ref_delta].write(&mut self.encoder, &self.flags, self.curr_node, Some(ref_delta))?;
        self.ref_counts[self.curr_node] = ref_count;
        self.curr_node += 1;
        self.stats.offsets_written_bits += self.offsets_writer.push(written_bits)? as u64;
        self.stats.written_bits += written_bits;
        Ok(())
    }

    /// Pushes every node of a sequential graph, in order.
    pub fn extend<L>(&mut self, iter_nodes: L) -> Result<()>
    where
        L: lender::IntoLender,
        L::Lender: for<'next> NodeLabelsLender<'next, Label = usize>,
    {
        let mut pl = ProgressLogger::default();
        pl.display_memory(true).item_name("node");
        pl.start("Compressing successors...");
        let mut result = Ok(());
        for_!( (_, succ) in iter_nodes {
            if let Err(e) = self.push(succ) {
                result = Err(e);
                break;
            }
            pl.update();
        });
        pl.done();
        result
    }

    /// Finalizes both streams, returning statistics and the two underlying
    /// writers (so callers can `sync_all`/close them before renaming).
    pub fn flush(self) -> std::io::Result<(CompStats, WG, WO)> {
        let graph_out = self.encoder.finish()?;
        let offsets_out = self.offsets_writer.finish()?;
        Ok((self.stats, graph_out, offsets_out))
    }
}

/// Builder for compressing a whole graph to a basename, with atomic
/// temp-then-rename writes for `.graph`, `.offsets` and `.properties`.
pub struct BvCompConfig {
    basename: PathBuf,
    flags: CompFlags,
}

impl BvCompConfig {
    pub fn with_basename(basename: impl AsRef<Path>) -> Self {
        Self {
            basename: basename.as_ref().to_path_buf(),
            flags: CompFlags::default(),
        }
    }

    pub fn with_comp_flags(mut self, flags: CompFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn comp_graph<G: SequentialGraph>(self, graph: &G) -> Result<CompStats> {
        let graph_path = self.basename.with_extension(GRAPH_EXTENSION);
        let offsets_path = self.basename.with_extension(OFFSETS_EXTENSION);
        let properties_path = self.basename.with_extension(PROPERTIES_EXTENSION);
        let graph_tmp = self.basename.with_extension(format!("{GRAPH_EXTENSION}.tmp"));
        let offsets_tmp = self.basename.with_extension(format!("{OFFSETS_EXTENSION}.tmp"));

        let graph_file = File::create(&graph_tmp)
            .with_context(|| format!("could not create {}", graph_tmp.display()))?;
        let offsets_file = File::create(&offsets_tmp)
            .with_context(|| format!("could not create {}", offsets_tmp.display()))?;

        let mut comp = BvComp::new(graph_file, offsets_file, self.flags, 0)?;
        comp.extend(graph)?;
        let (stats, graph_out, offsets_out) = comp.flush()?;
        graph_out.sync_all()?;
        offsets_out.sync_all()?;
        drop(graph_out);
        drop(offsets_out);

        std::fs::rename(&graph_tmp, &graph_path)
            .with_context(|| format!("could not rename {} to {}", graph_tmp.display(), graph_path.display()))?;
        std::fs::rename(&offsets_tmp, &offsets_path)
            .with_context(|| format!("could not rename {} to {}", offsets_tmp.display(), offsets_path.display()))?;

        let properties = self
            .flags
            .to_properties(graph.num_nodes(), stats.num_arcs, stats.written_bits);
        write_properties(&properties_path, &properties)?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressor_no_ref() {
        let mut c = Compressor::default();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], None, 2);
        assert_eq!(c.outdegree, 7);
        assert!(c.blocks.is_empty());
        assert_eq!(c.extra_nodes, vec![0, 1, 2, 5, 7, 8, 9]);
        assert_eq!(c.left_interval, vec![0, 7]);
        assert_eq!(c.len_interval, vec![3, 3]);
        assert_eq!(c.residuals, vec![5]);
    }

    #[test]
    fn compressor_with_ref() {
        let mut c = Compressor::default();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2]), 2);
        assert!(c.blocks.is_empty());
        assert_eq!(c.extra_nodes, vec![5, 7, 8, 9]);
        assert_eq!(c.left_interval, vec![7]);
        assert_eq!(c.residuals, vec![5]);
    }

    #[test]
    fn compressor_with_blocks() {
        let mut c = Compressor::default();
        c.compress(&[0, 1, 2, 5, 7, 8, 9], Some(&[0, 1, 2, 100]), 2);
        assert_eq!(c.blocks, vec![4]);
        assert_eq!(c.extra_nodes, vec![5, 7, 8, 9]);
    }

    #[test]
    fn compressor_alternating_blocks() {
        let mut c = Compressor::default();
        c.compress(&[0, 1, 2, 5, 7, 8, 9, 100], Some(&[0, 1, 2, 4, 7, 8, 9, 101]), 2);
        assert_eq!(c.blocks, vec![4, 1, 3]);
        assert_eq!(c.extra_nodes, vec![5, 100]);
        assert!(c.left_interval.is_empty());
        assert_eq!(c.residuals, vec![5, 100]);
    }
}
