/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Shared low-level successor-list decoding steps, used by both
//! the sequential and random-access decoders so they stay in lock step with
//! the encoder's bit layout (`encoder.rs`'s `Compressor::write`).

use std::io;

use super::codec::{unfold_signed, BitRead, CodeRead};
use super::comp_flags::CompFlags;

/// The outdegree/reference/copy-block prefix common to both decoders.
pub(super) struct Prefix {
    pub outdegree: usize,
    pub reference: usize,
    pub blocks: Vec<usize>,
}

impl Prefix {
    /// Number of reference-list elements this node's copy blocks keep: the
    /// sum of the even-indexed (inclusion) block lengths.
    pub fn copied_count(&self) -> usize {
        self.blocks.iter().step_by(2).sum()
    }
}

/// Reads outdegree, and — if the window is nonzero and the outdegree is
/// nonzero — the reference and copy-block list.
pub(super) fn read_prefix(
    r: &mut impl BitRead,
    flags: &CompFlags,
    compression_window: usize,
) -> io::Result<Prefix> {
    let outdegree = flags.outdegrees.read(r)? as usize;
    let mut reference = 0;
    let mut blocks = Vec::new();
    if outdegree != 0 && compression_window != 0 {
        reference = flags.references.read(r)? as usize;
        if reference != 0 {
            let block_count = flags.blocks.read(r)? as usize;
            blocks.reserve(block_count);
            for i in 0..block_count {
                let raw = flags.blocks.read(r)? as usize;
                blocks.push(if i == 0 { raw } else { raw + 1 });
            }
        }
    }
    Ok(Prefix {
        outdegree,
        reference,
        blocks,
    })
}

/// Reads the interval list as absolute, ascending, non-overlapping
/// `(left, length)` pairs.
pub(super) fn read_intervals(
    r: &mut impl BitRead,
    flags: &CompFlags,
    curr_node: usize,
) -> io::Result<Vec<(usize, usize)>> {
    if flags.min_interval_length == 0 {
        return Ok(Vec::new());
    }
    let interval_count = flags.intervals.read(r)? as usize;
    let mut intervals = Vec::with_capacity(interval_count);
    if interval_count == 0 {
        return Ok(intervals);
    }
    let left0 = curr_node as i64 + unfold_signed(flags.intervals.read(r)?);
    let len0 = flags.min_interval_length + flags.intervals.read(r)? as usize;
    let left0 = left0 as usize;
    intervals.push((left0, len0));
    let mut prev_end = left0 + len0;
    for _ in 1..interval_count {
        let left = prev_end + 1 + flags.intervals.read(r)? as usize;
        let len = flags.min_interval_length + flags.intervals.read(r)? as usize;
        intervals.push((left, len));
        prev_end = left + len;
    }
    Ok(intervals)
}

/// Reads exactly `count` residuals as absolute, strictly ascending node ids.
pub(super) fn read_residuals(
    r: &mut impl BitRead,
    flags: &CompFlags,
    curr_node: usize,
    count: usize,
) -> io::Result<Vec<usize>> {
    let mut residuals = Vec::with_capacity(count);
    if count == 0 {
        return Ok(residuals);
    }
    let first = curr_node as i64 + unfold_signed(flags.residuals.read(r)?);
    residuals.push(first as usize);
    for _ in 1..count {
        let next = residuals[residuals.len() - 1] + 1 + flags.residuals.read(r)? as usize;
        residuals.push(next);
    }
    Ok(residuals)
}
