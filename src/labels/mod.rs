/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The arc-labelled overlay: combining a plain graph's
//! successor structure with a parallel bit-stream of per-arc labels.
//!
//! [`bitstream`] implements the label bit streams themselves
//! (`.labels`/`.labeloffsets`); [`proj`] and [`zip`] convert
//! between a `(usize, L)`-labelled graph and the pair of its unlabelled
//! successor structure and its bare label sequence.

pub mod bitstream;
pub use bitstream::*;

pub mod proj;
pub use proj::*;

pub mod zip;
pub use zip::*;
