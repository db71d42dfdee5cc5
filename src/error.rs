/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Typed error kinds, layered under the `anyhow::Result` used at
//! API boundaries (load, encode, property parsing).
//!
//! [`FormatError`] and [`CapabilityError`] are the two kinds a caller is
//! expected to match on programmatically; I/O failures are surfaced as
//! plain [`std::io::Error`] (wrapped by `anyhow` at the boundary) since
//! there is nothing a caller can do differently based on their content.

use thiserror::Error;

/// A malformed on-disk artifact: a truncated bit stream, an invalid code
/// word, a reference pointing outside the decoded prefix, a residual count
/// that doesn't reconcile with the declared outdegree, or a `.properties`
/// file missing a required key.
///
/// Non-recoverable: once raised, the iterator or decoder that raised it
/// must not be used again — a decoder failure mid-iteration invalidates
/// the whole iterator.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("truncated bit stream while reading {field}")]
    Truncated { field: &'static str },
    #[error("node {node} declares reference {reference} which exceeds the compression window")]
    ReferenceOutOfWindow { node: usize, reference: usize },
    #[error("node {node} references node {target}, which has not been decoded yet")]
    ReferenceBeforeStart { node: usize, target: i64 },
    #[error(
        "node {node}: residual count mismatch (outdegree {outdegree}, copied {copied}, interval {interval}, leaving {residuals} residuals required but stream yields a different count)"
    )]
    ResidualCountMismatch {
        node: usize,
        outdegree: usize,
        copied: usize,
        interval: usize,
        residuals: usize,
    },
    #[error("missing required property key {key:?}")]
    MissingProperty { key: &'static str },
    #[error("unknown code name {name:?} in compressionflags")]
    UnknownCode { name: String },
    #[error("outdegree {outdegree} exceeds the documented per-list limit of 2^31 targets")]
    OutdegreeOverflow { outdegree: u64 },
}

/// A programming-contract violation: calling a random-access-only method on
/// a sequential graph, `outdegree`/`successors` on an OFFLINE graph with no
/// offsets loaded, or `copy()` on a graph that isn't random-access.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("outdegree/successors random access requires offsets, which are not loaded in this mode (load in STANDARD or MAPPED mode, or query via the sequential iterator)")]
    NoRandomAccess,
    #[error("copy() requires a random-access, flyweight-shareable graph")]
    NotCopiable,
    #[error("this graph was loaded in ONCE mode and cannot be iterated a second time")]
    NotRestartable,
}

/// Node id or argument out of the domain the operation accepts.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("node id {node} is out of range [0, {num_nodes})")]
    NodeOutOfRange { node: usize, num_nodes: usize },
    #[error("split count must be >= 1, got {0}")]
    InvalidSplitCount(usize),
}
