/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Binding a basename to a constructed graph: parse
//! `.properties`, then back the graph with whichever of the four load
//! modes the caller picked.
//!
//! [`BvGraph::with_basename`] covers `STANDARD`/`MAPPED` (random access,
//! offsets required). [`BvGraphSeq::with_basename`] covers `OFFLINE`
//! (sequential only, nothing preloaded, the graph file reopened from disk on
//! every restart). [`BvGraphSeq::from_stream`] covers `ONCE` (a single
//! already-open stream, non-restartable, structural parameters supplied
//! directly since there is no basename to read a `.properties` file from).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use mmap_rs::MmapFlags;

use crate::utils::MmapHelper;

use super::codec::{CodeRead, MemBitReader};
use super::comp_flags::{read_properties, CompFlags};
use super::offsets::{build_ef, read_ef_cache, EF};
use super::random_access::{BvGraph, MemoryFactory as MemFactory, MmapFactory, RandomAccessDecoderFactory};
use super::sequential::{BvGraphSeq, FileFactory, OnceFactory};
use super::{EF_EXTENSION, GRAPH_EXTENSION, OFFSETS_EXTENSION, PROPERTIES_EXTENSION};

fn parse_properties(basename: &Path) -> Result<(usize, u64, CompFlags)> {
    let props_path = basename.with_extension(PROPERTIES_EXTENSION);
    let map =
        read_properties(&props_path).with_context(|| format!("could not read {}", props_path.display()))?;
    let num_nodes = map
        .get("nodes")
        .context("missing 'nodes' property")?
        .parse::<usize>()
        .context("invalid 'nodes' property")?;
    let num_arcs = map
        .get("arcs")
        .context("missing 'arcs' property")?
        .parse::<u64>()
        .context("invalid 'arcs' property")?;
    let flags = CompFlags::from_properties(&map)?;
    Ok((num_nodes, num_arcs, flags))
}

/// Reads the full monotone offsets array (`num_nodes + 1` entries) back out
/// of the `.offsets` γ-gap stream: a leading sentinel `γ(0)` followed by one
/// γ-coded per-node bit-length (see `encoder.rs`'s `OffsetsWriter`).
fn decode_offsets_stream(bytes: &[u8], num_nodes: usize) -> Result<Vec<u64>> {
    let mut r = MemBitReader::new(bytes);
    let sentinel = r.read_gamma()?;
    ensure!(sentinel == 0, "malformed offsets stream: leading value is not 0");
    let mut offsets = Vec::with_capacity(num_nodes + 1);
    offsets.push(0u64);
    let mut acc = 0u64;
    for _ in 0..num_nodes {
        acc += r.read_gamma()?;
        offsets.push(acc);
    }
    Ok(offsets)
}

/// Loads the offsets EF from the `.ef` cache next to `basename` if present,
/// falling back to rebuilding it from the `.offsets` γ-gap stream. The
/// fallback is logged, since it costs an extra full pass over the offsets
/// stream that the cache exists precisely to avoid.
fn load_or_build_ef(basename: &Path, num_nodes: usize) -> Result<EF> {
    let ef_path = basename.with_extension(EF_EXTENSION);
    if ef_path.exists() {
        return read_ef_cache(&ef_path)
            .with_context(|| format!("could not read Elias-Fano cache {}", ef_path.display()));
    }
    log::warn!(
        "no {} cache found; rebuilding offsets from the .{} stream",
        ef_path.display(),
        OFFSETS_EXTENSION
    );
    let offsets_path = basename.with_extension(OFFSETS_EXTENSION);
    let bytes =
        fs::read(&offsets_path).with_context(|| format!("could not read {}", offsets_path.display()))?;
    let offsets = decode_offsets_stream(&bytes, num_nodes)?;
    Ok(build_ef(&offsets))
}

/// The two random-access backings (`STANDARD` and `MAPPED`) behind one
/// concrete type, so [`BvGraph::with_basename`] returns a single type
/// regardless of which the caller picked.
#[derive(Clone)]
pub enum StandardOrMapped {
    Standard(MemFactory),
    Mapped(MmapFactory),
}

impl RandomAccessDecoderFactory for StandardOrMapped {
    type Decoder<'a> = MemBitReader<&'a [u8]>;

    fn new_decoder(&self) -> std::io::Result<Self::Decoder<'_>> {
        match self {
            Self::Standard(f) => f.new_decoder(),
            Self::Mapped(f) => f.new_decoder(),
        }
    }
}

/// Which of the two random-access backings [`BvGraph::with_basename`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphLoadMode {
    /// Graph bytes read fully into memory (`STANDARD`).
    #[default]
    Standard,
    /// Graph bytes memory-mapped (`MAPPED`).
    Mapped,
}

/// Builder returned by [`BvGraph::with_basename`].
pub struct LoadConfig {
    basename: PathBuf,
    mode: GraphLoadMode,
}

impl LoadConfig {
    /// Selects `STANDARD` or `MAPPED`; `STANDARD` unless called.
    pub fn mode(mut self, mode: GraphLoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parses `.properties`, loads the graph bytes per [`mode`](Self::mode),
    /// and loads or rebuilds the `.ef` offsets.
    pub fn load(self) -> Result<BvGraph<StandardOrMapped, EF>> {
        let (num_nodes, num_arcs, flags) = parse_properties(&self.basename)?;
        let graph_path = self.basename.with_extension(GRAPH_EXTENSION);
        let factory = match self.mode {
            GraphLoadMode::Standard => {
                let bytes = fs::read(&graph_path)
                    .with_context(|| format!("could not read {}", graph_path.display()))?;
                StandardOrMapped::Standard(MemFactory::new(Arc::from(bytes.into_boxed_slice())))
            }
            GraphLoadMode::Mapped => {
                let mmap = MmapHelper::<u8>::mmap(&graph_path, MmapFlags::empty())
                    .with_context(|| format!("could not mmap {}", graph_path.display()))?;
                StandardOrMapped::Mapped(MmapFactory::new(Arc::new(mmap)))
            }
        };
        let offsets = load_or_build_ef(&self.basename, num_nodes)?;
        Ok(BvGraph::new(factory, Arc::new(offsets), flags, num_nodes, num_arcs))
    }
}

impl BvGraph<StandardOrMapped, EF> {
    /// Starts a [`LoadConfig`] for the graph with basename `basename`
    /// (`STANDARD` mode unless [`LoadConfig::mode`] is called).
    pub fn with_basename(basename: impl AsRef<Path>) -> LoadConfig {
        LoadConfig {
            basename: basename.as_ref().to_path_buf(),
            mode: GraphLoadMode::Standard,
        }
    }
}

impl BvGraphSeq<FileFactory> {
    /// `OFFLINE` mode: nothing preloaded, sequential access only, the graph
    /// file reopened from disk on every restart.
    pub fn with_basename(basename: impl AsRef<Path>) -> Result<Self> {
        let basename = basename.as_ref();
        let (num_nodes, num_arcs, flags) = parse_properties(basename)?;
        let graph_path = basename.with_extension(GRAPH_EXTENSION);
        Ok(BvGraphSeq::new(FileFactory::new(&graph_path), flags, num_nodes, Some(num_arcs)))
    }
}

impl<R: Read> BvGraphSeq<OnceFactory<R>> {
    /// `ONCE` mode: wraps a single already-open stream; the graph's
    /// structural parameters must be supplied directly.
    pub fn from_stream(reader: R, flags: CompFlags, num_nodes: usize, num_arcs: Option<u64>) -> Self {
        BvGraphSeq::new(OnceFactory::new(reader), flags, num_nodes, num_arcs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::bvgraph::encoder::BvCompConfig;
    use crate::graphs::vec_graph::VecGraph;
    use crate::traits::RandomAccessGraph;

    #[test]
    fn roundtrip_standard_mode_without_ef_cache() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("g");

        let n = 10;
        let mut g = VecGraph::empty(n);
        g.add_arcs((0..n).map(|i| (i, (i + 3) % n)));
        BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();

        let loaded = BvGraph::with_basename(&basename).load().unwrap();
        assert_eq!(loaded.num_nodes(), n);
        for node in 0..n {
            let got: Vec<usize> = loaded.successors(node).collect();
            assert_eq!(got, vec![(node + 3) % n]);
        }
    }

    #[test]
    fn offline_mode_is_sequential_only() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("g");

        let n = 6;
        let mut g = VecGraph::empty(n);
        g.add_arcs((0..n).map(|i| (i, (i + 1) % n)));
        BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();

        let seq = BvGraphSeq::<FileFactory>::with_basename(&basename).unwrap();
        use crate::traits::SequentialLabeling;
        use lender::for_;
        let mut got = Vec::new();
        for_!( (node, succ) in seq.iter() {
            got.push((node, succ.collect::<Vec<_>>()));
        });
        assert_eq!(got.len(), n);
    }

    #[test]
    fn once_mode_from_stream() {
        let dir = tempfile::tempdir().unwrap();
        let basename = dir.path().join("g");

        let n = 5;
        let mut g = VecGraph::empty(n);
        g.add_arcs((0..n).map(|i| (i, (i + 2) % n)));
        BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();

        let graph_bytes = fs::read(basename.with_extension(GRAPH_EXTENSION)).unwrap();
        let seq = BvGraphSeq::from_stream(
            std::io::Cursor::new(graph_bytes),
            CompFlags::default(),
            n,
            None,
        );
        assert!(seq.try_iter_from(0).is_ok());
        assert!(seq.try_iter_from(0).is_err());
    }
}
