/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The sequential BV adjacency decoder: a forward-only lender
//! over successor lists, carrying a sliding window of the last
//! `compression_window` decoded lists so that copy references are resolved
//! by reading the window rather than by seeking the bit stream. This is the
//! only decoder usable under the `OFFLINE` and `ONCE` load modes, which
//! have no offsets table.

use std::cell::RefCell;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use lender::{Lend, Lender, Lending};

use crate::traits::{NodeLabelsLender, SequentialLabeling, SortedIterator, SortedLender};

use super::codec::{BitRead, MemBitReader, StreamBitReader};
use super::comp_flags::CompFlags;
use super::decode::{read_intervals, read_prefix, read_residuals};
use super::masked_iter::MaskedIter;

/// A source of fresh bit-stream decoders for sequential access.
///
/// `new_decoder` is called once per restart (`iter_from`): `STANDARD` and
/// `MAPPED` loads back this with a shared in-memory buffer and can restart
/// any number of times; `OFFLINE` backs it with a file path, reopened on
/// every restart; `ONCE` backs it with a single already-open stream that
/// can be handed out exactly once.
pub trait SequentialDecoderFactory {
    type Decoder<'a>: BitRead
    where
        Self: 'a;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>>;
}

/// In-memory backing (`STANDARD`/`MAPPED`), restartable any number of times.
#[derive(Clone)]
pub struct MemoryFactory {
    data: std::sync::Arc<[u8]>,
}

impl MemoryFactory {
    pub fn new(data: std::sync::Arc<[u8]>) -> Self {
        Self { data }
    }
}

impl SequentialDecoderFactory for MemoryFactory {
    type Decoder<'a> = MemBitReader<&'a [u8]>;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>> {
        Ok(MemBitReader::new(self.data.as_ref()))
    }
}

/// `OFFLINE`-mode backing: nothing is kept resident; every restart reopens
/// the graph file from disk.
#[derive(Clone)]
pub struct FileFactory {
    path: PathBuf,
}

impl FileFactory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SequentialDecoderFactory for FileFactory {
    type Decoder<'a> = StreamBitReader<std::fs::File>;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>> {
        Ok(StreamBitReader::new(std::fs::File::open(&self.path)?))
    }
}

/// `ONCE`-mode backing: wraps a single already-open [`Read`] stream, given
/// out the first time `new_decoder` is called and never again.
pub struct OnceFactory<R> {
    inner: RefCell<Option<R>>,
}

impl<R: Read> OnceFactory<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: RefCell::new(Some(inner)),
        }
    }
}

impl<R: Read> SequentialDecoderFactory for OnceFactory<R> {
    type Decoder<'a>
        = StreamBitReader<R>
    where
        R: 'a;

    fn new_decoder(&self) -> io::Result<Self::Decoder<'_>> {
        let inner = self
            .inner
            .borrow_mut()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "ONCE-mode stream already consumed"))?;
        Ok(StreamBitReader::new(inner))
    }
}

/// Ring buffer of the last `capacity` decoded successor lists, indexed by
/// absolute node id modulo capacity.
struct Window {
    data: Vec<Vec<usize>>,
}

impl Window {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![Vec::new(); capacity.max(1)],
        }
    }

    fn get(&self, node: usize) -> &[usize] {
        &self.data[node % self.data.len()]
    }

    fn slot_mut(&mut self, node: usize) -> &mut Vec<usize> {
        let len = self.data.len();
        &mut self.data[node % len]
    }
}

/// Decodes node `curr_node`'s successor list into `out` (cleared first,
/// left sorted ascending), resolving any copy reference against `window`.
fn decode_node(
    decoder: &mut impl BitRead,
    flags: &CompFlags,
    curr_node: usize,
    window: &Window,
    out: &mut Vec<usize>,
) -> io::Result<()> {
    out.clear();
    let prefix = read_prefix(decoder, flags, flags.compression_window)?;
    if prefix.outdegree == 0 {
        return Ok(());
    }
    let reference = prefix.reference;
    let outdegree = prefix.outdegree;
    let copied_count = if reference != 0 {
        let ref_list = window.get(curr_node - reference);
        let masked = MaskedIter::new(ref_list.iter().copied(), prefix.blocks);
        let before = out.len();
        out.extend(masked);
        out.len() - before
    } else {
        0
    };
    let extra = outdegree - copied_count;
    if extra > 0 {
        let intervals = read_intervals(decoder, flags, curr_node)?;
        let interval_total: usize = intervals.iter().map(|&(_, l)| l).sum();
        for (left, len) in intervals {
            out.extend(left..left + len);
        }
        let residual_count = extra - interval_total;
        let residuals = read_residuals(decoder, flags, curr_node, residual_count)?;
        out.extend(residuals);
    }
    out.sort_unstable();
    Ok(())
}

/// A forward-only, node-ordered sequential graph over a BV-compressed
/// adjacency stream.
pub struct BvGraphSeq<F: SequentialDecoderFactory> {
    factory: F,
    flags: CompFlags,
    num_nodes: usize,
    num_arcs: Option<u64>,
}

impl<F: SequentialDecoderFactory> BvGraphSeq<F> {
    pub fn new(factory: F, flags: CompFlags, num_nodes: usize, num_arcs: Option<u64>) -> Self {
        Self {
            factory,
            flags,
            num_nodes,
            num_arcs,
        }
    }

    pub fn flags(&self) -> &CompFlags {
        &self.flags
    }

    /// Fallible counterpart to [`SequentialLabeling::iter_from`]. Surfaces
    /// factory failures directly instead of panicking — the one case that
    /// matters in practice is a second restart of a `ONCE`-mode graph.
    pub fn try_iter_from(&self, from: usize) -> io::Result<Iter<F::Decoder<'_>>> {
        let mut decoder = self.factory.new_decoder()?;
        let mut backrefs = Window::new(self.flags.compression_window + 1);
        let mut current_node = 0;
        let mut scratch = Vec::new();
        while current_node < from && current_node < self.num_nodes {
            decode_node(&mut decoder, &self.flags, current_node, &backrefs, &mut scratch)?;
            std::mem::swap(&mut scratch, backrefs.slot_mut(current_node));
            current_node += 1;
        }
        Ok(Iter {
            decoder,
            flags: self.flags,
            backrefs,
            current_node,
            num_nodes: self.num_nodes,
            error: None,
        })
    }
}

impl<F: SequentialDecoderFactory> SequentialLabeling for BvGraphSeq<F> {
    type Label = usize;
    type Lender<'node>
        = Iter<F::Decoder<'node>>
    where
        F: 'node;

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_arcs_hint(&self) -> Option<u64> {
        self.num_arcs
    }

    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        self.try_iter_from(from)
            .expect("sequential decoder could not be (re)started; see BvGraphSeq::try_iter_from")
    }
}

/// Lender over the node/successors pairs of a [`BvGraphSeq`].
pub struct Iter<D: BitRead> {
    decoder: D,
    flags: CompFlags,
    backrefs: Window,
    current_node: usize,
    num_nodes: usize,
    error: Option<io::Error>,
}

impl<D: BitRead> Iter<D> {
    /// The format error (if any) that stopped iteration early. A `None`
    /// after iteration has reached `num_nodes` total calls means a clean
    /// finish.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }
}

impl<'lend, D: BitRead> Lending<'lend> for Iter<D> {
    type Lend = (usize, std::iter::Copied<std::slice::Iter<'lend, usize>>);
}

impl<D: BitRead> Lender for Iter<D> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.error.is_some() || self.current_node >= self.num_nodes {
            return None;
        }
        let node = self.current_node;
        self.current_node += 1;
        let mut scratch = std::mem::take(self.backrefs.slot_mut(node));
        if let Err(e) = decode_node(&mut self.decoder, &self.flags, node, &self.backrefs, &mut scratch) {
            self.error = Some(e);
            return None;
        }
        *self.backrefs.slot_mut(node) = scratch;
        Some((node, self.backrefs.get(node).iter().copied()))
    }
}

impl<'lend, D: BitRead> NodeLabelsLender<'lend> for Iter<D> {
    type Label = usize;
    type IntoIterator = std::iter::Copied<std::slice::Iter<'lend, usize>>;
}

unsafe impl<D: BitRead> SortedLender for Iter<D> {}
unsafe impl SortedIterator for std::iter::Copied<std::slice::Iter<'_, usize>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::bvgraph::comp_flags::Code;
    use crate::graphs::bvgraph::encoder::BvComp;
    use crate::traits::SequentialGraph;
    use lender::for_;

    fn compress_to_memory(arcs: &[(usize, usize)], num_nodes: usize, flags: CompFlags) -> (Vec<u8>, Vec<u8>) {
        use crate::graphs::vec_graph::VecGraph;
        let mut g = VecGraph::empty(num_nodes);
        g.add_arcs(arcs.iter().copied());
        let mut comp = BvComp::new(Vec::new(), Vec::new(), flags, 0).unwrap();
        comp.extend(&g).unwrap();
        let (_stats, graph_bytes, _offsets_bytes) = comp.flush().unwrap();
        (graph_bytes, Vec::new())
    }

    #[test]
    fn sequential_roundtrip_small_cycle() {
        let n = 8;
        let arcs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let flags = CompFlags::default();
        let (graph_bytes, _) = compress_to_memory(&arcs, n, flags);
        let factory = MemoryFactory::new(graph_bytes.into());
        let seq = BvGraphSeq::new(factory, flags, n, Some(n as u64));

        let mut got = Vec::new();
        for_!( (node, succ) in seq.iter() {
            got.push((node, succ.collect::<Vec<_>>()));
        });
        let expected: Vec<(usize, Vec<usize>)> = (0..n).map(|i| (i, vec![(i + 1) % n])).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn sequential_roundtrip_with_blocks_and_intervals() {
        let n = 12;
        let mut g = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if j != i && (j + i) % 3 == 0 {
                    g.push((i, j));
                }
            }
        }
        let flags = CompFlags {
            min_interval_length: 2,
            compression_window: 4,
            ..CompFlags::default()
        };
        let (graph_bytes, _) = compress_to_memory(&g, n, flags);
        let factory = MemoryFactory::new(graph_bytes.into());
        let seq = BvGraphSeq::new(factory, flags, n, None);

        let mut expected_succ: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in &g {
            expected_succ[u].push(v);
        }
        for s in expected_succ.iter_mut() {
            s.sort_unstable();
        }

        let mut got = vec![Vec::new(); n];
        for_!( (node, succ) in seq.iter() {
            got[node] = succ.collect::<Vec<_>>();
        });
        assert_eq!(got, expected_succ);
    }

    #[test]
    fn sequential_iter_from_matches_full_scan() {
        let n = 20;
        let arcs: Vec<(usize, usize)> = (0..n).flat_map(|i| [(i, (i + 3) % n), (i, (i + 7) % n)]).collect();
        let flags = CompFlags::default();
        let (graph_bytes, _) = compress_to_memory(&arcs, n, flags);
        let factory = MemoryFactory::new(graph_bytes.into());
        let seq = BvGraphSeq::new(factory, flags, n, None);

        let mut full = Vec::new();
        for_!( (node, succ) in seq.iter() {
            full.push((node, succ.collect::<Vec<_>>()));
        });

        let mut from5 = Vec::new();
        for_!( (node, succ) in seq.iter_from(5) {
            from5.push((node, succ.collect::<Vec<_>>()));
        });
        assert_eq!(&full[5..], &from5[..]);
    }

    #[test]
    fn once_factory_cannot_restart() {
        let n = 4;
        let arcs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let flags = CompFlags::default();
        let (graph_bytes, _) = compress_to_memory(&arcs, n, flags);
        let factory = OnceFactory::new(std::io::Cursor::new(graph_bytes));
        let seq = BvGraphSeq::new(factory, flags, n, None);
        assert!(seq.try_iter_from(0).is_ok());
        assert!(seq.try_iter_from(0).is_err());
    }
}
