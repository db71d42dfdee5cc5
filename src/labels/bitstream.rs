/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The arc-labelled bit-stream overlay: a `.labels` bit
//! stream holding one serialized label per arc, back to back with no
//! per-node count prefix, and a parallel `.labeloffsets` stream giving each
//! node's starting bit position as a γ-coded delta — structurally identical
//! to the main `.offsets` stream (leading sentinel, `num_nodes` deltas).
//!
//! A node's labels are read by decoding values from `.labels` until the bit
//! cursor reaches the next node's offset; there is no stored per-node count
//! to bound the read some other way.
//!
//! [`BitStreamLabels`] covers the `OFFLINE`/`ONCE` load modes (mirrors
//! [`BvGraphSeq`](crate::graphs::bvgraph::BvGraphSeq)); [`BitStreamRandomLabels`]
//! covers `STANDARD`/`MAPPED` (mirrors
//! [`BvGraph`](crate::graphs::bvgraph::BvGraph)).

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use lender::{for_, Lend, Lender, Lending};
use mmap_rs::MmapFlags;

use crate::prelude::*;
use crate::utils::MmapHelper;

use crate::graphs::bvgraph::codec::{BitWriter, MemBitReader};
use crate::graphs::bvgraph::random_access::{
    MemoryFactory as RanMemoryFactory, MmapFactory, RandomAccessDecoderFactory,
};
use crate::graphs::bvgraph::sequential::{FileFactory, OnceFactory, SequentialDecoderFactory};

/// Write side of a label protocol: knows how to bit-serialize one
/// label value.
pub trait BitSerializer {
    type SerType;

    fn serialize<W: CodeWrite>(&self, value: &Self::SerType, writer: &mut W) -> io::Result<usize>;
}

/// Read side of a label protocol. `deserialize_into` exists for callers
/// that want to reuse a buffer across labels instead of allocating one
/// `DeserType` per call; the default just calls [`deserialize`](Self::deserialize).
pub trait BitDeserializer {
    type DeserType;

    fn deserialize<R: CodeRead>(&self, reader: &mut R) -> io::Result<Self::DeserType>;

    fn deserialize_into<R: CodeRead>(&self, reader: &mut R, out: &mut Self::DeserType) -> io::Result<()>
    where
        Self::DeserType: Sized,
    {
        *out = self.deserialize(reader)?;
        Ok(())
    }
}

/// The label codecs this crate ships, named the way `.properties`'
/// `labelspec` key identifies them; `from_labelspec`/`to_labelspec`
/// together act as the registry mapping between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCodec {
    /// γ-coded `u64`.
    Gamma,
    /// Fixed-width minimal binary over `[0, 2^width)`.
    FixedWidth(u32),
}

impl LabelCodec {
    pub fn to_labelspec(self) -> String {
        match self {
            LabelCodec::Gamma => "GAMMA".to_string(),
            LabelCodec::FixedWidth(width) => format!("FIXEDWIDTH{width}"),
        }
    }

    pub fn from_labelspec(s: &str) -> Option<LabelCodec> {
        let upper = s.to_uppercase();
        if upper == "GAMMA" {
            return Some(LabelCodec::Gamma);
        }
        upper
            .strip_prefix("FIXEDWIDTH")
            .and_then(|w| w.parse::<u32>().ok())
            .map(LabelCodec::FixedWidth)
    }
}

impl BitSerializer for LabelCodec {
    type SerType = u64;

    fn serialize<W: CodeWrite>(&self, value: &u64, writer: &mut W) -> io::Result<usize> {
        match *self {
            LabelCodec::Gamma => writer.write_gamma(*value),
            LabelCodec::FixedWidth(width) => writer.write_bits(*value, width),
        }
    }
}

impl BitDeserializer for LabelCodec {
    type DeserType = u64;

    fn deserialize<R: CodeRead>(&self, reader: &mut R) -> io::Result<u64> {
        match *self {
            LabelCodec::Gamma => reader.read_gamma(),
            LabelCodec::FixedWidth(width) => reader.read_bits(width),
        }
    }
}

/// Reads values from `labels_decoder` until its bit cursor has advanced
/// exactly `bit_len` bits past its position on entry.
fn decode_node_labels<R, D>(labels_decoder: &mut R, bit_len: u64, deserializer: &D) -> io::Result<Vec<D::DeserType>>
where
    R: BitRead,
    D: BitDeserializer,
{
    let start = labels_decoder.bit_pos();
    let mut out = Vec::new();
    while labels_decoder.bit_pos() - start < bit_len {
        out.push(deserializer.deserialize(labels_decoder)?);
    }
    Ok(out)
}

/// Advances `r` by `n` bits without decoding them, for skipping past nodes
/// a sequential restart doesn't need to yield.
fn skip_bits(r: &mut impl BitRead, mut n: u64) -> io::Result<()> {
    while n > 0 {
        let take = n.min(56);
        r.read_bits(take as u32)?;
        n -= take;
    }
    Ok(())
}

/// Reads back the full monotone array of `num_nodes + 1` bit offsets from a
/// `.labeloffsets`-shaped γ-gap stream (same layout as the main `.offsets`
/// stream; see `load::decode_offsets_stream`, duplicated here because that
/// function is private to its module).
fn decode_label_offsets_stream(bytes: &[u8], num_nodes: usize) -> Result<Vec<u64>> {
    let mut r = MemBitReader::new(bytes);
    let sentinel = r.read_gamma()?;
    ensure!(sentinel == 0, "malformed labeloffsets stream: leading value is not 0");
    let mut offsets = Vec::with_capacity(num_nodes + 1);
    offsets.push(0u64);
    let mut acc = 0u64;
    for _ in 0..num_nodes {
        acc += r.read_gamma()?;
        offsets.push(acc);
    }
    Ok(offsets)
}

/// Loads the label offsets EF from the `.labelobl` cache next to `basename`
/// if present, falling back to rebuilding it from the `.labeloffsets`
/// γ-gap stream.
fn load_or_build_label_ef(basename: &Path, num_nodes: usize) -> Result<EF> {
    let cache_path = basename.with_extension(LABELOFFSETS_CACHE_EXTENSION);
    if cache_path.exists() {
        return read_ef_cache(&cache_path)
            .with_context(|| format!("could not read Elias-Fano cache {}", cache_path.display()));
    }
    log::warn!(
        "no {} cache found; rebuilding label offsets from the .{} stream",
        cache_path.display(),
        LABELOFFSETS_EXTENSION
    );
    let offsets_path = basename.with_extension(LABELOFFSETS_EXTENSION);
    let bytes =
        fs::read(&offsets_path).with_context(|| format!("could not read {}", offsets_path.display()))?;
    let offsets = decode_label_offsets_stream(&bytes, num_nodes)?;
    Ok(build_ef(&offsets))
}

const LABEL_REQUIRED_KEYS: &[&str] = &["graphclass", "nodes", "arcs", "underlyinggraph", "labelspec"];

struct LabelProperties {
    num_nodes: usize,
    num_arcs: u64,
    underlying_basename: PathBuf,
    labelspec: String,
}

/// Resolves the `underlyinggraph` property against the directory holding
/// the label's own `.properties` file, the way a relative basename in that
/// key is meant to be interpreted.
fn resolve_underlying(properties_path: &Path, raw: &str) -> PathBuf {
    let raw_path = Path::new(raw);
    if raw_path.is_absolute() {
        return raw_path.to_path_buf();
    }
    match properties_path.parent() {
        Some(dir) => dir.join(raw_path),
        None => raw_path.to_path_buf(),
    }
}

fn parse_label_properties(basename: &Path) -> Result<LabelProperties> {
    let props_path = basename.with_extension(PROPERTIES_EXTENSION);
    let f = File::open(&props_path).with_context(|| format!("could not open {}", props_path.display()))?;
    let map = java_properties::read(std::io::BufReader::new(f))
        .with_context(|| format!("could not parse {}", props_path.display()))?;
    for key in LABEL_REQUIRED_KEYS {
        ensure!(map.contains_key(*key), "missing required property {key}");
    }
    let num_nodes = map.get("nodes").unwrap().parse::<usize>().context("invalid 'nodes' property")?;
    let num_arcs = map.get("arcs").unwrap().parse::<u64>().context("invalid 'arcs' property")?;
    let underlying_basename = resolve_underlying(&props_path, map.get("underlyinggraph").unwrap());
    let labelspec = map.get("labelspec").unwrap().clone();
    Ok(LabelProperties {
        num_nodes,
        num_arcs,
        underlying_basename,
        labelspec,
    })
}

/// Statistics for a completed [`LabelCompConfig::comp_labels`] run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCompStats {
    pub num_nodes: usize,
    pub num_arcs: u64,
}

/// Mirrors `encoder::OffsetsWriter`, duplicated here (that one is private
/// to the main-graph encoder) for the `.labeloffsets` stream.
struct LabelOffsetsWriter<W: Write> {
    writer: BitWriter<W>,
}

impl<W: Write> LabelOffsetsWriter<W> {
    fn new(inner: W) -> io::Result<Self> {
        let mut writer = BitWriter::new(inner);
        writer.write_gamma(0)?;
        Ok(Self { writer })
    }

    fn push(&mut self, bit_len: u64) -> io::Result<usize> {
        self.writer.write_gamma(bit_len)
    }

    fn finish(self) -> io::Result<W> {
        self.writer.finish()
    }
}

/// Builder for compressing a bare label sequence to a basename, with atomic
/// temp-then-rename writes for `.labels`, `.labeloffsets` and `.properties`
/// (same pattern as [`BvCompConfig`](crate::graphs::bvgraph::BvCompConfig)).
pub struct LabelCompConfig {
    basename: PathBuf,
}

impl LabelCompConfig {
    pub fn with_basename(basename: impl AsRef<Path>) -> Self {
        Self {
            basename: basename.as_ref().to_path_buf(),
        }
    }

    /// `graph` supplies, for every node, the `(successor, label)` pairs to
    /// serialize; only the label half is written. `labelspec` is recorded
    /// verbatim in `.properties` and `underlying_basename` names the main
    /// graph this overlay is meant to be zipped with.
    pub fn comp_labels<S, G>(
        self,
        serializer: &S,
        labelspec: &str,
        underlying_basename: impl AsRef<Path>,
        graph: &G,
    ) -> Result<LabelCompStats>
    where
        S: BitSerializer,
        G: LabeledSequentialGraph<S::SerType>,
    {
        let labels_path = self.basename.with_extension(LABELS_EXTENSION);
        let offsets_path = self.basename.with_extension(LABELOFFSETS_EXTENSION);
        let properties_path = self.basename.with_extension(PROPERTIES_EXTENSION);
        let labels_tmp = self.basename.with_extension(format!("{LABELS_EXTENSION}.tmp"));
        let offsets_tmp = self.basename.with_extension(format!("{LABELOFFSETS_EXTENSION}.tmp"));

        let labels_file =
            File::create(&labels_tmp).with_context(|| format!("could not create {}", labels_tmp.display()))?;
        let offsets_file =
            File::create(&offsets_tmp).with_context(|| format!("could not create {}", offsets_tmp.display()))?;

        let mut labels_writer = BitWriter::new(labels_file);
        let mut offsets_writer = LabelOffsetsWriter::new(offsets_file)?;

        let mut num_arcs = 0u64;
        for_!( (_node, labels) in graph.iter() {
            let start = labels_writer.bit_pos();
            for (_succ, label) in labels {
                serializer.serialize(&label, &mut labels_writer)?;
                num_arcs += 1;
            }
            let bit_len = labels_writer.bit_pos() - start;
            offsets_writer.push(bit_len)?;
        });

        let labels_out = labels_writer.finish()?;
        let offsets_out = offsets_writer.finish()?;
        labels_out.sync_all()?;
        offsets_out.sync_all()?;
        drop(labels_out);
        drop(offsets_out);

        fs::rename(&labels_tmp, &labels_path)
            .with_context(|| format!("could not rename {} to {}", labels_tmp.display(), labels_path.display()))?;
        fs::rename(&offsets_tmp, &offsets_path)
            .with_context(|| format!("could not rename {} to {}", offsets_tmp.display(), offsets_path.display()))?;

        let num_nodes = graph.num_nodes();
        let underlying_basename = underlying_basename.as_ref();
        let mut props = String::new();
        props.push_str("#bvgraph-core label properties\n");
        props.push_str("graphclass=ArcLabelledImmutableGraph\n");
        props.push_str(&format!("nodes={num_nodes}\n"));
        props.push_str(&format!("arcs={num_arcs}\n"));
        props.push_str(&format!("underlyinggraph={}\n", underlying_basename.display()));
        props.push_str(&format!("labelspec={labelspec}\n"));
        write_properties(&properties_path, &props)?;

        Ok(LabelCompStats { num_nodes, num_arcs })
    }
}

/// A bare label sequence over `OFFLINE`/`ONCE`-mode bit streams: a forward-only
/// lender, restarted by reopening (`OFFLINE`) or consumed exactly once
/// (`ONCE`).
pub struct BitStreamLabels<FL: SequentialDecoderFactory, FO: SequentialDecoderFactory, D: BitDeserializer + Clone> {
    labels_factory: FL,
    offsets_factory: FO,
    deserializer: D,
    num_nodes: usize,
    num_arcs: Option<u64>,
    underlying_basename: Option<PathBuf>,
}

impl<FL: SequentialDecoderFactory, FO: SequentialDecoderFactory, D: BitDeserializer + Clone>
    BitStreamLabels<FL, FO, D>
{
    pub fn new(
        labels_factory: FL,
        offsets_factory: FO,
        deserializer: D,
        num_nodes: usize,
        num_arcs: Option<u64>,
    ) -> Self {
        Self {
            labels_factory,
            offsets_factory,
            deserializer,
            num_nodes,
            num_arcs,
            underlying_basename: None,
        }
    }

    pub fn underlying_basename(&self) -> Option<&Path> {
        self.underlying_basename.as_deref()
    }

    /// Fallible counterpart to [`SequentialLabeling::iter_from`]; the one
    /// case that matters in practice is a second restart of a `ONCE`-mode
    /// label stream.
    pub fn try_iter_from(&self, from: usize) -> io::Result<SeqLabelIter<FL::Decoder<'_>, FO::Decoder<'_>, D>> {
        let mut labels_decoder = self.labels_factory.new_decoder()?;
        let mut offsets_decoder = self.offsets_factory.new_decoder()?;
        let sentinel = offsets_decoder.read_gamma()?;
        debug_assert_eq!(sentinel, 0);
        let mut current_node = 0;
        while current_node < from && current_node < self.num_nodes {
            let bit_len = offsets_decoder.read_gamma()?;
            skip_bits(&mut labels_decoder, bit_len)?;
            current_node += 1;
        }
        Ok(SeqLabelIter {
            labels_decoder,
            offsets_decoder,
            deserializer: self.deserializer.clone(),
            current_node,
            num_nodes: self.num_nodes,
            error: None,
        })
    }
}

impl<FL: SequentialDecoderFactory, FO: SequentialDecoderFactory, D: BitDeserializer + Clone> SequentialLabeling
    for BitStreamLabels<FL, FO, D>
{
    type Label = D::DeserType;
    type Lender<'a>
        = SeqLabelIter<FL::Decoder<'a>, FO::Decoder<'a>, D>
    where
        Self: 'a;

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_arcs_hint(&self) -> Option<u64> {
        self.num_arcs
    }

    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        self.try_iter_from(from)
            .expect("label decoder could not be (re)started; see BitStreamLabels::try_iter_from")
    }
}

impl<D: BitDeserializer + Clone> BitStreamLabels<FileFactory, FileFactory, D> {
    /// `OFFLINE` mode: reopens `.labels`/`.labeloffsets` from disk on every
    /// restart.
    pub fn with_basename(basename: impl AsRef<Path>, deserializer: D) -> Result<Self> {
        let basename = basename.as_ref();
        let props = parse_label_properties(basename)?;
        let labels_path = basename.with_extension(LABELS_EXTENSION);
        let offsets_path = basename.with_extension(LABELOFFSETS_EXTENSION);
        Ok(Self {
            labels_factory: FileFactory::new(&labels_path),
            offsets_factory: FileFactory::new(&offsets_path),
            deserializer,
            num_nodes: props.num_nodes,
            num_arcs: Some(props.num_arcs),
            underlying_basename: Some(props.underlying_basename),
        })
    }
}

impl<R1: Read, R2: Read, D: BitDeserializer + Clone> BitStreamLabels<OnceFactory<R1>, OnceFactory<R2>, D> {
    /// `ONCE` mode: wraps a pair of already-open streams; not restartable.
    pub fn from_streams(
        labels: R1,
        offsets: R2,
        deserializer: D,
        num_nodes: usize,
        num_arcs: Option<u64>,
    ) -> Self {
        Self::new(OnceFactory::new(labels), OnceFactory::new(offsets), deserializer, num_nodes, num_arcs)
    }
}

/// Lender over the node/labels pairs of a [`BitStreamLabels`].
pub struct SeqLabelIter<Dl, Do, D: BitDeserializer> {
    labels_decoder: Dl,
    offsets_decoder: Do,
    deserializer: D,
    current_node: usize,
    num_nodes: usize,
    error: Option<io::Error>,
}

impl<Dl, Do, D: BitDeserializer> SeqLabelIter<Dl, Do, D> {
    /// The format error (if any) that stopped iteration early.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }
}

impl<'lend, Dl: BitRead, Do: BitRead, D: BitDeserializer> Lending<'lend> for SeqLabelIter<Dl, Do, D> {
    type Lend = (usize, std::vec::IntoIter<D::DeserType>);
}

impl<Dl: BitRead, Do: BitRead, D: BitDeserializer> Lender for SeqLabelIter<Dl, Do, D> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.error.is_some() || self.current_node >= self.num_nodes {
            return None;
        }
        let node = self.current_node;
        self.current_node += 1;
        let bit_len = match self.offsets_decoder.read_gamma() {
            Ok(v) => v,
            Err(e) => {
                self.error = Some(e);
                return None;
            }
        };
        match decode_node_labels(&mut self.labels_decoder, bit_len, &self.deserializer) {
            Ok(values) => Some((node, values.into_iter())),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

impl<'lend, Dl: BitRead, Do: BitRead, D: BitDeserializer> NodeLabelsLender<'lend> for SeqLabelIter<Dl, Do, D> {
    type Label = D::DeserType;
    type IntoIterator = std::vec::IntoIter<D::DeserType>;
}

/// A bare label sequence over `STANDARD`/`MAPPED`-mode bit streams, with
/// random access bounded by a succinct offsets structure
/// `.labelobl` cache; see [`load_or_build_label_ef`]).
pub struct BitStreamRandomLabels<F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> {
    factory: F,
    offsets: Arc<O>,
    deserializer: D,
    num_nodes: usize,
    num_arcs: u64,
    underlying_basename: Option<PathBuf>,
}

impl<F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> BitStreamRandomLabels<F, D, O> {
    pub fn new(factory: F, offsets: Arc<O>, deserializer: D, num_nodes: usize, num_arcs: u64) -> Self {
        Self {
            factory,
            offsets,
            deserializer,
            num_nodes,
            num_arcs,
            underlying_basename: None,
        }
    }

    pub fn underlying_basename(&self) -> Option<&Path> {
        self.underlying_basename.as_deref()
    }

    /// A flyweight clone: backing bytes and offsets are shared, not copied
    /// .
    pub fn copy(&self) -> Self
    where
        F: Clone,
    {
        Self {
            factory: self.factory.clone(),
            offsets: Arc::clone(&self.offsets),
            deserializer: self.deserializer.clone(),
            num_nodes: self.num_nodes,
            num_arcs: self.num_arcs,
            underlying_basename: self.underlying_basename.clone(),
        }
    }
}

impl<F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> SequentialLabeling
    for BitStreamRandomLabels<F, D, O>
{
    type Label = D::DeserType;
    type Lender<'a>
        = RanLabelIter<'a, F, D, O>
    where
        Self: 'a;

    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    fn num_arcs_hint(&self) -> Option<u64> {
        Some(self.num_arcs)
    }

    fn iter_from(&self, from: usize) -> Self::Lender<'_> {
        RanLabelIter { labels: self, node: from }
    }
}

impl<F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> RandomAccessLabeling
    for BitStreamRandomLabels<F, D, O>
{
    type Labels<'succ>
        = RanLabels<D::DeserType>
    where
        Self: 'succ;

    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    /// No stored per-node count; computed by decoding the node's whole
    /// label region and counting it.
    fn outdegree(&self, node_id: usize) -> usize {
        self.labels(node_id).count()
    }

    fn labels(&self, node_id: usize) -> Self::Labels<'_> {
        let mut decoder = self
            .factory
            .new_decoder()
            .expect("could not open a fresh decoder for random access");
        let start = self.offsets.get(node_id);
        let bit_len = self.offsets.get(node_id + 1) - start;
        decoder.set_bit_pos(start).expect("offset out of range");
        let values = decode_node_labels(&mut decoder, bit_len, &self.deserializer).expect("truncated label region");
        RanLabels(values.into_iter())
    }
}

/// Owned per-node label iterator returned by [`BitStreamRandomLabels::labels`].
pub struct RanLabels<T>(std::vec::IntoIter<T>);

impl<T> Iterator for RanLabels<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.next()
    }
}

/// Lender over the node/labels pairs of a [`BitStreamRandomLabels`], built
/// directly on top of [`RandomAccessLabeling::labels`] (one fresh decode
/// per node).
pub struct RanLabelIter<'a, F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> {
    labels: &'a BitStreamRandomLabels<F, D, O>,
    node: usize,
}

impl<'lend, F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> Lending<'lend>
    for RanLabelIter<'_, F, D, O>
{
    type Lend = (usize, RanLabels<D::DeserType>);
}

impl<F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> Lender for RanLabelIter<'_, F, D, O> {
    fn next(&mut self) -> Option<Lend<'_, Self>> {
        if self.node >= self.labels.num_nodes {
            return None;
        }
        let node = self.node;
        self.node += 1;
        Some((node, self.labels.labels(node)))
    }
}

impl<'lend, F: RandomAccessDecoderFactory, D: BitDeserializer + Clone, O: Offsets> NodeLabelsLender<'lend>
    for RanLabelIter<'_, F, D, O>
{
    type Label = D::DeserType;
    type IntoIterator = RanLabels<D::DeserType>;
}

/// Builder mirroring [`LoadConfig`](crate::graphs::bvgraph::LoadConfig):
/// parses `.properties`, loads `.labels` per [`mode`](Self::mode), and
/// loads or rebuilds the `.labelobl` offsets.
pub struct LabelLoadConfig {
    basename: PathBuf,
    mode: GraphLoadMode,
}

impl LabelLoadConfig {
    pub fn with_basename(basename: impl AsRef<Path>) -> Self {
        Self {
            basename: basename.as_ref().to_path_buf(),
            mode: GraphLoadMode::Standard,
        }
    }

    /// Selects `STANDARD` or `MAPPED`; `STANDARD` unless called.
    pub fn mode(mut self, mode: GraphLoadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn load<D: BitDeserializer + Clone>(
        self,
        deserializer: D,
    ) -> Result<BitStreamRandomLabels<StandardOrMapped, D, EF>> {
        let props = parse_label_properties(&self.basename)?;
        let labels_path = self.basename.with_extension(LABELS_EXTENSION);
        let factory = match self.mode {
            GraphLoadMode::Standard => {
                let bytes = fs::read(&labels_path)
                    .with_context(|| format!("could not read {}", labels_path.display()))?;
                StandardOrMapped::Standard(RanMemoryFactory::new(Arc::from(bytes.into_boxed_slice())))
            }
            GraphLoadMode::Mapped => {
                let mmap = MmapHelper::<u8>::mmap(&labels_path, MmapFlags::empty())
                    .with_context(|| format!("could not mmap {}", labels_path.display()))?;
                StandardOrMapped::Mapped(MmapFactory::new(Arc::new(mmap)))
            }
        };
        let offsets = load_or_build_label_ef(&self.basename, props.num_nodes)?;
        let mut labels = BitStreamRandomLabels::new(factory, Arc::new(offsets), deserializer, props.num_nodes, props.num_arcs);
        labels.underlying_basename = Some(props.underlying_basename);
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::bvgraph::encoder::BvCompConfig;
    use crate::graphs::vec_graph::{LabeledVecGraph, VecGraph};
    use lender::for_;

    #[test]
    fn label_codec_roundtrip_gamma() {
        let codec = LabelCodec::Gamma;
        let mut w = BitWriter::new(Vec::new());
        for v in [0u64, 1, 2, 100, 1000] {
            codec.serialize(&v, &mut w).unwrap();
        }
        let bytes = w.finish().unwrap();
        let mut r = MemBitReader::new(bytes);
        for v in [0u64, 1, 2, 100, 1000] {
            assert_eq!(codec.deserialize(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn labelspec_roundtrip() {
        assert_eq!(LabelCodec::from_labelspec("GAMMA"), Some(LabelCodec::Gamma));
        assert_eq!(LabelCodec::from_labelspec("gamma"), Some(LabelCodec::Gamma));
        assert_eq!(LabelCodec::from_labelspec(&LabelCodec::FixedWidth(12).to_labelspec()), Some(LabelCodec::FixedWidth(12)));
        assert_eq!(LabelCodec::from_labelspec("bogus"), None);
    }

    fn build_labeled(arcs: &[((usize, usize), u64)]) -> LabeledVecGraph<u64> {
        LabeledVecGraph::from_arcs(arcs.iter().copied())
    }

    #[test]
    fn comp_and_load_standard_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let graph_basename = dir.path().join("g");
        let labels_basename = dir.path().join("g-labels");

        let n = 5;
        let mut g = VecGraph::empty(n);
        g.add_arcs((0..n).map(|i| (i, (i + 1) % n)));
        BvCompConfig::with_basename(&graph_basename).comp_graph(&g).unwrap();

        let arcs: Vec<((usize, usize), u64)> =
            (0..n).map(|i| ((i, (i + 1) % n), (10 * i) as u64)).collect();
        let labeled = build_labeled(&arcs);

        let stats = LabelCompConfig::with_basename(&labels_basename)
            .comp_labels(&LabelCodec::Gamma, &LabelCodec::Gamma.to_labelspec(), &graph_basename, &labeled)
            .unwrap();
        assert_eq!(stats.num_nodes, n);
        assert_eq!(stats.num_arcs, n as u64);

        let loaded = LabelLoadConfig::with_basename(&labels_basename).load(LabelCodec::Gamma).unwrap();
        assert_eq!(loaded.num_nodes(), n);
        assert_eq!(loaded.underlying_basename(), Some(graph_basename.as_path()));
        for node in 0..n {
            let got: Vec<u64> = loaded.labels(node).collect();
            assert_eq!(got, vec![(10 * node) as u64]);
        }

        let mut from_lender = Vec::new();
        for_!( (node, labels) in loaded.iter() {
            from_lender.push((node, labels.collect::<Vec<_>>()));
        });
        assert_eq!(from_lender, (0..n).map(|i| (i, vec![(10 * i) as u64])).collect::<Vec<_>>());
    }

    #[test]
    fn offline_mode_matches_standard() {
        let dir = tempfile::tempdir().unwrap();
        let graph_basename = dir.path().join("g");
        let labels_basename = dir.path().join("g-labels");

        let n = 6;
        let mut g = VecGraph::empty(n);
        g.add_arcs((0..n).map(|i| (i, (i + 2) % n)));
        BvCompConfig::with_basename(&graph_basename).comp_graph(&g).unwrap();

        let arcs: Vec<((usize, usize), u64)> =
            (0..n).map(|i| ((i, (i + 2) % n), i as u64)).collect();
        let labeled = build_labeled(&arcs);
        LabelCompConfig::with_basename(&labels_basename)
            .comp_labels(&LabelCodec::Gamma, "GAMMA", &graph_basename, &labeled)
            .unwrap();

        let seq = BitStreamLabels::<FileFactory, FileFactory, LabelCodec>::with_basename(&labels_basename, LabelCodec::Gamma).unwrap();
        let mut got = Vec::new();
        for_!( (node, labels) in seq.iter() {
            got.push((node, labels.collect::<Vec<_>>()));
        });
        assert_eq!(got, (0..n).map(|i| (i, vec![i as u64])).collect::<Vec<_>>());

        let mut from3 = Vec::new();
        for_!( (node, labels) in seq.iter_from(3) {
            from3.push((node, labels.collect::<Vec<_>>()));
        });
        assert_eq!(from3, got[3..]);
    }
}
