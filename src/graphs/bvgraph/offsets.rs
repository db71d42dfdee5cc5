/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The succinct offset table: an O(1)-random-access mapping from
//! node id to the absolute bit offset of its successor list in the graph
//! file.
//!
//! Two backings implement [`Offsets`]: a plain `Vec<u64>` (exact, one word
//! per node — built in a single pass over the graph and kept if no `.ef`
//! cache is requested) and an Elias-Fano monotone sequence (about
//! 2 + ⌈log₂(U/n)⌉ bits per node), loaded from or built into a `.ef` cache
//! file next to the graph.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use sux::bits::{BitFieldVec, BitVec};
use sux::dict::{EliasFano, EliasFanoBuilder};
use sux::rank_sel::SelectAdaptConst;
use sux::traits::IndexedSeq;

/// An indexed sequence of `num_nodes() + 1` monotonically non-decreasing bit
/// offsets: `get(i)` is the bit at which node `i`'s successor list starts,
/// and `get(num_nodes())` is the graph file's total bit length.
pub trait Offsets {
    fn num_nodes(&self) -> usize;
    fn get(&self, node: usize) -> u64;
}

impl Offsets for Vec<u64> {
    fn num_nodes(&self) -> usize {
        self.len().saturating_sub(1)
    }

    fn get(&self, node: usize) -> u64 {
        self[node]
    }
}

/// Layout of the Elias-Fano structure used for offsets and, with a
/// predecessor-capable variant, for the cumulative outdegree list
/// (see [`super::deg_cumul`]).
pub type EF = EliasFano<
    SelectAdaptConst<BitVec<Box<[usize]>>, Box<[usize]>, 12, 4>,
    BitFieldVec<usize, Box<[usize]>>,
>;

impl Offsets for EF {
    fn num_nodes(&self) -> usize {
        IndexedSeq::len(self).saturating_sub(1)
    }

    fn get(&self, node: usize) -> u64 {
        IndexedSeq::get(self, node) as u64
    }
}

/// Builds the Elias-Fano offsets structure from a complete, monotone list of
/// `num_nodes + 1` absolute bit offsets (the last entry being the graph
/// file's total bit length, the universe of the sequence).
pub fn build_ef(offsets: &[u64]) -> EF {
    let n = offsets.len();
    let universe = *offsets.last().unwrap_or(&0) as usize;
    let mut efb = EliasFanoBuilder::new(n, universe);
    for &o in offsets {
        efb.push(o as usize);
    }
    let ef = efb.build();
    unsafe { ef.map_high_bits(SelectAdaptConst::<_, _, 12, 4>::new) }
}

/// Tag distinguishing our `.ef`/`.dcf` cache files from unrelated data; not
/// an attempt at any cross-version binary format.
const CACHE_MAGIC: u64 = 0x4246_4745_4f46_4653;

/// Writes the raw offsets backing a `.ef` (or `.dcf`) cache: just the
/// monotone integer sequence, rebuilt into an [`EF`] on load with
/// [`build_ef`]. We do not serialize the Elias-Fano structure itself, so
/// there is no concern about its internal bit layout changing between runs.
pub fn write_cache(path: impl AsRef<Path>, values: &[u64]) -> io::Result<()> {
    let tmp_path = path.as_ref().with_extension("tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp_path)?);
        w.write_all(&CACHE_MAGIC.to_le_bytes())?;
        w.write_all(&(values.len() as u64).to_le_bytes())?;
        for &v in values {
            w.write_all(&v.to_le_bytes())?;
        }
        w.flush()?;
    }
    std::fs::rename(&tmp_path, path)
}

/// Reads back a cache written by [`write_cache`].
pub fn read_cache_values(path: impl AsRef<Path>) -> io::Result<Vec<u64>> {
    let mut r = BufReader::new(File::open(path)?);
    let mut buf8 = [0u8; 8];
    r.read_exact(&mut buf8)?;
    if u64::from_le_bytes(buf8) != CACHE_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a recognized offsets/degree cache file",
        ));
    }
    r.read_exact(&mut buf8)?;
    let n = u64::from_le_bytes(buf8) as usize;
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        r.read_exact(&mut buf8)?;
        values.push(u64::from_le_bytes(buf8));
    }
    Ok(values)
}

/// Reads a `.ef`-style cache directly into an [`EF`].
pub fn read_ef_cache(path: impl AsRef<Path>) -> io::Result<EF> {
    read_cache_values(path).map(|values| build_ef(&values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ef_matches_vec_offsets() {
        let offsets: Vec<u64> = vec![0, 3, 3, 10, 12, 40];
        let ef = build_ef(&offsets);
        assert_eq!(Offsets::num_nodes(&ef), offsets.len() - 1);
        for (i, &o) in offsets.iter().enumerate() {
            assert_eq!(Offsets::get(&ef, i), o);
        }
    }

    #[test]
    fn cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.ef");
        let offsets: Vec<u64> = vec![0, 5, 5, 5, 21, 1000];
        write_cache(&path, &offsets).unwrap();
        let ef = read_ef_cache(&path).unwrap();
        for (i, &o) in offsets.iter().enumerate() {
            assert_eq!(Offsets::get(&ef, i), o);
        }
    }
}
