/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The cumulative outdegree list: a monotone sequence
//! `C[0..=n]`, `C[i] = Σ_{j<i} outdegree(j)`, backed by the same
//! Elias-Fano structure as the offsets table, with a mask-aligned
//! `skip_to` used to cut a graph into roughly equal arc-count chunks for
//! parallel iteration.

use std::io;
use std::path::Path;

use super::offsets::{build_ef, read_cache_values, write_cache, Offsets, EF};

/// Succinct cumulative outdegree list with a forward-only cursor.
///
/// `current_index` starts at `-1`, matching an iterator that has not been
/// advanced yet; an empty graph (`num_nodes() == 0`) never advances past
/// that sentinel.
pub struct DegCumul {
    ef: EF,
    current_index: i64,
}

impl DegCumul {
    pub fn new(ef: EF) -> Self {
        Self {
            ef,
            current_index: -1,
        }
    }

    pub fn num_nodes(&self) -> usize {
        Offsets::num_nodes(&self.ef)
    }

    pub fn num_arcs(&self) -> u64 {
        Offsets::get(&self.ef, self.num_nodes())
    }

    /// `C[i]`.
    pub fn get(&self, i: usize) -> u64 {
        Offsets::get(&self.ef, i)
    }

    pub fn current_index(&self) -> i64 {
        self.current_index
    }

    /// Advances the cursor to the smallest `i >= current cursor position`
    /// such that `C[i] >= a` and `(i & mask) == 0`, returning `(i, C[i])`,
    /// or `None` if no such index exists before `num_nodes()`.
    ///
    /// `mask` must be `2^k - 1` for some `k >= 0`; `mask == 0` means every
    /// node is a valid boundary.
    pub fn skip_to(&mut self, a: u64, mask: usize) -> Option<(usize, u64)> {
        let n = self.num_nodes();
        let start = if self.current_index < 0 {
            0
        } else {
            self.current_index as usize
        };
        for i in start..=n {
            if i & mask == 0 {
                let v = self.get(i);
                if v >= a {
                    self.current_index = i as i64;
                    return Some((i, v));
                }
            }
        }
        None
    }

    /// Resets the cursor to its initial, unadvanced state.
    pub fn reset(&mut self) {
        self.current_index = -1;
    }

    /// Splits the arc range `[0, num_arcs())` into `how_many` chunks of
    /// roughly `num_arcs() / how_many` arcs each, boundaries aligned to
    /// `mask`, returning the `how_many + 1` node boundaries
    /// `[0 = n_0 <= n_1 <= ... <= n_{how_many} = num_nodes()]`.
    pub fn partition_by_arcs(&mut self, how_many: usize, mask: usize) -> Vec<usize> {
        self.reset();
        let n = self.num_nodes();
        let m = self.num_arcs();
        let how_many = how_many.max(1);
        let mut bounds = Vec::with_capacity(how_many + 1);
        bounds.push(0);
        for k in 1..how_many {
            let target = (m as u128 * k as u128 / how_many as u128) as u64;
            let idx = self.skip_to(target, mask).map(|(i, _)| i).unwrap_or(n);
            bounds.push(idx);
        }
        bounds.push(n);
        bounds
    }
}

/// Builds the cumulative list (length `outdegrees.len() + 1`, leading `0`)
/// from a node's worth of outdegrees in order.
pub fn cumulative_from_outdegrees(outdegrees: impl IntoIterator<Item = usize>) -> Vec<u64> {
    let mut cumul = Vec::new();
    let mut acc = 0u64;
    cumul.push(0);
    for d in outdegrees {
        acc += d as u64;
        cumul.push(acc);
    }
    cumul
}

pub fn build_deg_cumul(outdegrees: impl IntoIterator<Item = usize>) -> DegCumul {
    let values = cumulative_from_outdegrees(outdegrees);
    DegCumul::new(build_ef(&values))
}

pub fn write_dcf_cache(path: impl AsRef<Path>, cumulative: &[u64]) -> io::Result<()> {
    write_cache(path, cumulative)
}

pub fn read_dcf_cache(path: impl AsRef<Path>) -> io::Result<DegCumul> {
    let values = read_cache_values(path)?;
    Ok(DegCumul::new(build_ef(&values)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_outdegrees(n: usize, seed: u64) -> Vec<usize> {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random_range(0..5)).collect()
    }

    #[test]
    fn empty_graph_sentinel() {
        let dc = build_deg_cumul(Vec::<usize>::new());
        assert_eq!(dc.num_nodes(), 0);
        assert_eq!(dc.num_arcs(), 0);
        assert_eq!(dc.current_index(), -1);
    }

    #[test]
    fn skip_to_is_monotone_and_mask_aligned() {
        let outdegrees = dense_outdegrees(10_000, 1);
        for &mask in &[0usize, 1, 3] {
            let mut dc = build_deg_cumul(outdegrees.clone());
            let m = dc.num_arcs();
            let mut last = 0usize;
            for a in (1..=m).step_by((m as usize / 37).max(1)) {
                let (i, v) = dc.skip_to(a, mask).expect("must find a boundary at or before n");
                assert!(i & mask == 0);
                assert!(v >= a);
                assert!(i >= last);
                last = i;
            }
        }
    }

    #[test]
    fn partition_covers_full_range() {
        let outdegrees = dense_outdegrees(1000, 2);
        let mut dc = build_deg_cumul(outdegrees);
        let bounds = dc.partition_by_arcs(4, 0);
        assert_eq!(bounds.first(), Some(&0));
        assert_eq!(bounds.last(), Some(&dc.num_nodes()));
        assert!(bounds.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.dcf");
        let cumulative = cumulative_from_outdegrees([3, 0, 1, 4, 1, 5]);
        write_dcf_cache(&path, &cumulative).unwrap();
        let dc = read_dcf_cache(&path).unwrap();
        assert_eq!(dc.num_arcs(), *cumulative.last().unwrap());
        for (i, &c) in cumulative.iter().enumerate() {
            assert_eq!(dc.get(i), c);
        }
    }
}
