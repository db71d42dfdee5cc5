/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Cumulative-outdegree `skip_to` over a larger Erdős–Rényi graph, checked
//! against a plain prefix-sum scan for every requested mask.

use bvgraph_core::prelude::*;
use lender::Lender;

#[cfg_attr(feature = "slow_tests", test)]
#[cfg_attr(not(feature = "slow_tests"), allow(dead_code))]
fn skip_to_matches_linear_scan_for_every_mask() {
    let gen = ErdosRenyi::new(10_000, 0.001, 1);
    let mut outdegrees = vec![0usize; 10_000];
    let mut lender = gen.iter();
    while let Some((node, succ)) = lender.next() {
        outdegrees[node] = succ.into_iter().count();
    }

    let cumulative = cumulative_from_outdegrees(outdegrees.iter().copied());
    let m = *cumulative.last().unwrap();
    assert!(m > 0, "expected a nonempty random graph at this density");

    let step = (m / 50).max(1);
    for &mask in &[0usize, 1, 3] {
        let mut dc = build_deg_cumul(outdegrees.iter().copied());
        let mut last = 0usize;
        let mut a = 1u64;
        while a <= m {
            let (i, v) = dc.skip_to(a, mask).expect("a boundary must exist at or before n");
            assert_eq!(i & mask, 0);
            assert!(v >= a);
            assert!(i >= last, "skip_to must be monotone non-decreasing");
            // Cross-check against the smallest index satisfying the same
            // predicate via a linear scan of the cumulative array.
            let expected = (0..cumulative.len())
                .find(|&j| j & mask == 0 && cumulative[j] >= a)
                .unwrap();
            assert_eq!(i, expected, "mask {mask}, target {a}");
            last = i;
            a += step;
        }
    }
}
