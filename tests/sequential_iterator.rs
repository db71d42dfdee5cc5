/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Sequential-decoder properties: restarting `iter_from` at any node
//! matches random access, `OFFLINE` mode (no offsets table) agrees with
//! `STANDARD`, and `split_iter`'s chunks concatenate back to a full scan.

use bvgraph_core::prelude::*;
use lender::{for_, Lender};

fn build_referential_graph(n: usize) -> VecGraph {
    let mut g = VecGraph::empty(n);
    for i in 0..n {
        for j in 0..n {
            if j != i && (i + j) % 3 != 0 {
                g.add_arc(i, j);
            }
        }
    }
    g
}

#[test]
fn iter_from_matches_random_access() {
    let dir = tempfile::tempdir().unwrap();
    let n = 30;
    let g = build_referential_graph(n);
    let flags = CompFlags {
        compression_window: 7,
        max_ref_count: 3,
        min_interval_length: 4,
        ..CompFlags::default()
    };
    let basename = dir.path().join("g");
    BvCompConfig::with_basename(&basename).with_comp_flags(flags).comp_graph(&g).unwrap();
    let random = BvGraph::with_basename(&basename).load().unwrap();
    let sequential = BvGraphSeq::with_basename(&basename).unwrap();

    for from in 0..n {
        let mut lender = sequential.iter_from(from);
        for node in from..n {
            let (x, succ) = lender.next().expect("sequential iterator ended early");
            assert_eq!(x, node);
            assert_eq!(succ.collect::<Vec<_>>(), random.successors(node).into_iter().collect::<Vec<_>>());
        }
        assert!(lender.next().is_none());
    }
}

#[test]
fn offline_mode_matches_standard() {
    let dir = tempfile::tempdir().unwrap();
    let n = 25;
    let g = build_referential_graph(n);
    let basename = dir.path().join("g");
    BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();
    let offline = BvGraphSeq::with_basename(&basename).unwrap();
    assert!(bvgraph_core::traits::eq(&g, &offline));
}

#[test]
fn split_iter_covers_every_node_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let n = 37;
    let g = build_referential_graph(n);
    let basename = dir.path().join("g");
    BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();
    let loaded = BvGraph::with_basename(&basename).load().unwrap();

    for how_many in [1usize, 4, 10, 100] {
        let mut seen = Vec::with_capacity(n);
        for chunk in loaded.split_iter(how_many) {
            for_!((node, succ) in chunk {
                seen.push((node, succ.into_iter().collect::<Vec<_>>()));
            });
        }
        assert_eq!(seen.len(), n, "how_many = {how_many}");
        for (node, succ) in seen {
            assert_eq!(succ, loaded.successors(node).into_iter().collect::<Vec<_>>());
        }
    }
}

#[test]
fn flyweight_copies_traverse_independently() {
    let dir = tempfile::tempdir().unwrap();
    let n = 20;
    let mut g = VecGraph::empty(n);
    for i in 0..n {
        g.add_arc(i, (i + 1) % n);
    }
    let basename = dir.path().join("g");
    BvCompConfig::with_basename(&basename).comp_graph(&g).unwrap();
    let loaded = BvGraph::with_basename(&basename).load().unwrap();

    let copies: Vec<_> = (0..4).map(|_| loaded.copy()).collect();
    let handles: Vec<_> = copies
        .into_iter()
        .map(|c| std::thread::spawn(move || (0..n).map(|node| c.successors(node).into_iter().collect::<Vec<_>>()).collect::<Vec<_>>()))
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
}
