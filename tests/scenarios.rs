/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! End-to-end compress-then-load round trips against a handful of named
//! graphs, covering the size extremes and the three successor-encoding
//! paths (plain, referential, interval) at once.

use bvgraph_core::prelude::*;
use lender::Lender;

fn compress_and_load(dir: &tempfile::TempDir, name: &str, g: &VecGraph, flags: CompFlags) -> BvGraph<StandardOrMapped, EF> {
    let basename = dir.path().join(name);
    BvCompConfig::with_basename(&basename).with_comp_flags(flags).comp_graph(g).unwrap();
    BvGraph::with_basename(&basename).load().unwrap()
}

#[test]
fn empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let g = VecGraph::empty(0);
    let loaded = compress_and_load(&dir, "empty", &g, CompFlags::default());
    assert_eq!(loaded.num_nodes(), 0);
    assert_eq!(loaded.num_arcs(), 0);
    let mut lender = loaded.iter();
    assert!(lender.next().is_none());
}

#[test]
fn single_node_no_arcs() {
    let dir = tempfile::tempdir().unwrap();
    let g = VecGraph::empty(1);
    let loaded = compress_and_load(&dir, "single", &g, CompFlags::default());
    assert_eq!(loaded.num_nodes(), 1);
    assert_eq!(loaded.outdegree(0), 0);
    assert!(loaded.successors(0).into_iter().next().is_none());
}

#[test]
fn bidirectional_cycle_of_40() {
    let dir = tempfile::tempdir().unwrap();
    let n = 40;
    let mut g = VecGraph::empty(n);
    for i in 0..n {
        g.add_arcs([(i, (i + n - 1) % n), (i, (i + 1) % n)]);
    }
    let loaded = compress_and_load(&dir, "cycle", &g, CompFlags::default());
    assert_eq!(loaded.num_arcs(), 80);
    for i in 0..n {
        let mut expected = vec![(i + n - 1) % n, (i + 1) % n];
        expected.sort_unstable();
        assert_eq!(loaded.outdegree(i), 2);
        assert_eq!(loaded.successors(i).into_iter().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn complete_binary_in_tree_symmetrised() {
    let dir = tempfile::tempdir().unwrap();
    // Depth-10 complete binary tree: 2^11 - 1 nodes, every non-root node i
    // has parent (i - 1) / 2. Symmetrising adds the reverse arc too.
    let n = (1usize << 11) - 1;
    let mut g = VecGraph::empty(n);
    let mut tree_edges = 0usize;
    for i in 1..n {
        let parent = (i - 1) / 2;
        g.add_arcs([(i, parent), (parent, i)]);
        tree_edges += 1;
    }
    let loaded = compress_and_load(&dir, "intree", &g, CompFlags::default());
    assert_eq!(loaded.num_arcs(), 2 * tree_edges as u64);
    assert!(bvgraph_core::traits::eq(&g, &loaded));
}

#[test]
fn erdos_renyi_1000_with_referential_params() {
    let dir = tempfile::tempdir().unwrap();
    let gen = ErdosRenyi::new(1000, 0.001, 1);
    let mut g = VecGraph::empty(1000);
    let mut lender = gen.iter();
    while let Some((node, succ)) = lender.next() {
        for s in succ {
            g.add_arc(node, s);
        }
    }
    let flags = CompFlags {
        min_interval_length: 4,
        compression_window: 7,
        max_ref_count: 3,
        residuals: Code::Zeta(3),
        ..CompFlags::default()
    };
    let loaded = compress_and_load(&dir, "er1000", &g, flags);
    assert_eq!(loaded.num_nodes(), 1000);
    assert!(bvgraph_core::traits::eq(&g, &loaded));
}
