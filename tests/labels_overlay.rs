/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The arc-labelled overlay, compressed and reloaded as two separate
//! artifacts (a plain `BvGraph` and a bare `.labels`/`.labeloffsets` bit
//! stream) and recombined with [`Zip`], checked against the labelled graph
//! that produced both halves.

use bvgraph_core::prelude::*;

#[test]
fn zipped_overlay_recovers_every_label() {
    let dir = tempfile::tempdir().unwrap();
    let graph_basename = dir.path().join("graph");
    let labels_basename = dir.path().join("labels");

    let n = 50;
    let arcs: Vec<((usize, usize), u64)> = (0..n)
        .flat_map(|i| {
            [((i, (i + 1) % n), (i * 7 + 1) as u64), ((i, (i + 3) % n), (i * 13 + 2) as u64)]
        })
        .collect();
    let labeled = LabeledVecGraph::from_arcs(arcs.iter().copied());

    let underlying = Left(labeled.clone());
    BvCompConfig::with_basename(&graph_basename).comp_graph(&underlying).unwrap();

    let stats = LabelCompConfig::with_basename(&labels_basename)
        .comp_labels(&LabelCodec::Gamma, &LabelCodec::Gamma.to_labelspec(), &graph_basename, &labeled)
        .unwrap();
    assert_eq!(stats.num_arcs, arcs.len() as u64);

    let graph = BvGraph::with_basename(&graph_basename).load().unwrap();
    let labels = LabelLoadConfig::with_basename(&labels_basename).load(LabelCodec::Gamma).unwrap();

    let zipped = Zip(graph, labels);
    zipped.verify().unwrap();

    let mut expected: Vec<Vec<(usize, u64)>> = vec![Vec::new(); n];
    for &((u, v), l) in &arcs {
        expected[u].push((v, l));
    }
    for e in expected.iter_mut() {
        e.sort_unstable();
    }

    for node in 0..n {
        let mut got: Vec<(usize, u64)> = zipped.successors(node).into_iter().collect();
        got.sort_unstable();
        assert_eq!(got, expected[node], "node {node}");
    }
}
