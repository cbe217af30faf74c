// Sieve: SDN traffic-engineering control plane for a k=4 fat-tree fabric
// Copyright (C) 2024 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! A switch-to-switch path and the k-shortest-paths search over [`FabricGraph`].
//!
//! petgraph has no k-shortest-paths routine built in, so this hand-rolls Yen's algorithm on top
//! of the graph's hop-count Dijkstra, the way `bgpsim`'s route computation layers its own
//! algorithms over petgraph's primitives rather than reaching for an external crate.

use std::collections::{BinaryHeap, HashSet};

use sieve_openflow::Dpid;

use crate::graph::FabricGraph;

/// Number of shortest paths cached per switch pair: `k²·3/4` for `k=4`.
pub const K_SHORTEST_PATHS: usize = 12;

/// A simple (no repeated DPID) path between two switches, inclusive of both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<Dpid>);

/// An empty hop sequence was supplied to [`Path::new`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("a path must contain at least one switch")]
pub struct EmptyPath;

impl Path {
    pub fn new(hops: Vec<Dpid>) -> Result<Self, EmptyPath> {
        if hops.is_empty() {
            return Err(EmptyPath);
        }
        Ok(Path(hops))
    }

    pub fn hops(&self) -> &[Dpid] {
        &self.0
    }

    pub fn src(&self) -> Dpid {
        self.0[0]
    }

    pub fn dst(&self) -> Dpid {
        *self.0.last().expect("path is never empty")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The directed edges this path walks, in order.
    pub fn edges(&self) -> impl Iterator<Item = (Dpid, Dpid)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// `true` if every hop is distinct (§3 path invariant).
    pub fn has_no_repeated_hop(&self) -> bool {
        let set: HashSet<_> = self.0.iter().collect();
        set.len() == self.0.len()
    }

    /// The bottleneck bandwidth along this path in the given graph: the minimum edge weight,
    /// or `0.0` if any edge is missing (§4.2.5).
    pub fn bottleneck_bandwidth(&self, graph: &FabricGraph) -> f64 {
        self.edges()
            .map(|(a, b)| graph.bandwidth(a, b).unwrap_or(0.0))
            .fold(f64::INFINITY, f64::min)
            .max(0.0)
    }
}

fn reconstruct(dist: &std::collections::HashMap<Dpid, (usize, Option<Dpid>)>, dst: Dpid) -> Option<Vec<Dpid>> {
    let mut hops = vec![dst];
    let mut cur = dst;
    loop {
        let (_, pred) = dist.get(&cur)?;
        match pred {
            Some(p) => {
                hops.push(*p);
                cur = *p;
            }
            None => break,
        }
    }
    hops.reverse();
    Some(hops)
}

fn path_total_hops(graph: &FabricGraph, hops: &[Dpid]) -> Option<usize> {
    for w in hops.windows(2) {
        if !graph.is_linked(w[0], w[1]) {
            return None;
        }
    }
    Some(hops.len().saturating_sub(1))
}

/// Computes up to [`K_SHORTEST_PATHS`] loopless paths from `src` to `dst`, ranked by hop count
/// and, for ties, by lexicographic order of the DPID sequence (§4.1 "Algorithm").
///
/// `src == dst` returns the single-node sentinel path per the documented edge case; callers
/// treat its bandwidth as infinite.
pub fn k_shortest_paths(graph: &FabricGraph, src: Dpid, dst: Dpid) -> Vec<Path> {
    if src == dst {
        return vec![Path(vec![src])];
    }

    let empty_nodes = HashSet::new();
    let empty_edges = HashSet::new();
    let dist = graph.dijkstra_hops(src, &empty_nodes, &empty_edges);
    let Some(first_hops) = reconstruct(&dist, dst) else {
        return Vec::new();
    };

    let mut found: Vec<Vec<Dpid>> = vec![first_hops];
    // Yen's algorithm: candidate heap ordered by (hop_count, lexicographic dpid sequence) for
    // deterministic tie-breaking.
    let mut candidates: BinaryHeap<std::cmp::Reverse<(usize, Vec<u64>, Vec<Dpid>)>> = BinaryHeap::new();

    while found.len() < K_SHORTEST_PATHS {
        let prev = found.last().expect("found is never empty here").clone();

        for i in 0..prev.len().saturating_sub(1) {
            let spur_node = prev[i];
            let root_path = &prev[..=i];

            let mut avoid_edges = HashSet::new();
            for p in &found {
                if p.len() > i && p[..=i] == *root_path {
                    avoid_edges.insert((p[i], p[i + 1]));
                }
            }
            let avoid_nodes: HashSet<Dpid> = root_path[..i].iter().copied().collect();

            let spur_dist = graph.dijkstra_hops(spur_node, &avoid_nodes, &avoid_edges);
            if let Some(spur_hops) = reconstruct(&spur_dist, dst) {
                let mut total = root_path[..i].to_vec();
                total.extend(spur_hops);
                if total.iter().collect::<HashSet<_>>().len() != total.len() {
                    continue;
                }
                if found.contains(&total) {
                    continue;
                }
                if let Some(hop_count) = path_total_hops(graph, &total) {
                    let key = total.iter().map(|d| d.0).collect::<Vec<_>>();
                    candidates.push(std::cmp::Reverse((hop_count, key, total)));
                }
            }
        }

        let Some(std::cmp::Reverse((_, _, next))) = candidates.pop() else {
            break;
        };
        if !found.contains(&next) {
            found.push(next);
        }
    }

    found.into_iter().map(Path).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use sieve_openflow::PortNo;

    fn dpid(n: u64) -> Dpid {
        Dpid(n)
    }

    fn fat_tree_k4() -> FabricGraph {
        let mut g = FabricGraph::new();
        // 4 core, 8 aggregate, 8 edge per spec §6 DPID ranges, wired as a k=4 fat-tree.
        let core: Vec<Dpid> = (1001..=1004).map(dpid).collect();
        let agg: Vec<Dpid> = (2001..=2008).map(dpid).collect();
        let edge: Vec<Dpid> = (3001..=3008).map(dpid).collect();

        // Each pod has 2 aggregate + 2 edge switches; 4 pods total.
        for pod in 0..4usize {
            let agg_pair = [agg[pod * 2], agg[pod * 2 + 1]];
            let edge_pair = [edge[pod * 2], edge[pod * 2 + 1]];
            for &a in &agg_pair {
                for &e in &edge_pair {
                    g.add_link(a, e, (PortNo(1), PortNo(1)));
                }
            }
        }
        // Each aggregate switch connects to all 4 core switches.
        for (i, &a) in agg.iter().enumerate() {
            let core_offset = i % 2;
            for (j, &c) in core.iter().enumerate() {
                if j % 2 == core_offset {
                    g.add_link(a, c, (PortNo(2), PortNo(1)));
                }
            }
        }
        g
    }

    #[test]
    fn src_equals_dst_is_sentinel_singleton() {
        let g = fat_tree_k4();
        let paths = k_shortest_paths(&g, dpid(3001), dpid(3001));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].hops(), &[dpid(3001)]);
    }

    #[test]
    fn never_exceeds_k_and_never_repeats_a_hop() {
        let g = fat_tree_k4();
        let paths = k_shortest_paths(&g, dpid(3001), dpid(3007));
        assert!(paths.len() <= K_SHORTEST_PATHS);
        for p in &paths {
            assert!(p.has_no_repeated_hop());
        }
    }

    #[test]
    fn cross_pod_path_has_five_hops() {
        let g = fat_tree_k4();
        let paths = k_shortest_paths(&g, dpid(3001), dpid(3007));
        assert!(!paths.is_empty());
        assert_eq!(paths[0].len(), 5);
    }

    #[test]
    fn no_path_between_disconnected_switches_is_empty() {
        let mut g = fat_tree_k4();
        g.add_switch(dpid(9999));
        let paths = k_shortest_paths(&g, dpid(3001), dpid(9999));
        assert!(paths.is_empty());
    }
}
