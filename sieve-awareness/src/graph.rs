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

//! The topological view of the fabric: switches as nodes, discovered links as edges.
//!
//! Residual bandwidth is symmetric for a link (the bottleneck is `min` of both port's free
//! bandwidth, §3 "Bandwidth view"), so — unlike `bgpsim`'s directed `IgpNetwork` — the fabric
//! graph here is undirected.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use sieve_openflow::{Dpid, PortNo};

/// `(src_port, dst_port)` for a directed traversal of a link; which endpoint is "src" depends on
/// which direction a path walks the edge, so both link tables store the forward and reverse
/// port pair.
pub type PortPair = (PortNo, PortNo);

/// The switch topology: nodes are datapaths, edges are discovered links carrying a bandwidth
/// weight (Kb/s). A weight of `f64::INFINITY` models the `src == dst` sentinel path (§4.1 edge
/// cases); ordinary links always carry a finite, non-negative weight.
#[derive(Debug, Clone, Default)]
pub struct FabricGraph {
    graph: StableUnGraph<Dpid, f64>,
    index_of: HashMap<Dpid, NodeIndex>,
    /// `(src_dpid, dst_dpid) -> (src_port, dst_port)`, keyed in both directions so a lookup never
    /// needs to know which endpoint was discovered first.
    link_to_port: HashMap<(Dpid, Dpid), PortPair>,
}

impl FabricGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_switch(&self, dpid: Dpid) -> bool {
        self.index_of.contains_key(&dpid)
    }

    pub fn switches(&self) -> impl Iterator<Item = Dpid> + '_ {
        self.index_of.keys().copied()
    }

    /// Adds `dpid` as a node if not already present. Idempotent.
    pub fn add_switch(&mut self, dpid: Dpid) {
        self.index_of
            .entry(dpid)
            .or_insert_with(|| self.graph.add_node(dpid));
    }

    /// Removes `dpid` and every link touching it. No-op if unknown.
    pub fn remove_switch(&mut self, dpid: Dpid) {
        if let Some(idx) = self.index_of.remove(&dpid) {
            self.graph.remove_node(idx);
            self.link_to_port
                .retain(|(a, b), _| *a != dpid && *b != dpid);
        }
    }

    /// Records a link `src -> dst` with the given port pair, adding both endpoints as switches
    /// if necessary. The initial edge weight is `0.0`; Monitor overwrites it on each bandwidth
    /// refresh (§4.2.2).
    pub fn add_link(&mut self, src: Dpid, dst: Dpid, ports: PortPair) {
        self.add_switch(src);
        self.add_switch(dst);
        let (src_idx, dst_idx) = (self.index_of[&src], self.index_of[&dst]);
        if self.graph.find_edge(src_idx, dst_idx).is_none() {
            self.graph.add_edge(src_idx, dst_idx, 0.0);
        }
        self.link_to_port.insert((src, dst), ports);
        self.link_to_port.insert((dst, src), (ports.1, ports.0));
    }

    /// Removes the link between `src` and `dst`, if any. Leaves both switches in the graph.
    pub fn remove_link(&mut self, src: Dpid, dst: Dpid) {
        if let (Some(&src_idx), Some(&dst_idx)) =
            (self.index_of.get(&src), self.index_of.get(&dst))
        {
            if let Some(edge) = self.graph.find_edge(src_idx, dst_idx) {
                self.graph.remove_edge(edge);
            }
        }
        self.link_to_port.remove(&(src, dst));
        self.link_to_port.remove(&(dst, src));
    }

    pub fn port_pair(&self, src: Dpid, dst: Dpid) -> Option<PortPair> {
        self.link_to_port.get(&(src, dst)).copied()
    }

    pub fn is_linked(&self, src: Dpid, dst: Dpid) -> bool {
        self.link_to_port.contains_key(&(src, dst))
    }

    /// Sets the bandwidth weight of the `src-dst` edge (§4.2.2 "rebuild the bandwidth-decorated
    /// graph"). No-op if the link is unknown.
    pub fn set_bandwidth(&mut self, src: Dpid, dst: Dpid, bandwidth_kbps: f64) {
        if let (Some(&src_idx), Some(&dst_idx)) =
            (self.index_of.get(&src), self.index_of.get(&dst))
        {
            if let Some(edge) = self.graph.find_edge(src_idx, dst_idx) {
                if let Some(w) = self.graph.edge_weight_mut(edge) {
                    *w = bandwidth_kbps;
                }
            }
        }
    }

    pub fn bandwidth(&self, src: Dpid, dst: Dpid) -> Option<f64> {
        let src_idx = *self.index_of.get(&src)?;
        let dst_idx = *self.index_of.get(&dst)?;
        let edge = self.graph.find_edge(src_idx, dst_idx)?;
        self.graph.edge_weight(edge).copied()
    }

    /// Every known link, one entry per undirected edge, with its `(src, dst)` port pair in the
    /// direction the pair happens to be stored. Used by the bandwidth-graph refresh (§4.2.2),
    /// which treats the graph as undirected and only cares about the two endpoints.
    pub fn links(&self) -> impl Iterator<Item = (Dpid, Dpid, PortPair)> + '_ {
        self.graph.edge_references().map(move |edge| {
            let src = *self
                .graph
                .node_weight(edge.source())
                .expect("edge source index is valid");
            let dst = *self
                .graph
                .node_weight(edge.target())
                .expect("edge target index is valid");
            let ports = self.link_to_port[&(src, dst)];
            (src, dst, ports)
        })
    }

    pub fn neighbors(&self, dpid: Dpid) -> impl Iterator<Item = Dpid> + '_ {
        let idx = self.index_of.get(&dpid).copied();
        idx.into_iter().flat_map(move |idx| {
            self.graph
                .neighbors(idx)
                .map(|n| *self.graph.node_weight(n).expect("neighbor index is valid"))
        })
    }

    /// Runs a weighted Dijkstra from `src`, returning `(dpid -> (distance, predecessor))`. Edge
    /// weight used is `1.0` for hop count (Yen's spur-path search ranks by hop count per §4.1),
    /// never the bandwidth attribute — bandwidth only enters at path-selection time (§4.2.5).
    pub(crate) fn dijkstra_hops(
        &self,
        src: Dpid,
        avoid_nodes: &std::collections::HashSet<Dpid>,
        avoid_edges: &std::collections::HashSet<(Dpid, Dpid)>,
    ) -> HashMap<Dpid, (usize, Option<Dpid>)> {
        use std::collections::BinaryHeap;

        let mut dist: HashMap<Dpid, (usize, Option<Dpid>)> = HashMap::new();
        let mut heap: BinaryHeap<std::cmp::Reverse<(usize, Dpid)>> = BinaryHeap::new();

        if avoid_nodes.contains(&src) || !self.contains_switch(src) {
            return dist;
        }
        dist.insert(src, (0, None));
        heap.push(std::cmp::Reverse((0, src)));

        while let Some(std::cmp::Reverse((d, u))) = heap.pop() {
            if dist.get(&u).map(|(du, _)| *du) != Some(d) {
                continue;
            }
            let Some(u_idx) = self.index_of.get(&u).copied() else {
                continue;
            };
            for edge in self.graph.edges(u_idx) {
                let v = *self
                    .graph
                    .node_weight(edge.target())
                    .expect("edge target index is valid");
                if v == u {
                    continue;
                }
                if avoid_nodes.contains(&v) || avoid_edges.contains(&(u, v)) {
                    continue;
                }
                let nd = d + 1;
                let better = dist.get(&v).map(|(existing, _)| nd < *existing).unwrap_or(true);
                if better {
                    dist.insert(v, (nd, Some(u)));
                    heap.push(std::cmp::Reverse((nd, v)));
                }
            }
        }
        dist
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dpid(n: u64) -> Dpid {
        Dpid(n)
    }

    #[test]
    fn add_and_remove_switch() {
        let mut g = FabricGraph::new();
        g.add_switch(dpid(3001));
        assert!(g.contains_switch(dpid(3001)));
        g.remove_switch(dpid(3001));
        assert!(!g.contains_switch(dpid(3001)));
    }

    #[test]
    fn link_registers_both_directions() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        assert_eq!(g.port_pair(dpid(3001), dpid(2001)), Some((PortNo(1), PortNo(3))));
        assert_eq!(g.port_pair(dpid(2001), dpid(3001)), Some((PortNo(3), PortNo(1))));
        assert!(g.is_linked(dpid(3001), dpid(2001)));
    }

    #[test]
    fn remove_switch_drops_its_links() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        g.remove_switch(dpid(3001));
        assert!(!g.is_linked(dpid(3001), dpid(2001)));
        assert!(!g.is_linked(dpid(2001), dpid(3001)));
        assert!(g.contains_switch(dpid(2001)));
    }

    #[test]
    fn links_yields_one_entry_per_edge() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        g.add_link(dpid(3002), dpid(2001), (PortNo(1), PortNo(4)));
        assert_eq!(g.links().count(), 2);
    }

    #[test]
    fn bandwidth_defaults_to_zero_then_updates() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        assert_eq!(g.bandwidth(dpid(3001), dpid(2001)), Some(0.0));
        g.set_bandwidth(dpid(3001), dpid(2001), 12000.0);
        assert_eq!(g.bandwidth(dpid(3001), dpid(2001)), Some(12000.0));
        assert_eq!(g.bandwidth(dpid(2001), dpid(3001)), Some(12000.0));
    }
}
