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

//! Bandwidth-graph refresh (§4.2.2): decorates every known link with
//! `min(free_bw(src_port), free_bw(dst_port))`.

use std::collections::HashMap;

use sieve_awareness::FabricGraph;
use sieve_openflow::{Dpid, PortNo};

/// Rebuilds the bandwidth-decorated view of `graph` from the current per-port free-bandwidth
/// table. Unknown endpoints default to `0` (§4.2.2 "Unknown endpoints default to 0").
pub fn refresh(graph: &mut FabricGraph, free_bw_kbps: &HashMap<(Dpid, PortNo), f64>) {
    let links: Vec<_> = graph.links().collect();
    for (src, dst, (src_port, dst_port)) in links {
        let src_free = free_bw_kbps.get(&(src, src_port)).copied().unwrap_or(0.0);
        let dst_free = free_bw_kbps.get(&(dst, dst_port)).copied().unwrap_or(0.0);
        graph.set_bandwidth(src, dst, src_free.min(dst_free));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dpid(n: u64) -> Dpid {
        Dpid(n)
    }

    #[test]
    fn bandwidth_is_min_of_both_endpoints() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        let mut free_bw = HashMap::new();
        free_bw.insert((dpid(3001), PortNo(1)), 12_000.0);
        free_bw.insert((dpid(2001), PortNo(3)), 8_000.0);
        refresh(&mut g, &free_bw);
        assert_eq!(g.bandwidth(dpid(3001), dpid(2001)), Some(8_000.0));
    }

    #[test]
    fn unknown_endpoint_defaults_to_zero() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        let free_bw = HashMap::new();
        refresh(&mut g, &free_bw);
        assert_eq!(g.bandwidth(dpid(3001), dpid(2001)), Some(0.0));
    }
}
