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

//! Detour flow-mod construction and installation ordering (§4.2.6).

use sieve_awareness::{FabricGraph, Path};
use sieve_openflow::{Dpid, FlowKey, FlowMod, IpProto, PortNo};

use crate::best_path::hop_ports;
use crate::reroute::Candidate;

/// Builds the detour [`FlowMod`] sequence for rerouting `candidate` along `path`, in installation
/// order: intermediate hops first, then the ingress hop last (§4.2.6 "to avoid packets reaching a
/// hop whose rule has not yet landed").
pub fn build_detour(
    candidate: &Candidate,
    path: &Path,
    graph: &FabricGraph,
    ingress_port: PortNo,
    final_egress: PortNo,
    eth_type: u16,
) -> Vec<FlowMod> {
    let hops = hop_ports(path, graph, ingress_port, final_egress);
    let key = FlowKey::L4 {
        eth_type,
        ipv4_src: candidate.ipv4_src,
        ipv4_dst: candidate.ipv4_dst,
        ip_proto: IpProto::Tcp,
        l4_src: candidate.tcp_src,
        l4_dst: candidate.tcp_dst,
    };

    let mut mods: Vec<FlowMod> = hops
        .iter()
        .map(|&(dpid, in_port, out_port)| {
            FlowMod::detour(dpid, in_port, key, out_port, candidate.priority)
        })
        .collect();

    // Installed last-to-first in time, so reverse the hop order: intermediate hops go out first,
    // then the first (ingress) hop.
    if !mods.is_empty() {
        let first = mods.remove(0);
        mods.push(first);
    }
    mods
}

/// Destination switch (the `dpid` half of the destination host's [`sieve_openflow::HostLocation`])
/// used to look up alternative paths from Awareness for a rerouted candidate.
pub fn dst_switch_of(dst_location: (Dpid, PortNo)) -> Dpid {
    dst_location.0
}

#[cfg(test)]
mod test {
    use super::*;
    use sieve_openflow::PortNo;

    fn dpid(n: u64) -> Dpid {
        Dpid(n)
    }

    #[test]
    fn detour_mods_install_intermediate_hops_before_ingress() {
        let mut g = FabricGraph::new();
        g.add_link(dpid(3001), dpid(2002), (PortNo(2), PortNo(3)));
        g.add_link(dpid(2002), dpid(3007), (PortNo(4), PortNo(2)));
        let path = sieve_awareness::k_shortest_paths(&g, dpid(3001), dpid(3007))
            .into_iter()
            .next()
            .unwrap();

        let candidate = Candidate {
            priority: 30,
            in_port: PortNo(3),
            ipv4_src: "10.1.0.1".parse().unwrap(),
            ipv4_dst: "10.7.0.1".parse().unwrap(),
            tcp_src: 5000,
            tcp_dst: 40000,
        };

        let mods = build_detour(&candidate, &path, &g, candidate.in_port, PortNo(5), 0x0800);
        assert_eq!(mods.len(), 3);
        // Intermediate hops and the destination switch install first, ingress hop (3001) last.
        assert_eq!(mods[0].dpid, dpid(2002));
        assert_eq!(mods[1].dpid, dpid(3007));
        assert_eq!(mods[2].dpid, dpid(3001));
        for m in &mods {
            assert!(m.priority > candidate.priority);
            assert_eq!(m.hard_timeout, std::time::Duration::from_secs(6));
        }
    }
}
