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

//! Bandwidth-weighted path selection (§4.2.5) shared by the reroute decision and the Forwarder's
//! `get_path` fallback.

use sieve_awareness::{FabricGraph, Path};
use sieve_openflow::{Dpid, PortNo};

/// Picks the path with maximum bottleneck bandwidth among `candidates`, breaking ties by
/// lexicographic order of the DPID sequence: the path whose `hops()` sorts first wins, regardless
/// of how many hops it has (§4.2.5 "Ties between equally good paths").
fn pick_by_bandwidth_then_lex_dpids<'a>(candidates: impl Iterator<Item = &'a Path>, graph: &FabricGraph) -> Option<&'a Path> {
    let mut best: Option<(&Path, f64)> = None;
    for path in candidates {
        let bw = path.bottleneck_bandwidth(graph);
        best = Some(match best {
            None => (path, bw),
            Some((cur, cur_bw)) if bw > cur_bw || (bw == cur_bw && path.hops() < cur.hops()) => (path, bw),
            Some(kept) => kept,
        });
    }
    best.map(|(path, _)| path)
}

/// Picks the path with maximum bottleneck bandwidth among `paths`. Ties are broken by
/// lexicographic order of the DPID sequence (§4.2.5 "Ties between equally good paths").
///
/// This is the general bandwidth-weighted selector the Forwarder falls back to when Monitor has
/// no fresh `best_paths` memo entry (§4.3 "get_path").
pub fn best_by_bandwidth<'a>(paths: &'a [Path], graph: &FabricGraph) -> Option<&'a Path> {
    pick_by_bandwidth_then_lex_dpids(paths.iter(), graph)
}

/// The first-hop egress port a path uses leaving `graph`'s `src` node, i.e. the port on
/// `path.hops()[0]` towards `path.hops()[1]`.
fn first_hop_egress_port(path: &Path, graph: &FabricGraph) -> Option<PortNo> {
    let hops = path.hops();
    if hops.len() < 2 {
        return None;
    }
    graph.port_pair(hops[0], hops[1]).map(|(src_port, _)| src_port)
}

/// Selects the best alternative path for a rerouted candidate (§4.2.5): among the cached shortest
/// paths, discard any whose first hop egresses through `excluded_port`, then return the one with
/// maximum bottleneck bandwidth provided it exceeds `hot_port_free_bw_kbps` by at least
/// `margin_kbps`. Returns `None` ("no path", §4.2.8) if no candidate clears the margin.
pub fn select_alternative_path<'a>(
    paths: &'a [Path],
    graph: &FabricGraph,
    excluded_port: PortNo,
    hot_port_free_bw_kbps: f64,
    margin_kbps: f64,
) -> Option<&'a Path> {
    let admissible: Vec<&Path> = paths
        .iter()
        .filter(|p| first_hop_egress_port(p, graph) != Some(excluded_port))
        .collect();

    let best = pick_by_bandwidth_then_lex_dpids(admissible.into_iter(), graph)?;

    let bottleneck = best.bottleneck_bandwidth(graph);
    if bottleneck - hot_port_free_bw_kbps >= margin_kbps {
        Some(best)
    } else {
        None
    }
}

/// Every `(in_port, out_port)` pair for each switch along `path`, used to build per-hop
/// flow-mods. The first hop's `in_port` is the caller-supplied ingress (where the original
/// packet/candidate entered); each subsequent switch derives its ingress from the link it was
/// reached over. The final entry is for `path`'s destination switch itself, egressing on
/// `final_egress` (the destination host's access port for a Forwarder install, or the hot
/// switch's access port for a detour) — without it the path's last switch would have no rule
/// delivering the packet to its target (§4.3 "For every hop along the chosen path").
pub fn hop_ports(
    path: &Path,
    graph: &FabricGraph,
    first_ingress: PortNo,
    final_egress: PortNo,
) -> Vec<(Dpid, PortNo, PortNo)> {
    let hops = path.hops();
    if hops.len() < 2 {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(hops.len());
    let mut in_port = first_ingress;
    for w in hops.windows(2) {
        let (src, dst) = (w[0], w[1]);
        let Some((out_port, next_in_port)) = graph.port_pair(src, dst) else {
            continue;
        };
        result.push((src, in_port, out_port));
        in_port = next_in_port;
    }
    if let Some(&last) = hops.last() {
        result.push((last, in_port, final_egress));
    }
    result
}
