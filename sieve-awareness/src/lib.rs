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

//! Topology discovery and k-shortest-path precomputation for the Sieve fabric (§4.1).
//!
//! `Awareness` owns the switch graph, the link-to-port table, the host-location table, and a
//! memoized cache of k-shortest paths between switch pairs. It has no notion of bandwidth or
//! flow scheduling — that belongs to `sieve-monitor`, which reads this crate's graph and path
//! cache but never mutates them directly.

pub mod graph;
pub mod host;
pub mod path;

use std::collections::HashMap;
use std::net::Ipv4Addr;

use log::{debug, info};
use sieve_openflow::{Dpid, HostLocation, MacAddr, PortNo};
use thiserror::Error;

pub use graph::{FabricGraph, PortPair};
pub use host::HostTable;
pub use path::{k_shortest_paths, Path, K_SHORTEST_PATHS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AwarenessError {
    #[error("switch {0} is not known to the topology")]
    UnknownSwitch(Dpid),
    #[error("no link is known between {0} and {1}")]
    NoLink(Dpid, Dpid),
}

/// Memoized k-shortest-paths result for one `(src, dst)` pair. Mirrors `bgpsim`'s
/// `CacheResult`-style memoization: a lookup is either a cached hit or a marker that forces a
/// recompute, rather than the source's try/except-driven cache probe (§9 design note).
#[derive(Debug, Clone)]
enum CachedPaths {
    Computed(Vec<Path>),
    Dirty,
}

/// Topology discovery and shortest-path precomputation.
#[derive(Debug, Clone, Default)]
pub struct Awareness {
    graph: FabricGraph,
    hosts: HostTable,
    path_cache: HashMap<(Dpid, Dpid), CachedPaths>,
}

impl Awareness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &FabricGraph {
        &self.graph
    }

    /// Mutable access to the graph for the Monitor's bandwidth-graph refresh (§4.2.2), which
    /// rewrites edge weights but never adds or removes nodes/links.
    pub fn graph_mut(&mut self) -> &mut FabricGraph {
        &mut self.graph
    }

    /// `on switch-enter` (§4.1). Idempotent; a fresh switch's paths are untouched since nothing
    /// could have referenced it yet.
    pub fn switch_enter(&mut self, dpid: Dpid) {
        debug!("switch {dpid} entered");
        self.graph.add_switch(dpid);
    }

    /// `on switch-leave` (§4.1). Invalidates every cached path touching `dpid`.
    pub fn switch_leave(&mut self, dpid: Dpid) {
        info!("switch {dpid} left");
        self.graph.remove_switch(dpid);
        self.invalidate_paths_touching(dpid);
    }

    /// `on link-add` (§4.1). Updates the link table and graph, marks affected path caches dirty.
    pub fn link_add(&mut self, src: Dpid, dst: Dpid, ports: PortPair) {
        debug!("link {src}<->{dst} added ({ports:?})");
        self.graph.add_link(src, dst, ports);
        self.invalidate_paths_touching(src);
        self.invalidate_paths_touching(dst);
    }

    /// `on link-delete` (§4.1).
    pub fn link_delete(&mut self, src: Dpid, dst: Dpid) {
        debug!("link {src}<->{dst} removed");
        self.graph.remove_link(src, dst);
        self.invalidate_paths_touching(src);
        self.invalidate_paths_touching(dst);
    }

    /// `on host-seen` (§4.1), triggered by ARP or IPv4 packet-in arriving on an access port.
    pub fn host_seen(&mut self, ip: Ipv4Addr, mac: MacAddr, location: HostLocation) {
        self.hosts.record(ip, mac, location);
    }

    pub fn get_host_location(&self, ip: Ipv4Addr) -> Option<HostLocation> {
        self.hosts.location_of(ip)
    }

    pub fn is_learned_access_port(&self, location: HostLocation) -> bool {
        self.hosts.is_learned(location)
    }

    pub fn known_switches(&self) -> impl Iterator<Item = Dpid> + '_ {
        self.graph.switches()
    }

    pub fn access_ports(&self, dpid: Dpid) -> impl Iterator<Item = HostLocation> + '_ {
        self.hosts
            .learned_locations()
            .filter(move |(d, _)| *d == dpid)
    }

    pub fn every_access_port(&self) -> impl Iterator<Item = HostLocation> + '_ {
        self.hosts.learned_locations()
    }

    /// `shortest_paths(src_sw, dst_sw)` (§4.1). Computed lazily on first request after an
    /// invalidation and memoized; `src == dst` and "no path" both short-circuit through
    /// [`k_shortest_paths`]'s own documented edge cases.
    pub fn shortest_paths(&mut self, src: Dpid, dst: Dpid) -> &[Path] {
        let key = (src, dst);
        let needs_compute = !matches!(self.path_cache.get(&key), Some(CachedPaths::Computed(_)));
        if needs_compute {
            let paths = k_shortest_paths(&self.graph, src, dst);
            self.path_cache.insert(key, CachedPaths::Computed(paths));
        }
        match self.path_cache.get(&key) {
            Some(CachedPaths::Computed(paths)) => paths,
            _ => unreachable!("just computed and inserted"),
        }
    }

    fn invalidate_paths_touching(&mut self, dpid: Dpid) {
        for (&(src, dst), entry) in self.path_cache.iter_mut() {
            if src == dpid || dst == dpid {
                *entry = CachedPaths::Dirty;
            }
        }
    }
}
