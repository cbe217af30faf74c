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

//! Adaptive stats polling, congestion detection and elephant-flow rerouting (§4.2).
//!
//! `Monitor` owns the per-port sample rings, the derived free-bandwidth table, the per-edge-switch
//! "hot port" state, the bandwidth-weighted best-path memo, and the reroute fail counter. It reads
//! (and, for the bandwidth view, writes) `sieve_awareness::Awareness`'s graph but never mutates its
//! topology or host tables — those stay exclusively owned by Awareness (§3 "Lifecycle and
//! ownership").

pub mod bandwidth_graph;
pub mod best_path;
pub mod config;
pub mod detour;
pub mod loops;
pub mod metrics;
pub mod period;
pub mod reroute;

use std::collections::HashMap;

use log::{info, warn};
use sieve_awareness::{Awareness, Path};
use sieve_openflow::{Dpid, FlowMod, FlowStatsEntry, PortNo, PortStatsEntry, SwitchTier};
use thiserror::Error;

pub use config::{MonitorConfig, SettingsError};
pub use metrics::{PortLoad, PortSample, PortStats};

/// Edge-switch port numbers that are uplinks to the aggregate tier (§6 bootstrapper contract).
pub const EDGE_UPLINK_PORTS: [PortNo; 2] = [PortNo(1), PortNo(2)];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("stats reply referenced unknown datapath {0}")]
    UnknownDatapath(Dpid),
    #[error("no admissible detour for the candidate on {0:?}")]
    NoAdmissibleDetour(Dpid),
}

/// Signals raised by port-stats reply processing (§4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatsOutcome {
    /// Two samples weren't yet available, or the port is not an edge uplink, or it isn't hot.
    Nominal,
    /// The uplink crossed into the congestion threshold: the caller must immediately issue an
    /// `OFPFlowStatsRequest` to `dpid` (§4.2.3 "immediately issue").
    HotPortDetected { dpid: Dpid, port_no: PortNo },
}

/// Network Monitor (§4.2): stats collection, congestion detection, reactive rerouting.
#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    port_stats: PortStats,
    loads: HashMap<(Dpid, PortNo), PortLoad>,
    /// `sw_out_inf`: the current hot outgoing interface per edge switch (§4.2.3, §4.2.7).
    sw_out_inf: HashMap<Dpid, PortNo>,
    /// Monitor-owned bandwidth-best-path memo, invalidated every stats tick (§4.2.1 step 3) and
    /// consumed read-only by the Forwarder (§3 "Lifecycle and ownership").
    best_paths: HashMap<(Dpid, Dpid), Path>,
    period_secs: f64,
    fail_count: u64,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        let period_secs = config.default_period_secs;
        Monitor {
            config,
            port_stats: PortStats::new(),
            loads: HashMap::new(),
            sw_out_inf: HashMap::new(),
            best_paths: HashMap::new(),
            period_secs,
            fail_count: 0,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn period_secs(&self) -> f64 {
        self.period_secs
    }

    pub fn fail_count(&self) -> u64 {
        self.fail_count
    }

    pub fn hot_port(&self, dpid: Dpid) -> Option<PortNo> {
        self.sw_out_inf.get(&dpid).copied()
    }

    pub fn free_bw_kbps(&self, dpid: Dpid, port_no: PortNo) -> Option<f64> {
        self.loads.get(&(dpid, port_no)).map(|l| l.free_bw_kbps)
    }

    /// Invalidates the `capabilities`/`best_paths` memos at the start of a stats tick (§4.2.1
    /// step 3), forcing the next Forwarder lookup to recompute against the latest bandwidth
    /// graph.
    pub fn begin_stats_tick(&mut self) {
        self.best_paths.clear();
    }

    /// Processes one `PortStatsReply` entry (§4.2.3). `dpid` must already be a known switch;
    /// unknown-tier DPIDs are a capacity-lookup miss (§7) and are skipped with a warning.
    pub fn on_port_stats_reply(&mut self, dpid: Dpid, entry: PortStatsEntry) -> PortStatsOutcome {
        let Ok(tier) = SwitchTier::try_from(dpid) else {
            warn!("capacity lookup miss: {dpid} does not belong to a known tier, skipping load computation");
            return PortStatsOutcome::Nominal;
        };

        self.port_stats.record(
            dpid,
            entry.port_no,
            PortSample {
                tx_bytes: entry.tx_bytes,
                rx_bytes: entry.rx_bytes,
                rx_errors: entry.rx_errors,
                duration_sec: entry.duration_sec,
                duration_nsec: entry.duration_nsec,
            },
        );

        let Some(load) = self.port_stats.load(dpid, entry.port_no, tier, &self.config) else {
            return PortStatsOutcome::Nominal;
        };
        self.loads.insert((dpid, entry.port_no), load);

        let is_edge_uplink =
            tier == SwitchTier::Edge && EDGE_UPLINK_PORTS.contains(&entry.port_no);
        if is_edge_uplink && load.free_bw_kbps < self.config.congestion_threshold_kbps {
            self.sw_out_inf.insert(dpid, entry.port_no);
            info!(
                "{dpid} port {} is hot (free_bw={:.0} Kb/s < {:.0})",
                entry.port_no, load.free_bw_kbps, self.config.congestion_threshold_kbps
            );
            PortStatsOutcome::HotPortDetected {
                dpid,
                port_no: entry.port_no,
            }
        } else {
            PortStatsOutcome::Nominal
        }
    }

    /// Mean load ratio across the monitored edge uplinks (§4.2.3 "Adaptive period"), used to
    /// derive the next polling period. Ports with no recorded load are excluded — a capacity
    /// miss must not silently pull the mean towards zero.
    pub fn mean_edge_uplink_load(&self, edge_uplinks: &[(Dpid, PortNo)]) -> f64 {
        let ratios: Vec<f64> = edge_uplinks
            .iter()
            .filter_map(|k| self.loads.get(k).map(|l| l.load_ratio))
            .collect();
        if ratios.is_empty() {
            return 0.0;
        }
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }

    /// Recomputes [`Monitor::period_secs`] from the mean edge-uplink load (§4.2.3).
    pub fn refresh_period(&mut self, edge_uplinks: &[(Dpid, PortNo)]) {
        let mean_load = self.mean_edge_uplink_load(edge_uplinks);
        self.period_secs = period::next_period(mean_load, &self.config);
    }

    /// Rebuilds the bandwidth-decorated graph (§4.2.2).
    pub fn refresh_bandwidth_graph(&self, awareness: &mut Awareness) {
        bandwidth_graph::refresh(awareness.graph_mut(), &self.free_bw_map());
    }

    fn free_bw_map(&self) -> HashMap<(Dpid, PortNo), f64> {
        self.loads.iter().map(|(&k, v)| (k, v.free_bw_kbps)).collect()
    }

    /// The bandwidth-weighted best path between `src` and `dst` (§4.3 "Best-path lookup"),
    /// consulting the memo first and computing-and-caching on a miss. Returns `None` if Awareness
    /// has no path at all (caller must flood, §4.1 edge cases).
    pub fn best_path(&mut self, src: Dpid, dst: Dpid, awareness: &mut Awareness) -> Option<Path> {
        if let Some(p) = self.best_paths.get(&(src, dst)) {
            return Some(p.clone());
        }
        let paths = awareness.shortest_paths(src, dst).to_vec();
        let chosen = best_path::best_by_bandwidth(&paths, awareness.graph())?.clone();
        self.best_paths.insert((src, dst), chosen.clone());
        Some(chosen)
    }

    /// Processes a `FlowStatsReply` from a congested switch and returns the detour flow-mods to
    /// install, in installation order (§4.2.4-§4.2.6). The reply is always evaluated against the
    /// *current* `sw_out_inf[dpid]` — "latest wins" (§5 "Ordering guarantees") — so if the hot
    /// port changed since the request was issued, the decision applies to the new hot port, and
    /// if the switch is no longer hot at all, no mods are produced.
    pub fn on_flow_stats_reply(
        &mut self,
        dpid: Dpid,
        entries: &[FlowStatsEntry],
        awareness: &mut Awareness,
        eth_type: u16,
    ) -> Vec<FlowMod> {
        let Some(hot_port) = self.sw_out_inf.get(&dpid).copied() else {
            return Vec::new();
        };
        let Ok(tier) = SwitchTier::try_from(dpid) else {
            return Vec::new();
        };
        let free_bw = self.free_bw_kbps(dpid, hot_port).unwrap_or(0.0);
        let capacity = self.config.capacity_kbps(tier);
        let l_curr = reroute::current_load_ratio(free_bw, capacity);

        let candidates = reroute::select_candidates(entries, hot_port);
        let n = candidates.len();
        let n_move = reroute::reroute_count(n, l_curr);
        if !reroute::should_reroute(n_move, l_curr, &self.config) {
            return Vec::new();
        }

        let mut flow_mods = Vec::new();
        for candidate in candidates.into_iter().take(n_move) {
            match self.reroute_one(dpid, hot_port, free_bw, &candidate, awareness, eth_type) {
                Some(mods) => flow_mods.extend(mods),
                None => {
                    self.fail_count += 1;
                    warn!(
                        "no admissible detour for {}:{} -> {} on {dpid}, fail_count={}",
                        candidate.ipv4_src, candidate.tcp_src, candidate.ipv4_dst, self.fail_count
                    );
                }
            }
        }
        flow_mods
    }

    fn reroute_one(
        &self,
        dpid: Dpid,
        hot_port: PortNo,
        hot_port_free_bw: f64,
        candidate: &reroute::Candidate,
        awareness: &mut Awareness,
        eth_type: u16,
    ) -> Option<Vec<FlowMod>> {
        let dst_location = awareness.get_host_location(candidate.ipv4_dst)?;
        let dst_sw = detour::dst_switch_of(dst_location);
        let dst_port = dst_location.1;
        let paths = awareness.shortest_paths(dpid, dst_sw).to_vec();
        let graph = awareness.graph();
        let alt = best_path::select_alternative_path(
            &paths,
            graph,
            hot_port,
            hot_port_free_bw,
            self.config.reroute_margin_kbps,
        )?;
        Some(detour::build_detour(
            candidate,
            alt,
            graph,
            candidate.in_port,
            dst_port,
            eth_type,
        ))
    }

    /// Destination IPs currently without a known host location are not rerouted this round; the
    /// caller may still want to know the fingerprint lookup miss happened, exposed here for
    /// logging call sites outside this crate.
    pub fn is_congested(&self, dpid: Dpid) -> bool {
        self.sw_out_inf.contains_key(&dpid)
    }
}
