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

//! Elephant-flow candidate selection and reroute-count derivation (§4.2.4).

use std::net::Ipv4Addr;

use sieve_openflow::{FlowStatsEntry, PortNo, RESERVED_PRIORITIES};

use crate::config::MonitorConfig;

/// A flow entry eligible for rescheduling: forwarder-installed, egressing the hot port, carrying
/// real traffic, and TCP (§4.2.4 "Candidate selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub priority: u16,
    pub in_port: PortNo,
    pub ipv4_src: Ipv4Addr,
    pub ipv4_dst: Ipv4Addr,
    pub tcp_src: u16,
    pub tcp_dst: u16,
}

/// Filters and sorts the flow entries on a congested switch into reroute candidates.
///
/// Filter (§4.2.4): (a) not a reserved baseline priority, (b) egresses the hot port, (c) more
/// than 50 bytes transferred, (d) carries a TCP source port — UDP is excluded from rescheduling,
/// preserved as observed (§9 Open Questions). Sorted by `(priority, ipv4_src, ipv4_dst)` for
/// deterministic candidate ordering.
pub fn select_candidates(entries: &[FlowStatsEntry], hot_port: PortNo) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = entries
        .iter()
        .filter(|e| !RESERVED_PRIORITIES.contains(&e.priority))
        .filter(|e| e.out_port == hot_port)
        .filter(|e| e.byte_count > 50)
        .filter_map(|e| {
            let tcp_src = e.tcp_src?;
            let tcp_dst = e.tcp_dst?;
            if e.ip_proto != Some(sieve_openflow::flowkey::IpProto::TCP) {
                return None;
            }
            Some(Candidate {
                priority: e.priority,
                in_port: e.in_port,
                ipv4_src: e.ipv4_src,
                ipv4_dst: e.ipv4_dst,
                tcp_src,
                tcp_dst,
            })
        })
        .collect();
    candidates.sort_by_key(|c| (c.priority, c.ipv4_src, c.ipv4_dst));
    candidates
}

/// `L_curr`: the hot port's current load ratio, rounded to one decimal place (§4.2.4).
pub fn current_load_ratio(free_bw_kbps: f64, capacity_kbps: f64) -> f64 {
    if capacity_kbps <= 0.0 {
        return 0.0;
    }
    let raw = 1.0 - free_bw_kbps / capacity_kbps;
    (raw * 10.0).round() / 10.0
}

/// `N_move` (§4.2.4 "Reroute count"): the number of candidates to move this round.
pub fn reroute_count(n: usize, l_curr: f64) -> usize {
    if n == 0 {
        return 0;
    }
    if l_curr >= 1.0 {
        n / 2
    } else if n == 1 {
        1
    } else {
        ((n as f64) * l_curr).floor() as usize
    }
}

/// Act only if `N_move > 0` and `L_curr >= reroute_load_gate` (§4.2.4).
pub fn should_reroute(n_move: usize, l_curr: f64, config: &MonitorConfig) -> bool {
    n_move > 0 && l_curr >= config.reroute_load_gate
}
