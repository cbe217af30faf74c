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

//! The subset of the OpenFlow 1.3 message set that Sieve's three components exchange with the
//! host OpenFlow library (§6). These are not a full wire codec — the bootstrapper and the host
//! library own the TLV encoding; Sieve only needs typed structs to build and interpret the
//! fields its logic actually touches.

use std::time::Duration;

use crate::flowkey::FlowKey;
use crate::ids::{Dpid, PortNo};

/// Sent once per datapath on connection; the reply ([`SwitchFeatures`]) registers the switch
/// with Awareness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturesRequest {
    pub dpid: Dpid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub dpid: Dpid,
    pub n_tables: u8,
    pub ports: Vec<PortNo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDescStatsRequest {
    pub dpid: Dpid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescStatsReply {
    pub dpid: Dpid,
    pub ports: Vec<PortDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDesc {
    pub port_no: PortNo,
    pub curr_speed_kbps: u32,
    pub config_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatsRequest {
    pub dpid: Dpid,
}

/// One port's counters as returned in a `PortStatsReply` body (§3 "Port-stats sample").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatsEntry {
    pub port_no: PortNo,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatsReply {
    pub dpid: Dpid,
    pub entries: Vec<PortStatsEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStatsRequest {
    pub dpid: Dpid,
}

/// A single installed flow entry as returned in a `FlowStatsReply` body. Only the fields the
/// Monitor's candidate-selection filter (§4.2.4) inspects are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowStatsEntry {
    pub priority: u16,
    pub in_port: PortNo,
    pub out_port: PortNo,
    pub byte_count: u64,
    pub ip_proto: Option<u8>,
    pub ipv4_src: std::net::Ipv4Addr,
    pub ipv4_dst: std::net::Ipv4Addr,
    pub tcp_src: Option<u16>,
    pub tcp_dst: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsReply {
    pub dpid: Dpid,
    pub entries: Vec<FlowStatsEntry>,
}

/// Payload delivered to the controller when a packet misses the installed flow tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub dpid: Dpid,
    pub in_port: PortNo,
    pub buffer_id: Option<u32>,
    pub data: Vec<u8>,
}

/// A reserved output port meaning "send to the port the packet arrived on, back out the
/// controller" is not used by Sieve; `Output` is the only action Forwarder and Monitor emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Output(PortNo),
}

/// Sent by the controller to push the buffered (or supplied) packet back out a chosen port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub dpid: Dpid,
    pub buffer_id: Option<u32>,
    pub in_port: PortNo,
    pub actions: Vec<Action>,
    pub data: Option<Vec<u8>>,
}

/// A flow-table modification. `priority`, `match_`, `actions` and the two timeouts together
/// fully determine the installed rule (§6 flow-mod schemas).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    pub dpid: Dpid,
    pub priority: u16,
    pub match_: Match,
    pub actions: Vec<Action>,
    pub idle_timeout: Duration,
    pub hard_timeout: Duration,
}

/// The match fields of a [`FlowMod`]: the flow fingerprint plus the hop-local ingress port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub in_port: PortNo,
    pub key: FlowKey,
}

impl FlowMod {
    /// Baseline forwarder entry: priority 30, idle 10s, hard 0 (§6).
    pub fn forwarder(dpid: Dpid, in_port: PortNo, key: FlowKey, out_port: PortNo) -> Self {
        FlowMod {
            dpid,
            priority: 30,
            match_: Match { in_port, key },
            actions: vec![Action::Output(out_port)],
            idle_timeout: Duration::from_secs(10),
            hard_timeout: Duration::ZERO,
        }
    }

    /// A Monitor detour entry: priority strictly above the rerouted candidate's priority, hard
    /// timeout fixed at 6s (§4.2.6).
    pub fn detour(
        dpid: Dpid,
        in_port: PortNo,
        key: FlowKey,
        out_port: PortNo,
        candidate_priority: u16,
    ) -> Self {
        FlowMod {
            dpid,
            priority: candidate_priority + 1,
            match_: Match { in_port, key },
            actions: vec![Action::Output(out_port)],
            idle_timeout: Duration::ZERO,
            hard_timeout: Duration::from_secs(6),
        }
    }
}

/// Reserved priorities maintained by the out-of-scope data-plane bootstrapper (§6). A
/// forwarder/monitor-installed entry must never use one of these.
pub const RESERVED_PRIORITIES: [u16; 4] = [0, 10, 1000, 65535];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detour_priority_strictly_above_candidate() {
        let key = FlowKey::L3 {
            eth_type: 0x0800,
            ipv4_src: "10.1.0.1".parse().unwrap(),
            ipv4_dst: "10.7.0.1".parse().unwrap(),
        };
        let fm = FlowMod::detour(Dpid(3001), PortNo(3), key, PortNo(1), 30);
        assert!(fm.priority > 30);
        assert_eq!(fm.hard_timeout, Duration::from_secs(6));
    }
}
