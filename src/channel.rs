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

//! The boundary between Sieve's control-plane logic and the host OpenFlow library (§6).
//!
//! The host library — which speaks the OpenFlow 1.3 wire protocol, runs LLDP-based topology
//! discovery and delivers packet-in/stats-reply events — is an out-of-scope external collaborator
//! (§1 "Deliberately out of scope"). [`OpenFlowChannel`] is the seam `sieve-monitor`'s
//! [`sieve_monitor::loops::DatapathChannel`] already establishes for the two periodic loops,
//! widened here to cover the flow-mod and packet-out sends the event loop issues on packet-in and
//! on a reroute decision.

use async_trait::async_trait;
use log::info;
use sieve_monitor::loops::DatapathChannel;
use sieve_openflow::{Dpid, FlowMod, PacketOut};

/// Everything the event loop needs to push to datapaths, beyond the stats-polling surface
/// [`DatapathChannel`] already covers.
#[async_trait]
pub trait OpenFlowChannel: DatapathChannel {
    async fn send_flow_mod(&self, flow_mod: FlowMod);
    async fn send_packet_out(&self, packet_out: PacketOut);
}

/// A channel with no real OpenFlow session behind it: every send is logged and discarded.
///
/// Sieve has no host OpenFlow library dependency in this workspace — the bootstrapper and the
/// wire session are out of scope (§1, §6) — so this is what `sieve`'s binary wires up today. A
/// deployment replaces it with an [`OpenFlowChannel`] impl over the real session; the control-plane
/// logic in `sieve-awareness`/`sieve-monitor`/`sieve-forwarder` does not change.
#[derive(Debug, Clone, Default)]
pub struct LoggingChannel {
    known: Vec<Dpid>,
}

impl LoggingChannel {
    pub fn new(known: Vec<Dpid>) -> Self {
        LoggingChannel { known }
    }
}

#[async_trait]
impl DatapathChannel for LoggingChannel {
    async fn known_datapaths(&self) -> Vec<Dpid> {
        self.known.clone()
    }

    async fn request_port_stats(&self, dpid: Dpid) {
        info!("(stub channel) OFPPortStatsRequest -> {dpid}");
    }

    async fn request_flow_stats(&self, dpid: Dpid) {
        info!("(stub channel) OFPFlowStatsRequest -> {dpid}");
    }
}

#[async_trait]
impl OpenFlowChannel for LoggingChannel {
    async fn send_flow_mod(&self, flow_mod: FlowMod) {
        info!(
            "(stub channel) FlowMod dpid={} priority={} hard_timeout={:?}",
            flow_mod.dpid, flow_mod.priority, flow_mod.hard_timeout
        );
    }

    async fn send_packet_out(&self, packet_out: PacketOut) {
        info!(
            "(stub channel) PacketOut dpid={} in_port={}",
            packet_out.dpid, packet_out.in_port
        );
    }
}
