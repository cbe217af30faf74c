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

//! Explicit constructor wiring for Awareness, Monitor and Forwarder (§9 Design Note: "Dynamic
//! service lookup ... should be replaced with explicit constructor wiring: the event loop owns
//! all three components and injects references once").
//!
//! `Controller` is the one place all three components meet. It owns the shared state behind
//! `Arc<RwLock<_>>` in the lock order the design notes fix ("Awareness graph lock < Monitor
//! caches < Forwarder read", §9) and exposes one entry point per external event the host OpenFlow
//! library delivers: topology change, packet-in, port-stats reply, flow-stats reply.

use std::net::Ipv4Addr;
use std::sync::Arc;

use log::debug;
use sieve_awareness::Awareness;
use sieve_forwarder::{Forwarder, ForwardPlan, ForwarderError};
use sieve_monitor::{Monitor, PortStatsOutcome};
use sieve_openflow::{Dpid, FlowStatsEntry, MacAddr, PacketIn, PortNo, PortStatsEntry};
use tokio::sync::RwLock;

use crate::channel::OpenFlowChannel;
use crate::settings::Settings;

/// Owns the three components and the fabric-wide ethertype used to build `FlowKey`s — `0x0800`
/// for every IPv4 flow the Forwarder and Monitor install matches for (§6: "eth_type=0x0800").
pub struct Controller {
    pub awareness: Arc<RwLock<Awareness>>,
    pub monitor: Arc<RwLock<Monitor>>,
    forwarder: Forwarder,
}

const ETH_TYPE_IPV4: u16 = 0x0800;

impl Controller {
    pub fn new(settings: Settings) -> Self {
        Controller {
            awareness: Arc::new(RwLock::new(Awareness::new())),
            monitor: Arc::new(RwLock::new(Monitor::new(settings.monitor))),
            forwarder: Forwarder::new(),
        }
    }

    /// `on switch-enter` / `on switch-leave` (§4.1), driven by the host library's topology events.
    pub async fn switch_enter(&self, dpid: Dpid) {
        self.awareness.write().await.switch_enter(dpid);
    }

    pub async fn switch_leave(&self, dpid: Dpid) {
        self.awareness.write().await.switch_leave(dpid);
    }

    pub async fn link_add(&self, src: Dpid, dst: Dpid, ports: (PortNo, PortNo)) {
        self.awareness.write().await.link_add(src, dst, ports);
    }

    pub async fn link_delete(&self, src: Dpid, dst: Dpid) {
        self.awareness.write().await.link_delete(src, dst);
    }

    /// Handles one packet-in end to end (§4.3): resolves a [`ForwardPlan`] against the current
    /// Awareness/Monitor state, then pushes whatever flow-mods and packet-out it calls for onto
    /// `channel`.
    pub async fn handle_packet_in<C: OpenFlowChannel>(&self, pkt: &PacketIn, channel: &C) {
        let plan = {
            let mut awareness = self.awareness.write().await;
            let mut monitor = self.monitor.write().await;
            self.forwarder
                .handle_packet_in(pkt, &mut awareness, &mut monitor)
        };
        if let Err(e) = self.apply_plan(pkt, plan, channel).await {
            debug!("packet-in on {} produced no action: {e}", pkt.dpid);
        }
    }

    async fn apply_plan<C: OpenFlowChannel>(
        &self,
        pkt: &PacketIn,
        plan: ForwardPlan,
        channel: &C,
    ) -> Result<(), ForwarderError> {
        match plan {
            ForwardPlan::Drop => Ok(()),
            ForwardPlan::PacketOut { dpid, port } => {
                let out = sieve_forwarder::packet_out_for(pkt, dpid, port)?;
                channel.send_packet_out(out).await;
                Ok(())
            }
            ForwardPlan::Flood { targets } => {
                for (dpid, port) in targets {
                    let out = sieve_forwarder::packet_out_for(pkt, dpid, port)?;
                    channel.send_packet_out(out).await;
                }
                Ok(())
            }
            ForwardPlan::InstallPath {
                flow_mods,
                packet_out: (dpid, port),
            } => {
                for fm in flow_mods {
                    channel.send_flow_mod(fm).await;
                }
                let out = sieve_forwarder::packet_out_for(pkt, dpid, port)?;
                channel.send_packet_out(out).await;
                Ok(())
            }
        }
    }

    /// §4.2.3 "Port-stats reply processing". On [`PortStatsOutcome::HotPortDetected`], the caller
    /// (the event loop) must immediately issue an `OFPFlowStatsRequest` — returned here so the
    /// event loop can push it onto the channel outside the lock.
    pub async fn on_port_stats_reply(&self, dpid: Dpid, entry: PortStatsEntry) -> Option<Dpid> {
        let outcome = self.monitor.write().await.on_port_stats_reply(dpid, entry);
        match outcome {
            PortStatsOutcome::HotPortDetected { dpid, .. } => Some(dpid),
            PortStatsOutcome::Nominal => None,
        }
    }

    /// §4.2.4-§4.2.6 "Flow-stats reply processing (reroute decision)": computes and returns the
    /// detour flow-mods to install, in installation order. Returns an empty vector if the switch
    /// is no longer hot (§5 "latest wins") or no candidate cleared the margin (§4.2.8).
    pub async fn on_flow_stats_reply(&self, dpid: Dpid, entries: &[FlowStatsEntry]) -> Vec<sieve_openflow::FlowMod> {
        let mut awareness = self.awareness.write().await;
        self.monitor
            .write()
            .await
            .on_flow_stats_reply(dpid, entries, &mut awareness, ETH_TYPE_IPV4)
    }

    /// Convenience used by ARP/host-learning paths outside a full packet-in (e.g. a host
    /// bootstrapped by static configuration rather than observed traffic).
    pub async fn host_seen(&self, ip: Ipv4Addr, mac: MacAddr, location: (Dpid, PortNo)) {
        self.awareness.write().await.host_seen(ip, mac, location);
    }
}
