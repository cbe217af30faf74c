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

//! The single-threaded-cooperative scheduling model of §5, mapped onto a `tokio::select!` loop
//! (§9 Design Note: "Cooperative green threads ... map naturally to either a single timer on the
//! OpenFlow event loop (single-threaded target) or two goroutines/tasks synchronized via
//! channels (multi-threaded target). In the multi-threaded case, shared state must move behind a
//! single-writer mutex" — Sieve picks the multi-task tokio rendition, recorded as an Open
//! Question decision in `DESIGN.md`, since every teacher crate in this pack is tokio-based).
//!
//! The host OpenFlow library (§6) is the one piece of this diagram Sieve does not implement: it
//! owns the wire session and hands events to this loop over plain channels, the same seam
//! `cisco_lab`'s executor uses `tokio::sync::mpsc`/`broadcast` for between its SSH sessions and
//! the reconciliation loop.

use std::sync::Arc;

use log::info;
use sieve_openflow::{Dpid, FlowStatsEntry, PacketIn, PortStatsEntry};
use tokio::sync::mpsc::Receiver;

use crate::channel::OpenFlowChannel;
use crate::controller::Controller;
use crate::settings;

/// A port-stats reply delivered by the host library, one entry per `OFPPortStatsReply` body
/// element (§3 "Port-stats sample").
pub struct PortStatsEvent {
    pub dpid: Dpid,
    pub entry: PortStatsEntry,
}

/// A flow-stats reply delivered by the host library in response to the controller's reactive
/// `OFPFlowStatsRequest` (§4.2.3).
pub struct FlowStatsEvent {
    pub dpid: Dpid,
    pub entries: Vec<FlowStatsEntry>,
}

/// Runs the control plane until the process receives a shutdown signal (Ctrl-C) or one of the
/// event channels closes. Drives, concurrently:
/// - the two Monitor periodic loops (§4.2.1, §4.2.2);
/// - packet-in driven path installation (§4.3);
/// - port-stats reply processing, which may immediately trigger a flow-stats request (§4.2.3);
/// - flow-stats reply processing, which may install detours (§4.2.4-§4.2.6).
#[allow(clippy::too_many_arguments)]
pub async fn run<C: OpenFlowChannel + 'static>(
    controller: Arc<Controller>,
    channel: Arc<C>,
    mut packet_in_rx: Receiver<PacketIn>,
    mut port_stats_rx: Receiver<PortStatsEvent>,
    mut flow_stats_rx: Receiver<FlowStatsEvent>,
) {
    let edge_uplinks = Arc::new(settings::all_edge_uplinks());
    let stats_handle = tokio::spawn(sieve_monitor::loops::stats_loop(
        controller.monitor.clone(),
        channel.clone(),
        edge_uplinks,
    ));
    let bandwidth_handle = tokio::spawn(sieve_monitor::loops::bandwidth_refresh_loop(
        controller.monitor.clone(),
        controller.awareness.clone(),
    ));

    info!(
        "event loop started, monitoring {} edge uplinks",
        settings::EDGE_UPLINK_PORT_COUNT
    );

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            Some(pkt) = packet_in_rx.recv() => {
                controller.handle_packet_in(&pkt, &*channel).await;
            }
            Some(ev) = port_stats_rx.recv() => {
                if let Some(hot_dpid) = controller.on_port_stats_reply(ev.dpid, ev.entry).await {
                    channel.request_flow_stats(hot_dpid).await;
                }
            }
            Some(ev) = flow_stats_rx.recv() => {
                for fm in controller.on_flow_stats_reply(ev.dpid, &ev.entries).await {
                    channel.send_flow_mod(fm).await;
                }
            }
            else => {
                info!("all event channels closed, shutting down");
                break;
            }
        }
    }

    stats_handle.abort();
    bandwidth_handle.abort();
}
