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

//! End-to-end tests driving `Controller` the way the event loop does: through a stub
//! `OpenFlowChannel` that records every flow-mod and packet-out it is handed, rather than through
//! the unit-level component APIs each sieve-* crate already exercises directly.

use std::net::Ipv4Addr;
use std::sync::Mutex;

use async_trait::async_trait;
use sieve::channel::OpenFlowChannel;
use sieve::settings::Settings;
use sieve::Controller;
use sieve_monitor::loops::DatapathChannel;
use sieve_openflow::{Dpid, FlowMod, MacAddr, PacketIn, PacketOut, PortNo};

#[derive(Default)]
struct RecordingChannel {
    flow_mods: Mutex<Vec<FlowMod>>,
    packet_outs: Mutex<Vec<PacketOut>>,
}

#[async_trait]
impl DatapathChannel for RecordingChannel {
    async fn known_datapaths(&self) -> Vec<Dpid> {
        Vec::new()
    }
    async fn request_port_stats(&self, _dpid: Dpid) {}
    async fn request_flow_stats(&self, _dpid: Dpid) {}
}

#[async_trait]
impl OpenFlowChannel for RecordingChannel {
    async fn send_flow_mod(&self, flow_mod: FlowMod) {
        self.flow_mods.lock().unwrap().push(flow_mod);
    }
    async fn send_packet_out(&self, packet_out: PacketOut) {
        self.packet_outs.lock().unwrap().push(packet_out);
    }
}

fn eth_arp_frame(src_mac: [u8; 6], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&[0xff; 6]); // dst mac (broadcast)
    buf.extend_from_slice(&src_mac);
    buf.extend_from_slice(&0x0806u16.to_be_bytes()); // ARP
    buf.extend_from_slice(&1u16.to_be_bytes()); // htype
    buf.extend_from_slice(&0x0800u16.to_be_bytes()); // ptype
    buf.push(6); // hlen
    buf.push(4); // plen
    buf.extend_from_slice(&1u16.to_be_bytes()); // request
    buf.extend_from_slice(&src_mac);
    buf.extend_from_slice(&src_ip.octets());
    buf.extend_from_slice(&[0; 6]);
    buf.extend_from_slice(&dst_ip.octets());
    buf
}

fn eth_tcp_frame(src_mac: [u8; 6], src_ip: Ipv4Addr, dst_ip: Ipv4Addr, src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&[0x00; 6]); // dst mac, unused by Sieve
    buf.extend_from_slice(&src_mac);
    buf.extend_from_slice(&0x0800u16.to_be_bytes()); // IPv4
    buf.push(0x45); // version/ihl
    buf.push(0);
    buf.extend_from_slice(&40u16.to_be_bytes()); // total length
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.push(64); // ttl
    buf.push(6); // TCP
    buf.extend_from_slice(&0u16.to_be_bytes()); // checksum
    buf.extend_from_slice(&src_ip.octets());
    buf.extend_from_slice(&dst_ip.octets());
    buf.extend_from_slice(&src_port.to_be_bytes());
    buf.extend_from_slice(&dst_port.to_be_bytes());
    buf
}

fn dpid(n: u64) -> Dpid {
    Dpid(n)
}

/// S1: a lone edge switch registers with no traffic observed — no packet-in has landed, so
/// the Controller's Awareness view holds only the node itself.
#[tokio::test]
async fn cold_start_registers_switch_with_no_paths() {
    let controller = Controller::new(Settings::default());
    controller.switch_enter(dpid(3001)).await;

    let paths = controller.awareness.write().await.shortest_paths(dpid(3001), dpid(3002)).to_vec();
    assert!(paths.is_empty());
}

/// S2: a first TCP flow across a two-pod fat-tree slice installs a forwarder flow-mod per hop
/// plus one packet-out on the first hop, driven entirely through the Controller/channel seam.
#[tokio::test]
async fn first_tcp_flow_installs_hop_chain_and_packet_out() {
    let controller = Controller::new(Settings::default());
    for d in [3001, 3003, 2001, 2002, 2003, 2004, 1001, 1002] {
        controller.switch_enter(dpid(d)).await;
    }
    controller.link_add(dpid(3001), dpid(2001), (PortNo(1), PortNo(3))).await;
    controller.link_add(dpid(3001), dpid(2002), (PortNo(2), PortNo(3))).await;
    controller.link_add(dpid(2001), dpid(1001), (PortNo(1), PortNo(1))).await;
    controller.link_add(dpid(2001), dpid(1002), (PortNo(2), PortNo(1))).await;
    controller.link_add(dpid(2003), dpid(1001), (PortNo(1), PortNo(2))).await;
    controller.link_add(dpid(2003), dpid(1002), (PortNo(2), PortNo(2))).await;
    controller.link_add(dpid(2003), dpid(3003), (PortNo(3), PortNo(1))).await;
    controller.link_add(dpid(2004), dpid(3003), (PortNo(3), PortNo(2))).await;
    controller
        .host_seen(
            "10.7.0.1".parse().unwrap(),
            MacAddr([7; 6]),
            (dpid(3003), PortNo(3)),
        )
        .await;

    let channel = RecordingChannel::default();
    let data = eth_tcp_frame([1; 6], "10.1.0.1".parse().unwrap(), "10.7.0.1".parse().unwrap(), 5000, 40000);
    let pkt = PacketIn {
        dpid: dpid(3001),
        in_port: PortNo(3),
        buffer_id: Some(42),
        data,
    };
    controller.handle_packet_in(&pkt, &channel).await;

    let flow_mods = channel.flow_mods.lock().unwrap();
    let packet_outs = channel.packet_outs.lock().unwrap();
    // 5-switch path (3001 -> agg -> core -> agg -> 3003): one flow-mod per switch, including the
    // destination edge switch's rule to the host port (§4.3, S2).
    assert_eq!(flow_mods.len(), 5);
    assert!(flow_mods.iter().all(|fm| fm.priority == 30));
    assert_eq!(packet_outs.len(), 1);
    assert_eq!(packet_outs[0].dpid, dpid(3001));
}

/// S5: ARP to an unknown destination floods unlearned access ports across every known datapath.
#[tokio::test]
async fn arp_to_unknown_destination_floods_unlearned_ports() {
    let controller = Controller::new(Settings::default());
    controller.switch_enter(dpid(3001)).await;
    controller.switch_enter(dpid(3002)).await;
    controller
        .host_seen("10.1.0.5".parse().unwrap(), MacAddr([5; 6]), (dpid(3001), PortNo(3)))
        .await;

    let channel = RecordingChannel::default();
    let data = eth_arp_frame([9; 6], "10.1.0.9".parse().unwrap(), "10.9.0.1".parse().unwrap());
    let pkt = PacketIn {
        dpid: dpid(3001),
        in_port: PortNo(4),
        buffer_id: Some(7),
        data,
    };
    controller.handle_packet_in(&pkt, &channel).await;

    let packet_outs = channel.packet_outs.lock().unwrap();
    let targets_output = |dpid: Dpid, port: PortNo| {
        packet_outs
            .iter()
            .any(|po| po.dpid == dpid && po.actions == vec![sieve_openflow::Action::Output(port)])
    };
    // 3001 port 3 is already learned and must be excluded from the flood.
    assert!(!targets_output(dpid(3001), PortNo(3)));
    assert!(targets_output(dpid(3001), PortNo(4)));
    assert!(targets_output(dpid(3002), PortNo(3)));
    assert!(targets_output(dpid(3002), PortNo(4)));
}

/// IPv4 to an unresolved destination drops silently rather than flooding (§4.3 edge case).
#[tokio::test]
async fn ipv4_to_unknown_destination_drops_silently() {
    let controller = Controller::new(Settings::default());
    controller.switch_enter(dpid(3001)).await;

    let channel = RecordingChannel::default();
    let data = eth_tcp_frame([1; 6], "10.1.0.1".parse().unwrap(), "10.9.0.1".parse().unwrap(), 5000, 40000);
    let pkt = PacketIn {
        dpid: dpid(3001),
        in_port: PortNo(3),
        buffer_id: Some(1),
        data,
    };
    controller.handle_packet_in(&pkt, &channel).await;

    assert!(channel.flow_mods.lock().unwrap().is_empty());
    assert!(channel.packet_outs.lock().unwrap().is_empty());
}
