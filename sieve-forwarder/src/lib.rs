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

//! Packet-in driven path installation (§4.3).
//!
//! `Forwarder` has no mutable state of its own: it consults `Awareness` (topology, host
//! location) and `Monitor` (bandwidth-weighted best path) and returns a [`ForwardPlan`] describing
//! the flow-mods and packet-out the caller's event loop must push to the OpenFlow channel. This
//! mirrors the "fabric view handed by value" refactor in the design notes — Forwarder reads the
//! other two components' state but never owns or mutates their caches.

use std::time::Duration;

use log::{debug, warn};
use sieve_awareness::Awareness;
use sieve_monitor::Monitor;
use sieve_openflow::{
    Action, Dpid, FlowKey, FlowMod, IpProto, MacAddr, PacketIn, PacketOut, ParsedPacket, PortNo,
    SwitchTier, EDGE_HOST_PORTS,
};
use thiserror::Error;

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const FORWARDER_PRIORITY: u16 = 30;
pub const FORWARDER_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwarderError {
    #[error("packet-in on {0} carried neither a buffer id nor raw data")]
    NoBufferedPacket(Dpid),
}

/// What the caller's event loop must do in response to one packet-in (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardPlan {
    /// Emit a packet-out for the buffered packet directly on `(dpid, port)` — the destination's
    /// known access port (ARP unicast reply path, or an IPv4 flow whose src and dst switch are
    /// identical, §4.3 "Edge cases").
    PacketOut { dpid: Dpid, port: PortNo },
    /// Flood the buffered packet out every access port not already bound in the host table
    /// (§4.3 "flood to all unlearned access ports"; also used for the IPv4 "no path" edge case,
    /// §4.1: "callers must treat this as flood").
    Flood { targets: Vec<(Dpid, PortNo)> },
    /// Install `flow_mods` in the given order (already last-hop-backwards per §4.3), then emit a
    /// packet-out for the buffered packet on `packet_out`.
    InstallPath {
        flow_mods: Vec<FlowMod>,
        packet_out: (Dpid, PortNo),
    },
    /// Destination host location is unknown for non-ARP IPv4 traffic (§4.3 "for IPv4, drop
    /// silently").
    Drop,
}

/// Shortest Forwarder (§4.3): translates packet-in events into flow installations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Forwarder;

impl Forwarder {
    pub fn new() -> Self {
        Forwarder
    }

    /// Dispatches one packet-in: parses the Ethernet payload and routes to `handle_arp` or
    /// `handle_ipv4` (§4.3 "Packet-in handling"). Non-ARP, non-IPv4 ethertypes produce
    /// [`ForwardPlan::Drop`] — the spec only names these two cases.
    pub fn handle_packet_in(
        &self,
        pkt: &PacketIn,
        awareness: &mut Awareness,
        monitor: &mut Monitor,
    ) -> ForwardPlan {
        match sieve_openflow::parse_ethernet_frame(&pkt.data) {
            ParsedPacket::Arp {
                src_mac,
                src_ip,
                dst_ip,
            } => self.handle_arp(pkt.dpid, pkt.in_port, src_mac, src_ip, dst_ip, awareness),
            ParsedPacket::Ipv4 {
                src_mac,
                eth_type,
                src_ip,
                dst_ip,
                l4,
            } => self.handle_ipv4(
                pkt.dpid, pkt.in_port, src_mac, eth_type, src_ip, dst_ip, l4, awareness, monitor,
            ),
            ParsedPacket::Other => ForwardPlan::Drop,
        }
    }

    /// §4.3 "If ARP: call `handle_arp`."
    pub fn handle_arp(
        &self,
        dpid: Dpid,
        in_port: PortNo,
        src_mac: MacAddr,
        src_ip: std::net::Ipv4Addr,
        dst_ip: std::net::Ipv4Addr,
        awareness: &mut Awareness,
    ) -> ForwardPlan {
        awareness.host_seen(src_ip, src_mac, (dpid, in_port));
        match awareness.get_host_location(dst_ip) {
            Some((dst_dpid, dst_port)) => ForwardPlan::PacketOut {
                dpid: dst_dpid,
                port: dst_port,
            },
            None => ForwardPlan::Flood {
                targets: unlearned_access_ports(awareness),
            },
        }
    }

    /// §4.3 "If IPv4: call `handle_ipv4`."
    #[allow(clippy::too_many_arguments)]
    pub fn handle_ipv4(
        &self,
        dpid: Dpid,
        in_port: PortNo,
        src_mac: MacAddr,
        eth_type: u16,
        src_ip: std::net::Ipv4Addr,
        dst_ip: std::net::Ipv4Addr,
        l4: Option<sieve_openflow::L4Info>,
        awareness: &mut Awareness,
        monitor: &mut Monitor,
    ) -> ForwardPlan {
        awareness.host_seen(src_ip, src_mac, (dpid, in_port));

        let Some((dst_dpid, dst_port)) = awareness.get_host_location(dst_ip) else {
            // §4.3 edge case: "Host location for destination unknown ... for IPv4, drop
            // silently (the ARP exchange will populate the host table)."
            return ForwardPlan::Drop;
        };

        let key = flow_key(eth_type, src_ip, dst_ip, l4);

        if dpid == dst_dpid {
            // §4.3 edge case: "Source switch and destination switch identical: install a single
            // entry and emit packet-out directly."
            let fm = FlowMod::forwarder(dpid, in_port, key, dst_port);
            return ForwardPlan::InstallPath {
                flow_mods: vec![fm],
                packet_out: (dpid, dst_port),
            };
        }

        let Some(path) = monitor.best_path(dpid, dst_dpid, awareness) else {
            debug!("no path {dpid} -> {dst_dpid}, flooding");
            return ForwardPlan::Flood {
                targets: unlearned_access_ports(awareness),
            };
        };

        let hops = sieve_monitor::best_path::hop_ports(&path, awareness.graph(), in_port, dst_port);
        if hops.is_empty() {
            warn!("best path {dpid} -> {dst_dpid} resolved but has no traversable hop");
            return ForwardPlan::Drop;
        }

        let mut flow_mods: Vec<FlowMod> = hops
            .iter()
            .map(|&(hop_dpid, hop_in_port, hop_out_port)| {
                FlowMod::forwarder(hop_dpid, hop_in_port, key, hop_out_port)
            })
            .collect();
        // §4.3 "Install from last hop backwards to first hop."
        flow_mods.reverse();

        let (first_dpid, _, first_out_port) = hops[0];
        ForwardPlan::InstallPath {
            flow_mods,
            packet_out: (first_dpid, first_out_port),
        }
    }
}

fn flow_key(
    eth_type: u16,
    src_ip: std::net::Ipv4Addr,
    dst_ip: std::net::Ipv4Addr,
    l4: Option<sieve_openflow::L4Info>,
) -> FlowKey {
    match l4.and_then(|info| IpProto::from_proto_number(info.proto).map(|p| (p, info))) {
        Some((ip_proto, info)) => FlowKey::L4 {
            eth_type,
            ipv4_src: src_ip,
            ipv4_dst: dst_ip,
            ip_proto,
            l4_src: info.src_port,
            l4_dst: info.dst_port,
        },
        None => FlowKey::L3 {
            eth_type,
            ipv4_src: src_ip,
            ipv4_dst: dst_ip,
        },
    }
}

/// Every `(dpid, port)` on an edge switch's host-facing ports that is not yet bound in the host
/// table (§4.3 "flood to all unlearned access ports ... any access port already bound in
/// `access_table` is excluded").
fn unlearned_access_ports(awareness: &Awareness) -> Vec<(Dpid, PortNo)> {
    let mut targets: Vec<(Dpid, PortNo)> = awareness
        .known_switches()
        .filter(|&dpid| SwitchTier::try_from(dpid) == Ok(SwitchTier::Edge))
        .flat_map(|dpid| EDGE_HOST_PORTS.into_iter().map(move |port| (dpid, port)))
        .filter(|loc| !awareness.is_learned_access_port(*loc))
        .collect();
    targets.sort();
    targets
}

/// Builds the actual `PacketOut` the event loop sends for a buffered packet-in, given the plan's
/// target `(dpid, port)` (§6 "emit the original packet").
pub fn packet_out_for(pkt: &PacketIn, dpid: Dpid, out_port: PortNo) -> Result<PacketOut, ForwarderError> {
    if pkt.buffer_id.is_none() && pkt.data.is_empty() {
        return Err(ForwarderError::NoBufferedPacket(dpid));
    }
    Ok(PacketOut {
        dpid,
        buffer_id: pkt.buffer_id,
        in_port: pkt.in_port,
        actions: vec![Action::Output(out_port)],
        data: if pkt.buffer_id.is_none() {
            Some(pkt.data.clone())
        } else {
            None
        },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use sieve_monitor::MonitorConfig;
    use sieve_openflow::PortNo;

    fn dpid(n: u64) -> Dpid {
        Dpid(n)
    }

    fn fat_tree_two_pods() -> Awareness {
        let mut aw = Awareness::new();
        for d in [
            dpid(3001),
            dpid(3002),
            dpid(2001),
            dpid(2002),
            dpid(1001),
            dpid(1002),
            dpid(2003),
            dpid(2004),
            dpid(3003),
            dpid(3004),
        ] {
            aw.switch_enter(d);
        }
        aw.link_add(dpid(3001), dpid(2001), (PortNo(1), PortNo(3)));
        aw.link_add(dpid(3001), dpid(2002), (PortNo(2), PortNo(3)));
        aw.link_add(dpid(2001), dpid(1001), (PortNo(1), PortNo(1)));
        aw.link_add(dpid(2001), dpid(1002), (PortNo(2), PortNo(1)));
        aw.link_add(dpid(2003), dpid(1001), (PortNo(1), PortNo(2)));
        aw.link_add(dpid(2003), dpid(1002), (PortNo(2), PortNo(2)));
        aw.link_add(dpid(2003), dpid(3003), (PortNo(3), PortNo(1)));
        aw.link_add(dpid(2004), dpid(3003), (PortNo(3), PortNo(2)));
        aw
    }

    /// S2: a TCP flow across pods installs one forwarder flow-mod per hop plus one packet-out.
    #[test]
    fn ipv4_cross_switch_flow_installs_hop_chain() {
        let mut aw = fat_tree_two_pods();
        aw.host_seen(
            "10.7.0.1".parse().unwrap(),
            MacAddr([7; 6]),
            (dpid(3003), PortNo(3)),
        );
        let mut monitor = Monitor::new(MonitorConfig::default());
        // Bandwidth view defaults to 0 everywhere; every path ties on bandwidth, so the selector
        // falls back to lexicographic DPID order — deterministic regardless.
        monitor.refresh_bandwidth_graph(&mut aw);

        let fwd = Forwarder::new();
        let plan = fwd.handle_ipv4(
            dpid(3001),
            PortNo(3),
            MacAddr([1; 6]),
            ETH_TYPE_IPV4,
            "10.1.0.1".parse().unwrap(),
            "10.7.0.1".parse().unwrap(),
            Some(sieve_openflow::L4Info {
                proto: 6,
                src_port: 5000,
                dst_port: 40000,
            }),
            &mut aw,
            &mut monitor,
        );

        match plan {
            ForwardPlan::InstallPath { flow_mods, .. } => {
                // S2: a 5-switch path (3001 -> agg -> core -> agg -> 3003) gets 5 flow-mods, one
                // per switch including the destination edge switch's rule to the host port.
                assert_eq!(flow_mods.len(), 5);
                assert!(flow_mods.iter().all(|fm| fm.priority == FORWARDER_PRIORITY));
                assert!(flow_mods
                    .iter()
                    .all(|fm| fm.idle_timeout == FORWARDER_IDLE_TIMEOUT));
                // Last-hop-backwards: the destination edge switch installs first.
                assert_eq!(flow_mods[0].dpid, dpid(3003));
                assert_eq!(flow_mods[4].dpid, dpid(3001));
                // The destination switch's rule egresses on the host's actual access port.
                assert_eq!(flow_mods[0].actions, vec![Action::Output(PortNo(3))]);
            }
            other => panic!("expected InstallPath, got {other:?}"),
        }
    }

    #[test]
    fn ipv4_same_switch_installs_single_entry() {
        let mut aw = Awareness::new();
        aw.switch_enter(dpid(3001));
        aw.host_seen("10.1.0.2".parse().unwrap(), MacAddr([2; 6]), (dpid(3001), PortNo(4)));
        let mut monitor = Monitor::new(MonitorConfig::default());

        let fwd = Forwarder::new();
        let plan = fwd.handle_ipv4(
            dpid(3001),
            PortNo(3),
            MacAddr([1; 6]),
            ETH_TYPE_IPV4,
            "10.1.0.1".parse().unwrap(),
            "10.1.0.2".parse().unwrap(),
            None,
            &mut aw,
            &mut monitor,
        );
        assert_eq!(
            plan,
            ForwardPlan::InstallPath {
                flow_mods: vec![FlowMod::forwarder(
                    dpid(3001),
                    PortNo(3),
                    FlowKey::L3 {
                        eth_type: ETH_TYPE_IPV4,
                        ipv4_src: "10.1.0.1".parse().unwrap(),
                        ipv4_dst: "10.1.0.2".parse().unwrap(),
                    },
                    PortNo(4),
                )],
                packet_out: (dpid(3001), PortNo(4)),
            }
        );
    }

    #[test]
    fn ipv4_unknown_destination_drops_silently() {
        let mut aw = Awareness::new();
        aw.switch_enter(dpid(3001));
        let mut monitor = Monitor::new(MonitorConfig::default());
        let fwd = Forwarder::new();
        let plan = fwd.handle_ipv4(
            dpid(3001),
            PortNo(3),
            MacAddr([1; 6]),
            ETH_TYPE_IPV4,
            "10.1.0.1".parse().unwrap(),
            "10.9.0.1".parse().unwrap(),
            None,
            &mut aw,
            &mut monitor,
        );
        assert_eq!(plan, ForwardPlan::Drop);
    }

    /// S5: ARP to an unknown destination floods every unlearned access port across every
    /// datapath.
    #[test]
    fn arp_unknown_destination_floods_unlearned_ports_only() {
        let mut aw = Awareness::new();
        aw.switch_enter(dpid(3001));
        aw.switch_enter(dpid(3002));
        // 3001 port 3 is already learned; every other edge host port is not.
        aw.host_seen("10.1.0.5".parse().unwrap(), MacAddr([5; 6]), (dpid(3001), PortNo(3)));

        let fwd = Forwarder::new();
        let plan = fwd.handle_arp(
            dpid(3001),
            PortNo(4),
            MacAddr([9; 6]),
            "10.1.0.9".parse().unwrap(),
            "10.9.0.1".parse().unwrap(),
            &mut aw,
        );
        match plan {
            ForwardPlan::Flood { targets } => {
                assert!(!targets.contains(&(dpid(3001), PortNo(3))));
                assert!(targets.contains(&(dpid(3001), PortNo(4))));
                assert!(targets.contains(&(dpid(3002), PortNo(3))));
                assert!(targets.contains(&(dpid(3002), PortNo(4))));
            }
            other => panic!("expected Flood, got {other:?}"),
        }
    }

    #[test]
    fn arp_known_destination_emits_packet_out() {
        let mut aw = Awareness::new();
        aw.switch_enter(dpid(3001));
        aw.host_seen("10.9.0.1".parse().unwrap(), MacAddr([9; 6]), (dpid(3001), PortNo(4)));

        let fwd = Forwarder::new();
        let plan = fwd.handle_arp(
            dpid(3001),
            PortNo(3),
            MacAddr([1; 6]),
            "10.1.0.1".parse().unwrap(),
            "10.9.0.1".parse().unwrap(),
            &mut aw,
        );
        assert_eq!(
            plan,
            ForwardPlan::PacketOut {
                dpid: dpid(3001),
                port: PortNo(4)
            }
        );
    }
}
