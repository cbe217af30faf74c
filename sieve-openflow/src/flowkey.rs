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

//! The flow fingerprint used to match and install flow entries.
//!
//! The original controller passed around a dynamically-sized tuple (4 fields for ARP/plain
//! IPv4, 9 fields for TCP/UDP) and dispatched on its length. Here it is a tagged variant that
//! every handler matches exhaustively.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::ids::PortNo;

/// IP protocol number, restricted to the two protocols Sieve reschedules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpProto {
    Tcp,
    Udp,
}

impl IpProto {
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;

    pub fn from_proto_number(n: u8) -> Option<Self> {
        match n {
            Self::TCP => Some(IpProto::Tcp),
            Self::UDP => Some(IpProto::Udp),
            _ => None,
        }
    }

    pub fn proto_number(self) -> u8 {
        match self {
            IpProto::Tcp => Self::TCP,
            IpProto::Udp => Self::UDP,
        }
    }
}

/// A flow fingerprint: either the full L4 5-tuple, or the bare L3 3-tuple used for ARP and
/// otherwise-unclassified IPv4 traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKey {
    /// `(eth_type, ipv4_src, ipv4_dst, ip_proto, l4_src, l4_dst)`
    L4 {
        eth_type: u16,
        ipv4_src: Ipv4Addr,
        ipv4_dst: Ipv4Addr,
        ip_proto: IpProto,
        l4_src: u16,
        l4_dst: u16,
    },
    /// `(eth_type, ipv4_src, ipv4_dst)`
    L3 {
        eth_type: u16,
        ipv4_src: Ipv4Addr,
        ipv4_dst: Ipv4Addr,
    },
}

impl FlowKey {
    pub fn eth_type(&self) -> u16 {
        match self {
            FlowKey::L4 { eth_type, .. } | FlowKey::L3 { eth_type, .. } => *eth_type,
        }
    }

    pub fn ipv4_src(&self) -> Ipv4Addr {
        match self {
            FlowKey::L4 { ipv4_src, .. } | FlowKey::L3 { ipv4_src, .. } => *ipv4_src,
        }
    }

    pub fn ipv4_dst(&self) -> Ipv4Addr {
        match self {
            FlowKey::L4 { ipv4_dst, .. } | FlowKey::L3 { ipv4_dst, .. } => *ipv4_dst,
        }
    }

    /// `true` if this fingerprint carries TCP L4 information — the only protocol Monitor
    /// currently considers for rescheduling (§4.2.4: UDP is excluded, preserved as-observed).
    pub fn is_tcp(&self) -> bool {
        matches!(
            self,
            FlowKey::L4 {
                ip_proto: IpProto::Tcp,
                ..
            }
        )
    }
}

/// A flow entry's ingress port, carried alongside the fingerprint for match construction but
/// kept out of [`FlowKey`] since it changes per hop while the fingerprint does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressPort(pub PortNo);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn l4_is_tcp_only_for_tcp() {
        let tcp = FlowKey::L4 {
            eth_type: 0x0800,
            ipv4_src: "10.1.0.1".parse().unwrap(),
            ipv4_dst: "10.7.0.1".parse().unwrap(),
            ip_proto: IpProto::Tcp,
            l4_src: 5000,
            l4_dst: 40000,
        };
        assert!(tcp.is_tcp());

        let udp = FlowKey::L4 {
            eth_type: 0x0800,
            ipv4_src: "10.1.0.1".parse().unwrap(),
            ipv4_dst: "10.7.0.1".parse().unwrap(),
            ip_proto: IpProto::Udp,
            l4_src: 5000,
            l4_dst: 40000,
        };
        assert!(!udp.is_tcp());

        let l3 = FlowKey::L3 {
            eth_type: 0x0806,
            ipv4_src: "10.1.0.1".parse().unwrap(),
            ipv4_dst: "10.9.0.1".parse().unwrap(),
        };
        assert!(!l3.is_tcp());
    }
}
