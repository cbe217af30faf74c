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

//! Wire-level model for the subset of OpenFlow 1.3 that Sieve speaks, plus the L2/L3/L4
//! header parsing needed to turn a packet-in payload into a [`flowkey::FlowKey`].
//!
//! This crate has no notion of switches, links or paths — it only knows about bytes on the
//! wire and the messages the controller library hands upward. `sieve-awareness`,
//! `sieve-monitor` and `sieve-forwarder` build the topology-aware logic on top of these types.

pub mod flowkey;
pub mod ids;
pub mod message;
pub mod packet;

pub use flowkey::{FlowKey, IpProto};
pub use ids::{Dpid, Host, HostLocation, MacAddr, PortNo, SwitchTier, EDGE_HOST_PORTS};
pub use message::*;
pub use packet::{parse_ethernet_frame, L4Info, ParsedPacket};
