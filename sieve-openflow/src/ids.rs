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

//! Datapath, port and MAC identifiers.
//!
//! A [`Dpid`] is classed by numeric prefix (§3 of the control-plane design): core switches are
//! in `1xxx`, aggregate in `2xxx`, edge in `3xxx`.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 64-bit OpenFlow datapath identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dpid(pub u64);

impl fmt::Display for Dpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for Dpid {
    fn from(x: u64) -> Self {
        Self(x)
    }
}

/// Which tier of the fat-tree a switch belongs to, derived from its DPID prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchTier {
    Core,
    Aggregate,
    Edge,
}

/// The DPID does not fall into any known tier range.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("dpid {0} does not belong to any known switch tier")]
pub struct UnknownTier(pub Dpid);

impl TryFrom<Dpid> for SwitchTier {
    type Error = UnknownTier;

    fn try_from(dpid: Dpid) -> Result<Self, Self::Error> {
        match dpid.0 {
            1000..=1999 => Ok(SwitchTier::Core),
            2000..=2999 => Ok(SwitchTier::Aggregate),
            3000..=3999 => Ok(SwitchTier::Edge),
            _ => Err(UnknownTier(dpid)),
        }
    }
}

/// Physical or logical port number on a datapath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortNo(pub u16);

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for PortNo {
    fn from(x: u16) -> Self {
        Self(x)
    }
}

/// 48-bit Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// A host's attachment point: the access switch and port it was last seen on.
pub type HostLocation = (Dpid, PortNo);

/// Edge-switch ports that face hosts rather than the aggregate tier (§6 bootstrapper contract:
/// "ports {3,4} are host-facing"). Used by the Forwarder's ARP-flood fallback to enumerate every
/// access port in the fabric without needing topology discovery to have touched them yet.
pub const EDGE_HOST_PORTS: [PortNo; 2] = [PortNo(3), PortNo(4)];

/// A host, identified by its IPv4 address, known to be attached at [`HostLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub location: HostLocation,
}
