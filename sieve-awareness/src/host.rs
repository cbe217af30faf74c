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

//! Host location and access-port bookkeeping (§4.1 "On host-seen").

use std::collections::HashMap;
use std::net::Ipv4Addr;

use sieve_openflow::{HostLocation, MacAddr};

/// Tracks where each host was last seen, plus the reverse mapping from access port to host,
/// used by the Forwarder's "flood to unlearned access ports" ARP fallback (§4.3).
#[derive(Debug, Clone, Default)]
pub struct HostTable {
    host_location: HashMap<Ipv4Addr, HostLocation>,
    access_table: HashMap<HostLocation, (Ipv4Addr, MacAddr)>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `ip`/`mac` was observed at `location`. Overwrites any prior location for the
    /// same host — hosts do not migrate within a single fabric session, but the table does not
    /// assume it.
    pub fn record(&mut self, ip: Ipv4Addr, mac: MacAddr, location: HostLocation) {
        if let Some(prev) = self.host_location.insert(ip, location) {
            if prev != location {
                self.access_table.remove(&prev);
            }
        }
        self.access_table.insert(location, (ip, mac));
    }

    pub fn location_of(&self, ip: Ipv4Addr) -> Option<HostLocation> {
        self.host_location.get(&ip).copied()
    }

    pub fn is_learned(&self, location: HostLocation) -> bool {
        self.access_table.contains_key(&location)
    }

    pub fn learned_locations(&self) -> impl Iterator<Item = HostLocation> + '_ {
        self.access_table.keys().copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sieve_openflow::{Dpid, PortNo};

    #[test]
    fn records_and_looks_up_location() {
        let mut t = HostTable::new();
        let loc = (Dpid(3001), PortNo(3));
        t.record(Ipv4Addr::new(10, 1, 0, 1), MacAddr([1, 2, 3, 4, 5, 6]), loc);
        assert_eq!(t.location_of(Ipv4Addr::new(10, 1, 0, 1)), Some(loc));
        assert!(t.is_learned(loc));
        assert!(!t.is_learned((Dpid(3001), PortNo(4))));
    }

    #[test]
    fn unknown_host_has_no_location() {
        let t = HostTable::new();
        assert_eq!(t.location_of(Ipv4Addr::new(10, 9, 9, 9)), None);
    }
}
