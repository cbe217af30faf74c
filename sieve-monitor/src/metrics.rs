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

//! Per-port statistics ring buffer and derived load metrics (§3 "Port-stats sample", §4.2.3).

use std::collections::{HashMap, VecDeque};

use sieve_openflow::{Dpid, PortNo, SwitchTier};

use crate::config::MonitorConfig;

/// Maximum number of retained samples per port (§5 "Ring buffers are capped at 5 samples").
pub const RING_CAPACITY: usize = 5;

/// One `PortStatsReply` entry's counters, timestamped by the switch's own duration counters
/// (§3 "Port-stats sample").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSample {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl PortSample {
    fn duration_f64(&self) -> f64 {
        self.duration_sec as f64 + self.duration_nsec as f64 / 1_000_000_000.0
    }
}

/// Derived load figures for one port, valid as of the most recent sample (§3 "Derived port
/// metrics").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortLoad {
    pub speed_bps: f64,
    pub free_bw_kbps: f64,
    pub load_ratio: f64,
}

/// Bounded history of samples per `(dpid, port_no)`, plus the per-tier capacity table needed to
/// derive load metrics.
#[derive(Debug, Clone, Default)]
pub struct PortStats {
    rings: HashMap<(Dpid, PortNo), VecDeque<PortSample>>,
}

impl PortStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every ring (§4.2.1 "Reset in-memory buffers" happens at the stats-request tick
    /// boundary, but the buffers themselves — unlike the spec's Python `stats` dict — persist
    /// ring history across ticks; only the per-tick scratch state is reset by the caller).
    pub fn clear(&mut self) {
        self.rings.clear();
    }

    /// Appends a sample to the ring for `(dpid, port_no)`, evicting the oldest if at capacity.
    pub fn record(&mut self, dpid: Dpid, port_no: PortNo, sample: PortSample) {
        let ring = self.rings.entry((dpid, port_no)).or_default();
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(sample);
    }

    /// Computes the derived load for a port from its two most recent samples (§4.2.3 steps 1-2).
    /// Returns `None` if fewer than two samples have been recorded yet.
    pub fn load(&self, dpid: Dpid, port_no: PortNo, tier: SwitchTier, config: &MonitorConfig) -> Option<PortLoad> {
        let ring = self.rings.get(&(dpid, port_no))?;
        let prev = ring.get(ring.len().checked_sub(2)?)?;
        let now = ring.back()?;

        let dt = now.duration_f64() - prev.duration_f64();
        // §7: divide-by-zero on zero-period speed calculation is treated as speed 0.
        let speed_bps = if dt > 0.0 {
            (now.tx_bytes.saturating_sub(prev.tx_bytes)) as f64 / dt
        } else {
            0.0
        };

        let capacity_kbps = config.capacity_kbps(tier);
        let free_bw_kbps = (capacity_kbps - speed_bps * 8.0 / 1000.0).max(0.0);
        let load_ratio = if capacity_kbps > 0.0 {
            1.0 - free_bw_kbps / capacity_kbps
        } else {
            0.0
        };

        Some(PortLoad {
            speed_bps,
            free_bw_kbps,
            load_ratio,
        })
    }
}
