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

//! Compiled-in fabric constants plus the loadable Monitor settings (§6: "Configuration
//! constants... are compiled-in or loaded from a simple static settings module").
//!
//! The DPID ranges and reserved priorities below describe the bootstrapper's contract (§6) and
//! never change at runtime; [`sieve_monitor::MonitorConfig`] is the one piece a deployment is
//! expected to override per-fabric, so it alone is TOML-loadable.

use std::ops::RangeInclusive;
use std::path::Path;

pub use sieve_monitor::{MonitorConfig, SettingsError};
use sieve_openflow::Dpid;

/// Edge-tier DPID range (§6 bootstrapper contract: `3001..3008`).
pub const EDGE_DPID_RANGE: RangeInclusive<u64> = 3001..=3008;
/// Aggregate-tier DPID range (§6: `2001..2008`).
pub const AGGREGATE_DPID_RANGE: RangeInclusive<u64> = 2001..=2008;
/// Core-tier DPID range (§6: `1001..1004`).
pub const CORE_DPID_RANGE: RangeInclusive<u64> = 1001..=1004;

/// Number of edge uplink ports fabric-wide, used by the adaptive-period mean-load computation
/// (§4.2.3: "the mean load L across the 16 edge uplink ports").
pub const EDGE_UPLINK_PORT_COUNT: usize = 16;

/// Every `(dpid, port)` the adaptive-period computation averages over: both uplinks on every
/// edge switch in [`EDGE_DPID_RANGE`].
pub fn all_edge_uplinks() -> Vec<(Dpid, sieve_openflow::PortNo)> {
    EDGE_DPID_RANGE
        .flat_map(|dpid| {
            sieve_monitor::EDGE_UPLINK_PORTS
                .into_iter()
                .map(move |port| (Dpid(dpid), port))
        })
        .collect()
}

/// Top-level settings for one controller process: the Monitor tunables plus the listen address
/// the host OpenFlow library binds its session on. The CLI surface is otherwise empty per §6
/// ("None beyond the host OpenFlow library's standard invocation").
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            monitor: MonitorConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file, falling back to compiled-in defaults for any field the
    /// file omits. Returns `Err` rather than panicking — unlike `cisco_lab::config::CONFIG`'s
    /// one-shot-experiment `expect!`-and-panic style, Sieve is meant to run unattended (§7: "no
    /// error kind is fatal").
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edge_uplinks_cover_all_sixteen_ports() {
        assert_eq!(all_edge_uplinks().len(), EDGE_UPLINK_PORT_COUNT);
    }

    #[test]
    fn default_settings_match_reference_monitor_config() {
        let settings = Settings::default();
        assert_eq!(settings.monitor, MonitorConfig::default());
    }
}
