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

//! Monitor configuration: adaptive period bounds, congestion thresholds and per-tier port
//! capacities, loadable from a TOML file or used with built-in defaults (§4.2, §6 "Configuration
//! constants... loaded from a simple static settings module").

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Tunables for the two periodic monitor loops and the rerouting gate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Default adaptive period, seconds (§4.2: default 2 s).
    pub default_period_secs: f64,
    /// Adaptive period lower bound, seconds.
    pub min_period_secs: f64,
    /// Adaptive period upper bound, seconds.
    pub max_period_secs: f64,
    /// Free-bandwidth threshold below which an edge uplink is "hot", Kb/s (§4.2.3: 15000).
    pub congestion_threshold_kbps: f64,
    /// Load ratio above which a reroute is attempted (§4.2.4 gate, fixed at 0.45 per §9).
    pub reroute_load_gate: f64,
    /// Minimum bottleneck-over-hot-port margin an alternate path must clear, Kb/s (§4.2.5: 500).
    pub reroute_margin_kbps: f64,
    /// Load ratio below which the adaptive-period formula kicks in (§4.2: 0.25).
    pub idle_load_threshold: f64,
    /// Per-tier uplink capacity, Kb/s. Edge and aggregate share 20000 Kb/s per the resolved open
    /// question in §9; core tier capacity is left at the same default absent a differing fabric
    /// profile.
    pub edge_capacity_kbps: f64,
    pub aggregate_capacity_kbps: f64,
    pub core_capacity_kbps: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            default_period_secs: 2.0,
            min_period_secs: 1.0,
            max_period_secs: 10.0,
            congestion_threshold_kbps: 15_000.0,
            reroute_load_gate: 0.45,
            reroute_margin_kbps: 500.0,
            idle_load_threshold: 0.25,
            edge_capacity_kbps: 20_000.0,
            aggregate_capacity_kbps: 20_000.0,
            core_capacity_kbps: 20_000.0,
        }
    }
}

impl MonitorConfig {
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

    pub fn capacity_kbps(&self, tier: sieve_openflow::SwitchTier) -> f64 {
        use sieve_openflow::SwitchTier::*;
        match tier {
            Edge => self.edge_capacity_kbps,
            Aggregate => self.aggregate_capacity_kbps,
            Core => self.core_capacity_kbps,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.default_period_secs, 2.0);
        assert_eq!(cfg.congestion_threshold_kbps, 15_000.0);
        assert_eq!(cfg.reroute_load_gate, 0.45);
        assert_eq!(cfg.reroute_margin_kbps, 500.0);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults_for_missing_fields() {
        let cfg: MonitorConfig = toml::from_str("default_period_secs = 3.5\n").unwrap();
        assert_eq!(cfg.default_period_secs, 3.5);
        assert_eq!(cfg.congestion_threshold_kbps, 15_000.0);
    }
}
