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

//! The adaptive stats-polling period shared by Monitor's two periodic loops (§4.2, §4.2.3
//! "Adaptive period").

use crate::config::MonitorConfig;

/// Computes the next adaptive period from the mean load across the monitored edge uplinks.
///
/// Below [`MonitorConfig::idle_load_threshold`] the period grows exponentially towards
/// [`MonitorConfig::max_period_secs`] as load approaches zero (1s at the threshold, up to 10s at
/// `L=0`); at or above the threshold it falls back to the default (2s), clamped to
/// `[min_period_secs, max_period_secs]` (§8 invariant 4: "Adaptive period T is always in
/// [1, 10] seconds").
pub fn next_period(mean_load: f64, config: &MonitorConfig) -> f64 {
    let period = if mean_load < config.idle_load_threshold {
        let exponent = (config.idle_load_threshold - mean_load) / config.idle_load_threshold;
        10f64.powf(exponent)
    } else {
        config.default_period_secs
    };
    period.clamp(config.min_period_secs, config.max_period_secs)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn idle_load_yields_max_period() {
        // S6: all 16 edge uplinks at load 0 => T = 10^((0.25-0)/0.25) = 10.
        let cfg = MonitorConfig::default();
        assert_eq!(next_period(0.0, &cfg), 10.0);
    }

    #[test]
    fn load_at_threshold_yields_one_second() {
        let cfg = MonitorConfig::default();
        assert_eq!(next_period(0.25, &cfg), 1.0);
    }

    #[test]
    fn load_above_threshold_yields_default_period() {
        let cfg = MonitorConfig::default();
        assert_eq!(next_period(0.6, &cfg), 2.0);
    }

    #[test]
    fn result_is_always_in_bounds() {
        let cfg = MonitorConfig::default();
        for i in 0..=100 {
            let load = i as f64 / 100.0;
            let t = next_period(load, &cfg);
            assert!((cfg.min_period_secs..=cfg.max_period_secs).contains(&t));
        }
    }
}
