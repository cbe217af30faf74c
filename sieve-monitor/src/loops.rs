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

//! The two cooperative periodic tasks Monitor drives (§4.2, §5): the stats-request loop and the
//! bandwidth-graph-refresh loop, each wrapping `loop { ...; sleep(period).await }` the way
//! `cisco_lab`'s router and server reconciliation loops do (see e.g.
//! `cisco-lab::server::exabgp`'s retry loop and `cisco-lab::router`'s periodic health poll).
//!
//! Both loops need a way to actually talk to datapaths; since the OpenFlow wire channel itself is
//! owned by the host library (out of scope, §6), this module is generic over a small
//! [`DatapathChannel`] trait the root `sieve` crate implements against the real channel (and that
//! tests implement against an in-memory fake).

use std::sync::Arc;
use std::time::Duration;

use sieve_awareness::Awareness;
use sieve_openflow::{Dpid, PortNo};
use tokio::sync::RwLock;

use crate::Monitor;

/// The subset of the OpenFlow channel Monitor's periodic loops need to drive stats collection.
/// `sieve`'s root crate implements this against the real host OpenFlow library; tests implement
/// it against an in-memory recorder.
#[async_trait::async_trait]
pub trait DatapathChannel: Send + Sync {
    async fn known_datapaths(&self) -> Vec<Dpid>;
    async fn request_port_stats(&self, dpid: Dpid);
    async fn request_flow_stats(&self, dpid: Dpid);
}

/// Runs the stats-request loop (§4.2.1) until cancelled. Each tick: reset memos, request
/// port-desc/port stats for every known datapath (flow-stats requests are issued reactively by
/// the port-stats reply handler, §4.2.3, not from this loop), then recompute the adaptive polling
/// period from the mean load across `edge_uplinks` (§4.2.3 "After every full pass across edge
/// uplinks, compute the mean load").
pub async fn stats_loop<C: DatapathChannel>(
    monitor: Arc<RwLock<Monitor>>,
    channel: Arc<C>,
    edge_uplinks: Arc<Vec<(Dpid, PortNo)>>,
) -> ! {
    loop {
        {
            let mut m = monitor.write().await;
            m.begin_stats_tick();
        }
        for dpid in channel.known_datapaths().await {
            channel.request_port_stats(dpid).await;
        }
        let period = {
            let mut m = monitor.write().await;
            m.refresh_period(&edge_uplinks);
            m.period_secs()
        };
        tokio::time::sleep(Duration::from_secs_f64(period)).await;
    }
}

/// Runs the bandwidth-graph-refresh loop (§4.2.2) until cancelled, sharing the same adaptive
/// period as the stats-request loop.
pub async fn bandwidth_refresh_loop(monitor: Arc<RwLock<Monitor>>, awareness: Arc<RwLock<Awareness>>) -> ! {
    loop {
        let period = {
            let m = monitor.read().await;
            let mut aw = awareness.write().await;
            m.refresh_bandwidth_graph(&mut aw);
            m.period_secs()
        };
        tokio::time::sleep(Duration::from_secs_f64(period)).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MonitorConfig;
    use std::sync::Mutex;

    struct FakeChannel {
        dpids: Vec<Dpid>,
        port_stats_requests: Mutex<Vec<Dpid>>,
    }

    #[async_trait::async_trait]
    impl DatapathChannel for FakeChannel {
        async fn known_datapaths(&self) -> Vec<Dpid> {
            self.dpids.clone()
        }
        async fn request_port_stats(&self, dpid: Dpid) {
            self.port_stats_requests.lock().unwrap().push(dpid);
        }
        async fn request_flow_stats(&self, _dpid: Dpid) {}
    }

    #[tokio::test(start_paused = true)]
    async fn stats_loop_requests_every_known_datapath_each_tick() {
        let monitor = Arc::new(RwLock::new(Monitor::new(MonitorConfig::default())));
        let channel = Arc::new(FakeChannel {
            dpids: vec![Dpid(3001), Dpid(3002)],
            port_stats_requests: Mutex::new(Vec::new()),
        });
        let edge_uplinks = Arc::new(Vec::new());

        let m = monitor.clone();
        let c = channel.clone();
        let eu = edge_uplinks.clone();
        let handle = tokio::spawn(async move {
            stats_loop(m, c, eu).await;
        });

        tokio::time::advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        let requested = channel.port_stats_requests.lock().unwrap().clone();
        assert_eq!(requested, vec![Dpid(3001), Dpid(3002)]);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stats_loop_refreshes_adaptive_period_from_edge_uplink_load() {
        use sieve_openflow::PortStatsEntry;

        let monitor = Arc::new(RwLock::new(Monitor::new(MonitorConfig::default())));
        let edge_uplinks: Vec<(Dpid, PortNo)> = (3001..=3008)
            .flat_map(|d| [PortNo(1), PortNo(2)].into_iter().map(move |p| (Dpid(d), p)))
            .collect();

        // Two samples per uplink with identical tx/rx counters: zero speed, zero load.
        {
            let mut m = monitor.write().await;
            for &(dpid, port) in &edge_uplinks {
                for duration_sec in [0, 1] {
                    m.on_port_stats_reply(
                        dpid,
                        PortStatsEntry {
                            port_no: port,
                            tx_bytes: 0,
                            rx_bytes: 0,
                            rx_errors: 0,
                            duration_sec,
                            duration_nsec: 0,
                        },
                    );
                }
            }
        }
        assert_eq!(monitor.read().await.period_secs(), MonitorConfig::default().default_period_secs);

        let channel = Arc::new(FakeChannel {
            dpids: Vec::new(),
            port_stats_requests: Mutex::new(Vec::new()),
        });
        let edge_uplinks = Arc::new(edge_uplinks);

        let m = monitor.clone();
        let c = channel.clone();
        let eu = edge_uplinks.clone();
        let handle = tokio::spawn(async move {
            stats_loop(m, c, eu).await;
        });

        tokio::time::advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        // Idle edge uplinks (load ratio 0) push the period towards the configured maximum.
        assert_eq!(monitor.read().await.period_secs(), MonitorConfig::default().max_period_secs);

        handle.abort();
    }
}
