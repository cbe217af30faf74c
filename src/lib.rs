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

//! Sieve: an OpenFlow 1.3 control plane that proactively load-balances mice flows via
//! equal-cost hashing and reactively reschedules elephant flows on a k=4 fat-tree fabric (§1-§2).
//!
//! This crate wires together three library crates in dependency order (§2 "leaves first"):
//! [`sieve_awareness`] (topology and k-shortest paths), [`sieve_monitor`] (stats polling,
//! congestion detection, reactive rerouting) and [`sieve_forwarder`] (packet-in driven path
//! installation), plus [`sieve_openflow`]'s wire-message model used by all three.

pub mod channel;
pub mod controller;
pub mod event_loop;
pub mod settings;

pub use controller::Controller;
pub use settings::Settings;

use thiserror::Error;

/// Aggregates every fallible operation the binary's `main` can hit at startup. Per-component
/// errors (`AwarenessError`, `MonitorError`, `ForwarderError`) stay local to their crates and are
/// handled by logging-and-degrading at the call site per the §7 policy table — they never need to
/// escalate into this type. `SieveError` exists purely for the handful of things that *do* need to
/// abort the process: a bad config file, a channel that cannot be constructed.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("settings error: {0}")]
    Settings(#[from] settings::SettingsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
