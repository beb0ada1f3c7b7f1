//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

//! Station link management of a self-organizing wifi mesh node
//!
//! Every node runs an access point and, as a station, keeps at most one link to a neighboring
//! node. The [`StationScanner`] periodically scans for neighbors, drops the ones already
//! reachable over the mesh, ranks the rest by signal strength and either links to the best one
//! or, when already linked and the topology looks settled, occasionally drops its link to give
//! the mesh a chance to reorganize.

#![cfg_attr(not(test), no_std)]

use core::ops::Range;

use rand_core::RngCore;

use station_api::*;

mod candidates;
pub use crate::candidates::CandidateList;
mod context;
use crate::context::*;
mod establisher;
pub use crate::establisher::{LinkAttempt, LinkError, LinkEstablisher, LinkPhase, RemoteEndpoint};
mod event_log;
mod node_id;
pub use crate::node_id::derive_node_id;
mod settings;
pub use crate::settings::{ManualTarget, StationSettings};
mod stability;
pub use crate::stability::Stability;
mod states;
use crate::states::*;
pub use crate::states::Phase;
mod state_machine;
mod station;
pub use crate::station::{Diagnostics, StationScanner};

#[cfg(test)]
mod testing;

#[allow(unused_imports)]
use log::{debug, error, info, warn};

const MS_PER_S: TimeMs = 1000;

/// Base interval between two scans
pub const SCAN_INTERVAL_MS: TimeMs = 10 * MS_PER_S;
/// Transport port the mesh layer listens on
pub const DEFAULT_MESH_PORT: u16 = 5555;
/// Scan records kept per scan, further records are dropped
pub const MAX_SCAN_RECORDS: usize = 32;

/// Rescan delay in scan intervals when linked and nothing new was found
const SLOW_SCAN_FACTORS: Range<TimeMs> = 25..36;
/// Rescan delay in scan intervals when linked, unknown nodes were seen, and the link is kept
const RECHECK_SCAN_FACTORS: Range<TimeMs> = 4..7;
/// Fallback rescan delay in scan intervals after starting to link
const LINK_FALLBACK_FACTOR: TimeMs = 4;
/// Reconfiguration probabilities are given in parts per thousand
const PROBABILITY_SCALE: u32 = 1000;

/// Random whole multiple out of `factors` (end exclusive)
fn random_factor(factors: Range<TimeMs>, mut rng: impl RngCore) -> TimeMs {
    factors.start + rng.next_u32() as TimeMs % (factors.end - factors.start)
}
