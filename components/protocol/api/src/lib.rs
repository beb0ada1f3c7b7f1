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

//! Types and capabilities shared between the station link state machine and the system hosting
//! it (radio driver, transport stack, mesh layer and scheduler).

#![cfg_attr(not(test), no_std)]

use core::fmt;

mod address;
mod transport;
mod wifi;

pub use crate::{address::*, transport::*, wifi::*};

/// Time as milliseconds since start
pub type TimeMs = u64;
/// Mesh node identifier
pub type NodeId = u32;
/// Wifi channel number
pub type Channel = u8;

/// What the scheduler has to do after a dispatch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Dispatch again right away
    None,
    /// Dispatch again at `end` unless an event arrives earlier
    Wait { end: TimeMs },
    /// Dispatch again only when an event arrives
    Sleep,
}

/// Notification delivered to the state machine by the driver, the transport or the mesh layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Scan finished, records can be fetched with [`WifiDriver::scan_records`]
    ScanComplete,
    /// Station is associated and got an IP address
    GotIp,
    /// Station lost (or never got) its association
    StationDisconnected,
    /// Transport handshake of the given link succeeded
    LinkEstablished(LinkHandle),
    /// Transport reported an error on the given link
    LinkFailed(LinkHandle),
    /// Given link was closed by the peer or the transport
    LinkClosed(LinkHandle),
}

/// event as JSON to make it parseable
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ScanComplete => write!(f, "{{\"kind\":\"scan_complete\"}}"),
            Event::GotIp => write!(f, "{{\"kind\":\"got_ip\"}}"),
            Event::StationDisconnected => write!(f, "{{\"kind\":\"station_disconnected\"}}"),
            Event::LinkEstablished(link) => {
                write!(f, "{{\"kind\":\"link_established\",\"link\":{}}}", link.0)
            }
            Event::LinkFailed(link) => write!(f, "{{\"kind\":\"link_failed\",\"link\":{}}}", link.0),
            Event::LinkClosed(link) => write!(f, "{{\"kind\":\"link_closed\",\"link\":{}}}", link.0),
        }
    }
}

/// Authoritative view of the links the mesh layer maintains
///
/// Implementations answer from their current state; callers treat every answer as a snapshot.
pub trait ConnectionRegistry {
    /// Whether the node with the given ID is reachable over the established links
    fn lookup_connection(&self, id: NodeId) -> bool;

    /// Approximate number of nodes in the mesh, including this node. Never zero.
    fn approximate_mesh_size(&self) -> u32;
}

/// Violation of a fixed size field
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{field} is {len} bytes long, at most {max} bytes fit")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
    #[error("{field} must be {expected} bytes long, got {len}")]
    Length {
        field: &'static str,
        expected: usize,
        len: usize,
    },
}
