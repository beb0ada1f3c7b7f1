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

use serde::Serialize;

use crate::*;

/// Scanner state
///
/// `end` is when the state times out if no event arrives earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum State {
    #[default]
    Reset,
    Idle {
        end: TimeMs,
    },
    Scanning {
        end: TimeMs,
    },
    /// Waiting for the station to associate with `target` and get an IP address
    Associating {
        target: HardwareAddress,
        end: TimeMs,
    },
    /// Waiting for the transport handshake
    Connecting {
        handle: LinkHandle,
        end: TimeMs,
        /// Rescan time once the link is established
        rescan: TimeMs,
    },
    Backoff {
        end: TimeMs,
    },
    /// Linked to the manual target, nothing left to do
    Disabled,
}

impl State {
    /// Returns a state's action
    pub(crate) fn get_action(&self) -> Action {
        match self {
            State::Reset => Action::None,
            State::Idle { end }
            | State::Scanning { end }
            | State::Associating { end, .. }
            | State::Connecting { end, .. }
            | State::Backoff { end } => Action::Wait { end: *end },
            State::Disabled => Action::Sleep,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        match self {
            State::Reset | State::Idle { .. } => Phase::Idle,
            State::Scanning { .. } => Phase::Scanning,
            State::Associating { .. } | State::Connecting { .. } => Phase::Connecting,
            State::Backoff { .. } => Phase::Backoff,
            State::Disabled => Phase::Disabled,
        }
    }

    fn state_as_string(&self) -> &str {
        match self {
            State::Reset => "Reset",
            State::Idle { .. } => "Idle",
            State::Scanning { .. } => "Scanning",
            State::Associating { .. } => "Associating",
            State::Connecting { .. } => "Connecting",
            State::Backoff { .. } => "Backoff",
            State::Disabled => "Disabled",
        }
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}", self.state_as_string())
    }
}

/// Coarse scanner state for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Scanning,
    Connecting,
    Backoff,
    Disabled,
}
