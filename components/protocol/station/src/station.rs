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

/// Keeps the station interface of one node linked to a neighbor
///
/// The host calls [`progress`](Self::progress) whenever an event arrives or the deadline of the
/// returned [`Action`] passed. Nothing else runs concurrently with a dispatch step.
#[derive(Debug)]
pub struct StationScanner<D: WifiDriver, T: Transport, R: ConnectionRegistry> {
    pub(crate) id: NodeId,
    pub(crate) state: State,
    pub(crate) context: Context,
    pub(crate) settings: StationSettings,
    pub(crate) manual_target: Option<ManualTarget>,
    /// Links dropped to let the mesh reorganize
    pub(crate) reconfigurations: u32,
    pub(crate) driver: D,
    pub(crate) registry: R,
    pub(crate) establisher: LinkEstablisher<T>,
}

/// Snapshot of a scanner for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub node_id: NodeId,
    pub phase: Phase,
    pub stability: u16,
    pub candidates: usize,
    pub manual: Option<HardwareAddress>,
    pub linked: bool,
    pub reconfigurations: u32,
}

impl<D, T, R> StationScanner<D, T, R>
where
    D: WifiDriver,
    T: Transport,
    T::Hooks: Clone,
    R: ConnectionRegistry,
{
    /// `address` is the node's own hardware address, `hooks` are registered with every link
    pub fn new(
        address: HardwareAddress,
        settings: StationSettings,
        driver: D,
        registry: R,
        transport: T,
        hooks: T::Hooks,
    ) -> Self {
        Self {
            id: derive_node_id(&address),
            state: State::default(),
            context: Context::default(),
            settings,
            manual_target: None,
            reconfigurations: 0,
            driver,
            registry,
            establisher: LinkEstablisher::new(transport, hooks),
        }
    }

    /// Run one dispatch step
    ///
    /// `event` is `None` when called because the deadline of the previous action passed.
    pub fn progress(&mut self, time: TimeMs, event: Option<Event>, rng: impl RngCore) -> Action {
        if let Some(event) = &event {
            event_log_event!(time, self.id, event);
        }

        let next_state = self.next(time, event, rng);
        if next_state != self.state {
            event_log_state!(time, self.id, &next_state);
        }
        self.state = next_state;

        let action = self.state.get_action();
        event_log_action!(time, self.id, DisplayableAction(&action, time));
        action
    }

    /// Start a scan cycle right away
    ///
    /// Ignored while a scan or a link attempt is in flight.
    pub fn scan_now(&mut self, time: TimeMs) -> Action {
        if matches!(
            self.state.phase(),
            Phase::Idle | Phase::Backoff | Phase::Disabled
        ) && self.state != State::Reset
        {
            let next_state = self.scan(time);
            event_log_state!(time, self.id, &next_state);
            self.state = next_state;
        }
        self.state.get_action()
    }

    /// Pin the scanner to a fixed neighbor
    ///
    /// Restarts the scanner, the returned action asks for an immediate dispatch.
    pub fn configure_manual_target(&mut self, target: ManualTarget) -> Action {
        info!("{}: manual target {}", self.id, target.address);
        self.manual_target = Some(target);
        self.state = State::Reset;
        self.state.get_action()
    }

    /// Return to ranked neighbor selection
    pub fn clear_manual_target(&mut self) -> Action {
        if self.manual_target.take().is_some() {
            self.state = State::Reset;
        }
        self.state.get_action()
    }

    pub fn manual_target(&self) -> Option<&ManualTarget> {
        self.manual_target.as_ref()
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn stability(&self) -> Stability {
        self.context.stability
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn settings(&self) -> &StationSettings {
        &self.settings
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            node_id: self.id,
            phase: self.phase(),
            stability: self.context.stability.value(),
            candidates: self.context.candidates.len(),
            manual: self.manual_target.map(|target| target.address),
            linked: self.is_linked(),
            reconfigurations: self.reconfigurations,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn establisher(&self) -> &LinkEstablisher<T> {
        &self.establisher
    }
}

struct DisplayableAction<'a>(&'a Action, TimeMs);

/// action as JSON to make it parseable
impl core::fmt::Display for DisplayableAction<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Action::None => write!(f, "{{\"kind\":\"none\"}}"),
            Action::Wait { end } => write!(
                f,
                "{{\"kind\":\"wait\",\"duration\":{}}}",
                *end as i64 - self.1 as i64
            ),
            Action::Sleep => write!(f, "{{\"kind\":\"sleep\"}}"),
        }
    }
}
