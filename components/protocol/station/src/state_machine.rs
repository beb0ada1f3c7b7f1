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

use crate::*;

impl<D, T, R> StationScanner<D, T, R>
where
    D: WifiDriver,
    T: Transport,
    T::Hooks: Clone,
    R: ConnectionRegistry,
{
    /// Get next state
    ///
    /// Each state's exit functionality is implemented here.
    #[must_use]
    pub(crate) fn next(
        &mut self,
        time: TimeMs,
        event: Option<Event>,
        mut rng: impl RngCore,
    ) -> State {
        let interval = self.settings.scan_interval_ms;
        match (self.state, event) {
            (State::Reset, None) => {
                event_log_reset!(time, self.id, self.manual_target.is_some());
                self.context.reset();
                self.scan(time)
            }
            (State::Reset, Some(_)) => State::Reset,

            (State::Idle { .. } | State::Backoff { .. }, None) => self.scan(time),

            (State::Scanning { .. }, None) => {
                warn!("{}: scan did not complete, restarting it", self.id);
                self.scan(time)
            }
            (State::Scanning { .. }, Some(Event::ScanComplete)) => {
                let pinned = self.manual_target.map(|target| target.address);
                let dropped = self.context.candidates.replace(
                    self.driver.scan_records(),
                    &self.registry,
                    pinned.as_ref(),
                );
                event_log_scan!(time, self.id, self.context.candidates.len(), dropped);
                self.evaluate(time, &mut rng)
            }
            (State::Scanning { end }, Some(Event::StationDisconnected)) => {
                // evaluated once the scan completes
                self.establisher.abandon();
                State::Scanning { end }
            }

            (State::Associating { target, .. }, None) => {
                warn!("{}: association with {} timed out", self.id, target);
                self.driver.disconnect();
                self.scan(time)
            }
            (State::Associating { target, end }, Some(Event::GotIp)) => {
                self.open_link(time, target, end)
            }

            (
                State::Connecting { handle, rescan, .. },
                Some(Event::LinkEstablished(link)),
            ) if link == handle => {
                if let Some(link) = self.establisher.complete(handle) {
                    event_log_link!(
                        time,
                        self.id,
                        "established",
                        derive_node_id(&link.target),
                        handle.0
                    );
                }
                State::Idle { end: rescan }
            }
            (
                State::Connecting { handle, .. },
                Some(Event::LinkFailed(link) | Event::LinkClosed(link)),
            ) if link == handle => {
                warn!("{}: handshake on link {} failed", self.id, handle.0);
                self.establisher.fail(handle);
                self.driver.disconnect();
                State::Backoff {
                    end: time + interval,
                }
            }
            (State::Connecting { handle, .. }, None) => {
                warn!("{}: handshake on link {} timed out", self.id, handle.0);
                self.teardown();
                State::Backoff {
                    end: time + interval,
                }
            }

            (State::Disabled, None) => State::Disabled,

            (_, Some(Event::StationDisconnected)) => {
                // try the next candidate of the last scan
                self.establisher.abandon();
                self.evaluate(time, &mut rng)
            }

            (state, Some(Event::LinkEstablished(handle)))
                if self.establisher.attempt().is_some_and(|a| a.handle == handle) =>
            {
                debug!("{}: late handshake on link {}", self.id, handle.0);
                self.establisher.complete(handle);
                state
            }
            (state, Some(Event::LinkFailed(handle) | Event::LinkClosed(handle)))
                if self.establisher.owns(handle) =>
            {
                if let Some(link) = self.establisher.fail(handle) {
                    event_log_link!(
                        time,
                        self.id,
                        "lost",
                        derive_node_id(&link.target),
                        handle.0
                    );
                }
                // reported back as StationDisconnected
                self.driver.disconnect();
                state
            }

            (state, Some(event)) => {
                debug!("{}: ignoring {} in {}", self.id, event, state);
                state
            }
        }
    }

    pub(crate) fn scan(&mut self, time: TimeMs) -> State {
        match self.driver.start_scan(&self.settings.scan_config()) {
            Ok(()) => State::Scanning {
                end: time + self.settings.scan_timeout_ms,
            },
            Err(e) => {
                error!("{}: {}", self.id, e);
                State::Idle {
                    end: time + self.settings.scan_interval_ms,
                }
            }
        }
    }

    /// Filter and rank the candidates of the last scan, then decide what to do
    fn evaluate(&mut self, time: TimeMs, rng: impl RngCore) -> State {
        self.context.candidates.retain_unknown(&self.registry);
        self.context.candidates.rank();
        match self.manual_target {
            Some(target) => self.evaluate_manual(time, target),
            None => self.evaluate_ranked(time, rng),
        }
    }

    fn evaluate_ranked(&mut self, time: TimeMs, mut rng: impl RngCore) -> State {
        let interval = self.settings.scan_interval_ms;
        match (self.is_linked(), self.context.candidates.is_empty()) {
            (true, true) => {
                // nothing new around, topology looks settled
                self.context.stability.increase();
                State::Idle {
                    end: time + random_factor(SLOW_SCAN_FACTORS, rng) * interval,
                }
            }
            (true, false) => {
                let mesh_size = self.registry.approximate_mesh_size();
                if self
                    .context
                    .stability
                    .should_reconfigure(mesh_size, &mut rng)
                {
                    event_log_reconfigure!(
                        time,
                        self.id,
                        self.context.stability.value(),
                        mesh_size
                    );
                    self.teardown();
                    self.context.stability.reset();
                    self.reconfigurations += 1;
                    State::Idle {
                        end: time + interval,
                    }
                } else {
                    State::Idle {
                        end: time + random_factor(RECHECK_SCAN_FACTORS, rng) * interval,
                    }
                }
            }
            (false, _) => match self.context.candidates.pop_strongest() {
                Some(record) => self.associate(time, record),
                None => State::Idle {
                    end: time + interval,
                },
            },
        }
    }

    fn evaluate_manual(&mut self, time: TimeMs, target: ManualTarget) -> State {
        let interval = self.settings.scan_interval_ms;
        if self.is_linked() {
            if self.driver.associated_bssid() == Some(target.address) {
                info!("{}: linked to manual target, scanning stopped", self.id);
                State::Disabled
            } else {
                info!("{}: dropping link to reach manual target", self.id);
                self.teardown();
                State::Backoff {
                    end: time + interval,
                }
            }
        } else {
            match self.context.candidates.take(&target.address) {
                Some(record) => self.associate(time, record),
                None => {
                    debug!("{}: manual target {} not in range", self.id, target.address);
                    State::Idle {
                        end: time + interval,
                    }
                }
            }
        }
    }

    fn associate(&mut self, time: TimeMs, record: AccessPointRecord) -> State {
        let interval = self.settings.scan_interval_ms;
        match self.driver.associate(&self.settings.station_config(&record)) {
            Ok(()) => {
                info!(
                    "{}: associating with {} ({} dBm)",
                    self.id, record.bssid, record.rssi
                );
                State::Associating {
                    target: record.bssid,
                    end: time + LINK_FALLBACK_FACTOR * interval,
                }
            }
            Err(e) => {
                error!("{}: {}", self.id, e);
                State::Backoff {
                    end: time + interval,
                }
            }
        }
    }

    fn open_link(&mut self, time: TimeMs, target: HardwareAddress, rescan: TimeMs) -> State {
        let backoff = State::Backoff {
            end: time + self.settings.scan_interval_ms,
        };
        let (remote, port) = match self.manual_target {
            Some(manual) => (manual.remote(), manual.port),
            None => (RemoteEndpoint::Gateway, self.settings.port),
        };
        let ip_info = self.driver.ip_info();
        match self
            .establisher
            .connect(target, remote, port, ip_info)
            .map(|attempt| attempt.handle)
        {
            Ok(handle) => {
                event_log_link!(
                    time,
                    self.id,
                    "handshake",
                    derive_node_id(&target),
                    handle.0
                );
                State::Connecting {
                    handle,
                    end: time + self.settings.handshake_timeout_ms,
                    rescan,
                }
            }
            Err(LinkError::NoIpConfiguration) => {
                error!("{}: {}", self.id, LinkError::NoIpConfiguration);
                backoff
            }
            Err(e) => {
                error!("{}: {}", self.id, e);
                self.driver.disconnect();
                backoff
            }
        }
    }

    pub(crate) fn is_linked(&self) -> bool {
        self.driver.ip_info().is_some_and(|ip| ip.is_assigned())
    }

    /// Drop the current link and leave the access point
    fn teardown(&mut self) {
        self.establisher.close();
        self.driver.disconnect();
    }
}
