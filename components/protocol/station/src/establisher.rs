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

use core::net::{Ipv4Addr, SocketAddrV4};

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// Connect request issued, waiting for the transport
    Handshake,
    Established,
}

/// Transport connection towards the access point the station is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAttempt {
    pub target: HardwareAddress,
    pub handle: LinkHandle,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub phase: LinkPhase,
}

impl LinkAttempt {
    pub fn local_port(&self) -> u16 {
        self.local.port()
    }

    pub fn remote_port(&self) -> u16 {
        self.remote.port()
    }
}

/// Where to connect to once associated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEndpoint {
    /// The gateway handed out by the access point, which is the neighbor itself
    Gateway,
    Fixed(Ipv4Addr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("station has no IP configuration")]
    NoIpConfiguration,
    #[error("link to {0} still pending")]
    AttemptInProgress(HardwareAddress),
    #[error("already linked over {0:?}")]
    AlreadyLinked(LinkHandle),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Issues transport connects and keeps track of the resulting link
///
/// Holds at most one link, either still in handshake or established.
#[derive(Debug)]
pub struct LinkEstablisher<T: Transport> {
    transport: T,
    hooks: T::Hooks,
    attempt: Option<LinkAttempt>,
    link: Option<LinkAttempt>,
}

impl<T: Transport> LinkEstablisher<T>
where
    T::Hooks: Clone,
{
    /// `hooks` are registered with every connection opened
    pub fn new(transport: T, hooks: T::Hooks) -> Self {
        Self {
            transport,
            hooks,
            attempt: None,
            link: None,
        }
    }

    /// Start the handshake with `target`
    ///
    /// The station has to be associated with `target` and hold an IP configuration.
    pub fn connect(
        &mut self,
        target: HardwareAddress,
        remote: RemoteEndpoint,
        port: u16,
        ip_info: Option<IpInfo>,
    ) -> Result<&LinkAttempt, LinkError> {
        if let Some(attempt) = &self.attempt {
            return Err(LinkError::AttemptInProgress(attempt.target));
        }
        if let Some(link) = &self.link {
            return Err(LinkError::AlreadyLinked(link.handle));
        }
        let ip_info = ip_info
            .filter(IpInfo::is_assigned)
            .ok_or(LinkError::NoIpConfiguration)?;

        let remote_ip = match remote {
            RemoteEndpoint::Gateway => ip_info.gateway,
            RemoteEndpoint::Fixed(ip) => ip,
        };
        let request = ConnectRequest {
            local: SocketAddrV4::new(ip_info.ip, self.transport.allocate_port()?),
            remote: SocketAddrV4::new(remote_ip, port),
            options: TransportOptions::LOW_LATENCY,
        };
        let handle = self
            .transport
            .open_connection(&request, self.hooks.clone())?;
        info!(
            "connecting {} -> {} ({}), link {}",
            request.local, request.remote, target, handle.0
        );

        Ok(&*self.attempt.insert(LinkAttempt {
            target,
            handle,
            local: request.local,
            remote: request.remote,
            phase: LinkPhase::Handshake,
        }))
    }

    /// Handshake of `handle` succeeded
    pub fn complete(&mut self, handle: LinkHandle) -> Option<LinkAttempt> {
        let mut attempt = self.attempt.take_if(|attempt| attempt.handle == handle)?;
        attempt.phase = LinkPhase::Established;
        self.link = Some(attempt);
        Some(attempt)
    }

    /// Transport gave up on `handle`, returns the attempt or link it belonged to
    pub fn fail(&mut self, handle: LinkHandle) -> Option<LinkAttempt> {
        self.attempt
            .take_if(|attempt| attempt.handle == handle)
            .or_else(|| self.link.take_if(|link| link.handle == handle))
    }

    /// Forget attempt and link without closing them
    ///
    /// Used when the station lost its association and the transport drops the connections
    /// itself.
    pub fn abandon(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            debug!("abandoned attempt {}", attempt.handle.0);
        }
        self.link = None;
    }

    /// Close attempt and link
    pub fn close(&mut self) {
        for link in [self.attempt.take(), self.link.take()].into_iter().flatten() {
            debug!("closing link {}", link.handle.0);
            self.transport.close_connection(link.handle);
        }
    }

    pub fn attempt(&self) -> Option<&LinkAttempt> {
        self.attempt.as_ref()
    }

    pub fn link(&self) -> Option<&LinkAttempt> {
        self.link.as_ref()
    }

    /// Whether `handle` is the pending attempt or the established link
    pub fn owns(&self, handle: LinkHandle) -> bool {
        [self.attempt, self.link]
            .iter()
            .flatten()
            .any(|link| link.handle == handle)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
