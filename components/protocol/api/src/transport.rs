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

//! Transport stack capability

use core::{fmt, net::SocketAddrV4};
use serde::Serialize;

/// Transport connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LinkHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Send segments right away instead of coalescing them
    pub no_delay: bool,
    pub keep_alive: bool,
}

impl TransportOptions {
    /// Low latency at the cost of bandwidth, broken links are detected by keep-alive
    pub const LOW_LATENCY: Self = Self {
        no_delay: true,
        keep_alive: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub options: TransportOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no free local port")]
    NoFreePort,
    #[error("connect failed with code {0}")]
    Connect(i8),
    #[error("connection aborted")]
    Aborted,
    #[error("connection reset")]
    Reset,
}

/// Callbacks the transport invokes for one connection
///
/// They are implemented by the mesh layer running on top of the link.
pub trait LinkHooks {
    fn connected(&mut self, link: LinkHandle);
    fn received(&mut self, link: LinkHandle, data: &[u8]);
    fn sent(&mut self, link: LinkHandle);
    fn disconnected(&mut self, link: LinkHandle);
    fn error(&mut self, link: LinkHandle, error: TransportError);
}

pub trait Transport {
    type Hooks: LinkHooks + fmt::Debug;

    /// Free local port for an outgoing connection
    fn allocate_port(&mut self) -> Result<u16, TransportError>;

    /// Start the handshake, the outcome is reported through `hooks`
    fn open_connection(
        &mut self,
        request: &ConnectRequest,
        hooks: Self::Hooks,
    ) -> Result<LinkHandle, TransportError>;

    /// Close connection, no hooks are invoked for it afterwards
    fn close_connection(&mut self, link: LinkHandle);
}
