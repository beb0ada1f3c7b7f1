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

use core::net::Ipv4Addr;

use serde::Deserialize;

use crate::*;

/// Mesh network parameters shared by all nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StationSettings {
    pub ssid: Ssid,
    pub password: Password,
    /// Transport port the mesh layer listens on
    pub port: u16,
    /// Channel all access points of the mesh operate on
    pub channel: Channel,
    pub scan_interval_ms: TimeMs,
    /// Give up on a scan that did not complete within this time
    pub scan_timeout_ms: TimeMs,
    /// Give up on a transport handshake that did not complete within this time
    pub handshake_timeout_ms: TimeMs,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            ssid: Ssid::from_static("meshNetwork"),
            password: Password::from_static("meshPassword"),
            port: DEFAULT_MESH_PORT,
            channel: 1,
            scan_interval_ms: SCAN_INTERVAL_MS,
            scan_timeout_ms: 3 * SCAN_INTERVAL_MS,
            handshake_timeout_ms: 10 * MS_PER_S,
        }
    }
}

impl StationSettings {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            ssid: self.ssid,
            channel: self.channel,
            show_hidden: true,
        }
    }

    /// Association with exactly the access point of `record`
    pub fn station_config(&self, record: &AccessPointRecord) -> StationConfig {
        StationConfig {
            ssid: record.ssid,
            password: self.password,
            bssid: Some(record.bssid),
        }
    }
}

/// Fixed neighbor to link to instead of choosing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualTarget {
    pub address: HardwareAddress,
    pub port: u16,
    /// Connect to this address instead of the gateway the access point hands out
    pub remote_ip: Option<Ipv4Addr>,
}

impl ManualTarget {
    pub fn new(address: HardwareAddress, port: u16) -> Self {
        Self {
            address,
            port,
            remote_ip: None,
        }
    }

    pub fn with_remote_ip(mut self, ip: Ipv4Addr) -> Self {
        self.remote_ip = Some(ip);
        self
    }

    pub(crate) fn remote(&self) -> RemoteEndpoint {
        match self.remote_ip {
            Some(ip) => RemoteEndpoint::Fixed(ip),
            None => RemoteEndpoint::Gateway,
        }
    }
}
