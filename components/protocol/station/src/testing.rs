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

//! Scripted driver, transport and registry for tests

use core::net::Ipv4Addr;

use crate::*;

pub(crate) type TestScanner = StationScanner<FakeDriver, FakeTransport, FakeRegistry>;

pub(crate) fn address(n: u8) -> HardwareAddress {
    HardwareAddress::new([0x02, 0x00, 0xa0, 0x00, 0x00, n])
}

pub(crate) fn node(n: u8) -> NodeId {
    derive_node_id(&address(n))
}

pub(crate) fn record(n: u8, rssi: i8) -> AccessPointRecord {
    AccessPointRecord {
        bssid: address(n),
        ssid: StationSettings::default().ssid,
        rssi,
        channel: 1,
    }
}

/// IP configuration handed out by the access point of node `n`
pub(crate) fn ip_info(n: u8) -> IpInfo {
    IpInfo {
        ip: Ipv4Addr::new(10, 0, n, 2),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(10, 0, n, 1),
    }
}

pub(crate) fn scanner(driver: FakeDriver, registry: FakeRegistry) -> TestScanner {
    scanner_with(driver, registry, FakeTransport::default())
}

pub(crate) fn scanner_with(
    driver: FakeDriver,
    registry: FakeRegistry,
    transport: FakeTransport,
) -> TestScanner {
    StationScanner::new(
        address(0xee),
        StationSettings::default(),
        driver,
        registry,
        transport,
        NoHooks,
    )
}

#[derive(Debug, Default)]
pub(crate) struct FakeDriver {
    /// Returned by every scan
    pub(crate) records: Vec<AccessPointRecord>,
    pub(crate) scans_started: usize,
    pub(crate) fail_scan: bool,
    pub(crate) associated: Vec<StationConfig>,
    pub(crate) fail_association: bool,
    pub(crate) disconnects: usize,
    pub(crate) bssid: Option<HardwareAddress>,
    pub(crate) ip: Option<IpInfo>,
}

impl FakeDriver {
    /// Station is associated with `bssid` and got an IP address from it
    pub(crate) fn link_to(&mut self, bssid: HardwareAddress) {
        self.bssid = Some(bssid);
        self.ip = Some(ip_info(bssid.octets()[5]));
    }
}

impl WifiDriver for FakeDriver {
    fn start_scan(&mut self, _config: &ScanConfig) -> Result<(), DriverError> {
        if self.fail_scan {
            return Err(DriverError::ScanRefused);
        }
        self.scans_started += 1;
        Ok(())
    }

    fn scan_records(&mut self) -> impl Iterator<Item = AccessPointRecord> + '_ {
        self.records.iter().copied()
    }

    fn associate(&mut self, config: &StationConfig) -> Result<(), DriverError> {
        if self.fail_association {
            return Err(DriverError::AssociationRefused);
        }
        self.associated.push(*config);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.bssid = None;
        self.ip = None;
    }

    fn associated_bssid(&self) -> Option<HardwareAddress> {
        self.bssid
    }

    fn ip_info(&self) -> Option<IpInfo> {
        self.ip
    }
}

#[derive(Debug)]
pub(crate) struct FakeTransport {
    pub(crate) opened: Vec<ConnectRequest>,
    pub(crate) closed: Vec<LinkHandle>,
    pub(crate) fail_connect: Option<TransportError>,
    pub(crate) next_handle: u32,
    pub(crate) next_port: u16,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            opened: Vec::new(),
            closed: Vec::new(),
            fail_connect: None,
            next_handle: 1,
            next_port: 49152,
        }
    }
}

impl Transport for FakeTransport {
    type Hooks = NoHooks;

    fn allocate_port(&mut self) -> Result<u16, TransportError> {
        let port = self.next_port;
        self.next_port += 1;
        Ok(port)
    }

    fn open_connection(
        &mut self,
        request: &ConnectRequest,
        _hooks: NoHooks,
    ) -> Result<LinkHandle, TransportError> {
        if let Some(e) = self.fail_connect {
            return Err(e);
        }
        self.opened.push(*request);
        let handle = LinkHandle(self.next_handle);
        self.next_handle += 1;
        Ok(handle)
    }

    fn close_connection(&mut self, link: LinkHandle) {
        self.closed.push(link);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct NoHooks;

impl LinkHooks for NoHooks {
    fn connected(&mut self, _link: LinkHandle) {}
    fn received(&mut self, _link: LinkHandle, _data: &[u8]) {}
    fn sent(&mut self, _link: LinkHandle) {}
    fn disconnected(&mut self, _link: LinkHandle) {}
    fn error(&mut self, _link: LinkHandle, _error: TransportError) {}
}

#[derive(Debug)]
pub(crate) struct FakeRegistry {
    pub(crate) known: Vec<NodeId>,
    pub(crate) mesh_size: u32,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            known: Vec::new(),
            mesh_size: 1,
        }
    }
}

impl FakeRegistry {
    pub(crate) fn knowing(ids: &[NodeId]) -> Self {
        Self {
            known: ids.to_vec(),
            mesh_size: ids.len() as u32 + 1,
        }
    }

    pub(crate) fn with_mesh_size(mesh_size: u32) -> Self {
        Self {
            mesh_size,
            ..Self::default()
        }
    }
}

impl ConnectionRegistry for FakeRegistry {
    fn lookup_connection(&self, id: NodeId) -> bool {
        self.known.contains(&id)
    }

    fn approximate_mesh_size(&self) -> u32 {
        self.mesh_size
    }
}
