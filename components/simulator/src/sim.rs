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

use std::{
    cell::RefCell,
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap, VecDeque},
    fs::File,
    io::BufWriter,
    net::{Ipv4Addr, SocketAddrV4},
    path::Path,
    rc::Rc,
    time::Duration,
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;
use serde::Serialize;

use crate::*;

type SimScanner = StationScanner<SimRadio, SimTransport, SimRegistry>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

impl From<(i64, i64)> for Coordinates {
    fn from(value: (i64, i64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

pub fn get_distance(a: &Coordinates, b: &Coordinates) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    ((dx.pow(2) + dy.pow(2)) as f32).sqrt()
}

/// Simulated node, runs an access point and a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Node {
    pub address: HardwareAddress,
    pub location: Coordinates,
}

impl Node {
    /// Vector index is node index, the address is derived from it
    pub fn new(index: usize, location: Coordinates) -> Self {
        let [.., hi, lo] = (index as u32).to_be_bytes();
        Self {
            address: HardwareAddress::new([0x5c, 0xcf, 0x7f, 0x00, hi, lo]),
            location,
        }
    }

    pub fn id(&self) -> NodeId {
        derive_node_id(&self.address)
    }
}

/// Check if two nodes are in range of each other
pub fn check_visibility_based_on_distance(a: &Node, b: &Node, range: u32) -> bool {
    get_distance(&a.location, &b.location) < range as f32
}

/// Signal strength of a neighbor's access point, weaker with distance
fn rssi(a: &Node, b: &Node) -> i8 {
    (-30.0 - 2.0 * get_distance(&a.location, &b.location)).max(i8::MIN as f32) as i8
}

fn gateway_ip(ap: usize) -> Ipv4Addr {
    let [_, _, hi, lo] = (ap as u32).to_be_bytes();
    Ipv4Addr::new(10, hi, lo, 1)
}

fn station_ip_info(ap: usize, station: usize) -> IpInfo {
    let [_, _, hi, lo] = (ap as u32).to_be_bytes();
    IpInfo {
        ip: Ipv4Addr::new(10, hi, lo, 2 + (station % 250) as u8),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: gateway_ip(ap),
    }
}

/// Driver or transport operation that completes later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Scan,
    Associate { ap: usize, generation: u64 },
    Handshake(LinkHandle),
    Disconnected,
}

#[derive(Debug, Default)]
struct StationSide {
    associated: Option<usize>,
    pending: Option<usize>,
    /// Bumped whenever a pending association is superseded
    generation: u64,
}

#[derive(Debug)]
struct Connection {
    station: usize,
    ap: usize,
    request: ConnectRequest,
    hooks: SimHooks,
}

/// Radio medium, station interfaces and transport connections of all nodes
#[derive(Debug)]
pub struct World {
    nodes: Vec<Node>,
    visible: Vec<Vec<bool>>,
    settings: StationSettings,
    stations: Vec<StationSide>,
    scanning: Vec<bool>,
    scan_results: Vec<Vec<AccessPointRecord>>,
    handshakes: BTreeMap<LinkHandle, Connection>,
    links: BTreeMap<LinkHandle, Connection>,
    /// Completions scheduled since the simulation last collected them
    outbox: Vec<(TimeMs, usize, Completion)>,
    now: TimeMs,
    next_handle: u32,
    next_port: u16,
}

impl World {
    pub fn new(
        nodes: Vec<Node>,
        settings: StationSettings,
        mut check_visibility: impl FnMut(&Node, &Node) -> bool,
    ) -> Self {
        let visible = nodes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(j, b)| i != j && check_visibility(a, b))
                    .collect()
            })
            .collect();
        let n = nodes.len();
        Self {
            nodes,
            visible,
            settings,
            stations: (0..n).map(|_| StationSide::default()).collect(),
            scanning: vec![false; n],
            scan_results: vec![Vec::new(); n],
            handshakes: BTreeMap::new(),
            links: BTreeMap::new(),
            outbox: Vec::new(),
            now: 0,
            next_handle: 1,
            next_port: EPHEMERAL_PORTS_START,
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn schedule(&mut self, delay: TimeMs, node: usize, completion: Completion) {
        self.outbox.push((self.now + delay, node, completion));
    }

    fn node_index(&self, address: &HardwareAddress) -> Option<usize> {
        self.nodes.iter().position(|node| node.address == *address)
    }

    fn node_index_by_id(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == id)
    }

    /// Nodes reachable from `from` over established links, including `from`
    pub fn reachable(&self, from: usize) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;
        while let Some(node) = queue.pop_front() {
            for link in self.links.values() {
                let peer = if link.station == node {
                    link.ap
                } else if link.ap == node {
                    link.station
                } else {
                    continue;
                };
                if !seen[peer] {
                    seen[peer] = true;
                    queue.push_back(peer);
                }
            }
        }
        seen
    }

    pub fn component_size(&self, from: usize) -> usize {
        self.reachable(from).iter().filter(|r| **r).count()
    }

    /// Drop handshakes and links running over the station interface of `node`
    fn drop_station_links(&mut self, node: usize) {
        self.handshakes.retain(|_, handshake| handshake.station != node);
        let dropped: Vec<_> = self
            .links
            .iter()
            .filter(|(_, link)| link.station == node)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in dropped {
            if let Some(mut link) = self.links.remove(&handle) {
                link.hooks.disconnected(handle);
            }
        }
    }

    /// Apply a completion, returns the event to deliver to `node`
    pub fn complete(&mut self, node: usize, completion: Completion) -> Option<Event> {
        match completion {
            Completion::Scan => {
                self.scanning[node] = false;
                let channel = self.settings.channel;
                let ssid = self.settings.ssid;
                let records = self
                    .nodes
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| self.visible[node][*other])
                    .map(|(_, other)| AccessPointRecord {
                        bssid: other.address,
                        ssid,
                        rssi: rssi(&self.nodes[node], other),
                        channel,
                    })
                    .collect();
                self.scan_results[node] = records;
                Some(Event::ScanComplete)
            }
            Completion::Associate { ap, generation } => {
                let station = &mut self.stations[node];
                if station.generation != generation {
                    // superseded
                    return None;
                }
                station.pending = None;
                if self.visible[node][ap] {
                    station.associated = Some(ap);
                    Some(Event::GotIp)
                } else {
                    Some(Event::StationDisconnected)
                }
            }
            Completion::Handshake(handle) => {
                let Connection {
                    station,
                    ap,
                    request,
                    mut hooks,
                } = self.handshakes.remove(&handle)?;
                if self.stations[station].associated != Some(ap) {
                    hooks.error(handle, TransportError::Aborted);
                    return Some(Event::LinkFailed(handle));
                }
                if request.remote != SocketAddrV4::new(gateway_ip(ap), self.settings.port) {
                    hooks.error(handle, TransportError::Connect(CONNECTION_RESET));
                    return Some(Event::LinkFailed(handle));
                }
                if self.reachable(station)[ap] {
                    // mesh layer closes links to nodes it already reaches
                    info!(
                        "node {} already reaches node {}, closing link {}",
                        self.nodes[station].id(),
                        self.nodes[ap].id(),
                        handle.0
                    );
                    hooks.disconnected(handle);
                    return Some(Event::LinkClosed(handle));
                }
                hooks.connected(handle);
                self.links.insert(
                    handle,
                    Connection {
                        station,
                        ap,
                        request,
                        hooks,
                    },
                );
                Some(Event::LinkEstablished(handle))
            }
            Completion::Disconnected => Some(Event::StationDisconnected),
        }
    }
}

/// Wifi driver of one node
#[derive(Debug)]
pub struct SimRadio {
    node: usize,
    world: Rc<RefCell<World>>,
    records: Vec<AccessPointRecord>,
}

impl WifiDriver for SimRadio {
    fn start_scan(&mut self, config: &ScanConfig) -> Result<(), DriverError> {
        let mut world = self.world.borrow_mut();
        if world.scanning[self.node] {
            return Err(DriverError::Busy);
        }
        if config.ssid != world.settings.ssid {
            return Err(DriverError::ScanRefused);
        }
        world.scanning[self.node] = true;
        world.schedule(SCAN_DURATION_MS, self.node, Completion::Scan);
        Ok(())
    }

    fn scan_records(&mut self) -> impl Iterator<Item = AccessPointRecord> + '_ {
        self.records.clone_from(&self.world.borrow().scan_results[self.node]);
        self.records.iter().copied()
    }

    fn associate(&mut self, config: &StationConfig) -> Result<(), DriverError> {
        let mut world = self.world.borrow_mut();
        let ap = config
            .bssid
            .and_then(|bssid| world.node_index(&bssid))
            .ok_or(DriverError::AssociationRefused)?;
        if config.ssid != world.settings.ssid || config.password != world.settings.password {
            return Err(DriverError::AssociationRefused);
        }
        if world.stations[self.node].associated.take().is_some() {
            world.drop_station_links(self.node);
        }
        let station = &mut world.stations[self.node];
        station.generation += 1;
        station.pending = Some(ap);
        let generation = station.generation;
        world.schedule(
            ASSOCIATION_DURATION_MS,
            self.node,
            Completion::Associate { ap, generation },
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut world = self.world.borrow_mut();
        let station = &mut world.stations[self.node];
        let associated = station.associated.take().is_some();
        let pending = station.pending.take().is_some();
        station.generation += 1;
        world.drop_station_links(self.node);
        if associated || pending {
            world.schedule(0, self.node, Completion::Disconnected);
        }
    }

    fn associated_bssid(&self) -> Option<HardwareAddress> {
        let world = self.world.borrow();
        world.stations[self.node]
            .associated
            .map(|ap| world.nodes[ap].address)
    }

    fn ip_info(&self) -> Option<IpInfo> {
        let world = self.world.borrow();
        world.stations[self.node]
            .associated
            .map(|ap| station_ip_info(ap, self.node))
    }
}

/// Transport stack of one node
#[derive(Debug)]
pub struct SimTransport {
    node: usize,
    world: Rc<RefCell<World>>,
}

impl Transport for SimTransport {
    type Hooks = SimHooks;

    fn allocate_port(&mut self) -> Result<u16, TransportError> {
        let mut world = self.world.borrow_mut();
        let port = world.next_port;
        world.next_port = port.checked_add(1).unwrap_or(EPHEMERAL_PORTS_START);
        Ok(port)
    }

    fn open_connection(
        &mut self,
        request: &ConnectRequest,
        hooks: SimHooks,
    ) -> Result<LinkHandle, TransportError> {
        let mut world = self.world.borrow_mut();
        let ap = world.stations[self.node]
            .associated
            .ok_or(TransportError::Connect(NOT_CONNECTED))?;
        let handle = LinkHandle(world.next_handle);
        world.next_handle += 1;
        world.handshakes.insert(
            handle,
            Connection {
                station: self.node,
                ap,
                request: *request,
                hooks,
            },
        );
        world.schedule(HANDSHAKE_DURATION_MS, self.node, Completion::Handshake(handle));
        Ok(handle)
    }

    fn close_connection(&mut self, link: LinkHandle) {
        let mut world = self.world.borrow_mut();
        world.handshakes.remove(&link);
        if let Some(mut connection) = world.links.remove(&link) {
            connection.hooks.disconnected(link);
        }
    }
}

/// Mesh layer callbacks of one node's links
#[derive(Debug, Clone)]
pub struct SimHooks {
    node: NodeId,
}

impl LinkHooks for SimHooks {
    fn connected(&mut self, link: LinkHandle) {
        debug!("node {}: link {} up", self.node, link.0);
    }

    fn received(&mut self, link: LinkHandle, data: &[u8]) {
        trace!("node {}: {} bytes on link {}", self.node, data.len(), link.0);
    }

    fn sent(&mut self, link: LinkHandle) {
        trace!("node {}: sent on link {}", self.node, link.0);
    }

    fn disconnected(&mut self, link: LinkHandle) {
        debug!("node {}: link {} down", self.node, link.0);
    }

    fn error(&mut self, link: LinkHandle, error: TransportError) {
        warn!("node {}: link {}: {}", self.node, link.0, error);
    }
}

/// Mesh layer view of one node
#[derive(Debug)]
pub struct SimRegistry {
    node: usize,
    world: Rc<RefCell<World>>,
}

impl ConnectionRegistry for SimRegistry {
    fn lookup_connection(&self, id: NodeId) -> bool {
        let world = self.world.borrow();
        world
            .node_index_by_id(id)
            .is_some_and(|other| world.reachable(self.node)[other])
    }

    fn approximate_mesh_size(&self) -> u32 {
        self.world.borrow().component_size(self.node) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    /// Deadline of a node's action, stale unless `generation` is the node's current one
    Timer { generation: u64 },
    Completion(Completion),
}

#[derive(Debug, Clone, Copy, Eq)]
struct Entry {
    time: TimeMs,
    /// Insertion order, keeps simultaneous entries first in first out
    seq: u64,
    node: usize,
    kind: EntryKind,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.seq) == (other.time, other.seq)
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Time all nodes first were part of one mesh
    pub fully_connected_at: Option<TimeMs>,
    pub reconfigurations: u32,
    pub links: usize,
    pub nodes: Vec<Diagnostics>,
}

/// Discrete event simulation of a mesh
pub struct Simulation {
    world: Rc<RefCell<World>>,
    scanners: Vec<SimScanner>,
    queue: BinaryHeap<Reverse<Entry>>,
    timers: Vec<u64>,
    seq: u64,
    now: TimeMs,
    fully_connected_at: Option<TimeMs>,
}

impl Simulation {
    pub fn new(world: World) -> Self {
        let settings = world.settings;
        let nodes = world.nodes.clone();
        let world = Rc::new(RefCell::new(world));
        let scanners = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                StationScanner::new(
                    node.address,
                    settings,
                    SimRadio {
                        node: index,
                        world: Rc::clone(&world),
                        records: Vec::new(),
                    },
                    SimRegistry {
                        node: index,
                        world: Rc::clone(&world),
                    },
                    SimTransport {
                        node: index,
                        world: Rc::clone(&world),
                    },
                    SimHooks { node: node.id() },
                )
            })
            .collect();
        Self {
            world,
            scanners,
            queue: BinaryHeap::new(),
            timers: vec![0; nodes.len()],
            seq: 0,
            now: 0,
            fully_connected_at: None,
        }
    }

    fn push(&mut self, time: TimeMs, node: usize, kind: EntryKind) {
        self.queue.push(Reverse(Entry {
            time,
            seq: self.seq,
            node,
            kind,
        }));
        self.seq += 1;
    }

    fn collect_completions(&mut self) {
        let completions = std::mem::take(&mut self.world.borrow_mut().outbox);
        for (time, node, completion) in completions {
            self.push(time, node, EntryKind::Completion(completion));
        }
    }

    fn schedule_action(&mut self, node: usize, action: Action) {
        self.timers[node] += 1;
        let generation = self.timers[node];
        match action {
            Action::None => self.push(self.now, node, EntryKind::Timer { generation }),
            Action::Wait { end } => {
                if end < self.now {
                    warn!("end of action is in the past ({} < {})", end, self.now);
                }
                debug!("waiting for {:?}", Duration::from_millis(end.saturating_sub(self.now)));
                self.push(end.max(self.now), node, EntryKind::Timer { generation });
            }
            Action::Sleep => debug!("sleeping until next event"),
        }
    }

    pub fn run(&mut self, minutes: u64, mut rng: impl RngCore) -> Report {
        let end = minutes * MS_PER_MIN;

        // random delay to mimic asynchronous startup
        for node in 0..self.scanners.len() {
            let startup_delay = rng.next_u32() as TimeMs % STARTUP_DELAY_RANGE_MS;
            self.push(startup_delay, node, EntryKind::Timer { generation: 0 });
        }

        while let Some(Reverse(entry)) = self.queue.pop() {
            if entry.time > end {
                break;
            }
            assert!(entry.time >= self.now, "bug: time cannot go backwards");
            self.now = entry.time;
            self.world.borrow_mut().now = self.now;

            let event = match entry.kind {
                EntryKind::Timer { generation } => {
                    if generation != self.timers[entry.node] {
                        continue;
                    }
                    None
                }
                EntryKind::Completion(completion) => {
                    let event = self.world.borrow_mut().complete(entry.node, completion);
                    if event.is_none() {
                        // superseded
                        continue;
                    }
                    event
                }
            };

            trace!(
                "{:-^30}{:-^30}",
                format!(" node {} ", self.scanners[entry.node].id()),
                format!(
                    " {}min {:>7?} ",
                    self.now / MS_PER_MIN,
                    Duration::from_millis(self.now % MS_PER_MIN)
                )
            );
            let action = self.scanners[entry.node].progress(self.now, event, &mut rng);
            self.schedule_action(entry.node, action);
            self.collect_completions();

            if self.fully_connected_at.is_none()
                && self.world.borrow().component_size(0) == self.scanners.len()
            {
                info!("mesh fully connected after {:?}", Duration::from_millis(self.now));
                self.fully_connected_at = Some(self.now);
            }
        }

        self.report()
    }

    pub fn report(&self) -> Report {
        let nodes: Vec<_> = self.scanners.iter().map(|s| s.diagnostics()).collect();
        Report {
            fully_connected_at: self.fully_connected_at,
            reconfigurations: nodes.iter().map(|n| n.reconfigurations).sum(),
            links: self.world.borrow().link_count(),
            nodes,
        }
    }
}

#[derive(Debug, Serialize)]
struct NodeMetadata<'a> {
    id: NodeId,
    address: String,
    location: &'a Coordinates,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    node_range: u32,
    nodes: Vec<NodeMetadata<'a>>,
}

pub fn write_metadata_to_file(nodes: &[Node], node_range: u32, path: &Path) -> anyhow::Result<()> {
    let metadata = Metadata {
        node_range,
        nodes: nodes
            .iter()
            .map(|node| NodeMetadata {
                id: node.id(),
                address: node.address.to_string(),
                location: &node.location,
            })
            .collect(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &metadata)?;
    Ok(())
}
