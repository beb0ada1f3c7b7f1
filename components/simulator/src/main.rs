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

use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::Context;
use clap::Parser;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn, LevelFilter};
use rand::{RngCore, SeedableRng};

use mesh_station::{derive_node_id, Diagnostics, StationScanner, StationSettings};
use station_api::*;

mod logger;
mod sim;

use crate::sim::*;

const MS_PER_MIN: TimeMs = 60 * 1000;
/// Minimum distance between nodes. Avoids overlapping nodes.
const MIN_NODE_DISTANCE: u32 = 10;
/// Height and width of area
const AREA_SIZE: u32 = 100;
const MAX_PLACEMENT_ATTEMPTS: usize = 100_000;
/// Nodes are addressed with two bytes
const MAX_NODES: usize = u16::MAX as usize + 1;
const STARTUP_DELAY_RANGE_MS: TimeMs = 30 * 1000;
const SCAN_DURATION_MS: TimeMs = 1500;
const ASSOCIATION_DURATION_MS: TimeMs = 800;
const HANDSHAKE_DURATION_MS: TimeMs = 150;
const EPHEMERAL_PORTS_START: u16 = 49152;
/// Transport error codes
const CONNECTION_RESET: i8 = -9;
const NOT_CONNECTED: i8 = -11;

const EVENT_FILE_PATH: &str = "/tmp/station_events.csv";
const SIMULATION_METADATA_FILE_PATH: &str = "/tmp/station_sim_meta.json";

/// Simulates nodes of a wifi mesh linking up with their neighbors
#[derive(Debug, Parser)]
#[command(name = "mesh_simulator", version)]
struct Args {
    /// Seed of the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 15)]
    nodes: usize,
    /// Nodes that are farther apart from each other than this value are not in range of each other
    #[arg(long, default_value_t = 30)]
    range: u32,
    /// Simulated time in minutes
    #[arg(long, default_value_t = 90)]
    time_min: u64,
    /// Where to write the event log
    #[arg(long, default_value = EVENT_FILE_PATH)]
    events: PathBuf,
    /// Where to write node locations
    #[arg(long, default_value = SIMULATION_METADATA_FILE_PATH)]
    metadata: PathBuf,
    /// Station settings as JSON, missing fields keep their defaults
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long, default_value_t = LevelFilter::Debug)]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        (1..=MAX_NODES).contains(&args.nodes),
        "number of nodes must be between 1 and {MAX_NODES}"
    );

    let settings = match &args.settings {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("could not open settings {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file)).context("invalid settings")?
        }
        None => StationSettings::default(),
    };

    let mut rng = get_rng(args.seed);
    let nodes = place_nodes(args.nodes, &mut rng)?;

    write_metadata_to_file(&nodes, args.range, &args.metadata)?;

    logger::init(args.log_level, Some(args.events.as_path()))?;

    let range = args.range;
    let world = World::new(nodes, settings, |a, b| {
        check_visibility_based_on_distance(a, b, range)
    });
    let report = Simulation::new(world).run(args.time_min, rng);
    log::logger().flush();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn get_rng(rng_seed: u64) -> rand_chacha::ChaCha8Rng {
    println!("RNG seed: {rng_seed:#x}");
    rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed)
}

/// Random locations that keep a minimum distance to each other
fn place_nodes(number_of_nodes: usize, mut rng: impl RngCore) -> anyhow::Result<Vec<Node>> {
    let mut locations: Vec<Coordinates> = Vec::with_capacity(number_of_nodes);
    let mut attempts = 0;
    while locations.len() != number_of_nodes {
        attempts += 1;
        anyhow::ensure!(
            attempts <= MAX_PLACEMENT_ATTEMPTS,
            "could not place {number_of_nodes} nodes {MIN_NODE_DISTANCE} apart"
        );
        let location = Coordinates {
            x: (rng.next_u32() % AREA_SIZE) as i64,
            y: (rng.next_u32() % AREA_SIZE) as i64,
        };
        if !locations
            .iter()
            .any(|l| get_distance(&location, l) < MIN_NODE_DISTANCE as f32)
        {
            locations.push(location);
        }
    }
    Ok(locations
        .into_iter()
        .enumerate()
        .map(|(index, location)| Node::new(index, location))
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct VisibilityMap(HashSet<(usize, usize)>);

    impl VisibilityMap {
        fn get(&self, a: &Node, b: &Node) -> bool {
            let (a, b) = (index(a), index(b));
            self.0.contains(&(a.min(b), a.max(b)))
        }

        fn from_array<const N: usize>(array: [(usize, usize); N]) -> Self {
            Self(array.into_iter().map(|(a, b)| (a.min(b), a.max(b))).collect())
        }
    }

    fn index(node: &Node) -> usize {
        let [.., hi, lo] = node.address.octets();
        u16::from_be_bytes([hi, lo]) as usize
    }

    fn create_nodes(number_of_nodes: usize) -> Vec<Node> {
        (0..number_of_nodes)
            .map(|index| Node::new(index, Coordinates::default()))
            .collect()
    }

    fn run(
        nodes: Vec<Node>,
        minutes: u64,
        seed: u64,
        check_visibility: impl FnMut(&Node, &Node) -> bool,
    ) -> Report {
        let world = World::new(nodes, StationSettings::default(), check_visibility);
        Simulation::new(world).run(minutes, get_rng(seed))
    }

    #[test]
    fn basic() {
        let report = run(create_nodes(2), 30, 0, |_, _| true);
        assert!(report.fully_connected_at.is_some());
        assert_eq!(report.links, 1);
        assert_eq!(report.nodes.iter().filter(|n| n.linked).count(), 1);
    }

    #[test]
    fn chain3() {
        let visibility_map = VisibilityMap::from_array([(0, 1), (1, 2)]);
        let report = run(create_nodes(3), 30, 0, |a, b| visibility_map.get(a, b));
        assert!(report.fully_connected_at.is_some());
        assert_eq!(report.links, 2);
    }

    /// All nodes see each other
    #[test]
    fn fully_visible() {
        let num_nodes = 5;
        let report = run(create_nodes(num_nodes), 60, 1, |_, _| true);
        assert!(report.fully_connected_at.is_some());
        assert_eq!(report.links, num_nodes - 1);
    }

    #[test]
    fn out_of_range() {
        let report = run(create_nodes(2), 10, 0, |_, _| false);
        assert_eq!(report.fully_connected_at, None);
        assert_eq!(report.links, 0);
        assert!(report.nodes.iter().all(|n| !n.linked && n.stability == 0));
    }

    #[test]
    fn reproducible() {
        let a = run(create_nodes(4), 20, 7, |_, _| true);
        let b = run(create_nodes(4), 20, 7, |_, _| true);
        assert_eq!(a.fully_connected_at, b.fully_connected_at);
        assert_eq!(a.nodes, b.nodes);
    }

    #[test]
    fn placement_keeps_distance() {
        let nodes = place_nodes(20, get_rng(3)).unwrap();
        assert_eq!(nodes.len(), 20);
        for (i, a) in nodes.iter().enumerate() {
            assert_eq!(index(a), i);
            for b in &nodes[i + 1..] {
                assert!(get_distance(&a.location, &b.location) >= MIN_NODE_DISTANCE as f32);
                assert_ne!(a.id(), b.id());
            }
        }
        // more nodes than fit the area
        assert!(place_nodes(1000, get_rng(3)).is_err());
    }

    #[test]
    fn metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let nodes = place_nodes(3, get_rng(0)).unwrap();
        write_metadata_to_file(&nodes, 30, &path).unwrap();
        let json: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(json["node_range"], 30);
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["nodes"][1]["id"], nodes[1].id());
    }

    #[test]
    fn args() {
        let args = Args::try_parse_from(["mesh_simulator", "--nodes", "4", "--time-min", "5"]).unwrap();
        assert_eq!(args.nodes, 4);
        assert_eq!(args.time_min, 5);
        assert_eq!(args.range, 30);
        assert!(Args::try_parse_from(["mesh_simulator", "--sinks", "1"]).is_err());
    }
}
