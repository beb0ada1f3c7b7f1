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

//! Macros for generating parseable event log messages
//!
//! Lines start with `$` followed by `uptime;node_id;kind;content` where content is JSON.

#[macro_export]
macro_rules! event_log {
    ($uptime:expr,$node_id:expr,$kind:expr,$content:expr) => {
        info!("${};{};{};{}", $uptime, $node_id, $kind, $content);
    };
}

#[macro_export]
macro_rules! event_log_event {
    ($uptime:expr,$node_id:expr,$content:expr) => {
        event_log!($uptime, $node_id, "event", $content);
    };
}

#[macro_export]
macro_rules! event_log_action {
    ($uptime:expr,$node_id:expr,$action:expr) => {
        event_log!($uptime, $node_id, "action", $action);
    };
}

#[macro_export]
macro_rules! event_log_reset {
    ($uptime:expr,$node_id:expr,$manual:expr) => {
        info!("${};{};reset;{{\"manual\":{}}}", $uptime, $node_id, $manual);
    };
}

#[macro_export]
macro_rules! event_log_state {
    ($uptime:expr,$node_id:expr,$new_state:expr) => {
        info!("${};{};state;\"{}\"", $uptime, $node_id, $new_state);
    };
}

#[macro_export]
macro_rules! event_log_scan {
    ($uptime:expr,$node_id:expr,$found:expr,$dropped:expr) => {
        info!(
            "${};{};scan;{{\"found\":{},\"dropped\":{}}}",
            $uptime, $node_id, $found, $dropped
        );
    };
}

#[macro_export]
macro_rules! event_log_link {
    ($uptime:expr,$node_id:expr,$phase:expr,$peer:expr,$link:expr) => {
        info!(
            "${};{};link;{{\"phase\":\"{}\",\"peer\":{},\"link\":{}}}",
            $uptime, $node_id, $phase, $peer, $link
        );
    };
}

#[macro_export]
macro_rules! event_log_reconfigure {
    ($uptime:expr,$node_id:expr,$stability:expr,$mesh_size:expr) => {
        info!(
            "${};{};reconfigure;{{\"stability\":{},\"mesh_size\":{}}}",
            $uptime, $node_id, $stability, $mesh_size
        );
    };
}
