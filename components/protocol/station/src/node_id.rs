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

/// Node ID of the node owning the given hardware address
///
/// The last four bytes are packed in network byte order, the first two are ignored. Addresses
/// that only differ in their first two bytes therefore map to the same ID; the mesh accepts
/// such collisions.
pub fn derive_node_id(address: &HardwareAddress) -> NodeId {
    let [_, _, a, b, c, d] = address.octets();
    NodeId::from_be_bytes([a, b, c, d])
}
