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

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::FieldError;

/// Hardware (MAC) address of a radio interface
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HardwareAddress([u8; HardwareAddress::LEN]);

impl HardwareAddress {
    pub const LEN: usize = 6;

    pub const fn new(octets: [u8; Self::LEN]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; Self::LEN] {
        self.0
    }
}

impl From<[u8; HardwareAddress::LEN]> for HardwareAddress {
    fn from(octets: [u8; HardwareAddress::LEN]) -> Self {
        Self(octets)
    }
}

impl TryFrom<&[u8]> for HardwareAddress {
    type Error = FieldError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let octets = bytes.try_into().map_err(|_| FieldError::Length {
            field: "hardware address",
            expected: Self::LEN,
            len: bytes.len(),
        })?;
        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}
