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

use serde::Serialize;

use crate::*;

/// How settled the neighborhood of a linked node looks
///
/// Grows while scans find nothing new and is reset when the node drops its link to
/// reorganize. The higher it is, the more likely a linked node drops its link once it sees
/// unknown nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Stability(u16);

impl Stability {
    pub const MAX: u16 = 1000;
    /// Maximum increase per scan
    pub const STEP: u16 = 25;

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Another scan found nothing new
    pub fn increase(&mut self) {
        self.0 += Self::STEP.min(Self::MAX - self.0);
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Probability in parts per thousand that a linked node drops its link
    pub fn reconfigure_probability(&self, mesh_size: u32) -> u32 {
        u32::from(self.0) / mesh_size.max(1)
    }

    /// Draw whether to drop the current link
    pub fn should_reconfigure(&self, mesh_size: u32, mut rng: impl RngCore) -> bool {
        rng.next_u32() % PROBABILITY_SCALE < self.reconfigure_probability(mesh_size)
    }
}
