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

/// Data carried from one scan cycle to the next
#[derive(Debug, Default)]
pub(crate) struct Context {
    pub(crate) candidates: CandidateList,
    pub(crate) stability: Stability,
}

impl Context {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
