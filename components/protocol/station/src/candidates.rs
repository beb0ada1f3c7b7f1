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

use heapless::Vec;

use crate::*;

/// Access points found by the last scan that the node could link to
#[derive(Debug, Default)]
pub struct CandidateList {
    records: Vec<AccessPointRecord, MAX_SCAN_RECORDS>,
}

impl CandidateList {
    /// Replace the list with the records of a new scan
    ///
    /// Records of nodes already reachable over the mesh are skipped. When more records arrive
    /// than fit, the weakest ones are dropped, except for `pinned` which is always kept.
    /// Returns the number of dropped records.
    pub fn replace(
        &mut self,
        records: impl IntoIterator<Item = AccessPointRecord>,
        registry: &impl ConnectionRegistry,
        pinned: Option<&HardwareAddress>,
    ) -> usize {
        self.records.clear();
        let mut dropped = 0;
        for record in records {
            let id = derive_node_id(&record.bssid);
            debug!(
                "found {} ({}) {} dBm, channel {}",
                record.ssid, id, record.rssi, record.channel
            );
            if registry.lookup_connection(id) {
                continue;
            }
            if let Err(record) = self.records.push(record) {
                dropped += 1;
                let keep = Some(&record.bssid) == pinned;
                if let Some(weakest) = self.weakest(pinned) {
                    if keep || record.rssi > self.records[weakest].rssi {
                        self.records.remove(weakest);
                        // cannot fail, a slot was just freed
                        let _ = self.records.push(record);
                    }
                }
            }
        }
        if dropped > 0 {
            warn!("scan list full, dropped {} records", dropped);
        }
        dropped
    }

    /// Position of the weakest record, the last one seen among equals
    fn weakest(&self, pinned: Option<&HardwareAddress>) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| Some(&record.bssid) != pinned)
            .min_by(|(a_pos, a), (b_pos, b)| a.rssi.cmp(&b.rssi).then(b_pos.cmp(a_pos)))
            .map(|(position, _)| position)
    }

    /// Remove records of nodes that are already reachable over the mesh
    pub fn retain_unknown(&mut self, registry: &impl ConnectionRegistry) {
        self.records
            .retain(|record| !registry.lookup_connection(derive_node_id(&record.bssid)));
    }

    /// Sort by signal strength, strongest first
    ///
    /// Records with equal strength keep their order.
    pub fn rank(&mut self) {
        for i in 1..self.records.len() {
            let rssi = self.records[i].rssi;
            let slot = self.records[..i]
                .iter()
                .rposition(|record| record.rssi >= rssi)
                .map_or(0, |position| position + 1);
            self.records[slot..=i].rotate_right(1);
        }
    }

    /// Remove the first record, the strongest one once ranked
    pub fn pop_strongest(&mut self) -> Option<AccessPointRecord> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.records.remove(0))
        }
    }

    /// Remove the record of the given access point
    pub fn take(&mut self, bssid: &HardwareAddress) -> Option<AccessPointRecord> {
        let position = self
            .records
            .iter()
            .position(|record| record.bssid == *bssid)?;
        Some(self.records.remove(position))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessPointRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn fill(
        candidates: &mut CandidateList,
        records: impl IntoIterator<Item = AccessPointRecord>,
    ) -> usize {
        candidates.replace(records, &FakeRegistry::default(), None)
    }

    #[test]
    fn filter_known_nodes() {
        let mut candidates = CandidateList::default();
        fill(&mut candidates, [record(1, -60), record(2, -50), record(3, -70)]);
        let registry = FakeRegistry::knowing(&[node(2), node(3)]);
        candidates.retain_unknown(&registry);
        assert_eq!(candidates.len(), 1);
        for record in candidates.iter() {
            assert!(!registry.lookup_connection(derive_node_id(&record.bssid)));
        }
    }

    #[test]
    fn rank_strongest_first() {
        let mut candidates = CandidateList::default();
        fill(&mut candidates, [
            record(1, -80),
            record(2, -40),
            record(3, -90),
            record(4, -55),
            record(5, -40),
        ]);
        candidates.rank();
        let ranked: std::vec::Vec<_> = candidates.iter().collect();
        for pair in ranked.windows(2) {
            assert!(pair[0].rssi >= pair[1].rssi);
        }
        // equal strength keeps scan order
        assert_eq!(ranked[0].bssid, address(2));
        assert_eq!(ranked[1].bssid, address(5));
        assert_eq!(ranked[4].bssid, address(3));
    }

    #[test]
    fn rank_is_deterministic() {
        let records = [record(7, -61), record(3, -61), record(9, -20), record(1, -61)];
        let mut a = CandidateList::default();
        let mut b = CandidateList::default();
        fill(&mut a, records);
        fill(&mut b, records);
        a.rank();
        b.rank();
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn pop_and_take() {
        let mut candidates = CandidateList::default();
        assert_eq!(candidates.pop_strongest(), None);
        fill(&mut candidates, [record(1, -70), record(2, -30)]);
        candidates.rank();
        assert_eq!(candidates.pop_strongest().map(|r| r.bssid), Some(address(2)));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates.take(&address(2)), None);
        assert_eq!(candidates.take(&address(1)).map(|r| r.rssi), Some(-70));
        assert!(candidates.is_empty());
    }

    #[test]
    fn replace_skips_known_nodes() {
        let mut candidates = CandidateList::default();
        let registry = FakeRegistry::knowing(&[node(1)]);
        let dropped = candidates.replace([record(1, -20), record(2, -70)], &registry, None);
        assert_eq!(dropped, 0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates.iter().next().map(|r| r.bssid), Some(address(2)));
    }

    #[test]
    fn replace_keeps_strongest() {
        let mut candidates = CandidateList::default();
        fill(&mut candidates, [record(200, -10)]);
        let records = (0..MAX_SCAN_RECORDS as u8)
            .map(|n| record(n, -50))
            .chain([record(100, -20), record(101, -90), record(102, -50)]);
        let dropped = fill(&mut candidates, records);
        assert_eq!(dropped, 3);
        assert_eq!(candidates.len(), MAX_SCAN_RECORDS);
        assert!(candidates.iter().any(|r| r.bssid == address(100)));
        assert!(!candidates.iter().any(|r| r.bssid == address(101)));
        // equal strength keeps the records seen first
        assert!(!candidates.iter().any(|r| r.bssid == address(102)));
        assert!(candidates.iter().any(|r| r.bssid == address(0)));
        assert!(!candidates.iter().any(|r| r.bssid == address(200)));
    }

    #[test]
    fn known_nodes_do_not_fill_list() {
        let known: std::vec::Vec<_> = (1..=MAX_SCAN_RECORDS as u8).map(node).collect();
        let registry = FakeRegistry::knowing(&known);
        let mut candidates = CandidateList::default();
        let records = (1..=MAX_SCAN_RECORDS as u8)
            .map(|n| record(n, -80))
            .chain([record(100, -85)]);
        assert_eq!(candidates.replace(records, &registry, None), 0);
        assert_eq!(candidates.pop_strongest().map(|r| r.bssid), Some(address(100)));
    }

    #[test]
    fn pinned_record_survives_overflow() {
        let mut candidates = CandidateList::default();
        let registry = FakeRegistry::default();
        let records = (0..MAX_SCAN_RECORDS as u8)
            .map(|n| record(n, -40))
            .chain([record(100, -95)]);
        candidates.replace(records, &registry, Some(&address(100)));
        assert_eq!(candidates.len(), MAX_SCAN_RECORDS);
        assert_eq!(candidates.take(&address(100)).map(|r| r.rssi), Some(-95));
    }
}
