/*
 *  history.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bounded rolling history of chartable values
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::constants::HISTORY_CAPACITY;
use crate::decode::Snapshot;

/// One charted sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp_ms: i64,
    pub forward_power_w: Option<f64>,
    pub reflected_power_w: Option<f64>,
    pub level_left: Option<f64>,
    pub level_right: Option<f64>,
}

impl HistoryPoint {
    /// `None` when the snapshot has nothing worth charting.
    pub fn from_snapshot(timestamp_ms: i64, snapshot: &Snapshot) -> Option<Self> {
        let point = HistoryPoint {
            timestamp_ms,
            forward_power_w: snapshot.rf.forward_power_w,
            reflected_power_w: snapshot.rf.reflected_power_w,
            level_left: snapshot.audio.vu_left,
            level_right: snapshot.audio.vu_right,
        };
        point.has_values().then_some(point)
    }

    pub fn has_values(&self) -> bool {
        self.forward_power_w.is_some()
            || self.reflected_power_w.is_some()
            || self.level_left.is_some()
            || self.level_right.is_some()
    }
}

/// FIFO of at most `capacity` points, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryStore {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends and evicts from the front until within capacity.
    /// A timestamp older than the newest point is pulled forward to it, so
    /// the sequence stays non-decreasing even if the wall clock steps back.
    pub fn append(&mut self, mut point: HistoryPoint) {
        if let Some(last) = self.points.back() {
            point.timestamp_ms = point.timestamp_ms.max(last.timestamp_ms);
        }
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Owned copy, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ts: i64) -> HistoryPoint {
        HistoryPoint {
            timestamp_ms: ts,
            forward_power_w: Some(ts as f64),
            reflected_power_w: None,
            level_left: None,
            level_right: None,
        }
    }

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let mut store = HistoryStore::new();
        for ts in 0..1001 {
            store.append(point(ts));
        }
        assert_eq!(store.len(), 1000);
        let points = store.snapshot();
        assert_eq!(points.first().map(|p| p.timestamp_ms), Some(1));
        assert_eq!(points.last().map(|p| p.timestamp_ms), Some(1000));
        assert!(points.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    #[test]
    fn test_clock_step_back_keeps_order() {
        let mut store = HistoryStore::with_capacity(4);
        store.append(point(500));
        store.append(point(400));
        let points = store.snapshot();
        assert_eq!(points[1].timestamp_ms, 500);
        assert_eq!(points[1].forward_power_w, Some(400.0));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = HistoryStore::with_capacity(4);
        store.append(point(1));
        let copy = store.snapshot();
        store.clear();
        assert_eq!(copy.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_snapshot_produces_no_point() {
        assert_eq!(HistoryPoint::from_snapshot(1, &Snapshot::default()), None);

        let mut snap = Snapshot::default();
        snap.audio.vu_right = Some(12.0);
        let p = HistoryPoint::from_snapshot(7, &snap);
        assert_eq!(p.map(|p| p.level_right), Some(Some(12.0)));
    }
}
