use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::history::Reading;

/// Per-sensor rolling window of the most recent readings.
///
/// Sensors are added the first time a reading for them is recorded and
/// are never removed. Each window holds at most `capacity` readings in
/// arrival order, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    /// Sensor ids in first-seen order
    order: Vec<String>,
    windows: HashMap<String, VecDeque<Reading>>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: Vec::new(),
            windows: HashMap::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a reading to its sensor's window, evicting the oldest one
    /// when the window is full.
    ///
    /// Readings with identical timestamps are all kept.
    pub fn record(&mut self, reading: Reading) {
        let capacity = self.capacity;
        let order = &mut self.order;
        let window = self
            .windows
            .entry(reading.sensor_id.clone())
            .or_insert_with(|| {
                order.push(reading.sensor_id.clone());
                VecDeque::new()
            });

        if capacity == 0 {
            return;
        }

        // Evict before pushing so the window never holds more than capacity
        if window.len() >= capacity {
            window.pop_front();
        }
        window.push_back(reading);
    }

    /// Current window for a sensor, oldest first. Empty for unknown sensors.
    #[must_use]
    pub fn snapshot(&self, sensor_id: &str) -> Vec<Reading> {
        self.windows
            .get(sensor_id)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Newest reading for a sensor.
    #[must_use]
    pub fn latest(&self, sensor_id: &str) -> Option<&Reading> {
        self.windows.get(sensor_id).and_then(VecDeque::back)
    }

    /// Reading whose timestamp is closest to `at`.
    ///
    /// Assumes the window is in non-decreasing timestamp order. On a tie
    /// the earlier reading wins.
    #[must_use]
    pub fn nearest(&self, sensor_id: &str, at: DateTime<Utc>) -> Option<&Reading> {
        let window = self.windows.get(sensor_id)?;
        let idx = window.partition_point(|r| r.timestamp < at);

        let before = idx.checked_sub(1).and_then(|i| window.get(i));
        let after = window.get(idx);

        match (before, after) {
            (Some(b), Some(a)) => {
                if at - b.timestamp > a.timestamp - at {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }

    /// Every known sensor id, in the order they were first seen.
    #[must_use]
    pub fn sensor_ids(&self) -> &[String] {
        &self.order
    }

    /// Number of known sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_CAPACITY)
    }
}
