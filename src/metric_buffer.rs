// Bounded per-unit history of (CPU%, memory%) samples.
// Survives status transitions; dropped only when the unit leaves the inventory.

use crate::models::MetricSample;
use std::collections::{HashMap, VecDeque};

/// Samples kept per unit when not configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug)]
pub struct MetricBuffer {
    capacity: usize,
    buffers: HashMap<String, VecDeque<MetricSample>>,
}

impl Default for MetricBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MetricBuffer {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends, evicting the oldest sample once capacity is reached.
    /// Creates the buffer for unknown ids.
    pub fn push(&mut self, unit_id: &str, sample: MetricSample) {
        let capacity = self.capacity;
        let buf = self
            .buffers
            .entry(unit_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        while buf.len() >= capacity {
            buf.pop_front();
        }
        buf.push_back(sample);
    }

    /// Copy of the unit's samples, oldest first. Empty for unknown ids.
    pub fn snapshot(&self, unit_id: &str) -> Vec<MetricSample> {
        self.buffers
            .get(unit_id)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, unit_id: &str) -> Option<MetricSample> {
        self.buffers.get(unit_id).and_then(|b| b.back().copied())
    }

    pub fn evict(&mut self, unit_id: &str) -> bool {
        self.buffers.remove(unit_id).is_some()
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.buffers.contains_key(unit_id)
    }

    /// Number of units with a buffer.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(v: f64) -> MetricSample {
        MetricSample {
            cpu_percent: v,
            memory_percent: v * 2.0,
            timestamp: v as u64,
        }
    }

    #[test]
    fn keeps_most_recent_samples_in_order() {
        let mut buf = MetricBuffer::new(20);
        for i in 1..=25 {
            buf.push("u1", sample(i as f64));
        }
        let cpu: Vec<f64> = buf.snapshot("u1").iter().map(|s| s.cpu_percent).collect();
        let expected: Vec<f64> = (6..=25).map(|i| i as f64).collect();
        assert_eq!(cpu, expected);
    }

    #[test]
    fn never_exceeds_capacity_for_any_push_count() {
        for capacity in [1usize, 3, 20] {
            let mut buf = MetricBuffer::new(capacity);
            for n in 0..(capacity * 3) {
                buf.push("u", sample(n as f64));
                let snap = buf.snapshot("u");
                assert_eq!(snap.len(), (n + 1).min(capacity));
                assert_eq!(snap.last().map(|s| s.cpu_percent), Some(n as f64));
            }
        }
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut buf = MetricBuffer::new(5);
        buf.push("u1", sample(1.0));
        let mut snap = buf.snapshot("u1");
        snap.clear();
        assert_eq!(buf.snapshot("u1").len(), 1);
    }

    #[test]
    fn evict_drops_only_that_unit() {
        let mut buf = MetricBuffer::new(5);
        buf.push("u1", sample(1.0));
        buf.push("u2", sample(2.0));
        assert!(buf.evict("u1"));
        assert!(!buf.evict("u1"));
        assert!(buf.snapshot("u1").is_empty());
        assert_eq!(buf.latest("u2").map(|s| s.cpu_percent), Some(2.0));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = MetricBuffer::new(0);
        buf.push("u1", sample(1.0));
        buf.push("u1", sample(2.0));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.snapshot("u1").len(), 1);
    }
}
