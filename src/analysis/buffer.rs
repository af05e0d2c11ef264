// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Timestamp-aware sliding window over scalar samples

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Slack for floating-point timestamp comparisons
const TIME_EPSILON: f64 = 1e-6;

/// One scalar measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Fixed-duration window of samples ordered by timestamp.
///
/// The window is anchored on the newest sample: after every push, samples
/// older than `newest - window_secs` are evicted. The most recently evicted
/// sample is kept aside as the left edge so that a window whose oldest held
/// sample lands just inside the cutoff still counts as covered.
#[derive(Debug, Clone)]
pub struct TemporalBuffer {
    samples: VecDeque<Sample>,
    edge: Option<Sample>,
    window_secs: f64,
    max_gap_secs: f64,
}

impl TemporalBuffer {
    pub fn new(window_secs: f64) -> Self {
        Self::with_max_gap(window_secs, f64::INFINITY)
    }

    /// Buffer that reports itself stale when two consecutive samples are
    /// further apart than `max_gap_secs`
    pub fn with_max_gap(window_secs: f64, max_gap_secs: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            edge: None,
            window_secs,
            max_gap_secs,
        }
    }

    /// Append a sample and evict everything that fell out of the window.
    ///
    /// A timestamp earlier than the newest sample (or a non-finite one) is
    /// rejected and leaves the buffer untouched.
    pub fn push(&mut self, sample: Sample) -> Result<()> {
        let previous = self.latest().map(|s| s.timestamp);
        let in_order = sample.timestamp.is_finite()
            && previous.map_or(true, |prev| sample.timestamp >= prev);

        if !in_order {
            return Err(PipelineError::OutOfOrderSample {
                previous: previous.unwrap_or(f64::NEG_INFINITY),
                received: sample.timestamp,
            });
        }

        self.samples.push_back(sample);

        let cutoff = sample.timestamp - self.window_secs - TIME_EPSILON;
        while self.samples.front().map(|s| s.timestamp < cutoff).unwrap_or(false) {
            self.edge = self.samples.pop_front();
        }

        Ok(())
    }

    /// Ordered copy of the window
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Sample values in timestamp order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    /// Time covered by the samples currently held
    pub fn span(&self) -> f64 {
        match (self.oldest(), self.latest()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Whether the window covers its full duration.
    ///
    /// Once anything has been evicted, the evicted edge sample lies before the
    /// cutoff, so the held samples cover the window even when no timestamp
    /// falls exactly on `newest - window_secs`.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= 2
            && (self.edge.is_some() || self.span() + TIME_EPSILON >= self.window_secs)
    }

    /// Newest sample evicted from the window, if any
    pub fn edge(&self) -> Option<&Sample> {
        self.edge.as_ref()
    }

    /// Mean spacing between consecutive samples
    pub fn mean_interval(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let span = self.span();
        if span <= 0.0 {
            return None;
        }
        Some(span / (self.samples.len() - 1) as f64)
    }

    /// Estimated sampling rate in Hz; varies with frame skipping
    pub fn effective_sample_rate(&self) -> Option<f64> {
        self.mean_interval().map(|dt| 1.0 / dt)
    }

    /// Largest spacing between consecutive samples, the left edge included
    pub fn max_gap(&self) -> f64 {
        let held = self.edge.iter().chain(self.samples.iter());
        held.clone()
            .zip(held.skip(1))
            .map(|(a, b)| b.timestamp - a.timestamp)
            .fold(0.0, f64::max)
    }

    /// True when the window contains a gap wider than the configured maximum
    pub fn is_stale(&self) -> bool {
        self.max_gap() > self.max_gap_secs + TIME_EPSILON
    }

    /// Linearly interpolate the window onto `count` points spaced `1 / rate_hz`
    /// apart, ending at the newest sample.
    ///
    /// Grid points older than the oldest held sample interpolate from the left
    /// edge. Returns `None` when the history is too short to cover the grid.
    pub fn resample_uniform(&self, rate_hz: f64, count: usize) -> Option<Vec<f64>> {
        if !rate_hz.is_finite() || count < 2 || rate_hz <= 0.0 || self.samples.len() < 2 {
            return None;
        }

        let ordered: Vec<&Sample> = self.edge.iter().chain(self.samples.iter()).collect();

        let dt = 1.0 / rate_hz;
        let last = self.latest()?.timestamp;
        let first = ordered[0].timestamp;
        let start = last - (count - 1) as f64 * dt;
        if start + TIME_EPSILON < first {
            return None;
        }

        let mut output = Vec::with_capacity(count);
        let mut seg = 0;
        for i in 0..count {
            let t = (start + i as f64 * dt).clamp(first, last);

            while seg + 2 < ordered.len() && ordered[seg + 1].timestamp < t {
                seg += 1;
            }

            let a = ordered[seg];
            let b = ordered[seg + 1];
            let width = b.timestamp - a.timestamp;
            let value = if width <= 0.0 {
                b.value
            } else {
                let frac = ((t - a.timestamp) / width).clamp(0.0, 1.0);
                a.value + (b.value - a.value) * frac
            };
            output.push(value);
        }

        Some(output)
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        self.samples.clear();
        self.edge = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(window: f64, rate: f64, seconds: f64) -> TemporalBuffer {
        let mut buffer = TemporalBuffer::new(window);
        let n = (seconds * rate).round() as usize;
        for i in 0..=n {
            buffer.push(Sample::new(i as f64 / rate, i as f64)).unwrap();
        }
        buffer
    }

    #[test]
    fn test_eviction_keeps_window() {
        let buffer = filled(1.0, 10.0, 5.0);
        let snapshot = buffer.snapshot();
        let newest = snapshot.last().unwrap().timestamp;

        assert!(snapshot.iter().all(|s| s.timestamp >= newest - 1.0 - 1e-6));
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(buffer.is_full());
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut buffer = TemporalBuffer::new(2.0);
        buffer.push(Sample::new(1.0, 0.5)).unwrap();
        buffer.push(Sample::new(1.5, 0.7)).unwrap();

        let err = buffer.push(Sample::new(1.2, 9.0)).unwrap_err();
        assert!(matches!(err, PipelineError::OutOfOrderSample { .. }));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest().unwrap().value, 0.7);
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let mut buffer = TemporalBuffer::new(2.0);
        buffer.push(Sample::new(1.0, 0.5)).unwrap();
        assert!(buffer.push(Sample::new(1.0, 0.6)).is_ok());
        assert!(buffer.push(Sample::new(f64::NAN, 0.6)).is_err());
    }

    #[test]
    fn test_is_full_gates_on_duration() {
        let mut buffer = TemporalBuffer::new(2.0);
        for i in 0..30 {
            buffer.push(Sample::new(i as f64 / 30.0, 1.0)).unwrap();
        }
        assert!(!buffer.is_full());

        let buffer = filled(2.0, 30.0, 2.0);
        assert!(buffer.is_full());
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let buffer = filled(1.0, 20.0, 3.0);
        assert_eq!(buffer.snapshot(), buffer.snapshot());
    }

    #[test]
    fn test_effective_rate_tracks_frame_skip() {
        let mut buffer = TemporalBuffer::new(2.0);
        for i in 0..=20 {
            buffer.push(Sample::new(i as f64 * 0.1, 0.0)).unwrap();
        }
        let rate = buffer.effective_sample_rate().unwrap();
        assert!((rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_flags_stale() {
        let mut buffer = TemporalBuffer::with_max_gap(5.0, 0.5);
        buffer.push(Sample::new(0.0, 0.0)).unwrap();
        buffer.push(Sample::new(0.1, 0.0)).unwrap();
        assert!(!buffer.is_stale());

        buffer.push(Sample::new(1.2, 0.0)).unwrap();
        assert!(buffer.is_stale());
    }

    #[test]
    fn test_resample_interpolates_linearly() {
        let mut buffer = TemporalBuffer::new(2.0);
        // Irregular spacing along the line v = 2t
        for &t in &[0.0, 0.13, 0.4, 0.41, 0.77, 1.0] {
            buffer.push(Sample::new(t, 2.0 * t)).unwrap();
        }

        let grid = buffer.resample_uniform(10.0, 11).unwrap();
        assert_eq!(grid.len(), 11);
        for (i, v) in grid.iter().enumerate() {
            assert!((v - 0.2 * i as f64).abs() < 1e-9, "point {} = {}", i, v);
        }
    }

    #[test]
    fn test_resample_requires_coverage() {
        let buffer = filled(2.0, 10.0, 0.5);
        assert!(buffer.resample_uniform(10.0, 20).is_none());
    }

    #[test]
    fn test_off_grid_camera_fills_window() {
        // 33 ms frames never land exactly on `newest - window`
        let mut buffer = TemporalBuffer::new(2.0);
        for i in 0..300 {
            buffer.push(Sample::new(i as f64 * 0.033, 1.0)).unwrap();
            let newest = buffer.latest().unwrap().timestamp;
            assert!(buffer.snapshot().iter().all(|s| s.timestamp >= newest - 2.0 - 1e-6));
        }

        assert!(buffer.span() < 2.0);
        assert!(buffer.is_full());
        assert!(buffer.edge().unwrap().timestamp < buffer.latest().unwrap().timestamp - 2.0);

        let grid = buffer.resample_uniform(30.0, 60).unwrap();
        assert_eq!(grid.len(), 60);
        assert!(grid.iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_jittered_frames_fill_window() {
        // Deterministic +-4 ms jitter around a 30 Hz clock, along v = t
        let mut buffer = TemporalBuffer::with_max_gap(2.0, 0.5);
        for i in 0..240 {
            let jitter = [0.004, -0.003, 0.0, -0.004, 0.002][i % 5];
            let t = i as f64 / 30.0 + jitter;
            buffer.push(Sample::new(t, t)).unwrap();
        }

        assert!(buffer.is_full());
        assert!(!buffer.is_stale());

        let last = buffer.latest().unwrap().timestamp;
        let grid = buffer.resample_uniform(30.0, 60).unwrap();
        for (i, v) in grid.iter().enumerate() {
            let expected = last - (59 - i) as f64 / 30.0;
            assert!((v - expected).abs() < 1e-9, "point {} = {}", i, v);
        }
    }

    #[test]
    fn test_gap_across_edge_flags_stale() {
        let mut buffer = TemporalBuffer::with_max_gap(1.0, 0.5);
        for i in 0..=10 {
            buffer.push(Sample::new(i as f64 * 0.1, 0.0)).unwrap();
        }
        // Everything before the jump is evicted; the edge keeps the hole visible
        buffer.push(Sample::new(5.0, 0.0)).unwrap();
        buffer.push(Sample::new(5.1, 0.0)).unwrap();

        assert!(buffer.is_full());
        assert!(buffer.is_stale());

        buffer.clear();
        assert!(buffer.edge().is_none());
        assert!(!buffer.is_full());
    }
}
