// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Facial distortion - landmark displacement against a short-term baseline,
//! plus a head-shake component from the tracked head position

use serde::{Deserialize, Serialize};

use crate::config::FacialConfig;
use crate::error::Result;
use super::{Assessment, Sample, SymptomKind, SymptomScore, TemporalBuffer};
use super::statistics::{mean, std_dev};

/// Fewest head positions needed before shaking is scored
const MIN_HEAD_SAMPLES: usize = 5;

/// Head reference point (nose tip) in normalized image units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPoint {
    pub x: f64,
    pub y: f64,
}

/// Face landmark displacement from the landmark collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSample {
    pub timestamp: f64,
    /// Mean landmark displacement since the previous face frame
    pub displacement: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadPoint>,
}

impl FaceSample {
    pub fn new(timestamp: f64, displacement: f64) -> Self {
        Self { timestamp, displacement, head: None }
    }

    pub fn with_head(mut self, x: f64, y: f64) -> Self {
        self.head = Some(HeadPoint { x, y });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialReading {
    pub timestamp: f64,
    /// Larger of the distortion and head-shake components
    pub confidence: f64,
    pub recent_displacement: f64,
    pub baseline_displacement: f64,
    pub head_shake: f64,
}

impl FacialReading {
    pub fn score(&self) -> SymptomScore {
        SymptomScore::new(SymptomKind::FacialDistortion, self.confidence, self.timestamp)
    }
}

/// Auxiliary, low-weight analyzer
pub struct FacialAnalyzer {
    config: FacialConfig,
    recent: TemporalBuffer,
    baseline: TemporalBuffer,
    head_x: TemporalBuffer,
    head_y: TemporalBuffer,
}

impl FacialAnalyzer {
    pub fn new(config: FacialConfig) -> Self {
        Self {
            recent: TemporalBuffer::with_max_gap(config.recent_window_secs, config.max_gap_secs),
            baseline: TemporalBuffer::with_max_gap(config.baseline_window_secs, config.max_gap_secs),
            head_x: TemporalBuffer::with_max_gap(config.shake_window_secs, config.max_gap_secs),
            head_y: TemporalBuffer::with_max_gap(config.shake_window_secs, config.max_gap_secs),
            config,
        }
    }

    /// Pipeline time of the newest face sample
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.baseline.latest().map(|s| s.timestamp)
    }

    pub fn update(&mut self, sample: &FaceSample) -> Result<Assessment<FacialReading>> {
        let value = if sample.displacement.is_finite() { sample.displacement.abs() } else { 0.0 };

        self.baseline.push(Sample::new(sample.timestamp, value))?;
        self.recent.push(Sample::new(sample.timestamp, value))?;

        match sample.head {
            Some(head) if head.x.is_finite() && head.y.is_finite() => {
                self.head_x.push(Sample::new(sample.timestamp, head.x))?;
                self.head_y.push(Sample::new(sample.timestamp, head.y))?;
            }
            // Untracked head: shaking restarts from scratch
            _ => {
                self.head_x.clear();
                self.head_y.clear();
            }
        }

        if !self.baseline.is_full() || self.baseline.is_stale() {
            return Ok(Assessment::InsufficientData);
        }

        let recent_displacement = mean(&self.recent.values());
        let baseline_displacement = mean(&self.baseline.values());
        let excess = (recent_displacement - baseline_displacement).max(0.0);
        let distortion = (excess / self.config.distortion_scale).clamp(0.0, 1.0);
        let head_shake = self.head_shake();

        Ok(Assessment::Ready(FacialReading {
            timestamp: sample.timestamp,
            confidence: distortion.max(head_shake),
            recent_displacement,
            baseline_displacement,
            head_shake,
        }))
    }

    /// Rapid back-and-forth head motion in `[0, 1]`, scored on whichever axis
    /// (shaking or nodding) moves most.
    ///
    /// Blends how often the head reverses direction with how far it spreads
    /// around its mean position; steps under `shake_min_step` are ignored
    /// when counting reversals.
    fn head_shake(&self) -> f64 {
        if self.head_x.len() < MIN_HEAD_SAMPLES || self.head_x.is_stale() {
            return 0.0;
        }

        [self.head_x.values(), self.head_y.values()]
            .iter()
            .map(|positions| {
                let turns = (positions.len() - 2) as f64;
                let oscillation = self.reversals(positions) as f64 / turns;
                let movement = (std_dev(positions) / self.config.shake_spread_scale).min(1.0);
                ((0.5 * oscillation + 0.3 * movement) * 1.5).clamp(0.0, 1.0)
            })
            .fold(0.0, f64::max)
    }

    /// Direction changes between consecutive significant steps
    fn reversals(&self, positions: &[f64]) -> usize {
        let directions: Vec<bool> = positions
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|step| step.abs() >= self.config.shake_min_step)
            .map(|step| step > 0.0)
            .collect();

        directions.windows(2).filter(|d| d[0] != d[1]).count()
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        self.baseline.clear();
        self.head_x.clear();
        self.head_y.clear();
    }
}
