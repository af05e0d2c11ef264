// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Posture and fall analysis from body centroid and bounding-box geometry

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PostureConfig;
use crate::error::Result;
use super::{Sample, SymptomKind, SymptomScore, TemporalBuffer};
use super::statistics::median;

const TIME_EPSILON: f64 = 1e-9;

/// Body orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostureState {
    Standing,
    Transitioning,
    Fallen,
    #[default]
    Unknown,
}

/// Pose geometry from the landmark collaborator.
///
/// Coordinates are normalized image units with `y` growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub timestamp: f64,
    pub centroid_x: f64,
    pub centroid_y: f64,
    /// Bounding-box height / width
    pub aspect_ratio: f64,
}

/// Result of one posture update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureReading {
    pub timestamp: f64,
    pub state: PostureState,
    pub confidence: f64,
    /// Smoothed downward velocity, if enough history exists
    pub vertical_velocity: Option<f64>,
    /// A descent was flagged within the correlation window
    pub descent: bool,
}

impl PostureReading {
    pub fn score(&self) -> SymptomScore {
        SymptomScore::new(SymptomKind::Fall, self.confidence, self.timestamp)
    }
}

/// Fall analyzer
pub struct PostureAnalyzer {
    config: PostureConfig,
    centroid_y: TemporalBuffer,
    state: PostureState,
    descent_at: Option<f64>,
    last_upright_at: Option<f64>,
    lying_since: Option<f64>,
    fallen_at: Option<f64>,
}

impl PostureAnalyzer {
    pub fn new(config: PostureConfig) -> Self {
        Self {
            centroid_y: TemporalBuffer::new(config.velocity_window_secs),
            config,
            state: PostureState::Unknown,
            descent_at: None,
            last_upright_at: None,
            lying_since: None,
            fallen_at: None,
        }
    }

    pub fn state(&self) -> PostureState {
        self.state
    }

    /// Feed one pose observation
    pub fn update(&mut self, sample: &PoseSample) -> Result<PostureReading> {
        let ratio_ok = sample.aspect_ratio.is_finite() && sample.aspect_ratio > 0.0;
        if !ratio_ok || !sample.centroid_y.is_finite() {
            return Ok(self.lost(sample.timestamp));
        }

        self.centroid_y.push(Sample::new(sample.timestamp, sample.centroid_y))?;
        let now = sample.timestamp;

        let velocity = self.vertical_velocity();
        if velocity.map_or(false, |v| v > self.config.velocity_threshold) {
            if !self.descent_recent(now) {
                debug!("descent flagged at t={:.3} (v={:.3})", now, velocity.unwrap_or(0.0));
            }
            self.descent_at = Some(now);
        }

        let upright = sample.aspect_ratio >= self.config.upright_ratio;
        let lying = sample.aspect_ratio <= self.config.lying_ratio;

        let previous = self.state;
        self.state = match self.state {
            PostureState::Unknown | PostureState::Standing => {
                if lying && self.descent_recent(now) && self.upright_recent(now) {
                    self.lying_since = Some(now);
                    PostureState::Transitioning
                } else {
                    PostureState::Standing
                }
            }
            PostureState::Transitioning if lying => PostureState::Transitioning,
            PostureState::Transitioning => {
                self.lying_since = None;
                PostureState::Standing
            }
            PostureState::Fallen if upright => {
                self.lying_since = None;
                self.fallen_at = None;
                PostureState::Standing
            }
            PostureState::Fallen => PostureState::Fallen,
        };

        if self.state == PostureState::Transitioning {
            let held = self.lying_since.map_or(0.0, |since| now - since);
            if held + TIME_EPSILON >= self.config.min_hold_secs {
                self.state = PostureState::Fallen;
                self.fallen_at = Some(now);
            }
        }

        if upright {
            self.last_upright_at = Some(now);
        }

        if previous != self.state {
            debug!("posture {:?} -> {:?} at t={:.3}", previous, self.state, now);
        }

        Ok(PostureReading {
            timestamp: now,
            state: self.state,
            confidence: self.confidence(now),
            vertical_velocity: velocity,
            descent: self.descent_recent(now),
        })
    }

    /// Landmarks missing or occluded: forget everything
    pub fn lost(&mut self, timestamp: f64) -> PostureReading {
        if self.state != PostureState::Unknown {
            debug!("pose lost at t={:.3}", timestamp);
        }
        self.reset();

        PostureReading {
            timestamp,
            state: PostureState::Unknown,
            confidence: 0.0,
            vertical_velocity: None,
            descent: false,
        }
    }

    pub fn reset(&mut self) {
        self.centroid_y.clear();
        self.state = PostureState::Unknown;
        self.descent_at = None;
        self.last_upright_at = None;
        self.lying_since = None;
        self.fallen_at = None;
    }

    /// Pipeline time of the newest pose sample
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.centroid_y.latest().map(|s| s.timestamp)
    }

    /// Median of step velocities over the short centroid window
    fn vertical_velocity(&self) -> Option<f64> {
        let snapshot = self.centroid_y.snapshot();
        let steps: Vec<f64> = snapshot
            .windows(2)
            .filter_map(|w| {
                let dt = w[1].timestamp - w[0].timestamp;
                (dt > 0.0).then(|| (w[1].value - w[0].value) / dt)
            })
            .collect();

        if steps.is_empty() {
            None
        } else {
            Some(median(&steps))
        }
    }

    fn descent_recent(&self, now: f64) -> bool {
        self.descent_at
            .map_or(false, |t| now - t <= self.config.correlation_secs + TIME_EPSILON)
    }

    fn upright_recent(&self, now: f64) -> bool {
        self.last_upright_at
            .map_or(false, |t| now - t <= self.config.correlation_secs + TIME_EPSILON)
    }

    /// Fallen was entered within the correlation window after the descent,
    /// and that window (counted from entering Fallen) is still open
    fn correlated_fall(&self, now: f64) -> bool {
        let window = self.config.correlation_secs + TIME_EPSILON;
        match (self.fallen_at, self.descent_at) {
            (Some(fallen), Some(descent)) => fallen - descent <= window && now - fallen <= window,
            _ => false,
        }
    }

    /// High while a fall is correlated with its descent; a lone descent, a fall
    /// still being confirmed, or a long lie-down scores medium
    fn confidence(&self, now: f64) -> f64 {
        match self.state {
            PostureState::Fallen if self.correlated_fall(now) => self.config.high_confidence,
            PostureState::Fallen | PostureState::Transitioning => self.config.medium_confidence,
            _ if self.descent_recent(now) => self.config.medium_confidence,
            _ => 0.0,
        }
    }
}
