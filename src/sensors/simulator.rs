// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Scenario simulator for demo/testing
//!
//! Produces what the optical-flow and landmark collaborators would report
//! for a subject on a fixed camera, including frame jitter and landmark
//! frame-skipping.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::analysis::{FaceSample, PoseSample};
use crate::config::DemoConfig;
use crate::error::Result;
use super::{FrameMeasurement, MeasurementSource, Observation};

/// Seconds of calm before the scripted event
const ONSET_SECS: f64 = 3.0;
const CONVULSION_SECS: f64 = 6.0;
const CONVULSION_HZ: f64 = 6.0;
const DROP_SECS: f64 = 0.3;

/// Scripted subject behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Subject at rest
    Calm,
    /// Rhythmic clonic motion while standing
    Convulsion,
    /// Collapse to the floor, then lying still
    Fall,
    /// Collapse followed by convulsive motion on the floor
    Mixed,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Calm,
        Scenario::Convulsion,
        Scenario::Fall,
        Scenario::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Calm => "calm",
            Scenario::Convulsion => "convulsion",
            Scenario::Fall => "fall",
            Scenario::Mixed => "mixed",
        }
    }

    fn convulsing(&self, t: f64) -> bool {
        let start = match self {
            Scenario::Convulsion => ONSET_SECS,
            Scenario::Mixed => ONSET_SECS + 1.0,
            _ => return false,
        };
        t >= start && t < start + CONVULSION_SECS
    }

    fn falls(&self) -> bool {
        matches!(self, Scenario::Fall | Scenario::Mixed)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown scenario '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Simulates one camera feed
pub struct ScenarioSimulator {
    name: String,
    scenario: Scenario,
    config: DemoConfig,
    rng: StdRng,
    frame: u64,
    limit: Option<u64>,
    last_timestamp: f64,
}

impl ScenarioSimulator {
    pub fn new(scenario: Scenario, config: DemoConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            name: format!("sim-{}", scenario),
            scenario,
            config,
            rng,
            frame: 0,
            limit: None,
            last_timestamp: f64::NEG_INFINITY,
        }
    }

    /// Stop after `frames` frames
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    fn gauss(&mut self, std_dev: f64) -> f64 {
        match Normal::new(0.0, std_dev) {
            Ok(normal) => self.rng.sample::<f64, _>(normal),
            Err(_) => 0.0,
        }
    }

    fn generate(&mut self) -> FrameMeasurement {
        let fps = self.config.fps.max(1.0);
        let i = self.frame;
        self.frame += 1;

        let nominal = i as f64 / fps;
        let max_jitter = 0.25 / fps;
        let jitter = self.gauss(self.config.jitter_secs).clamp(-max_jitter, max_jitter);
        let timestamp = (nominal + jitter).max(self.last_timestamp + 1e-6).max(0.0);
        self.last_timestamp = timestamp;

        let motion = self.motion_at(timestamp);

        let pose = if i % u64::from(self.config.pose_every.max(1)) == 0 {
            Observation::Seen(self.pose_at(timestamp))
        } else {
            Observation::Skipped
        };

        let face = if i % u64::from(self.config.face_every.max(1)) == 0 {
            Observation::Seen(self.face_at(timestamp))
        } else {
            Observation::Skipped
        };

        FrameMeasurement { timestamp, motion, pose, face }
    }

    fn motion_at(&mut self, t: f64) -> f64 {
        let value = if self.scenario.convulsing(t) {
            0.8 + 0.7 * (2.0 * PI * CONVULSION_HZ * t).sin() + self.gauss(0.05)
        } else if self.scenario.falls() && (ONSET_SECS..ONSET_SECS + DROP_SECS).contains(&t) {
            0.6 + self.gauss(0.05)
        } else {
            // Breathing and small postural sway
            0.05 + 0.02 * (2.0 * PI * 0.3 * t).sin() + self.gauss(0.005)
        };
        value.max(0.0)
    }

    fn pose_at(&mut self, t: f64) -> PoseSample {
        let (centroid_y, aspect_ratio) = if !self.scenario.falls() || t < ONSET_SECS {
            (0.3, 3.5)
        } else if t < ONSET_SECS + DROP_SECS {
            (0.3 + (t - ONSET_SECS) / DROP_SECS * 0.5, 1.0)
        } else {
            (0.8, 0.28)
        };

        let shake = if self.scenario.convulsing(t) {
            0.005 * (2.0 * PI * CONVULSION_HZ * t).sin()
        } else {
            0.0
        };

        PoseSample {
            timestamp: t,
            centroid_x: 0.5 + self.gauss(0.003),
            centroid_y: centroid_y + shake + self.gauss(0.002),
            aspect_ratio: (aspect_ratio + self.gauss(0.008)).max(0.05),
        }
    }

    fn face_at(&mut self, t: f64) -> FaceSample {
        let (displacement, sway) = if self.scenario.convulsing(t) {
            (0.25 + self.gauss(0.05).abs(), 0.02 * (2.0 * PI * CONVULSION_HZ * t).sin())
        } else {
            (0.01 + self.gauss(0.003).abs(), 0.0)
        };

        let x = 0.5 + sway + self.gauss(0.001);
        let y = 0.2 + self.gauss(0.001);
        FaceSample::new(t, displacement).with_head(x, y)
    }
}

impl MeasurementSource for ScenarioSimulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Option<Result<FrameMeasurement>> {
        if self.limit.map_or(false, |limit| self.frame >= limit) {
            return None;
        }
        Some(Ok(self.generate()))
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(self.config.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(scenario: Scenario, count: u64) -> Vec<FrameMeasurement> {
        let mut sim = ScenarioSimulator::new(scenario, DemoConfig::default()).with_limit(count);
        std::iter::from_fn(|| sim.next_frame()).map(|f| f.unwrap()).collect()
    }

    #[test]
    fn test_scenario_parse() {
        assert_eq!("Mixed".parse::<Scenario>().unwrap(), Scenario::Mixed);
        assert!("seizure".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_limit_and_monotonic_timestamps() {
        let frames = frames(Scenario::Convulsion, 120);
        assert_eq!(frames.len(), 120);
        assert!(frames.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
        assert!(frames.iter().all(|f| f.motion >= 0.0));
    }

    #[test]
    fn test_landmark_cadence() {
        let frames = frames(Scenario::Calm, 30);
        let poses = frames.iter().filter(|f| f.pose.seen().is_some()).count();
        let faces = frames.iter().filter(|f| f.face.seen().is_some()).count();
        assert_eq!(poses, 10);
        assert_eq!(faces, 15);
        assert!(frames[1].pose.is_skipped());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        assert_eq!(frames(Scenario::Mixed, 200), frames(Scenario::Mixed, 200));
    }

    #[test]
    fn test_convulsion_shakes_head() {
        let frames = frames(Scenario::Convulsion, 180);
        let heads: Vec<(f64, f64)> = frames
            .iter()
            .filter_map(|f| f.face.seen())
            .filter_map(|face| face.head.map(|h| (face.timestamp, h.x)))
            .collect();

        assert!(heads.iter().filter(|(t, _)| *t < 3.0).all(|(_, x)| (x - 0.5).abs() < 0.01));
        assert!(heads.iter().any(|(t, x)| *t > 3.0 && (x - 0.5).abs() > 0.012));
    }

    #[test]
    fn test_fall_lies_down_after_onset() {
        let frames = frames(Scenario::Fall, 150);
        let last_pose = frames.iter().rev().find_map(|f| f.pose.seen().copied()).unwrap();
        assert!(last_pose.aspect_ratio < 1.0 / 3.0);
        assert!(last_pose.centroid_y > 0.7);
    }
}
