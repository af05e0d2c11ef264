// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Per-frame measurement types and the source trait

use serde::{Deserialize, Serialize};

use crate::analysis::{FaceSample, PoseSample};
use crate::error::Result;

/// Landmark output for one frame.
///
/// Landmark extraction runs on its own cadence, so most frames carry no
/// landmark result at all.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation<T> {
    /// Extraction did not run on this frame
    #[default]
    Skipped,
    /// Extraction ran but found nothing (occluded, out of frame)
    Lost,
    Seen(T),
}

impl<T> Observation<T> {
    pub fn seen(&self) -> Option<&T> {
        match self {
            Observation::Seen(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Observation::Skipped)
    }
}

/// Everything the collaborators computed for one processed video frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeasurement {
    /// Frame time in seconds
    pub timestamp: f64,
    /// Optical-flow motion magnitude inside the subject ROI
    pub motion: f64,
    #[serde(default)]
    pub pose: Observation<PoseSample>,
    #[serde(default)]
    pub face: Observation<FaceSample>,
}

impl FrameMeasurement {
    /// Motion only, no landmark output
    pub fn motion_only(timestamp: f64, motion: f64) -> Self {
        Self {
            timestamp,
            motion,
            pose: Observation::Skipped,
            face: Observation::Skipped,
        }
    }
}

/// Produces frames in timestamp order
pub trait MeasurementSource: Send {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Next frame, `None` when the source is exhausted
    fn next_frame(&mut self) -> Option<Result<FrameMeasurement>>;

    /// Nominal frame rate, if the source knows it
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}
