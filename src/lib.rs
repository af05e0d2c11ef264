// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Seizure Sentinel - real-time convulsion and fall alerting
//!
//! Turns per-frame motion and landmark measurements from a fixed camera into
//! symptom confidences and a stable, cooldown-protected alert decision:
//! - Spectral motion analysis (uniform resampling, Hann window, FFT band energy)
//! - Fall detection from centroid velocity and bounding-box orientation
//! - Auxiliary facial-distortion score
//! - Weighted symptom fusion with strict frame persistence
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Monitor                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────────────┐   ┌─────────────────┐  │
//! │  │ Sensors  │ → │ Analysis          │ → │ Detection       │  │
//! │  │ (frames) │   │ motion/pose/face  │   │ fusion + state  │  │
//! │  └──────────┘   └───────────────────┘   └─────────────────┘  │
//! │        one Session per camera, single writer                 │
//! │                           ↓                                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              Event Bus (alerts, status)                │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![allow(dead_code)]

pub mod core;
pub mod sensors;
pub mod analysis;
pub mod detection;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{EventBus, Monitor, Session, SessionHandle, SessionStatus};
pub use sensors::{FrameMeasurement, MeasurementSource, Observation};
pub use analysis::{SymptomKind, SymptomScore, PostureState};
pub use detection::{AlertEvent, AlertState, Decision, DecisionEngine};
pub use error::{PipelineError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Display name
pub const NAME: &str = "Seizure Sentinel";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
}
