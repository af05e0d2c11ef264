//! Analysis module - windowed buffers and per-symptom analyzers

mod buffer;
mod signal;
mod posture;
mod facial;
mod statistics;

pub use buffer::*;
pub use signal::*;
pub use posture::*;
pub use facial::*;
pub use statistics::*;

use serde::{Deserialize, Serialize};

/// Independently computed symptom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymptomKind {
    Convulsion,
    Fall,
    FacialDistortion,
}

impl SymptomKind {
    pub const ALL: [SymptomKind; 3] = [
        SymptomKind::Convulsion,
        SymptomKind::Fall,
        SymptomKind::FacialDistortion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomKind::Convulsion => "convulsion",
            SymptomKind::Fall => "fall",
            SymptomKind::FacialDistortion => "facial_distortion",
        }
    }
}

impl std::fmt::Display for SymptomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence of one symptom at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymptomScore {
    pub kind: SymptomKind,
    /// Always within [0, 1]
    pub confidence: f64,
    /// Pipeline time in seconds
    pub timestamp: f64,
}

impl SymptomScore {
    pub fn new(kind: SymptomKind, confidence: f64, timestamp: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { kind, confidence, timestamp }
    }
}

/// Outcome of an analyzer pass
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment<R> {
    /// Enough history was available
    Ready(R),
    /// Not enough history yet (or the window has a gap); counts as confidence 0
    InsufficientData,
}

impl<R> Assessment<R> {
    pub fn ready(self) -> Option<R> {
        match self {
            Assessment::Ready(r) => Some(r),
            Assessment::InsufficientData => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Assessment::Ready(_))
    }
}
