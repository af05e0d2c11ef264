//! Core module - monitoring sessions, multi-camera monitor, event bus

mod engine;
mod session;
mod event_bus;

pub use engine::Monitor;
pub use session::{Session, SessionHandle};
pub use event_bus::{EventBus, Event, EventPayload};

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::analysis::{PostureState, SymptomKind};
use crate::detection::{AlertEvent, AlertState, SymptomSlot};

/// Read-only snapshot of one session for dashboards and overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub state: AlertState,
    /// Consecutive elevated frames in the current run
    pub consecutive: u32,
    pub fused_score: f64,
    pub effective_threshold: f64,
    pub posture_state: PostureState,
    /// Latest per-symptom reads
    pub symptoms: BTreeMap<SymptomKind, SymptomSlot>,
    /// Pipeline time of the last processed frame
    pub timestamp: Option<f64>,
    pub frames_processed: u64,
    pub alerts_emitted: u64,
    pub last_alert: Option<AlertEvent>,
}

impl SessionStatus {
    /// Status of a session that has not processed any frame
    pub fn idle(session_id: &str, threshold: f64) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: AlertState::Idle,
            consecutive: 0,
            fused_score: 0.0,
            effective_threshold: threshold,
            posture_state: PostureState::Unknown,
            symptoms: SymptomKind::ALL
                .iter()
                .map(|&kind| (kind, SymptomSlot::Missing))
                .collect(),
            timestamp: None,
            frames_processed: 0,
            alerts_emitted: 0,
            last_alert: None,
        }
    }
}
