// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Monitoring session - one subject, one camera, one alert state

use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use tracing::{info, trace, warn};

use crate::analysis::{
    Assessment, FacialAnalyzer, PostureAnalyzer, PostureReading, SpectralAnalyzer, SymptomKind,
};
use crate::config::Config;
use crate::detection::{AlertEvent, Decision, DecisionEngine};
use crate::error::{PipelineError, Result};
use crate::sensors::{FrameMeasurement, Observation};
use super::{EventBus, SessionStatus};

/// Full pipeline state for one monitored subject.
///
/// Analyzers own their buffers privately; the alert state is only touched
/// through [`Session::process`].
pub struct Session {
    id: String,
    config: Arc<Config>,
    motion: SpectralAnalyzer,
    posture: PostureAnalyzer,
    facial: FacialAnalyzer,
    decision: DecisionEngine,
    frames_processed: u64,
    last_decision: Option<Decision>,
    last_alert: Option<AlertEvent>,
}

impl Session {
    pub fn new(id: &str, config: Arc<Config>) -> Self {
        Self {
            id: id.to_string(),
            motion: SpectralAnalyzer::new(config.motion.clone()),
            posture: PostureAnalyzer::new(config.posture.clone()),
            facial: FacialAnalyzer::new(config.facial.clone()),
            decision: DecisionEngine::new(config.decision.clone(), config.posture.symptom_threshold),
            frames_processed: 0,
            last_decision: None,
            last_alert: None,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one processed frame through the pipeline.
    ///
    /// A frame whose motion, pose or face timestamp regresses is rejected
    /// before any state changes.
    pub fn process(&mut self, frame: &FrameMeasurement) -> Result<Decision> {
        if let Err(e) = self.check_order(frame) {
            warn!("[{}] rejected frame: {}", self.id, e);
            return Err(e);
        }

        self.motion.push(frame.timestamp, frame.motion)?;

        match self.motion.analyze() {
            Assessment::Ready(reading) => {
                trace!(
                    "[{}] convulsion={:.3} f={:.2}Hz band={:.4}",
                    self.id,
                    reading.confidence,
                    reading.dominant_frequency,
                    reading.band_energy
                );
                self.decision.record(reading.score());
            }
            Assessment::InsufficientData => self.decision.clear(SymptomKind::Convulsion),
        }

        match &frame.pose {
            Observation::Skipped => {}
            Observation::Lost => {
                let reading = self.posture.lost(frame.timestamp);
                self.apply_posture(reading);
            }
            Observation::Seen(sample) => {
                let reading = self.posture.update(sample)?;
                self.apply_posture(reading);
            }
        }

        match &frame.face {
            Observation::Skipped => {}
            Observation::Lost => {
                self.facial.reset();
                self.decision.clear(SymptomKind::FacialDistortion);
            }
            Observation::Seen(sample) => match self.facial.update(sample)? {
                Assessment::Ready(reading) => self.decision.record(reading.score()),
                Assessment::InsufficientData => self.decision.clear(SymptomKind::FacialDistortion),
            },
        }

        let mut decision = self.decision.evaluate(frame.timestamp);
        if let Some(event) = decision.event.as_mut() {
            event.session_id = self.id.clone();
            self.last_alert = Some(event.clone());
        }

        self.frames_processed += 1;
        self.last_decision = Some(decision.clone());
        Ok(decision)
    }

    /// Every timestamp carried by the frame must be finite and not older than
    /// the newest sample its analyzer already holds
    fn check_order(&self, frame: &FrameMeasurement) -> Result<()> {
        let streams = [
            (Some(frame.timestamp), self.motion.buffer().latest().map(|s| s.timestamp)),
            (frame.pose.seen().map(|p| p.timestamp), self.posture.latest_timestamp()),
            (frame.face.seen().map(|f| f.timestamp), self.facial.latest_timestamp()),
        ];

        for (received, previous) in streams {
            let Some(received) = received else { continue };
            let in_order = received.is_finite() && previous.map_or(true, |prev| received >= prev);
            if !in_order {
                return Err(PipelineError::OutOfOrderSample {
                    previous: previous.unwrap_or(f64::NEG_INFINITY),
                    received,
                });
            }
        }
        Ok(())
    }

    fn apply_posture(&mut self, reading: PostureReading) {
        self.decision.set_posture(reading.state);
        self.decision.record(reading.score());
    }

    pub fn status(&self) -> SessionStatus {
        let mut status = SessionStatus::idle(&self.id, self.config.decision.alert_threshold);
        status.state = self.decision.state();
        status.posture_state = self.decision.posture_state();
        status.frames_processed = self.frames_processed;
        status.alerts_emitted = self.decision.alerts_emitted();
        status.last_alert = self.last_alert.clone();

        if let Some(decision) = &self.last_decision {
            status.consecutive = decision.consecutive;
            status.fused_score = decision.fused.score;
            status.effective_threshold = decision.threshold;
            status.timestamp = Some(decision.timestamp);
            for contribution in &decision.fused.contributions {
                status.symptoms.insert(contribution.kind, contribution.slot);
            }
        }
        status
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Discard all buffers and counters and return to `Idle`
    pub fn reset(&mut self) {
        self.motion.reset();
        self.posture.reset();
        self.facial.reset();
        self.decision.reset();
        self.frames_processed = 0;
        self.last_decision = None;
        self.last_alert = None;
        info!("[{}] session reset", self.id);
    }
}

/// Shared handle to a session.
///
/// Processing is serialized by a mutex so there is exactly one writer for the
/// buffers and the alert state. The snapshot swap and the bus publish happen
/// under that mutex too, so subscribers see frames in processing order;
/// readers only take the status lock, which is held just long enough to swap
/// in a new snapshot.
#[derive(Clone)]
pub struct SessionHandle {
    id: Arc<str>,
    session: Arc<Mutex<Session>>,
    status: Arc<RwLock<SessionStatus>>,
    event_bus: Arc<EventBus>,
}

impl SessionHandle {
    pub fn new(session: Session, event_bus: Arc<EventBus>) -> Self {
        let status = session.status();
        Self {
            id: Arc::from(session.id()),
            session: Arc::new(Mutex::new(session)),
            status: Arc::new(RwLock::new(status)),
            event_bus,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Process one frame, then publish the alert (if any) and the new status
    pub fn process(&self, frame: &FrameMeasurement) -> Result<Decision> {
        let mut session = self.session.lock();
        let decision = session.process(frame)?;
        let status = session.status();

        *self.status.write() = status.clone();

        if let Some(event) = &decision.event {
            self.event_bus.publish_alert(event.clone());
        }
        self.event_bus.publish_status(status);

        Ok(decision)
    }

    /// Latest snapshot; never waits on frame processing
    pub fn status(&self) -> SessionStatus {
        self.status.read().clone()
    }

    pub fn reset(&self) {
        let mut session = self.session.lock();
        session.reset();
        *self.status.write() = session.status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PostureState;
    use crate::config::DemoConfig;
    use crate::detection::{AlertState, SymptomSlot};
    use crate::analysis::{FaceSample, PoseSample};
    use crate::sensors::{MeasurementSource, Scenario, ScenarioSimulator};
    use std::f64::consts::PI;
    use std::time::Duration;

    fn run(scenario: Scenario, frames: u64) -> (Session, Vec<Decision>) {
        let mut session = Session::new("test", Arc::new(Config::default()));
        let mut source = ScenarioSimulator::new(scenario, DemoConfig::default()).with_limit(frames);
        let mut decisions = Vec::new();
        while let Some(frame) = source.next_frame() {
            decisions.push(session.process(&frame.unwrap()).unwrap());
        }
        (session, decisions)
    }

    fn events(decisions: &[Decision]) -> Vec<&AlertEvent> {
        decisions.iter().filter_map(|d| d.event.as_ref()).collect()
    }

    #[test]
    fn test_calm_subject_never_alerts() {
        let (session, decisions) = run(Scenario::Calm, 300);
        assert!(events(&decisions).is_empty());
        assert!(decisions.iter().all(|d| d.state == AlertState::Idle));
        assert_eq!(session.status().posture_state, PostureState::Standing);
    }

    #[test]
    fn test_convulsion_alerts_once_per_episode() {
        // Event runs from 3 s to 9 s; stop before a second window could open
        let (session, decisions) = run(Scenario::Convulsion, 200);
        let events = events(&decisions);

        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.session_id, "test");
        assert!(event.timestamp > 3.0 && event.timestamp < 6.0, "t = {}", event.timestamp);
        assert!(event.fused_score >= event.threshold);
        assert!(event.contributing_symptoms[&SymptomKind::Convulsion] > 0.0);
        assert_eq!(session.status().alerts_emitted, 1);
    }

    #[test]
    fn test_fall_alerts_with_fallen_posture() {
        let (_, decisions) = run(Scenario::Fall, 180);
        let events = events(&decisions);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].posture_state, PostureState::Fallen);
    }

    #[test]
    fn test_warm_up_contributes_nothing() {
        let (_, decisions) = run(Scenario::Convulsion, 30);
        assert!(decisions
            .iter()
            .all(|d| d.fused.slot(SymptomKind::Convulsion) == SymptomSlot::Missing));
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut session = Session::new("test", Arc::new(Config::default()));
        session.process(&FrameMeasurement::motion_only(1.0, 0.1)).unwrap();
        assert!(session.process(&FrameMeasurement::motion_only(0.5, 0.1)).is_err());
        assert_eq!(session.frames_processed(), 1);
    }

    #[test]
    fn test_off_grid_jittered_camera_alerts() {
        // 33 ms camera with heavier jitter than the default feed
        let demo = DemoConfig {
            fps: 1.0 / 0.033,
            jitter_secs: 0.004,
            seed: Some(11),
            ..DemoConfig::default()
        };
        let mut session = Session::new("test", Arc::new(Config::default()));
        let mut source = ScenarioSimulator::new(Scenario::Convulsion, demo).with_limit(200);
        let mut decisions = Vec::new();
        while let Some(frame) = source.next_frame() {
            decisions.push(session.process(&frame.unwrap()).unwrap());
        }

        let events = events(&decisions);
        assert_eq!(events.len(), 1);
        assert!(events[0].timestamp > 3.0 && events[0].timestamp < 6.0);
    }

    #[test]
    fn test_in_band_sine_crosses_alert_threshold() {
        let drive = |freq: f64| {
            let mut session = Session::new("test", Arc::new(Config::default()));
            // 4.95 s: one alert plus its cooldown, no room for a second run
            (0..150)
                .map(|i| {
                    let t = i as f64 * 0.033;
                    let motion = 1.0 + 0.8 * (2.0 * PI * freq * t).sin();
                    session.process(&FrameMeasurement::motion_only(t, motion)).unwrap()
                })
                .collect::<Vec<Decision>>()
        };

        let decisions = drive(6.0);
        assert!(decisions.iter().any(|d| d.fused.score >= d.threshold));
        assert_eq!(events(&decisions).len(), 1);

        let decisions = drive(0.5);
        assert!(decisions.iter().all(|d| d.fused.score < d.threshold));
        assert!(events(&decisions).is_empty());
        assert!(decisions.iter().all(|d| d.state == AlertState::Idle));
    }

    #[test]
    fn test_landmark_regression_rejects_whole_frame() {
        let mut session = Session::new("test", Arc::new(Config::default()));
        let pose = |t: f64| PoseSample {
            timestamp: t,
            centroid_x: 0.5,
            centroid_y: 0.3,
            aspect_ratio: 3.5,
        };

        let first = FrameMeasurement {
            pose: Observation::Seen(pose(1.0)),
            face: Observation::Seen(FaceSample::new(1.0, 0.01)),
            ..FrameMeasurement::motion_only(1.0, 0.1)
        };
        session.process(&first).unwrap();

        let stale_pose = FrameMeasurement {
            pose: Observation::Seen(pose(0.9)),
            ..FrameMeasurement::motion_only(1.1, 0.1)
        };
        let err = session.process(&stale_pose).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::OutOfOrderSample { previous, received } if previous == 1.0 && received == 0.9
        ));
        assert_eq!(session.frames_processed(), 1);
        assert_eq!(session.motion.buffer().latest().map(|s| s.timestamp), Some(1.0));

        let stale_face = FrameMeasurement {
            face: Observation::Seen(FaceSample::new(0.95, 0.01)),
            ..FrameMeasurement::motion_only(1.1, 0.1)
        };
        assert!(session.process(&stale_face).is_err());
        assert_eq!(session.frames_processed(), 1);

        // The motion clock was left alone, so the same instant still goes through
        session.process(&FrameMeasurement::motion_only(1.1, 0.1)).unwrap();
        assert_eq!(session.frames_processed(), 2);
    }

    #[test]
    fn test_lost_pose_records_zero_fall() {
        let mut session = Session::new("test", Arc::new(Config::default()));
        let frame = FrameMeasurement {
            pose: Observation::Lost,
            ..FrameMeasurement::motion_only(0.0, 0.0)
        };
        let decision = session.process(&frame).unwrap();
        assert_eq!(decision.fused.slot(SymptomKind::Fall), SymptomSlot::Fresh(0.0));
        assert_eq!(session.status().posture_state, PostureState::Unknown);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let (mut session, _) = run(Scenario::Convulsion, 150);
        session.reset();

        let status = session.status();
        assert_eq!(status.state, AlertState::Idle);
        assert_eq!(status.fused_score, 0.0);
        assert!(status.symptoms.values().all(|s| *s == SymptomSlot::Missing));
    }

    #[test]
    fn test_reset_clears_episode_counters() {
        let (mut session, _) = run(Scenario::Convulsion, 200);
        assert_eq!(session.status().alerts_emitted, 1);
        assert!(session.status().last_alert.is_some());

        session.reset();
        let status = session.status();
        assert_eq!(status.frames_processed, 0);
        assert_eq!(status.alerts_emitted, 0);
        assert!(status.last_alert.is_none());
        assert_eq!(status, SessionStatus::idle("test", Config::default().decision.alert_threshold));
    }

    #[tokio::test]
    async fn test_handle_publishes_alert_and_status() {
        let bus = Arc::new(EventBus::new(1024));
        let mut alerts = bus.subscribe_alerts();
        let handle = SessionHandle::new(Session::new("cam-1", Arc::new(Config::default())), bus.clone());

        let mut source = ScenarioSimulator::new(Scenario::Convulsion, DemoConfig::default()).with_limit(160);
        while let Some(frame) = source.next_frame() {
            handle.process(&frame.unwrap()).unwrap();
        }

        let alert = tokio::time::timeout(Duration::from_secs(5), alerts.recv())
            .await
            .expect("no alert published")
            .unwrap();
        assert_eq!(alert.session_id, "cam-1");

        let status = handle.status();
        assert_eq!(status.frames_processed, 160);
        assert_eq!(status.last_alert.map(|a| a.id), Some(alert.id));
    }

    #[tokio::test]
    async fn test_status_stream_follows_frame_order() {
        let bus = Arc::new(EventBus::new(4096));
        let mut statuses = bus.subscribe_status();
        let handle = SessionHandle::new(Session::new("cam-1", Arc::new(Config::default())), bus.clone());

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let handle = handle.clone();
                tokio::task::spawn_blocking(move || {
                    for i in 0..100 {
                        let t = (w * 100 + i) as f64 * 0.001;
                        // Workers race; regressions are rejected, the rest must stay ordered
                        let _ = handle.process(&FrameMeasurement::motion_only(t, 0.1));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }

        let mut seen = Vec::new();
        while let Ok(status) = statuses.try_recv() {
            seen.push(status.frames_processed);
        }
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[1] == w[0] + 1), "{:?}", seen);
        assert_eq!(seen.last().copied(), Some(handle.status().frames_processed));
    }
}
