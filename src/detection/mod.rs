//! Detection module - symptom fusion and alert decisions

mod fusion;
mod state;

pub use fusion::*;
pub use state::*;

use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{PostureState, SymptomKind, SymptomScore};
use crate::config::DecisionConfig;

/// Emitted exactly once per `Suspect -> Alert` transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub session_id: String,
    /// Pipeline time of the triggering frame
    pub timestamp: f64,
    pub emitted_at: DateTime<Utc>,
    pub fused_score: f64,
    pub threshold: f64,
    pub contributing_symptoms: BTreeMap<SymptomKind, f64>,
    pub posture_state: PostureState,
}

/// Latest score per symptom, with staleness read-out
#[derive(Debug, Clone, Default)]
pub struct SymptomBoard {
    latest: BTreeMap<SymptomKind, SymptomScore>,
    stale: BTreeSet<SymptomKind>,
}

impl SymptomBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, score: SymptomScore) {
        self.stale.remove(&score.kind);
        self.latest.insert(score.kind, score);
    }

    /// Insufficient data: the symptom contributes nothing until it reports again
    pub fn clear(&mut self, kind: SymptomKind) {
        self.stale.remove(&kind);
        self.latest.remove(&kind);
    }

    pub fn latest(&self, kind: SymptomKind) -> Option<&SymptomScore> {
        self.latest.get(&kind)
    }

    /// Tagged read of one symptom at time `now`
    pub fn read(&mut self, kind: SymptomKind, now: f64, staleness_secs: f64) -> SymptomSlot {
        let Some(score) = self.latest.get(&kind) else {
            return SymptomSlot::Missing;
        };

        if now - score.timestamp > staleness_secs {
            if self.stale.insert(kind) {
                warn!(
                    "{} score is stale ({:.2}s old, bound {:.2}s)",
                    kind,
                    now - score.timestamp,
                    staleness_secs
                );
            }
            SymptomSlot::Stale
        } else {
            SymptomSlot::Fresh(score.confidence)
        }
    }

    pub fn reset(&mut self) {
        self.latest.clear();
        self.stale.clear();
    }
}

/// Outcome of one decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: f64,
    pub previous_state: AlertState,
    pub state: AlertState,
    pub consecutive: u32,
    pub fused: FusionResult,
    /// Threshold applied this cycle (lowered while a fall is present)
    pub threshold: f64,
    pub event: Option<AlertEvent>,
}

/// Fuses symptoms and owns the alert state transition
pub struct DecisionEngine {
    config: DecisionConfig,
    fall_symptom_threshold: f64,
    fusion: FusionEngine,
    machine: AlertStateMachine,
    board: SymptomBoard,
    posture_state: PostureState,
    alerts_emitted: u64,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig, fall_symptom_threshold: f64) -> Self {
        Self {
            fusion: FusionEngine::new(config.weights, config.mode),
            machine: AlertStateMachine::new(config.persistence_frames, config.cooldown_secs),
            board: SymptomBoard::new(),
            posture_state: PostureState::Unknown,
            alerts_emitted: 0,
            fall_symptom_threshold,
            config,
        }
    }

    pub fn record(&mut self, score: SymptomScore) {
        self.board.record(score);
    }

    pub fn clear(&mut self, kind: SymptomKind) {
        self.board.clear(kind);
    }

    pub fn set_posture(&mut self, state: PostureState) {
        self.posture_state = state;
    }

    pub fn posture_state(&self) -> PostureState {
        self.posture_state
    }

    pub fn state(&self) -> AlertState {
        self.machine.state()
    }

    pub fn alerts_emitted(&self) -> u64 {
        self.alerts_emitted
    }

    pub fn board(&self) -> &SymptomBoard {
        &self.board
    }

    pub fn fusion_mut(&mut self) -> &mut FusionEngine {
        &mut self.fusion
    }

    /// Run one decision cycle at pipeline time `now`
    pub fn evaluate(&mut self, now: f64) -> Decision {
        let slots: Vec<(SymptomKind, SymptomSlot)> = SymptomKind::ALL
            .iter()
            .map(|&kind| (kind, self.board.read(kind, now, self.config.staleness_secs)))
            .collect();

        let fused = self.fusion.fuse(&slots);
        let threshold = self.threshold_for(&fused);
        // Inclusive: a score equal to the threshold is elevated
        let elevated = fused.score >= threshold;

        let outcome = self.machine.step(now, elevated);

        let event = outcome.alerted.then(|| {
            self.alerts_emitted += 1;
            let event = AlertEvent {
                id: Uuid::new_v4(),
                session_id: String::new(),
                timestamp: now,
                emitted_at: Utc::now(),
                fused_score: fused.score,
                threshold,
                contributing_symptoms: fused
                    .contributions
                    .iter()
                    .filter(|c| c.slot.is_fresh())
                    .map(|c| (c.kind, c.slot.confidence()))
                    .collect(),
                posture_state: self.posture_state,
            };
            info!(
                "ALERT at t={:.3}: fused={:.3} threshold={:.3} posture={:?}",
                now, fused.score, threshold, self.posture_state
            );
            event
        });

        Decision {
            timestamp: now,
            previous_state: outcome.from,
            state: outcome.to,
            consecutive: outcome.consecutive,
            fused,
            threshold,
            event,
        }
    }

    fn threshold_for(&self, fused: &FusionResult) -> f64 {
        let fall_present = matches!(
            fused.slot(SymptomKind::Fall),
            SymptomSlot::Fresh(c) if c >= self.fall_symptom_threshold
        );

        match self.config.primed_threshold {
            Some(primed) if fall_present => self.config.alert_threshold.min(primed),
            _ => self.config.alert_threshold,
        }
    }

    pub fn cooldown_remaining(&self, now: f64) -> Option<f64> {
        self.machine.cooldown_remaining(now)
    }

    /// Back to `Idle` with no symptom history
    pub fn reset(&mut self) {
        self.machine.reset();
        self.board.reset();
        self.posture_state = PostureState::Unknown;
        self.alerts_emitted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 30.0;

    fn make_engine(persistence: u32, cooldown: f64) -> DecisionEngine {
        let config = DecisionConfig {
            persistence_frames: persistence,
            cooldown_secs: cooldown,
            ..Default::default()
        };
        DecisionEngine::new(config, 0.7)
    }

    /// Drive one frame with a convulsion confidence
    fn frame(engine: &mut DecisionEngine, i: usize, convulsion: f64) -> Decision {
        let t = i as f64 * DT;
        engine.record(SymptomScore::new(SymptomKind::Convulsion, convulsion, t));
        engine.evaluate(t)
    }

    #[test]
    fn test_persistence_minus_one_then_drop_never_alerts() {
        let n = 15;
        let mut engine = make_engine(n, 3.0);

        let mut decisions = Vec::new();
        for i in 0..(n as usize - 1) {
            decisions.push(frame(&mut engine, i, 0.9));
        }
        decisions.push(frame(&mut engine, n as usize - 1, 0.1));

        assert!(decisions.iter().all(|d| d.event.is_none()));
        assert!(decisions
            .iter()
            .all(|d| matches!(d.state, AlertState::Idle | AlertState::Suspect)));
        assert_eq!(engine.state(), AlertState::Idle);
    }

    #[test]
    fn test_sustained_run_emits_exactly_one_event() {
        let n = 15;
        let mut engine = make_engine(n, 3.0);

        let mut states = Vec::new();
        let mut events = Vec::new();
        // Above threshold for the run and the whole cooldown window
        for i in 0..(n as usize + 85) {
            let d = frame(&mut engine, i, 0.9);
            states.push(d.state);
            events.extend(d.event);
        }

        assert_eq!(events.len(), 1);
        assert_eq!(states[0], AlertState::Suspect);
        assert_eq!(states[n as usize - 1], AlertState::Cooldown);
        assert!(states[n as usize..].iter().all(|s| *s == AlertState::Cooldown));

        let event = &events[0];
        assert!((event.timestamp - (n as f64 - 1.0) * DT).abs() < 1e-9);
        assert_eq!(event.contributing_symptoms.get(&SymptomKind::Convulsion), Some(&0.9));
        assert!(!event.contributing_symptoms.contains_key(&SymptomKind::Fall));
    }

    #[test]
    fn test_second_episode_after_cooldown() {
        let n = 5;
        let mut engine = make_engine(n, 1.0);
        let mut events = 0;
        let mut i = 0;

        while events == 0 {
            events += frame(&mut engine, i, 0.9).event.iter().count();
            i += 1;
        }
        let alert_time = (i - 1) as f64 * DT;

        // Stay elevated until cooldown elapses
        let mut went_idle = false;
        while !went_idle {
            let d = frame(&mut engine, i, 0.9);
            assert!(d.event.is_none());
            if d.state == AlertState::Idle {
                went_idle = true;
                assert!(d.timestamp - alert_time >= 1.0 - 1e-9);
            }
            i += 1;
        }

        let mut second = 0;
        for _ in 0..n {
            second += frame(&mut engine, i, 0.9).event.iter().count();
            i += 1;
        }
        assert_eq!(second, 1);
        assert_eq!(engine.alerts_emitted(), 2);
    }

    #[test]
    fn test_no_symptoms_stays_idle() {
        let mut engine = make_engine(3, 1.0);
        for i in 0..100 {
            let d = engine.evaluate(i as f64 * DT);
            assert_eq!(d.state, AlertState::Idle);
            assert_eq!(d.fused.score, 0.0);
        }
    }

    #[test]
    fn test_stale_score_is_ignored() {
        let mut engine = make_engine(3, 1.0);
        engine.record(SymptomScore::new(SymptomKind::Convulsion, 1.0, 0.0));

        assert_eq!(engine.evaluate(0.5).fused.slot(SymptomKind::Convulsion), SymptomSlot::Fresh(1.0));

        let late = engine.evaluate(2.0);
        assert_eq!(late.fused.slot(SymptomKind::Convulsion), SymptomSlot::Stale);
        assert_eq!(late.fused.score, 0.0);
        assert_eq!(late.state, AlertState::Idle);
    }

    #[test]
    fn test_fall_primes_lower_threshold() {
        let mut engine = make_engine(1, 1.0);
        // 0.6 * 0.75 = 0.45: below the normal threshold, above the primed one
        engine.record(SymptomScore::new(SymptomKind::Fall, 0.75, 0.0));

        let d = engine.evaluate(0.0);
        assert_eq!(d.threshold, 0.4);
        assert!(d.event.is_some());

        let mut unprimed = make_engine(1, 1.0);
        unprimed.record(SymptomScore::new(SymptomKind::Fall, 0.5, 0.0));
        let d = unprimed.evaluate(0.0);
        assert_eq!(d.threshold, 0.55);
        assert!(d.event.is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut engine = make_engine(1, 1.0);
        let d = frame(&mut engine, 0, 0.55);
        assert_eq!(d.fused.score, d.threshold);
        assert!(d.event.is_some());

        let mut engine = make_engine(1, 1.0);
        assert!(frame(&mut engine, 0, 0.549).event.is_none());
    }

    #[test]
    fn test_reset_forgets_alert_count() {
        let mut engine = make_engine(1, 1.0);
        assert!(frame(&mut engine, 0, 0.9).event.is_some());
        assert_eq!(engine.alerts_emitted(), 1);

        engine.reset();
        assert_eq!(engine.alerts_emitted(), 0);
        assert_eq!(engine.state(), AlertState::Idle);
        assert!(engine.board().latest(SymptomKind::Convulsion).is_none());
    }

    #[test]
    fn test_cleared_symptom_reads_missing() {
        let mut engine = make_engine(3, 1.0);
        engine.record(SymptomScore::new(SymptomKind::FacialDistortion, 1.0, 0.0));
        engine.clear(SymptomKind::FacialDistortion);
        let d = engine.evaluate(0.0);
        assert_eq!(d.fused.slot(SymptomKind::FacialDistortion), SymptomSlot::Missing);
    }
}
