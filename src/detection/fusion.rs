// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Symptom fusion engine - weighted sum over fresh symptom confidences

use serde::{Deserialize, Serialize};

use crate::analysis::SymptomKind;
use crate::config::{FusionMode, SymptomWeights};

/// Latest value of one symptom as seen by the fusion step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SymptomSlot {
    /// Recent enough to use
    Fresh(f64),
    /// Older than the staleness bound
    Stale,
    /// Never reported, or the analyzer had insufficient data
    Missing,
}

impl SymptomSlot {
    /// Confidence this slot contributes; stale and missing slots contribute nothing
    pub fn confidence(&self) -> f64 {
        match self {
            SymptomSlot::Fresh(c) => *c,
            SymptomSlot::Stale | SymptomSlot::Missing => 0.0,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, SymptomSlot::Fresh(_))
    }
}

/// One symptom's share of the fused score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub kind: SymptomKind,
    pub slot: SymptomSlot,
    pub weight: f64,
    pub weighted: f64,
}

/// Fusion result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Weighted sum; not normalized
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

impl FusionResult {
    pub fn slot(&self, kind: SymptomKind) -> SymptomSlot {
        self.contributions
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.slot)
            .unwrap_or(SymptomSlot::Missing)
    }
}

/// Symptom fusion engine
pub struct FusionEngine {
    weights: SymptomWeights,
    mode: FusionMode,
}

impl FusionEngine {
    pub fn new(weights: SymptomWeights, mode: FusionMode) -> Self {
        Self { weights, mode }
    }

    pub fn weight(&self, kind: SymptomKind) -> f64 {
        match kind {
            SymptomKind::Convulsion => self.weights.convulsion,
            SymptomKind::Fall => self.weights.fall,
            SymptomKind::FacialDistortion => self.weights.facial,
        }
    }

    /// Set a symptom weight
    pub fn set_weight(&mut self, kind: SymptomKind, weight: f64) {
        let weight = weight.max(0.0);
        match kind {
            SymptomKind::Convulsion => self.weights.convulsion = weight,
            SymptomKind::Fall => self.weights.fall = weight,
            SymptomKind::FacialDistortion => self.weights.facial = weight,
        }
    }

    pub fn mode(&self) -> FusionMode {
        self.mode
    }

    /// Combine the current slots into one score
    pub fn fuse(&self, slots: &[(SymptomKind, SymptomSlot)]) -> FusionResult {
        let contributions: Vec<Contribution> = slots
            .iter()
            .map(|&(kind, slot)| {
                let weight = self.weight(kind);
                Contribution {
                    kind,
                    slot,
                    weight,
                    weighted: weight * slot.confidence(),
                }
            })
            .collect();

        let mut score: f64 = contributions.iter().map(|c| c.weighted).sum();

        if let FusionMode::CoOccurrence { min_symptoms, floor } = self.mode {
            let present = contributions
                .iter()
                .filter(|c| c.slot.is_fresh() && c.slot.confidence() >= floor)
                .count();
            if present < min_symptoms {
                score = 0.0;
            }
        }

        FusionResult { score, contributions }
    }
}
