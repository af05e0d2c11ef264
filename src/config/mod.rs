// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::PipelineError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// Spectral motion analysis
    pub motion: SpectralConfig,

    /// Posture / fall analysis
    pub posture: PostureConfig,

    /// Facial distortion analysis
    pub facial: FacialConfig,

    /// Fusion and alert state machine
    pub decision: DecisionConfig,

    /// Synthetic feed used by the headless demo
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "SeizureSentinel".to_string(),
            log_level: "info".to_string(),
            motion: SpectralConfig::default(),
            posture: PostureConfig::default(),
            facial: FacialConfig::default(),
            decision: DecisionConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("seizure-sentinel"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Check every threshold for internal consistency
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.motion.validate()?;
        self.posture.validate()?;
        self.facial.validate()?;
        self.decision.validate()?;
        self.demo.validate()?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(msg.into())
}

/// Reject NaN and infinite values before any range check sees them
fn require_finite(section: &str, fields: &[(&str, f64)]) -> Result<(), PipelineError> {
    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, value)) => Err(invalid(format!("{}.{} must be finite, got {}", section, name, value))),
        None => Ok(()),
    }
}

/// Spectral motion analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Analysis window length in seconds
    pub window_secs: f64,

    /// Largest tolerated gap between motion samples before the window is stale
    pub max_gap_secs: f64,

    /// Uniform resampling rate in Hz
    pub target_rate_hz: f64,

    /// Lower edge of the convulsive band
    pub band_low_hz: f64,

    /// Upper edge of the convulsive band
    pub band_high_hz: f64,

    /// Lower edge of the reference (total) energy band
    pub total_low_hz: f64,

    /// Band energy at which the energy factor saturates
    pub energy_threshold: f64,

    /// Multiplier applied to the band/total energy ratio
    pub ratio_gain: f64,

    /// Motion magnitudes below this are recorded as zero
    pub noise_floor: f64,

    /// Detrended signals flatter than this produce no score
    pub min_std: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            max_gap_secs: 0.5,
            target_rate_hz: 30.0,
            band_low_hz: 3.0,
            band_high_hz: 15.0,
            total_low_hz: 0.1,
            energy_threshold: 0.05,
            ratio_gain: 2.0,
            noise_floor: 0.02,
            min_std: 0.01,
        }
    }
}

impl SpectralConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        require_finite(
            "motion",
            &[
                ("window_secs", self.window_secs),
                ("max_gap_secs", self.max_gap_secs),
                ("target_rate_hz", self.target_rate_hz),
                ("band_low_hz", self.band_low_hz),
                ("band_high_hz", self.band_high_hz),
                ("total_low_hz", self.total_low_hz),
                ("energy_threshold", self.energy_threshold),
                ("ratio_gain", self.ratio_gain),
                ("noise_floor", self.noise_floor),
                ("min_std", self.min_std),
            ],
        )?;
        if self.window_secs <= 0.0 || self.target_rate_hz <= 0.0 {
            return Err(invalid("motion window and target rate must be positive"));
        }
        if self.max_gap_secs <= 0.0 {
            return Err(invalid("motion.max_gap_secs must be positive"));
        }
        if self.band_low_hz < 0.0 || self.band_low_hz >= self.band_high_hz {
            return Err(invalid(format!(
                "motion band [{}, {}] Hz is empty",
                self.band_low_hz, self.band_high_hz
            )));
        }
        if self.band_high_hz > self.target_rate_hz / 2.0 {
            return Err(invalid(format!(
                "motion.band_high_hz {} exceeds Nyquist of {} Hz",
                self.band_high_hz,
                self.target_rate_hz / 2.0
            )));
        }
        if (self.window_secs * self.target_rate_hz).round() < 8.0 {
            return Err(invalid("motion window holds fewer than 8 resampled points"));
        }
        if self.energy_threshold <= 0.0 || self.ratio_gain <= 0.0 {
            return Err(invalid("motion energy threshold and ratio gain must be positive"));
        }
        Ok(())
    }
}

/// Posture / fall analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Span of centroid history used for the velocity finite difference
    pub velocity_window_secs: f64,

    /// Downward centroid velocity (image heights per second) that flags a descent
    pub velocity_threshold: f64,

    /// Height/width ratio at or above which the body is upright
    pub upright_ratio: f64,

    /// Height/width ratio at or below which the body is lying
    pub lying_ratio: f64,

    /// Maximum delay between descent, last upright frame and first lying frame
    pub correlation_secs: f64,

    /// Time the lying ratio must persist before the state becomes Fallen
    pub min_hold_secs: f64,

    /// Confidence when descent and fall are correlated
    pub high_confidence: f64,

    /// Confidence when only one piece of evidence holds
    pub medium_confidence: f64,

    /// Confidence at which the fall symptom counts as present
    pub symptom_threshold: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            velocity_window_secs: 0.25,
            velocity_threshold: 0.6,
            upright_ratio: 3.0,
            lying_ratio: 1.0 / 3.0,
            correlation_secs: 1.5,
            min_hold_secs: 1.0,
            high_confidence: 1.0,
            medium_confidence: 0.5,
            symptom_threshold: 0.7,
        }
    }
}

impl PostureConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        require_finite(
            "posture",
            &[
                ("velocity_window_secs", self.velocity_window_secs),
                ("velocity_threshold", self.velocity_threshold),
                ("upright_ratio", self.upright_ratio),
                ("lying_ratio", self.lying_ratio),
                ("correlation_secs", self.correlation_secs),
                ("min_hold_secs", self.min_hold_secs),
            ],
        )?;
        if self.velocity_window_secs <= 0.0 || self.velocity_threshold <= 0.0 {
            return Err(invalid("posture velocity window and threshold must be positive"));
        }
        if self.lying_ratio <= 0.0 || self.lying_ratio >= self.upright_ratio {
            return Err(invalid("posture.lying_ratio must be positive and below upright_ratio"));
        }
        if self.correlation_secs <= 0.0 || self.min_hold_secs < 0.0 {
            return Err(invalid("posture correlation window must be positive"));
        }
        for c in [self.high_confidence, self.medium_confidence, self.symptom_threshold] {
            if !(0.0..=1.0).contains(&c) {
                return Err(invalid("posture confidences must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}

/// Facial distortion analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacialConfig {
    /// Window of recent displacement compared against the baseline
    pub recent_window_secs: f64,

    /// Short-term baseline window
    pub baseline_window_secs: f64,

    /// Excess displacement mapping to full confidence
    pub distortion_scale: f64,

    /// Largest tolerated gap between face samples
    pub max_gap_secs: f64,

    /// Window of head positions scored for shaking
    pub shake_window_secs: f64,

    /// Head position spread (normalized units) that saturates the movement term
    pub shake_spread_scale: f64,

    /// Head steps smaller than this never count as a direction change
    pub shake_min_step: f64,
}

impl Default for FacialConfig {
    fn default() -> Self {
        Self {
            recent_window_secs: 0.5,
            baseline_window_secs: 3.0,
            distortion_scale: 0.15,
            max_gap_secs: 0.5,
            shake_window_secs: 0.7,
            shake_spread_scale: 0.01,
            shake_min_step: 0.002,
        }
    }
}

impl FacialConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        require_finite(
            "facial",
            &[
                ("recent_window_secs", self.recent_window_secs),
                ("baseline_window_secs", self.baseline_window_secs),
                ("distortion_scale", self.distortion_scale),
                ("max_gap_secs", self.max_gap_secs),
                ("shake_window_secs", self.shake_window_secs),
                ("shake_spread_scale", self.shake_spread_scale),
                ("shake_min_step", self.shake_min_step),
            ],
        )?;
        if self.recent_window_secs <= 0.0 || self.baseline_window_secs < self.recent_window_secs {
            return Err(invalid("facial baseline window must cover the recent window"));
        }
        if self.distortion_scale <= 0.0 || self.max_gap_secs <= 0.0 {
            return Err(invalid("facial scale and gap must be positive"));
        }
        if self.shake_window_secs <= 0.0 || self.shake_spread_scale <= 0.0 || self.shake_min_step < 0.0 {
            return Err(invalid("facial shake window and scale must be positive"));
        }
        Ok(())
    }
}

/// Relative symptom weights
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomWeights {
    pub convulsion: f64,
    pub fall: f64,
    pub facial: f64,
}

impl Default for SymptomWeights {
    fn default() -> Self {
        Self {
            convulsion: 1.0,
            fall: 0.6,
            facial: 0.2,
        }
    }
}

/// How symptom confidences are combined
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FusionMode {
    /// Plain weighted sum
    Additive,
    /// Weighted sum, zeroed unless enough symptoms co-occur
    CoOccurrence {
        min_symptoms: usize,
        floor: f64,
    },
}

/// Decision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Per-symptom weights
    pub weights: SymptomWeights,

    /// Fused score at or above which a frame counts as elevated
    pub alert_threshold: f64,

    /// Lower threshold used while a fall is present
    pub primed_threshold: Option<f64>,

    /// Consecutive elevated frames required before alerting
    pub persistence_frames: u32,

    /// Seconds spent in cooldown after an alert
    pub cooldown_secs: f64,

    /// Symptom scores older than this are treated as stale
    pub staleness_secs: f64,

    /// Fusion mode
    pub mode: FusionMode,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            weights: SymptomWeights::default(),
            alert_threshold: 0.55,
            primed_threshold: Some(0.4),
            persistence_frames: 15,
            cooldown_secs: 3.0,
            staleness_secs: 1.0,
            mode: FusionMode::Additive,
        }
    }
}

impl DecisionConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        let w = &self.weights;
        require_finite(
            "decision",
            &[
                ("weights.convulsion", w.convulsion),
                ("weights.fall", w.fall),
                ("weights.facial", w.facial),
                ("alert_threshold", self.alert_threshold),
                ("primed_threshold", self.primed_threshold.unwrap_or(0.0)),
                ("cooldown_secs", self.cooldown_secs),
                ("staleness_secs", self.staleness_secs),
            ],
        )?;
        if w.convulsion < 0.0 || w.fall < 0.0 || w.facial < 0.0 {
            return Err(invalid("symptom weights must be non-negative"));
        }
        if self.alert_threshold <= 0.0 {
            return Err(invalid("decision.alert_threshold must be positive"));
        }
        if let Some(primed) = self.primed_threshold {
            if primed <= 0.0 {
                return Err(invalid("decision.primed_threshold must be positive"));
            }
        }
        if self.persistence_frames == 0 {
            return Err(invalid("decision.persistence_frames must be at least 1"));
        }
        if self.cooldown_secs < 0.0 || self.staleness_secs <= 0.0 {
            return Err(invalid("cooldown must be non-negative and staleness positive"));
        }
        if let FusionMode::CoOccurrence { min_symptoms, floor } = self.mode {
            if min_symptoms == 0 || min_symptoms > 3 {
                return Err(invalid("co-occurrence needs between 1 and 3 symptoms"));
            }
            require_finite("decision", &[("mode.floor", floor)])?;
        }
        Ok(())
    }
}

/// Synthetic feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Camera frame rate
    pub fps: f64,

    /// Pose landmarks are produced every Nth frame
    pub pose_every: u32,

    /// Face landmarks are produced every Nth frame
    pub face_every: u32,

    /// Timestamp jitter (standard deviation, seconds)
    pub jitter_secs: f64,

    /// RNG seed; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            pose_every: 3,
            face_every: 2,
            jitter_secs: 0.002,
            seed: Some(7),
        }
    }
}

impl DemoConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        require_finite("demo", &[("fps", self.fps), ("jitter_secs", self.jitter_secs)])?;
        if self.fps <= 0.0 || self.jitter_secs < 0.0 {
            return Err(invalid("demo.fps must be positive and jitter non-negative"));
        }
        Ok(())
    }
}
