// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Spectral motion analysis - resampling, Hann window, FFT band energy

use std::f64::consts::PI;
use std::sync::Arc;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SpectralConfig;
use crate::error::Result;
use super::{Assessment, Sample, SymptomKind, SymptomScore, TemporalBuffer};
use super::statistics::std_dev;

/// Convulsion score plus spectral diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvulsionReading {
    pub confidence: f64,
    pub timestamp: f64,
    /// In-band bin with maximum power (Hz)
    pub dominant_frequency: f64,
    /// Summed power inside the convulsive band
    pub band_energy: f64,
    /// Summed power across the reference band
    pub total_energy: f64,
    /// Band energy / total energy
    pub band_ratio: f64,
    /// Estimated input rate before resampling
    pub input_rate_hz: f64,
}

impl ConvulsionReading {
    pub fn score(&self) -> SymptomScore {
        SymptomScore::new(SymptomKind::Convulsion, self.confidence, self.timestamp)
    }
}

/// One-sided power spectrum
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    /// Power per bin, normalized so the bins sum to the mean square of the windowed signal
    pub power: Vec<f64>,
    /// Bin spacing in Hz
    pub resolution: f64,
}

impl PowerSpectrum {
    pub fn frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.resolution
    }

    /// Sum of power over bins whose centre lies in `[low, high]`
    pub fn energy_between(&self, low: f64, high: f64) -> f64 {
        self.power
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let f = self.frequency(*i);
                f >= low && f <= high
            })
            .map(|(_, &p)| p)
            .sum()
    }

    /// Strongest bin within `[low, high]`
    pub fn peak_between(&self, low: f64, high: f64) -> Option<(f64, f64)> {
        self.power
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let f = self.frequency(*i);
                f >= low && f <= high
            })
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &p)| (self.frequency(i), p))
    }
}

/// Analyzer turning motion magnitude into a convulsion confidence
pub struct SpectralAnalyzer {
    config: SpectralConfig,
    buffer: TemporalBuffer,
    grid_len: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        let grid_len = ((config.window_secs * config.target_rate_hz).round() as usize).max(2);

        let window: Vec<f64> = (0..grid_len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (grid_len - 1) as f64).cos()))
            .collect();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(grid_len);

        Self {
            buffer: TemporalBuffer::with_max_gap(config.window_secs, config.max_gap_secs),
            config,
            grid_len,
            window,
            fft,
        }
    }

    /// Record one motion magnitude; values under the noise floor count as stillness
    pub fn push(&mut self, timestamp: f64, magnitude: f64) -> Result<()> {
        let value = if magnitude.is_finite() && magnitude >= self.config.noise_floor {
            magnitude
        } else {
            0.0
        };
        self.buffer.push(Sample::new(timestamp, value))
    }

    /// Analyze the current window
    pub fn analyze(&self) -> Assessment<ConvulsionReading> {
        if !self.buffer.is_full() || self.buffer.is_stale() {
            return Assessment::InsufficientData;
        }

        let Some(latest) = self.buffer.latest().map(|s| s.timestamp) else {
            return Assessment::InsufficientData;
        };
        let Some(mut grid) = self.buffer.resample_uniform(self.config.target_rate_hz, self.grid_len) else {
            return Assessment::InsufficientData;
        };

        let input_rate_hz = self.buffer.effective_sample_rate().unwrap_or(0.0);

        // Detrend
        let mean = grid.iter().sum::<f64>() / grid.len() as f64;
        grid.iter_mut().for_each(|x| *x -= mean);

        if std_dev(&grid) < self.config.min_std {
            return Assessment::Ready(ConvulsionReading {
                timestamp: latest,
                input_rate_hz,
                ..Default::default()
            });
        }

        let spectrum = self.power_spectrum(&grid);
        let nyquist = self.config.target_rate_hz / 2.0;
        let band_energy = spectrum.energy_between(self.config.band_low_hz, self.config.band_high_hz);
        let total_energy = spectrum.energy_between(self.config.total_low_hz, nyquist);
        let dominant_frequency = spectrum
            .peak_between(self.config.band_low_hz, self.config.band_high_hz)
            .map(|(f, _)| f)
            .unwrap_or(0.0);

        let band_ratio = if total_energy > 1e-12 { band_energy / total_energy } else { 0.0 };
        let confidence = self.confidence(band_energy, band_ratio);

        trace!(
            "spectral t={:.3} f_dom={:.2}Hz band={:.4} total={:.4} ratio={:.3} conf={:.3}",
            latest, dominant_frequency, band_energy, total_energy, band_ratio, confidence
        );

        Assessment::Ready(ConvulsionReading {
            confidence,
            timestamp: latest,
            dominant_frequency,
            band_energy,
            total_energy,
            band_ratio,
            input_rate_hz,
        })
    }

    /// Monotonic in band energy and in the band share of total energy
    fn confidence(&self, band_energy: f64, band_ratio: f64) -> f64 {
        let energy_factor = (band_energy / self.config.energy_threshold).clamp(0.0, 1.0);
        let ratio_factor = (band_ratio * self.config.ratio_gain).clamp(0.0, 1.0);
        (energy_factor * ratio_factor).clamp(0.0, 1.0)
    }

    /// Hann-windowed one-sided power spectrum of a uniformly sampled, detrended signal
    pub fn power_spectrum(&self, data: &[f64]) -> PowerSpectrum {
        let n = self.grid_len;
        let mut buffer: Vec<Complex<f64>> = data.iter()
            .take(n)
            .zip(self.window.iter())
            .map(|(&x, &w)| Complex::new(x * w, 0.0))
            .collect();
        buffer.resize(n, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let norm = (n * n) as f64;
        let power: Vec<f64> = buffer[0..=n / 2].iter()
            .enumerate()
            .map(|(k, c)| {
                // Interior bins fold in their negative-frequency mirror
                let fold = if k == 0 || (n % 2 == 0 && k == n / 2) { 1.0 } else { 2.0 };
                fold * c.norm_sqr() / norm
            })
            .collect();

        PowerSpectrum {
            power,
            resolution: self.config.target_rate_hz / n as f64,
        }
    }

    /// Samples currently held
    pub fn buffer(&self) -> &TemporalBuffer {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
