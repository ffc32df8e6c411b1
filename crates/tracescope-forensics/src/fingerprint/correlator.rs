// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fingerprint correlator: one score per bank entry, in bank key order.

use std::sync::Arc;

use rayon::prelude::*;
use tracescope_core::config::{CorrelationMetric, CorrelationSettings};
use tracescope_core::error::{Result, TraceError};
use tracescope_core::types::FingerprintMatch;
use tracing::{debug, instrument};

use super::bank::FingerprintBank;
use crate::residual::Residual;
use crate::transform::fft::{Spectrum, fft2d, ifft2d};

/// Half-width of the window around the correlation peak excluded from the
/// PCE energy term (11x11 window).
const PCE_EXCLUSION_RADIUS: usize = 5;

/// Scores for one residual, aligned with the bank's key order.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationScores {
    pub scores: Vec<f32>,
}

impl CorrelationScores {
    /// Index and score of the best entry. Among entries within `epsilon` of
    /// the maximum the earliest wins. Non-finite scores never win.
    pub fn best_match(&self, epsilon: f32) -> Option<(usize, f32)> {
        let max = self
            .scores
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |m| m.max(s))))?;
        self.scores
            .iter()
            .copied()
            .enumerate()
            .find(|(_, s)| s.is_finite() && *s >= max - epsilon)
    }
}

/// Bank references prepared once and reused for every residual.
#[derive(Debug)]
pub struct FingerprintCorrelator {
    bank: Arc<FingerprintBank>,
    settings: CorrelationSettings,
    /// Zero-mean, unit-norm references.
    normalized: Vec<Vec<f32>>,
    /// Reference spectra, present for PCE only.
    spectra: Option<Vec<Spectrum>>,
}

impl FingerprintCorrelator {
    /// Normalise every reference and, for PCE, transform it once.
    #[instrument(skip_all, fields(devices = bank.len(), metric = ?settings.metric))]
    pub fn prepare(bank: Arc<FingerprintBank>, settings: CorrelationSettings) -> Result<Self> {
        let normalized: Vec<Vec<f32>> = bank.iter().map(|(_, fp)| normalize(fp)).collect();
        let spectra = match settings.metric {
            CorrelationMetric::Ncc => None,
            CorrelationMetric::Pce => Some(
                normalized
                    .iter()
                    .map(|fp| fft2d(fp, bank.width(), bank.height()))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(Self {
            bank,
            settings,
            normalized,
            spectra,
        })
    }

    pub fn bank(&self) -> &FingerprintBank {
        &self.bank
    }

    pub fn settings(&self) -> CorrelationSettings {
        self.settings
    }

    /// Score one residual against every reference.
    pub fn correlate(&self, residual: &Residual) -> Result<CorrelationScores> {
        let (w, h) = (self.bank.width(), self.bank.height());
        if residual.width() != w || residual.height() != h {
            return Err(TraceError::dimension(
                "residual vs fingerprint bank",
                w * h,
                residual.width() * residual.height(),
            ));
        }
        let probe = residual.normalized();

        let scores = match &self.spectra {
            None => self.normalized.iter().map(|fp| dot(&probe, fp)).collect(),
            Some(spectra) => {
                let probe_spectrum = fft2d(&probe, w, h)?;
                spectra
                    .iter()
                    .map(|reference| pce(&probe_spectrum.cross_power(reference)))
                    .collect()
            }
        };
        Ok(CorrelationScores { scores })
    }

    /// Score many residuals against the same prepared bank, in input order.
    #[instrument(skip_all, fields(count = residuals.len()))]
    pub fn correlate_batch(&self, residuals: &[Residual]) -> Vec<Result<CorrelationScores>> {
        let out: Vec<_> = residuals.par_iter().map(|r| self.correlate(r)).collect();
        debug!(count = out.len(), "Batch correlated");
        out
    }

    /// Best bank entry for a set of scores, using the configured tie epsilon.
    pub fn best_match(&self, scores: &CorrelationScores) -> Option<FingerprintMatch> {
        let (index, score) = scores.best_match(self.settings.tie_epsilon)?;
        self.bank.key(index).map(|device| FingerprintMatch {
            device: device.to_string(),
            score,
        })
    }
}

/// Normalised correlation coefficient of `residual` against every bank entry.
pub fn correlate(residual: &Residual, bank: &FingerprintBank) -> Result<Vec<f32>> {
    let correlator = FingerprintCorrelator::prepare(
        Arc::new(bank.clone()),
        CorrelationSettings {
            metric: CorrelationMetric::Ncc,
            ..CorrelationSettings::default()
        },
    )?;
    Ok(correlator.correlate(residual)?.scores)
}

fn normalize(data: &[f32]) -> Vec<f32> {
    let n = data.len().max(1) as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let norm = data
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        .sqrt();
    if norm <= f64::EPSILON {
        return vec![0.0; data.len()];
    }
    data.iter().map(|&v| ((v as f64 - mean) / norm) as f32).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum::<f64>() as f32
}

/// Signed peak-to-correlation-energy of a cross-power spectrum.
fn pce(cross: &Spectrum) -> f32 {
    let (w, h) = (cross.width, cross.height);
    let surface = ifft2d(cross);

    let Some((peak_index, peak)) = surface
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    else {
        return 0.0;
    };
    let (px, py) = (peak_index % w, peak_index / w);

    let within = |a: usize, b: usize, n: usize| {
        let d = a.abs_diff(b);
        d.min(n - d) <= PCE_EXCLUSION_RADIUS
    };
    let (mut energy, mut count) = (0.0f64, 0usize);
    for (i, v) in surface.iter().enumerate() {
        if within(i % w, px, w) && within(i / w, py, h) {
            continue;
        }
        energy += v * v;
        count += 1;
    }
    if count == 0 || energy <= 0.0 {
        return 0.0;
    }
    (peak.signum() * peak * peak / (energy / count as f64)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect()
    }

    fn bank(size: usize) -> Arc<FingerprintBank> {
        Arc::new(
            FingerprintBank::from_entries(
                size,
                size,
                vec![
                    ("Canon 120".into(), noise(size * size, 1)),
                    ("Epson V39".into(), noise(size * size, 2)),
                    ("HP Scanjet".into(), noise(size * size, 3)),
                ],
            )
            .unwrap(),
        )
    }

    fn probe(size: usize, device_seed: u32) -> Residual {
        let pattern = noise(size * size, device_seed);
        let extra = noise(size * size, 777);
        let data = pattern.iter().zip(&extra).map(|(p, e)| p + 0.5 * e).collect();
        Residual::from_raw(size, size, data).unwrap()
    }

    #[test]
    fn ncc_picks_the_matching_device() {
        let correlator = FingerprintCorrelator::prepare(bank(32), CorrelationSettings::default()).unwrap();
        let scores = correlator.correlate(&probe(32, 2)).unwrap();
        assert_eq!(scores.scores.len(), 3);
        assert!(scores.scores.iter().all(|s| (-1.0..=1.0).contains(s)));
        let best = correlator.best_match(&scores).unwrap();
        assert_eq!(best.device, "Epson V39");
        assert!(best.score > 0.5);
    }

    #[test]
    fn pce_picks_the_matching_device() {
        let settings = CorrelationSettings {
            metric: CorrelationMetric::Pce,
            tie_epsilon: 1e-6,
        };
        let correlator = FingerprintCorrelator::prepare(bank(32), settings).unwrap();
        let scores = correlator.correlate(&probe(32, 3)).unwrap();
        let (index, score) = scores.best_match(1e-6).unwrap();
        assert_eq!(index, 2);
        assert!(score > scores.scores[0] && score > scores.scores[1]);
    }

    #[test]
    fn ties_go_to_the_earliest_key() {
        let scores = CorrelationScores {
            scores: vec![0.1, 0.8, 0.8000001, 0.8],
        };
        assert_eq!(scores.best_match(1e-6).map(|m| m.0), Some(1));
        assert_eq!(scores.best_match(0.0).map(|m| m.0), Some(2));
    }

    #[test]
    fn nan_scores_never_win() {
        let scores = CorrelationScores {
            scores: vec![f32::NAN, 0.2],
        };
        assert_eq!(scores.best_match(0.0).map(|m| m.0), Some(1));
        assert!(CorrelationScores { scores: vec![] }.best_match(0.0).is_none());
    }

    #[test]
    fn batch_preserves_input_order() {
        let correlator = FingerprintCorrelator::prepare(bank(16), CorrelationSettings::default()).unwrap();
        let residuals = vec![probe(16, 3), probe(16, 1), probe(16, 2)];
        let devices: Vec<String> = correlator
            .correlate_batch(&residuals)
            .into_iter()
            .map(|s| correlator.best_match(&s.unwrap()).unwrap().device)
            .collect();
        assert_eq!(devices, vec!["HP Scanjet", "Canon 120", "Epson V39"]);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let correlator = FingerprintCorrelator::prepare(bank(16), CorrelationSettings::default()).unwrap();
        let err = correlator.correlate(&probe(32, 1)).unwrap_err();
        assert!(matches!(err, TraceError::DimensionMismatch { .. }));
    }

    #[test]
    fn free_function_matches_prepared_correlator() {
        let bank = bank(16);
        let r = probe(16, 1);
        let direct = correlate(&r, &bank).unwrap();
        let prepared = FingerprintCorrelator::prepare(bank, CorrelationSettings::default())
            .unwrap()
            .correlate(&r)
            .unwrap();
        assert_eq!(direct, prepared.scores);
    }
}
