// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feature engineer: fixed-length statistics over a residual.
//
// Layout (38 values, in order):
//   moments   4   mean, std, skewness, excess kurtosis
//   spectral 11   8 radial band fractions, flatness, horizontal/vertical axis fractions
//   texture  13   10-bin uniform LBP histogram, Sobel mean/std, Canny edge density
//   wavelet  10   3 levels x {LH, HL, HH} log-energy, approximation log-energy

pub mod spectral;
pub mod texture;

use tracescope_core::error::{Result, TraceError};
use tracing::instrument;

use crate::residual::Residual;
use crate::transform::wavelet;

pub const MOMENTS_LEN: usize = 4;
pub const WAVELET_LEVELS: usize = 3;
pub const WAVELET_LEN: usize = WAVELET_LEVELS * 3 + 1;

/// Number of engineered features per image.
pub const FEATURE_LEN: usize = MOMENTS_LEN + spectral::SPECTRAL_LEN + texture::TEXTURE_LEN + WAVELET_LEN;

const LOG_EPS: f64 = 1e-12;

/// Ordered engineered statistics for one residual.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stable feature names, aligned with [`FeatureEngineer::extract`] output.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = ["residual_mean", "residual_std", "residual_skewness", "residual_kurtosis"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend((0..spectral::RADIAL_BANDS).map(|b| format!("fft_band_{b}")));
    names.extend(
        ["fft_flatness", "fft_horizontal_axis", "fft_vertical_axis"]
            .iter()
            .map(|s| s.to_string()),
    );
    names.extend((0..texture::LBP_BINS).map(|b| format!("lbp_{b}")));
    names.extend(
        ["sobel_mean", "sobel_std", "canny_density"]
            .iter()
            .map(|s| s.to_string()),
    );
    for level in 1..=WAVELET_LEVELS {
        for band in ["lh", "hl", "hh"] {
            names.push(format!("wavelet_l{level}_{band}"));
        }
    }
    names.push(format!("wavelet_l{WAVELET_LEVELS}_approx"));
    names
}

/// Computes the engineered feature vector. Pure; holds no state beyond the
/// expected input size.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEngineer {
    size: usize,
}

impl FeatureEngineer {
    pub fn new(canonical_size: usize) -> Self {
        Self { size: canonical_size }
    }

    /// Extract [`FEATURE_LEN`] statistics. The residual must be at the
    /// canonical size.
    #[instrument(skip_all, fields(width = residual.width(), height = residual.height()))]
    pub fn extract(&self, residual: &Residual) -> Result<FeatureVector> {
        if residual.width() != self.size || residual.height() != self.size {
            return Err(TraceError::dimension(
                "feature engineer input",
                self.size * self.size,
                residual.width() * residual.height(),
            ));
        }

        let mut out = Vec::with_capacity(FEATURE_LEN);
        out.extend_from_slice(&moments(residual.data()));
        out.extend_from_slice(&spectral::spectral_features(residual)?);
        out.extend_from_slice(&texture::texture_features(residual));
        out.extend_from_slice(&wavelet_energies(residual)?);
        debug_assert_eq!(out.len(), FEATURE_LEN);
        Ok(FeatureVector(out))
    }
}

fn moments(data: &[f32]) -> [f32; MOMENTS_LEN] {
    if data.is_empty() {
        return [0.0; MOMENTS_LEN];
    }
    let n = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in data {
        let d = v as f64 - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    let sd = m2.sqrt();
    let (skew, kurt) = if m2 > 0.0 {
        (m3 / (m2 * sd), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };
    [mean as f32, sd as f32, skew as f32, kurt as f32]
}

fn log_energy(band: &[f32]) -> f32 {
    let mean_sq = if band.is_empty() {
        0.0
    } else {
        band.iter().map(|&v| (v as f64).powi(2)).sum::<f64>() / band.len() as f64
    };
    (LOG_EPS + mean_sq).log10() as f32
}

fn wavelet_energies(residual: &Residual) -> Result<[f32; WAVELET_LEN]> {
    let pyramid = wavelet::decompose(residual.data(), residual.width(), residual.height(), WAVELET_LEVELS)?;
    let mut out = [0.0f32; WAVELET_LEN];
    for (level, bands) in pyramid.levels.iter().enumerate() {
        for (i, band) in bands.details().into_iter().enumerate() {
            out[level * 3 + i] = log_energy(band);
        }
    }
    out[WAVELET_LEN - 1] = log_energy(&pyramid.approx);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_noise(size: usize, seed: u32) -> Residual {
        let mut state = seed;
        let data = (0..size * size)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        Residual::from_raw(size, size, data).unwrap()
    }

    #[test]
    fn names_match_length() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_LEN);
        assert_eq!(FEATURE_LEN, 38);
        assert_eq!(names[0], "residual_mean");
        assert_eq!(names[FEATURE_LEN - 1], "wavelet_l3_approx");
    }

    #[test]
    fn extract_produces_fixed_length_finite_vector() {
        let engineer = FeatureEngineer::new(64);
        let features = engineer.extract(&pseudo_noise(64, 7)).unwrap();
        assert_eq!(features.len(), FEATURE_LEN);
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extract_is_pure() {
        let engineer = FeatureEngineer::new(32);
        let r = pseudo_noise(32, 99);
        assert_eq!(engineer.extract(&r).unwrap(), engineer.extract(&r).unwrap());
    }

    #[test]
    fn wrong_size_fails_fast() {
        let engineer = FeatureEngineer::new(64);
        let err = engineer.extract(&pseudo_noise(32, 1)).unwrap_err();
        assert!(matches!(err, TraceError::DimensionMismatch { .. }));
    }

    #[test]
    fn moments_of_symmetric_data() {
        let m = moments(&[-1.0, 1.0, -1.0, 1.0]);
        assert!(m[0].abs() < 1e-7);
        assert!((m[1] - 1.0).abs() < 1e-7);
        assert!(m[2].abs() < 1e-7);
        assert!((m[3] + 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_residual_has_floor_log_energy() {
        let engineer = FeatureEngineer::new(32);
        let zero = Residual::from_raw(32, 32, vec![0.0; 1024]).unwrap();
        let f = engineer.extract(&zero).unwrap();
        assert!((f.as_slice()[FEATURE_LEN - 1] + 12.0).abs() < 1e-4);
    }
}
