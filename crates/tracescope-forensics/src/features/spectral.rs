// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frequency-domain energy statistics.

use tracescope_core::error::Result;

use crate::residual::Residual;
use crate::transform::fft::{Spectrum, fft2d};

pub const RADIAL_BANDS: usize = 8;
pub const SPECTRAL_LEN: usize = RADIAL_BANDS + 3;

const EPS: f64 = 1e-12;

/// Radial band energy fractions, spectral flatness, then the fractions of
/// energy on the horizontal (`v = 0`) and vertical (`u = 0`) frequency axes.
/// The DC bin is excluded throughout.
pub fn spectral_features(residual: &Residual) -> Result<[f32; SPECTRAL_LEN]> {
    let (w, h) = (residual.width(), residual.height());
    let spectrum = fft2d(residual.data(), w, h)?;

    let mut bands = [0.0f64; RADIAL_BANDS];
    let (mut total, mut log_sum, mut horizontal, mut vertical) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let half_w = (w as f64 / 2.0).max(1.0);
    let half_h = (h as f64 / 2.0).max(1.0);

    for v in 0..h {
        let fv = Spectrum::signed_frequency(v, h) as f64;
        for u in 0..w {
            if u == 0 && v == 0 {
                continue;
            }
            let fu = Spectrum::signed_frequency(u, w) as f64;
            let power = spectrum.bins[v * w + u].norm_sqr();

            let radius = ((fu / half_w).powi(2) + (fv / half_h).powi(2)).sqrt() / std::f64::consts::SQRT_2;
            let band = ((radius * RADIAL_BANDS as f64) as usize).min(RADIAL_BANDS - 1);
            bands[band] += power;

            total += power;
            log_sum += (power + EPS).ln();
            if v == 0 {
                horizontal += power;
            }
            if u == 0 {
                vertical += power;
            }
        }
    }

    let count = (w * h - 1).max(1) as f64;
    let fraction = |e: f64| if total > 0.0 { (e / total) as f32 } else { 0.0 };
    let flatness = if total > 0.0 {
        ((log_sum / count).exp() / (total / count + EPS)) as f32
    } else {
        0.0
    };

    let mut out = [0.0f32; SPECTRAL_LEN];
    for (slot, energy) in out.iter_mut().zip(bands) {
        *slot = fraction(energy);
    }
    out[RADIAL_BANDS] = flatness;
    out[RADIAL_BANDS + 1] = fraction(horizontal);
    out[RADIAL_BANDS + 2] = fraction(vertical);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_fractions_sum_to_one() {
        let data: Vec<f32> = (0..32 * 32).map(|i| ((i * 7 + i / 32) % 13) as f32 - 6.0).collect();
        let r = Residual::from_raw(32, 32, data).unwrap();
        let f = spectral_features(&r).unwrap();
        let sum: f32 = f[..RADIAL_BANDS].iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum = {sum}");
        assert!(f[RADIAL_BANDS] > 0.0 && f[RADIAL_BANDS] <= 1.0 + 1e-6);
    }

    #[test]
    fn vertical_stripes_put_energy_on_horizontal_axis() {
        // Varies along x only, so all energy sits at v = 0.
        let data: Vec<f32> = (0..16 * 16)
            .map(|i| if (i % 16) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let r = Residual::from_raw(16, 16, data).unwrap();
        let f = spectral_features(&r).unwrap();
        assert!((f[RADIAL_BANDS + 1] - 1.0).abs() < 1e-5);
        assert!(f[RADIAL_BANDS + 2].abs() < 1e-5);
    }

    #[test]
    fn zero_residual_yields_zeros() {
        let r = Residual::from_raw(8, 8, vec![0.0; 64]).unwrap();
        assert!(spectral_features(&r).unwrap().iter().all(|v| *v == 0.0));
    }
}
