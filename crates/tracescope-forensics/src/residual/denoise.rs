// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Denoising filters. Each returns the smoothed estimate; the residual is the
// input minus that estimate. Kernels run sequentially so output is
// bit-identical across runs.

use tracescope_core::config::DenoiseFilter;
use tracescope_core::error::Result;

use crate::transform::wavelet;

/// Noise-level constant for the median absolute deviation of Gaussian noise.
const MAD_TO_SIGMA: f32 = 0.6745;

/// Apply `filter` to a row-major buffer.
pub fn denoise(filter: DenoiseFilter, data: &[f32], width: usize, height: usize) -> Result<Vec<f32>> {
    match filter {
        DenoiseFilter::Gaussian { sigma } => Ok(gaussian(data, width, height, sigma)),
        DenoiseFilter::Wavelet { levels } => wavelet_shrink(data, width, height, levels as usize),
    }
}

// -- Gaussian ----------------------------------------------------------------

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur with clamped borders.
pub fn gaussian(data: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let clamp = |v: isize, n: usize| v.clamp(0, n as isize - 1) as usize;

    let mut horizontal = vec![0.0f32; data.len()];
    for y in 0..height {
        let row = &data[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * row[clamp(x as isize + k as isize - radius, width)])
                .sum();
        }
    }

    let mut out = vec![0.0f32; data.len()];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    w * horizontal[clamp(y as isize + k as isize - radius, height) * width + x]
                })
                .sum();
        }
    }
    out
}

// -- Wavelet shrinkage ---------------------------------------------------------

fn soft_threshold(band: &mut [f32], threshold: f32) {
    for v in band {
        let magnitude = (v.abs() - threshold).max(0.0);
        *v = magnitude.copysign(*v);
    }
}

fn median_abs(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = values.iter().map(|v| v.abs()).collect();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

/// BayesShrink threshold for one subband given the noise variance.
fn bayes_threshold(band: &[f32], noise_var: f32) -> f32 {
    if band.is_empty() {
        return 0.0;
    }
    let var = band.iter().map(|v| v * v).sum::<f32>() / band.len() as f32;
    let signal_sd = (var - noise_var).max(0.0).sqrt();
    if signal_sd > 0.0 {
        noise_var / signal_sd
    } else {
        // Pure noise: remove the whole subband.
        band.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }
}

/// Haar wavelet denoising with per-subband BayesShrink soft thresholds.
///
/// The noise level is estimated once from the finest diagonal band as
/// `median(|HH1|) / 0.6745`.
pub fn wavelet_shrink(data: &[f32], width: usize, height: usize, levels: usize) -> Result<Vec<f32>> {
    let mut pyramid = wavelet::decompose(data, width, height, levels)?;
    let noise_sd = pyramid
        .levels
        .first()
        .map(|finest| median_abs(&finest.hh) / MAD_TO_SIGMA)
        .unwrap_or(0.0);
    let noise_var = noise_sd * noise_sd;

    for level in &mut pyramid.levels {
        for band in level.details_mut() {
            let threshold = bayes_threshold(band, noise_var);
            soft_threshold(band, threshold);
        }
    }
    Ok(wavelet::reconstruct(&pyramid))
}
