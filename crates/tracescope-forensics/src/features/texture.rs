// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Texture and edge statistics over the min-max scaled residual, using
// imageproc's LBP, Sobel, and Canny operators.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::gradients::sobel_gradients;
use imageproc::local_binary_patterns::{count_transitions, local_binary_pattern};

use crate::residual::Residual;

/// Uniform patterns map to their bit count (0..=8); everything else to bin 9.
pub const LBP_BINS: usize = 10;
pub const TEXTURE_LEN: usize = LBP_BINS + 3;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// LBP histogram, Sobel magnitude mean and std (in units of 255), and Canny
/// edge density.
pub fn texture_features(residual: &Residual) -> [f32; TEXTURE_LEN] {
    let gray = residual.to_gray_u8();
    let mut out = [0.0f32; TEXTURE_LEN];

    out[..LBP_BINS].copy_from_slice(&lbp_histogram(&gray));

    let (mean, sd) = sobel_stats(&gray);
    out[LBP_BINS] = mean;
    out[LBP_BINS + 1] = sd;
    out[LBP_BINS + 2] = edge_density(&gray);
    out
}

fn lbp_histogram(gray: &GrayImage) -> [f32; LBP_BINS] {
    let mut hist = [0u64; LBP_BINS];
    let (w, h) = gray.dimensions();
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            if let Some(code) = local_binary_pattern(gray, x, y) {
                let bin = if count_transitions(code) <= 2 {
                    code.count_ones() as usize
                } else {
                    LBP_BINS - 1
                };
                hist[bin] += 1;
            }
        }
    }
    let total: u64 = hist.iter().sum();
    let mut out = [0.0f32; LBP_BINS];
    if total > 0 {
        for (slot, count) in out.iter_mut().zip(hist) {
            *slot = count as f32 / total as f32;
        }
    }
    out
}

fn sobel_stats(gray: &GrayImage) -> (f32, f32) {
    let magnitudes = sobel_gradients(gray);
    let values: Vec<f64> = magnitudes.pixels().map(|p| p.0[0] as f64 / 255.0).collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean as f32, var.sqrt() as f32)
}

fn edge_density(gray: &GrayImage) -> f32 {
    let edges = canny(gray, CANNY_LOW, CANNY_HIGH);
    let total = edges.pixels().len();
    if total == 0 {
        return 0.0;
    }
    edges.pixels().filter(|p| p.0[0] > 0).count() as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lbp_histogram_is_a_distribution() {
        let data: Vec<f32> = (0..32 * 32).map(|i| ((i * 37) % 19) as f32).collect();
        let r = Residual::from_raw(32, 32, data).unwrap();
        let f = texture_features(&r);
        let sum: f32 = f[..LBP_BINS].iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn flat_residual_has_no_edges() {
        let r = Residual::from_raw(16, 16, vec![0.0; 256]).unwrap();
        let f = texture_features(&r);
        assert_eq!(f[LBP_BINS], 0.0);
        assert_eq!(f[LBP_BINS + 2], 0.0);
        // Every interior pixel produces the same uniform pattern.
        assert!(f[..LBP_BINS].iter().any(|v| (v - 1.0).abs() < 1e-6));
        assert_eq!(f[LBP_BINS - 1], 0.0);
    }

    #[test]
    fn step_edge_is_detected() {
        let data: Vec<f32> = (0..32 * 32).map(|i| if i % 32 < 16 { 0.0 } else { 1.0 }).collect();
        let r = Residual::from_raw(32, 32, data).unwrap();
        let f = texture_features(&r);
        assert!(f[LBP_BINS] > 0.0);
        assert!(f[LBP_BINS + 2] > 0.0);
    }
}
