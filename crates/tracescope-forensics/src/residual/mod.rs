// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device-noise residuals: the image minus its denoised estimate.

pub mod denoise;
pub mod extractor;

pub use extractor::ResidualExtractor;

use tracescope_core::error::{Result, TraceError};

/// High-frequency noise left after subtracting a denoised image.
///
/// Row-major `f32` buffer at the canonical analysis size. Residuals are owned
/// by the identification call that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Residual {
    /// Wrap a raw buffer, checking that it holds `width * height` samples.
    pub fn from_raw(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(TraceError::dimension("residual buffer", width * height, data.len()));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64) as f32
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean() as f64;
        let var = self
            .data
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / self.data.len() as f64;
        var.sqrt() as f32
    }

    /// Zero-mean, unit-L2 copy. A constant residual normalises to all zeros.
    pub fn normalized(&self) -> Vec<f32> {
        let mean = self.mean();
        let centred: Vec<f32> = self.data.iter().map(|&v| v - mean).collect();
        let norm = centred.iter().map(|&v| (v as f64).powi(2)).sum::<f64>().sqrt();
        if norm <= f64::EPSILON {
            return vec![0.0; centred.len()];
        }
        centred.into_iter().map(|v| (v as f64 / norm) as f32).collect()
    }

    /// Min-max scaled 8-bit copy for the texture operators.
    pub fn to_gray_u8(&self) -> image::GrayImage {
        let (min, max) = self
            .data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let pixels = self
            .data
            .iter()
            .map(|&v| {
                if range > f32::EPSILON {
                    (((v - min) / range) * 255.0).round() as u8
                } else {
                    0
                }
            })
            .collect();
        // Length was checked in `from_raw`, so the buffer always fits.
        image::GrayImage::from_raw(self.width as u32, self.height as u32, pixels)
            .unwrap_or_else(|| image::GrayImage::new(self.width as u32, self.height as u32))
    }
}
