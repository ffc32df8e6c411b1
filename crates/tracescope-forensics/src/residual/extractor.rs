// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Residual extractor: decode, grayscale, canonicalise, denoise, subtract.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma};
use tracescope_core::config::{CanonicalFit, DenoiseFilter, PipelineConfig};
use tracescope_core::error::Result;
use tracing::{debug, instrument};

use super::Residual;
use super::denoise;
use crate::input::ImageInput;

type LumaF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Turns images into fixed-size noise residuals.
///
/// Identical input always yields a bit-identical residual.
#[derive(Debug, Clone, Copy)]
pub struct ResidualExtractor {
    size: u32,
    fit: CanonicalFit,
    filter: DenoiseFilter,
}

impl ResidualExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            size: config.canonical_size,
            fit: config.canonical_fit,
            filter: config.denoise,
        }
    }

    /// Side length of every residual this extractor produces.
    pub fn canonical_size(&self) -> usize {
        self.size as usize
    }

    /// Decode and extract. Decode failures surface as `TraceError::Decode`.
    #[instrument(skip_all, fields(source = %input.source))]
    pub fn extract_input(&self, input: &ImageInput) -> Result<Residual> {
        let image = input.decode()?;
        self.extract(&image)
    }

    /// Extract from encoded JPEG/PNG/TIFF bytes.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<Residual> {
        self.extract_input(&ImageInput::encoded("<bytes>", bytes.to_vec()))
    }

    /// Extract from a decoded image of any colour type or bit depth.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn extract(&self, image: &DynamicImage) -> Result<Residual> {
        // Luma in [0, 1] regardless of source bit depth.
        let gray = self.canonicalize(image.to_luma32f());
        let size = self.size as usize;
        let pixels = gray.into_raw();

        let smoothed = denoise::denoise(self.filter, &pixels, size, size)?;
        let data: Vec<f32> = pixels.iter().zip(&smoothed).map(|(p, s)| p - s).collect();
        let residual = Residual::from_raw(size, size, data)?;

        debug!(
            size,
            std_dev = residual.std_dev(),
            "Residual extracted"
        );
        Ok(residual)
    }

    fn canonicalize(&self, gray: LumaF32) -> LumaF32 {
        let s = self.size;
        let (w, h) = gray.dimensions();
        if (w, h) == (s, s) {
            return gray;
        }
        match self.fit {
            CanonicalFit::CenterCrop if w >= s && h >= s => {
                imageops::crop_imm(&gray, (w - s) / 2, (h - s) / 2, s, s).to_image()
            }
            _ => imageops::resize(&gray, s, s, FilterType::Triangle),
        }
    }
}
