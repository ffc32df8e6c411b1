// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic scans and artifact directories for unit tests.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracescope_core::config::{ArtifactPaths, PipelineConfig};
use tracescope_core::error::Result;

use crate::artifacts::{ArtifactStore, NetworkLoader};
use crate::classify::hybrid::{HybridBatch, HybridNetwork};
use crate::features::FEATURE_LEN;
use crate::fingerprint::bank::{BankEntry, BankFile};
use crate::input::ImageInput;
use crate::residual::ResidualExtractor;

pub const SIZE: u32 = 64;
pub const DEVICES: [&str; 3] = ["Canon LiDE 120", "Epson V39", "HP ScanJet 200"];

fn lcg(seed: u32) -> impl FnMut() -> f32 {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
    }
}

/// A smooth page with the device's fixed noise pattern plus fresh sensor noise.
pub fn scan(device: usize, shot: u32) -> DynamicImage {
    let mut pattern = lcg(1000 + device as u32);
    let mut noise = lcg(50_000 + shot);
    let mut img = GrayImage::new(SIZE, SIZE);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let page = 90.0 + 60.0 * (x + y) as f32 / (2 * SIZE) as f32;
            let value = page + 40.0 * pattern() + 10.0 * noise();
            img.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// A blank page: no device noise at all.
pub fn blank() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(SIZE, SIZE, Luma([200])))
}

pub fn png_input(source: &str, image: &DynamicImage) -> ImageInput {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap_or_else(|err| panic!("encode {source}: {err}"));
    ImageInput::encoded(source, bytes)
}

pub fn corrupt_input(source: &str) -> ImageInput {
    ImageInput::encoded(source, b"\x89PNG\r\n\x1a\nnot really".to_vec())
}

pub fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        canonical_size: SIZE,
        artifacts: ArtifactPaths::from_dir(dir),
        ..PipelineConfig::default()
    }
}

/// Write a bank built from one clean scan per device, an identity scaler of
/// `scaler_dim` features, the label encoder, and a stub model file.
pub fn write_hybrid_artifacts(config: &PipelineConfig, scaler_dim: usize) {
    let extractor = ResidualExtractor::new(config);
    let paths = &config.artifacts;
    let entries = DEVICES
        .iter()
        .enumerate()
        .map(|(device, key)| BankEntry {
            key: key.to_string(),
            fingerprint: extractor
                .extract(&scan(device, 9_999))
                .map(|r| r.into_data())
                .unwrap_or_else(|err| panic!("fingerprint for {key}: {err}")),
        })
        .collect();
    let bank = BankFile {
        width: SIZE as usize,
        height: SIZE as usize,
        entries,
    };
    write(&paths.fingerprints, &bank);
    write(
        &paths.label_encoder,
        &serde_json::json!({ "classes": DEVICES }),
    );
    write(
        &paths.scaler,
        &serde_json::json!({ "mean": vec![0.0; scaler_dim], "scale": vec![1.0; scaler_dim] }),
    );
    std::fs::write(&paths.hybrid_model, b"stub").unwrap_or_else(|err| panic!("{err}"));
}

/// Row length the hybrid scaler must accept.
pub fn hybrid_row_len() -> usize {
    DEVICES.len() + FEATURE_LEN
}

fn write<T: serde::Serialize>(path: &Path, value: &T) {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|err| panic!("{err}"));
    std::fs::write(path, bytes).unwrap_or_else(|err| panic!("{}: {err}", path.display()));
}

/// Scores each row by softmax over its leading correlation scores.
pub struct CorrelationNetwork {
    pub classes: usize,
    pub delay: std::time::Duration,
}

impl HybridNetwork for CorrelationNetwork {
    fn predict(&self, batch: &HybridBatch) -> Result<Vec<Vec<f32>>> {
        std::thread::sleep(self.delay);
        Ok((0..batch.rows)
            .map(|i| {
                let logits: Vec<f32> = batch.feature_row(i)[..self.classes]
                    .iter()
                    .map(|c| c * 20.0)
                    .collect();
                let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
                let sum: f32 = exp.iter().sum();
                exp.into_iter().map(|e| e / sum).collect()
            })
            .collect())
    }
}

pub fn correlation_loader(delay: std::time::Duration) -> NetworkLoader {
    Arc::new(move |_: &Path| -> Result<Arc<dyn HybridNetwork>> {
        Ok(Arc::new(CorrelationNetwork {
            classes: DEVICES.len(),
            delay,
        }))
    })
}

pub fn store(config: &PipelineConfig, delay: std::time::Duration) -> Arc<ArtifactStore> {
    Arc::new(ArtifactStore::with_network_loader(config, correlation_loader(delay)))
}

/// A one-split forest: residual std at or below 0.001 (blank pages) is the
/// first class, anything noisier the second.
pub fn write_baseline_forest(config: &PipelineConfig) {
    let model = serde_json::json!({
        "kind": "random_forest",
        "n_features": FEATURE_LEN,
        "classes": ["Canon LiDE 120", "Epson V39"],
        "trees": [[
            {"split": {"feature": 1, "threshold": 0.001, "left": 1, "right": 2}},
            {"leaf": {"distribution": [19.0, 1.0]}},
            {"leaf": {"distribution": [1.0, 3.0]}}
        ]]
    });
    write(&config.artifacts.baseline_model, &model);
}
