// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration and artifact locations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};

/// Environment variable naming the artifact directory.
pub const ARTIFACTS_ENV: &str = "TRACESCOPE_ARTIFACTS";

/// Well-known artifact filenames inside an artifact directory.
pub const HYBRID_MODEL_FILENAME: &str = "scanner_hybrid.rten";
pub const LABEL_ENCODER_FILENAME: &str = "hybrid_label_encoder.json";
pub const SCALER_FILENAME: &str = "hybrid_feat_scaler.json";
pub const FINGERPRINTS_FILENAME: &str = "scanner_fingerprints.json";
pub const FINGERPRINT_KEYS_FILENAME: &str = "fingerprint_keys.json";
pub const BASELINE_MODEL_FILENAME: &str = "baseline_model.json";

/// How an image is brought to the canonical analysis size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalFit {
    /// Resample the whole image to `size x size`.
    Resize,
    /// Take the central `size x size` window; resize if the image is smaller.
    CenterCrop,
}

/// Denoising filter whose output is subtracted to obtain the residual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenoiseFilter {
    /// Separable Gaussian blur.
    Gaussian { sigma: f32 },
    /// Haar wavelet shrinkage over `levels` decomposition levels.
    Wavelet { levels: u32 },
}

/// Correlation statistic used against the fingerprint bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMetric {
    /// Zero-lag normalised correlation coefficient.
    Ncc,
    /// Peak-to-correlation-energy of the circular cross-correlation.
    Pce,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSettings {
    pub metric: CorrelationMetric,
    /// Scores within this distance of the maximum count as ties.
    pub tie_epsilon: f32,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            metric: CorrelationMetric::Ncc,
            tie_epsilon: 1e-6,
        }
    }
}

/// Locations of the read-only artifacts the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub hybrid_model: PathBuf,
    pub label_encoder: PathBuf,
    pub scaler: PathBuf,
    pub fingerprints: PathBuf,
    /// Optional file fixing the bank's canonical key order.
    pub fingerprint_keys: PathBuf,
    pub baseline_model: PathBuf,
}

impl Default for ArtifactPaths {
    /// Artifacts in `$TRACESCOPE_ARTIFACTS`, falling back to `./results`.
    fn default() -> Self {
        let dir = std::env::var(ARTIFACTS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("results"));
        Self::from_dir(dir)
    }
}

impl ArtifactPaths {
    /// All artifacts under one directory with their well-known names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            hybrid_model: dir.join(HYBRID_MODEL_FILENAME),
            label_encoder: dir.join(LABEL_ENCODER_FILENAME),
            scaler: dir.join(SCALER_FILENAME),
            fingerprints: dir.join(FINGERPRINTS_FILENAME),
            fingerprint_keys: dir.join(FINGERPRINT_KEYS_FILENAME),
            baseline_model: dir.join(BASELINE_MODEL_FILENAME),
        }
    }

    /// Paths of the artifacts the hybrid path needs.
    pub fn hybrid_required(&self) -> [&Path; 4] {
        [
            &self.hybrid_model,
            &self.label_encoder,
            &self.scaler,
            &self.fingerprints,
        ]
    }

    /// Missing required hybrid artifacts, empty when all are present.
    pub fn missing_hybrid(&self) -> Vec<PathBuf> {
        self.hybrid_required()
            .into_iter()
            .filter(|p| !p.exists())
            .map(Path::to_path_buf)
            .collect()
    }

    /// Fail with `ResourceUnavailable` naming the first missing hybrid artifact.
    pub fn validate(&self) -> Result<()> {
        if let Some(missing) = self.missing_hybrid().first() {
            return Err(TraceError::ResourceUnavailable(format!(
                "hybrid artifact not found at {}",
                missing.display()
            )));
        }
        Ok(())
    }
}

/// Tunables for the identification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Side length of the square analysis window (power of two).
    pub canonical_size: u32,
    pub canonical_fit: CanonicalFit,
    pub denoise: DenoiseFilter,
    pub correlation: CorrelationSettings,
    /// Upper bound on one hybrid forward pass; `None` waits indefinitely.
    pub inference_timeout_ms: Option<u64>,
    /// Advisory confidence threshold (percent) echoed in results.
    pub confidence_threshold: f32,
    pub artifacts: ArtifactPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canonical_size: 256,
            canonical_fit: CanonicalFit::Resize,
            denoise: DenoiseFilter::Wavelet { levels: 2 },
            correlation: CorrelationSettings::default(),
            inference_timeout_ms: Some(30_000),
            confidence_threshold: 85.0,
            artifacts: ArtifactPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration file; omitted fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the transforms cannot honour.
    pub fn validate(&self) -> Result<()> {
        let size = self.canonical_size;
        if size < 32 || !size.is_power_of_two() {
            return Err(TraceError::Config(format!(
                "canonical_size must be a power of two >= 32, got {size}"
            )));
        }
        match self.denoise {
            DenoiseFilter::Gaussian { sigma } if !(sigma > 0.0 && sigma.is_finite()) => {
                return Err(TraceError::Config(format!(
                    "gaussian sigma must be positive, got {sigma}"
                )));
            }
            DenoiseFilter::Wavelet { levels } if levels == 0 || size.checked_shr(levels).unwrap_or(0) < 2 => {
                return Err(TraceError::Config(format!(
                    "wavelet levels must be in 1..{} for size {size}, got {levels}",
                    size.trailing_zeros()
                )));
            }
            _ => {}
        }
        if !(self.correlation.tie_epsilon >= 0.0) {
            return Err(TraceError::Config("tie_epsilon must be non-negative".into()));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(TraceError::Config(format!(
                "confidence_threshold must be a percentage, got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    pub fn inference_timeout(&self) -> Option<std::time::Duration> {
        self.inference_timeout_ms.map(std::time::Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn artifact_paths_from_dir() {
        let paths = ArtifactPaths::from_dir("/tmp/models");
        assert_eq!(paths.hybrid_model, PathBuf::from("/tmp/models/scanner_hybrid.rten"));
        assert_eq!(
            paths.fingerprint_keys,
            PathBuf::from("/tmp/models/fingerprint_keys.json")
        );
    }

    #[test]
    fn validate_missing_artifacts() {
        let paths = ArtifactPaths::from_dir("/nonexistent/tracescope-artifacts");
        assert_eq!(paths.missing_hybrid().len(), 4);
        assert!(matches!(
            paths.validate(),
            Err(TraceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn rejects_non_power_of_two_size() {
        let config = PipelineConfig {
            canonical_size: 300,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_too_many_wavelet_levels() {
        let config = PipelineConfig {
            canonical_size: 32,
            denoise: DenoiseFilter::Wavelet { levels: 5 },
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"canonical_size": 128, "denoise": {"kind": "gaussian", "sigma": 1.5}}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.canonical_size, 128);
        assert_eq!(config.denoise, DenoiseFilter::Gaussian { sigma: 1.5 });
        assert_eq!(config.correlation.metric, CorrelationMetric::Ncc);
        assert_eq!(config.confidence_threshold, 85.0);
    }
}
