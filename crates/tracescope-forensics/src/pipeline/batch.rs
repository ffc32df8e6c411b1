// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator: runs one classifier path over a set of images, keeps
// going past per-image failures, and summarises the batch.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracescope_core::config::PipelineConfig;
use tracescope_core::diagnostics::{batch_diagnostic, image_failure};
use tracescope_core::error::TraceError;
use tracescope_core::types::{BatchId, BatchResult, Mode};
use tracing::{info, instrument, warn};

use super::aggregate::aggregate;
use crate::artifacts::ArtifactStore;
use crate::classify::ensemble::{ClassifierEnsemble, PathReport};
use crate::input::ImageInput;

/// Entry point for scanner identification.
pub struct Identifier {
    ensemble: ClassifierEnsemble,
    config: PipelineConfig,
}

impl Identifier {
    /// Identifier backed by the process-wide artifact cache.
    pub fn new(config: PipelineConfig) -> Self {
        let store = ArtifactStore::process_wide(&config);
        Self::with_store(config, store)
    }

    /// Identifier backed by a specific artifact store.
    pub fn with_store(config: PipelineConfig, store: Arc<ArtifactStore>) -> Self {
        Self {
            ensemble: ClassifierEnsemble::new(&config, store),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        self.ensemble.store()
    }

    /// Raw per-image outcomes of the selected path.
    pub fn classify(&self, images: &[ImageInput], mode: Mode) -> PathReport {
        self.ensemble.classify(images, mode)
    }

    /// Identify with the configured advisory threshold.
    pub fn run(&self, images: &[ImageInput], mode: Mode) -> BatchResult {
        self.identify(images, mode, self.config.confidence_threshold)
    }

    /// Classify `images` with one path and build the batch result.
    ///
    /// `confidence_threshold` (percent) is echoed back and never filters
    /// results.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub fn identify(&self, images: &[ImageInput], mode: Mode, confidence_threshold: f32) -> BatchResult {
        let id = BatchId::new();
        let started_at = Utc::now();
        let clock = Instant::now();

        let report = self.classify(images, mode);

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for outcome in report.outcomes {
            match outcome.result {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(source = %outcome.source, error = %err, "Image not classified");
                    failures.push(image_failure(outcome.source, &err));
                }
            }
        }

        let batch_error = match report.batch_error {
            Some(err) => Some(err),
            None if results.is_empty() => Some(TraceError::EmptyBatch),
            None => None,
        };
        let diagnostic = batch_error.as_ref().map(batch_diagnostic);
        let aggregate = aggregate(&results);
        let elapsed_ms = clock.elapsed().as_millis() as u64;

        info!(
            batch = %id,
            %mode,
            classified = results.len(),
            failed = failures.len(),
            batch_error = diagnostic.as_ref().map(|d| d.detail.as_str()),
            elapsed_ms,
            "Identification complete"
        );

        BatchResult {
            id,
            mode,
            confidence_threshold,
            results,
            failures,
            aggregate,
            diagnostic,
            degraded: self.store().hybrid_degraded(),
            started_at,
            elapsed_ms,
        }
    }
}
