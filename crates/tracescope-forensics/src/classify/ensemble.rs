// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Classifier ensemble: the baseline and hybrid paths. Exactly one path runs
// per call.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, bounded};
use rayon::prelude::*;
use tracescope_core::config::PipelineConfig;
use tracescope_core::error::{Result, TraceError};
use tracescope_core::types::{ClassificationResult, Mode};
use tracing::{debug, info, instrument, warn};

use super::hybrid::{HybridBatch, HybridNetwork};
use super::labels::{argmax, check_probabilities};
use super::stage::{Stage, StageTracker};
use crate::artifacts::{ArtifactStore, HybridResources};
use crate::features::FeatureEngineer;
use crate::fingerprint::CorrelationScores;
use crate::input::ImageInput;
use crate::residual::{Residual, ResidualExtractor};

/// Per-image outcome, in input order.
#[derive(Debug)]
pub struct ImageOutcome {
    pub source: String,
    pub result: Result<ClassificationResult>,
}

/// Everything one path produced for a batch.
///
/// When `batch_error` is set no classification results are present; the
/// outcomes then hold only the per-image failures seen before the batch
/// failed.
#[derive(Debug, Default)]
pub struct PathReport {
    pub outcomes: Vec<ImageOutcome>,
    pub batch_error: Option<TraceError>,
}

impl PathReport {
    fn failed(batch_error: TraceError, failures: Vec<ImageOutcome>) -> Self {
        Self {
            outcomes: failures,
            batch_error: Some(batch_error),
        }
    }
}

pub struct ClassifierEnsemble {
    store: Arc<ArtifactStore>,
    extractor: ResidualExtractor,
    engineer: FeatureEngineer,
    timeout: Option<Duration>,
}

impl ClassifierEnsemble {
    pub fn new(config: &PipelineConfig, store: Arc<ArtifactStore>) -> Self {
        let extractor = ResidualExtractor::new(config);
        Self {
            engineer: FeatureEngineer::new(extractor.canonical_size()),
            extractor,
            store,
            timeout: config.inference_timeout(),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the path selected by `mode` over every image.
    pub fn classify(&self, images: &[ImageInput], mode: Mode) -> PathReport {
        match mode {
            Mode::Baseline => self.classify_baseline_all(images),
            Mode::Hybrid => self.classify_hybrid(images),
        }
    }

    // -- Baseline path ------------------------------------------------------------

    /// Classify one image from its engineered features alone.
    #[instrument(skip_all, fields(source = %input.source))]
    pub fn classify_baseline(&self, input: &ImageInput) -> Result<ClassificationResult> {
        let mut tracker = StageTracker::new("baseline");
        let outcome = self.run_baseline(input, &mut tracker);
        if outcome.is_err() {
            tracker.fail();
        }
        outcome
    }

    fn run_baseline(&self, input: &ImageInput, tracker: &mut StageTracker) -> Result<ClassificationResult> {
        let model = self.store.baseline()?;

        tracker.advance(Stage::Extracting);
        let residual = self.extractor.extract_input(input)?;
        let features = self.engineer.extract(&residual)?;

        tracker.advance(Stage::Scoring);
        let probabilities = model.predict_proba(features.as_slice())?;
        check_probabilities("baseline model", &probabilities)?;
        let (index, probability) = argmax(&probabilities)
            .ok_or_else(|| TraceError::Inference("baseline model returned no probabilities".into()))?;
        let label = model.classes().get(index).cloned().unwrap_or_default();

        tracker.advance(Stage::Done);
        debug!(label = %label, probability, "Baseline classification");
        Ok(ClassificationResult::new(
            input.source.clone(),
            label,
            probability,
            Mode::Baseline,
        ))
    }

    /// Baseline over a batch, one image at a time. An unavailable model fails
    /// the whole batch.
    fn classify_baseline_all(&self, images: &[ImageInput]) -> PathReport {
        if let Err(err) = self.store.baseline() {
            return PathReport::failed(err, Vec::new());
        }
        let outcomes = images
            .iter()
            .map(|input| ImageOutcome {
                source: input.source.clone(),
                result: self.classify_baseline(input),
            })
            .collect();
        PathReport {
            outcomes,
            batch_error: None,
        }
    }

    // -- Hybrid path ----------------------------------------------------------------

    /// Classify a batch with the dual-input network in one forward pass.
    #[instrument(skip_all, fields(count = images.len()))]
    pub fn classify_hybrid(&self, images: &[ImageInput]) -> PathReport {
        let mut tracker = StageTracker::new("hybrid");
        let resources = match self.store.hybrid() {
            Ok(resources) => resources,
            Err(err) => {
                tracker.fail();
                return PathReport::failed(err, Vec::new());
            }
        };

        tracker.advance(Stage::Extracting);
        let (rows, slots) = self.prepare_hybrid(images, &resources);
        let failures_only = |slots: Vec<Result<usize>>| -> Vec<ImageOutcome> {
            images
                .iter()
                .zip(slots)
                .filter_map(|(input, slot)| {
                    slot.err().map(|err| ImageOutcome {
                        source: input.source.clone(),
                        result: Err(err),
                    })
                })
                .collect()
        };

        if rows.is_empty() {
            tracker.fail();
            return PathReport::failed(TraceError::EmptyBatch, failures_only(slots));
        }

        tracker.advance(Stage::Scoring);
        let residuals: Vec<&Residual> = rows.iter().map(|r| &r.residual).collect();
        let feature_rows: Vec<Vec<f32>> = rows.iter().map(|r| r.scaled.clone()).collect();
        let probabilities = HybridBatch::stack(&residuals, &feature_rows)
            .and_then(|batch| run_bounded(resources.network.clone(), batch, self.timeout))
            .and_then(|p| check_output(&p, rows.len(), resources.labels.len()).map(|_| p));
        let probabilities = match probabilities {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "Hybrid forward pass failed");
                tracker.fail();
                return PathReport::failed(err, failures_only(slots));
            }
        };

        let outcomes: Vec<ImageOutcome> = images
            .iter()
            .zip(slots)
            .map(|(input, slot)| ImageOutcome {
                source: input.source.clone(),
                result: slot.and_then(|row| {
                    let (index, probability) = argmax(&probabilities[row]).ok_or_else(|| {
                        TraceError::Inference("model returned no finite probabilities".into())
                    })?;
                    let label = resources.labels.decode(index).unwrap_or_default();
                    let matched = resources.correlator.best_match(&rows[row].scores);
                    Ok(ClassificationResult::new(input.source.clone(), label, probability, Mode::Hybrid)
                        .with_fingerprint_match(matched))
                }),
            })
            .collect();

        tracker.advance(Stage::Done);
        info!(
            classified = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            submitted = images.len(),
            "Hybrid batch scored"
        );
        PathReport {
            outcomes,
            batch_error: None,
        }
    }

    /// Rows for the forward pass plus one slot per image: `Ok(row)` for an
    /// image that owns a row, `Err` for one that failed along the way.
    ///
    /// Residuals are extracted in parallel, then scored against the bank in
    /// one batched correlation, then joined with their features and scaled.
    fn prepare_hybrid(
        &self,
        images: &[ImageInput],
        resources: &HybridResources,
    ) -> (Vec<Prepared>, Vec<Result<usize>>) {
        let mut slots: Vec<Result<usize>> = (0..images.len()).map(Ok).collect();

        let extracted: Vec<Result<Residual>> = images
            .par_iter()
            .map(|input| self.extractor.extract_input(input))
            .collect();
        let residuals = advance_slots(&mut slots, extracted);

        let scores = resources.correlator.correlate_batch(&residuals);
        let joined: Vec<Result<Prepared>> = residuals
            .into_par_iter()
            .zip(scores)
            .map(|(residual, scores)| self.join_hybrid_row(residual, scores?, resources))
            .collect();
        let rows = advance_slots(&mut slots, joined);

        debug!(rows = rows.len(), submitted = images.len(), "Hybrid rows prepared");
        (rows, slots)
    }

    /// Concatenate `[scores | features]` for one residual and scale it.
    fn join_hybrid_row(
        &self,
        residual: Residual,
        scores: CorrelationScores,
        resources: &HybridResources,
    ) -> Result<Prepared> {
        let features = self.engineer.extract(&residual)?;

        let mut row = Vec::with_capacity(scores.scores.len() + features.len());
        row.extend_from_slice(&scores.scores);
        row.extend_from_slice(features.as_slice());
        let scaled = resources.scaler.transform(&row)?;

        Ok(Prepared {
            residual,
            scores,
            scaled,
        })
    }
}

/// Fold one stage's outcomes into the slots. `stage` lines up with the
/// currently `Ok` slots; failures replace their slot, successes are kept and
/// their slot points at the new index.
fn advance_slots<T>(slots: &mut [Result<usize>], stage: Vec<Result<T>>) -> Vec<T> {
    let mut kept = Vec::with_capacity(stage.len());
    let mut stage = stage.into_iter();
    for slot in slots.iter_mut().filter(|slot| slot.is_ok()) {
        match stage.next() {
            Some(Ok(value)) => {
                *slot = Ok(kept.len());
                kept.push(value);
            }
            Some(Err(err)) => *slot = Err(err),
            None => break,
        }
    }
    kept
}

struct Prepared {
    residual: Residual,
    scores: CorrelationScores,
    scaled: Vec<f32>,
}

fn check_output(probabilities: &[Vec<f32>], rows: usize, classes: usize) -> Result<()> {
    if probabilities.len() != rows {
        return Err(TraceError::Inference(format!(
            "model returned {} rows for {rows} images",
            probabilities.len()
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| p.len() != classes) {
        return Err(TraceError::Inference(format!(
            "model output has {} classes but the label encoder has {classes}",
            bad.len()
        )));
    }
    probabilities
        .iter()
        .try_for_each(|row| check_probabilities("hybrid model", row))
}

/// One forward pass, abandoned after `timeout`. On expiry the in-flight
/// result is discarded when it eventually arrives.
fn run_bounded(
    network: Arc<dyn HybridNetwork>,
    batch: HybridBatch,
    timeout: Option<Duration>,
) -> Result<Vec<Vec<f32>>> {
    let Some(limit) = timeout else {
        return network.predict(&batch);
    };

    let (tx, rx) = bounded(1);
    std::thread::Builder::new()
        .name("tracescope-inference".into())
        .spawn(move || {
            let _ = tx.send(network.predict(&batch));
        })
        .map_err(|err| TraceError::Inference(format!("failed to start inference thread: {err}")))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(TraceError::InferenceTimeout {
            millis: limit.as_millis() as u64,
        }),
        Err(RecvTimeoutError::Disconnected) => {
            Err(TraceError::Inference("inference thread exited without a result".into()))
        }
    }
}
