// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dual-input deep model for the hybrid path.
//
// The network takes two stacked inputs, the residual tensor `[N, H, W, 1]`
// and the scaled correlation + feature matrix `[N, F]`, and returns class
// probabilities `[N, K]`. The whole batch is scored in one forward pass.

use tracescope_core::error::{Result, TraceError};

use crate::residual::Residual;

/// One stacked forward-pass input.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridBatch {
    pub rows: usize,
    pub height: usize,
    pub width: usize,
    /// `rows * height * width` residual samples, row-major per image.
    pub residuals: Vec<f32>,
    pub feature_dim: usize,
    /// `rows * feature_dim` scaled features.
    pub features: Vec<f32>,
}

impl HybridBatch {
    /// Stack residuals and feature rows. All residuals must share one size and
    /// all rows one length; there must be as many rows as residuals.
    pub fn stack(residuals: &[&Residual], rows: &[Vec<f32>]) -> Result<Self> {
        if residuals.len() != rows.len() {
            return Err(TraceError::dimension("hybrid batch rows", residuals.len(), rows.len()));
        }
        let Some(first) = residuals.first() else {
            return Err(TraceError::EmptyBatch);
        };
        let (width, height) = (first.width(), first.height());
        let feature_dim = rows.first().map_or(0, Vec::len);

        let mut stacked = Vec::with_capacity(residuals.len() * width * height);
        for r in residuals {
            if (r.width(), r.height()) != (width, height) {
                return Err(TraceError::dimension(
                    "hybrid residual tensor",
                    width * height,
                    r.width() * r.height(),
                ));
            }
            stacked.extend_from_slice(r.data());
        }
        let mut features = Vec::with_capacity(rows.len() * feature_dim);
        for row in rows {
            if row.len() != feature_dim {
                return Err(TraceError::dimension("hybrid feature row", feature_dim, row.len()));
            }
            features.extend_from_slice(row);
        }

        Ok(Self {
            rows: residuals.len(),
            height,
            width,
            residuals: stacked,
            feature_dim,
            features,
        })
    }

    pub fn feature_row(&self, index: usize) -> &[f32] {
        &self.features[index * self.feature_dim..(index + 1) * self.feature_dim]
    }

    pub fn residual(&self, index: usize) -> &[f32] {
        let plane = self.width * self.height;
        &self.residuals[index * plane..(index + 1) * plane]
    }
}

/// Anything that can score a stacked hybrid batch.
///
/// Implementations must return one probability row per batch row.
pub trait HybridNetwork: Send + Sync {
    fn predict(&self, batch: &HybridBatch) -> Result<Vec<Vec<f32>>>;
}

#[cfg(feature = "rten")]
pub use self::rten_backend::RtenHybridNetwork;

#[cfg(feature = "rten")]
mod rten_backend {
    use std::path::Path;

    use rten::{Model, NodeId};
    use rten_tensor::NdTensor;
    use rten_tensor::prelude::*;
    use tracescope_core::error::{Result, TraceError};
    use tracing::{debug, info, instrument};

    use super::{HybridBatch, HybridNetwork};

    /// Hybrid network exported to the `.rten` format.
    pub struct RtenHybridNetwork {
        model: Model,
        residual_input: NodeId,
        feature_input: NodeId,
        output: NodeId,
    }

    impl RtenHybridNetwork {
        /// Load `scanner_hybrid.rten`. Inputs are taken in declaration order:
        /// residual tensor first, feature matrix second.
        #[instrument(skip_all, fields(path = %path.display()))]
        pub fn load(path: &Path) -> Result<Self> {
            let model = Model::load_file(path).map_err(|err| {
                TraceError::ResourceUnavailable(format!(
                    "failed to load hybrid model from {}: {}",
                    path.display(),
                    err
                ))
            })?;

            let (residual_input, feature_input) = match model.input_ids() {
                [residual, features] => (*residual, *features),
                other => {
                    return Err(TraceError::ResourceUnavailable(format!(
                        "hybrid model must have 2 inputs, found {}",
                        other.len()
                    )));
                }
            };
            let output = *model.output_ids().first().ok_or_else(|| {
                TraceError::ResourceUnavailable("hybrid model has no outputs".into())
            })?;

            info!("Hybrid model loaded");
            Ok(Self {
                model,
                residual_input,
                feature_input,
                output,
            })
        }
    }

    impl HybridNetwork for RtenHybridNetwork {
        fn predict(&self, batch: &HybridBatch) -> Result<Vec<Vec<f32>>> {
            let residuals = NdTensor::from_data(
                [batch.rows, batch.height, batch.width, 1],
                batch.residuals.clone(),
            );
            let features = NdTensor::from_data([batch.rows, batch.feature_dim], batch.features.clone());

            let mut outputs = self
                .model
                .run(
                    vec![
                        (self.residual_input, residuals.view().into()),
                        (self.feature_input, features.view().into()),
                    ],
                    &[self.output],
                    None,
                )
                .map_err(|err| TraceError::Inference(format!("forward pass failed: {err}")))?;

            if outputs.is_empty() {
                return Err(TraceError::Inference("model produced no output".into()));
            }
            let probabilities: NdTensor<f32, 2> = outputs
                .remove(0)
                .try_into()
                .map_err(|err| TraceError::Inference(format!("unexpected output tensor: {err:?}")))?;

            let [rows, classes] = probabilities.shape();
            if rows != batch.rows {
                return Err(TraceError::dimension("hybrid model output rows", batch.rows, rows));
            }
            debug!(rows, classes, "Forward pass complete");

            let flat = probabilities.to_vec();
            Ok(flat.chunks(classes.max(1)).map(<[f32]>::to_vec).collect())
        }
    }
}
