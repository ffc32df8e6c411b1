// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tracescope-forensics — Scanner identification from document images.
//
// Extracts device-noise residuals, engineers frequency/texture/wavelet
// statistics, correlates residuals against a bank of reference fingerprints,
// and classifies each image through either a classical baseline model or a
// dual-input hybrid network. `Identifier` drives a whole batch.

pub mod artifacts;
pub mod classify;
pub mod features;
pub mod fingerprint;
pub mod input;
pub mod pipeline;
pub mod residual;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{ArtifactStore, Availability};
pub use classify::{BaselineModel, ClassifierEnsemble, HybridNetwork, LabelEncoder, StandardScaler};
pub use features::{FEATURE_LEN, FeatureEngineer, FeatureVector, feature_names};
pub use fingerprint::{CorrelationScores, FingerprintBank, FingerprintCorrelator, correlate};
pub use input::{ImageInput, ImagePayload};
pub use pipeline::Identifier;
pub use residual::{Residual, ResidualExtractor};
