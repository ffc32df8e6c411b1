// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Classifier ensemble and the model artifacts it consumes.

pub mod baseline;
pub mod ensemble;
pub mod hybrid;
pub mod labels;
pub mod scaler;
pub mod stage;

pub use baseline::BaselineModel;
pub use ensemble::{ClassifierEnsemble, ImageOutcome, PathReport};
#[cfg(feature = "rten")]
pub use hybrid::RtenHybridNetwork;
pub use hybrid::{HybridBatch, HybridNetwork};
pub use labels::LabelEncoder;
pub use scaler::StandardScaler;
pub use stage::{Stage, StageTracker};
