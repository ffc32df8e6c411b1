// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-feature standardisation fitted at training time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracescope_core::error::{Result, TraceError};

use crate::artifacts::read_json;

/// `(x - mean) / scale` per feature. A scale of exactly zero marks a constant
/// feature and is treated as one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Load `hybrid_feat_scaler.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let scaler: Self = read_json(path)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(TraceError::ResourceUnavailable(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }

    /// Number of features the scaler was fitted on.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Standardise one row. The row length must equal [`dim`](Self::dim).
    pub fn transform(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.dim() {
            return Err(TraceError::dimension("feature scaler", self.dim(), row.len()));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect())
    }
}
