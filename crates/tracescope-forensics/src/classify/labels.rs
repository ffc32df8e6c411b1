// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Class index <-> device label mapping.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracescope_core::error::{Result, TraceError};

use crate::artifacts::read_json;

/// Bijective mapping from contiguous class indices `0..K` to labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fails on an empty class list, empty labels, or duplicates.
    pub fn new(classes: Vec<String>) -> Result<Self> {
        if classes.is_empty() {
            return Err(TraceError::ResourceUnavailable("label encoder has no classes".into()));
        }
        let mut seen = HashSet::with_capacity(classes.len());
        for label in &classes {
            if label.trim().is_empty() {
                return Err(TraceError::ResourceUnavailable(
                    "label encoder contains an empty label".into(),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(TraceError::ResourceUnavailable(format!(
                    "label encoder contains '{label}' twice"
                )));
            }
        }
        Ok(Self { classes })
    }

    /// Load `hybrid_label_encoder.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: Self = read_json(path)?;
        Self::new(raw.classes)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Index and value of the largest probability; the first index wins ties.
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
}

/// Largest amount a probability may stray outside [0, 1] through rounding.
const PROBABILITY_TOLERANCE: f32 = 1e-6;

/// Every entry of a model output row must be a finite probability.
pub fn check_probabilities(context: &str, probabilities: &[f32]) -> Result<()> {
    let valid = -PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE;
    match probabilities.iter().position(|p| !valid.contains(p)) {
        None => Ok(()),
        Some(index) => Err(TraceError::Inference(format!(
            "{context} returned {} for class {index}, outside [0, 1]",
            probabilities[index]
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encode_decode() {
        let enc = LabelEncoder::new(labels(&["Canon 120", "Epson V39"])).unwrap();
        assert_eq!(enc.decode(1), Some("Epson V39"));
        assert_eq!(enc.encode("Canon 120"), Some(0));
        assert_eq!(enc.decode(2), None);
    }

    #[test]
    fn duplicates_and_blanks_are_rejected() {
        assert!(LabelEncoder::new(labels(&["A", "A"])).is_err());
        assert!(LabelEncoder::new(labels(&["A", " "])).is_err());
        assert!(LabelEncoder::new(Vec::new()).is_err());
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax(&[f32::NAN, 0.1]), Some((1, 0.1)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn probabilities_outside_unit_interval_are_rejected() {
        assert!(check_probabilities("model", &[0.0, 0.25, 0.75, 1.0]).is_ok());
        assert!(check_probabilities("model", &[1.0 + 1e-7, 0.0]).is_ok());
        for row in [[1.4, 0.1], [-0.2, 0.5], [f32::NAN, 0.5], [f32::INFINITY, 0.0]] {
            assert!(matches!(
                check_probabilities("model", &row),
                Err(TraceError::Inference(_))
            ));
        }
    }
}
