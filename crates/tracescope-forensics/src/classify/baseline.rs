// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Classical models for the baseline path, exported from training as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracescope_core::error::{Result, TraceError};
use tracing::{info, instrument};

use super::labels::LabelEncoder;
use super::scaler::StandardScaler;
use crate::artifacts::read_json;

fn invalid(detail: impl std::fmt::Display) -> TraceError {
    TraceError::ResourceUnavailable(format!("invalid baseline model: {detail}"))
}

// -- Random forest -------------------------------------------------------------

/// One node of a decision tree in preorder layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Class counts (or weights) reaching this leaf.
    Leaf { distribution: Vec<f32> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(invalid("empty tree"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!("node {i} splits on feature {feature}")));
                    }
                    // Children strictly after the parent guarantees termination.
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(invalid(format!("node {i} has child index {child}")));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(invalid(format!(
                            "leaf {i} has {} classes, expected {n_classes}",
                            distribution.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Normalised class distribution of the leaf `x` falls into.
    fn leaf(&self, x: &[f32]) -> Vec<f32> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { distribution } => {
                    let total: f32 = distribution.iter().sum();
                    return if total > 0.0 {
                        distribution.iter().map(|d| d / total).collect()
                    } else {
                        distribution.clone()
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub classes: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict(&self, x: &[f32]) -> Vec<f32> {
        let mut proba = vec![0.0f32; self.classes.len()];
        for tree in &self.trees {
            for (p, leaf) in proba.iter_mut().zip(tree.leaf(x)) {
                *p += leaf;
            }
        }
        let n = self.trees.len().max(1) as f32;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }
}

// -- Linear --------------------------------------------------------------------

/// Multinomial linear model (logistic regression or linear SVM export).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<String>,
    /// `K x F` weight matrix, one row per class.
    pub weights: Vec<Vec<f32>>,
    pub intercepts: Vec<f32>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl LinearModel {
    fn n_features(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn predict(&self, x: &[f32]) -> Vec<f32> {
        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|e| e / sum).collect()
}

// -- Model -----------------------------------------------------------------------

/// Pretrained classical classifier over the engineered feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineModel {
    RandomForest(RandomForest),
    Linear(LinearModel),
}

impl BaselineModel {
    /// Load and validate `baseline_model.json`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = read_json(path)?;
        model.validate()?;
        info!(
            classes = model.classes().len(),
            features = model.n_features(),
            "Baseline model loaded"
        );
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        LabelEncoder::new(self.classes().to_vec())?;
        let (n_features, n_classes) = (self.n_features(), self.classes().len());
        if n_features == 0 {
            return Err(invalid("zero input features"));
        }
        match self {
            Self::RandomForest(forest) => {
                if forest.trees.is_empty() {
                    return Err(invalid("forest has no trees"));
                }
                for tree in &forest.trees {
                    tree.validate(n_features, n_classes)?;
                }
            }
            Self::Linear(linear) => {
                if linear.weights.len() != n_classes || linear.intercepts.len() != n_classes {
                    return Err(invalid(format!(
                        "{} weight rows and {} intercepts for {n_classes} classes",
                        linear.weights.len(),
                        linear.intercepts.len()
                    )));
                }
                if linear.weights.iter().any(|row| row.len() != n_features) {
                    return Err(invalid("ragged weight matrix"));
                }
            }
        }
        if let Some(scaler) = self.scaler() {
            scaler.validate()?;
            if scaler.dim() != n_features {
                return Err(invalid(format!(
                    "scaler expects {} features, model expects {n_features}",
                    scaler.dim()
                )));
            }
        }
        Ok(())
    }

    pub fn classes(&self) -> &[String] {
        match self {
            Self::RandomForest(f) => &f.classes,
            Self::Linear(l) => &l.classes,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::RandomForest(f) => f.n_features,
            Self::Linear(l) => l.n_features(),
        }
    }

    fn scaler(&self) -> Option<&StandardScaler> {
        match self {
            Self::RandomForest(f) => f.scaler.as_ref(),
            Self::Linear(l) => l.scaler.as_ref(),
        }
    }

    /// Class probabilities for one feature vector, aligned with
    /// [`classes`](Self::classes).
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.n_features() {
            return Err(TraceError::dimension(
                "baseline model input",
                self.n_features(),
                features.len(),
            ));
        }
        let scaled;
        let x = match self.scaler() {
            Some(scaler) => {
                scaled = scaler.transform(features)?;
                scaled.as_slice()
            }
            None => features,
        };
        Ok(match self {
            Self::RandomForest(f) => f.predict(x),
            Self::Linear(l) => l.predict(x),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> BaselineModel {
        serde_json::from_str(
            r#"{
                "kind": "random_forest",
                "n_features": 2,
                "classes": ["Canon 120", "Epson V39"],
                "trees": [
                    [
                        {"split": {"feature": 0, "threshold": 0.5, "left": 1, "right": 2}},
                        {"leaf": {"distribution": [9.0, 1.0]}},
                        {"leaf": {"distribution": [2.0, 8.0]}}
                    ],
                    [
                        {"leaf": {"distribution": [1.0, 1.0]}}
                    ]
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn forest_averages_normalised_leaves() {
        let model = stump();
        model.validate().unwrap();
        let p = model.predict_proba(&[0.2, 0.0]).unwrap();
        assert!((p[0] - 0.7).abs() < 1e-6 && (p[1] - 0.3).abs() < 1e-6);
        let p = model.predict_proba(&[0.9, 0.0]).unwrap();
        assert!((p[1] - 0.65).abs() < 1e-6);
    }

    #[test]
    fn threshold_goes_left_when_equal() {
        let p = stump().predict_proba(&[0.5, 0.0]).unwrap();
        assert!(p[0] > p[1]);
    }

    #[test]
    fn backward_child_index_is_rejected() {
        let model = BaselineModel::RandomForest(RandomForest {
            n_features: 1,
            classes: vec!["A".into(), "B".into()],
            scaler: None,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                }],
            }],
        });
        assert!(matches!(
            model.validate(),
            Err(TraceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn linear_softmax_with_scaler() {
        let model: BaselineModel = serde_json::from_str(
            r#"{
                "kind": "linear",
                "classes": ["Canon 120", "Epson V39", "HP Scanjet"],
                "weights": [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
                "intercepts": [0.0, 0.0, 0.0],
                "scaler": {"mean": [1.0, 1.0], "scale": [1.0, 1.0]}
            }"#,
        )
        .unwrap();
        model.validate().unwrap();
        let p = model.predict_proba(&[5.0, 1.0]).unwrap();
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[0] > p[1] && (p[1] - p[2]).abs() < 1e-6);
    }

    #[test]
    fn wrong_feature_count_is_a_dimension_mismatch() {
        assert!(matches!(
            stump().predict_proba(&[0.0; 3]),
            Err(TraceError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline_model.json");
        std::fs::write(&path, serde_json::to_vec(&stump()).unwrap()).unwrap();
        assert_eq!(BaselineModel::load(&path).unwrap(), stump());
    }
}
