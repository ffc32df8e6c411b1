// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the TraceScope identification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used wherever a device could not be determined.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Unique identifier for one identification batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification path selected by the caller.
///
/// `comprehensive` (and the dashboard's `deep`) parse to [`Mode::Hybrid`];
/// `standard` parses to [`Mode::Baseline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Classical model over engineered features only.
    #[serde(alias = "standard")]
    Baseline,
    /// Dual-input network over the residual tensor and correlation + features.
    #[serde(alias = "deep", alias = "comprehensive")]
    Hybrid,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = crate::error::TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "standard" => Ok(Self::Baseline),
            "hybrid" | "deep" | "comprehensive" => Ok(Self::Hybrid),
            other => Err(crate::error::TraceError::Config(format!(
                "unknown analysis mode '{other}' (expected baseline, hybrid, or comprehensive)"
            ))),
        }
    }
}

/// Serialisable classification of a [`TraceError`](crate::error::TraceError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Decode,
    DimensionMismatch,
    ResourceUnavailable,
    EmptyBatch,
    Inference,
    InferenceTimeout,
    Config,
    Io,
}

/// Best-scoring reference fingerprint for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintMatch {
    /// Bank key of the matching device (e.g. "Canon LiDE 120").
    pub device: String,
    /// Correlation score (NCC in [-1, 1], or PCE).
    pub score: f32,
}

/// Outcome of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Caller-supplied identifier of the image (usually the file name).
    pub source: String,
    /// Full device label, e.g. "Epson V39".
    pub label: String,
    /// First token of the label.
    pub brand: String,
    /// Probability of the predicted class, as a percentage in [0, 100].
    pub confidence: f32,
    /// Path that produced this result.
    pub method: Mode,
    /// Highest-correlating bank entry (hybrid path only).
    pub fingerprint_match: Option<FingerprintMatch>,
}

impl ClassificationResult {
    /// Build a result from a decoded label and a probability in [0, 1].
    ///
    /// The probability is scaled as-is; callers reject out-of-range model
    /// output before building a result.
    pub fn new(source: impl Into<String>, label: impl Into<String>, probability: f32, method: Mode) -> Self {
        let label = label.into();
        let label = if label.trim().is_empty() {
            UNKNOWN_LABEL.to_string()
        } else {
            label
        };
        Self {
            source: source.into(),
            brand: brand_of(&label),
            label,
            confidence: probability * 100.0,
            method,
            fingerprint_match: None,
        }
    }

    pub fn with_fingerprint_match(mut self, matched: Option<FingerprintMatch>) -> Self {
        self.fingerprint_match = matched;
        self
    }

    /// Advisory check against the caller's confidence threshold (percent).
    pub fn meets_threshold(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// Brand is the first whitespace-separated token of a device label.
pub fn brand_of(label: &str) -> String {
    label
        .split_whitespace()
        .next()
        .unwrap_or(UNKNOWN_LABEL)
        .to_string()
}

/// An image that could not be classified, with a readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub source: String,
    pub kind: ErrorKind,
    /// Technical error text.
    pub detail: String,
    /// Plain-language summary for reports.
    pub message: String,
    /// What the operator can do about it.
    pub suggestion: String,
}

/// Batch-level problem that prevented some or all scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDiagnostic {
    pub kind: ErrorKind,
    pub detail: String,
    pub message: String,
    pub suggestion: String,
    /// Resubmitting the same batch could succeed (e.g. after a timeout).
    pub retriable: bool,
}

/// Summary over all successfully classified images in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAggregate {
    /// Most frequent brand (first encountered wins ties).
    pub brand: String,
    /// Most frequent full label (first encountered wins ties).
    pub label: String,
    /// Arithmetic mean of the individual confidences.
    pub confidence: f32,
    /// Number of results the aggregate was computed over.
    pub count: usize,
}

impl BatchAggregate {
    /// Sentinel used when nothing could be classified.
    pub fn unknown() -> Self {
        Self {
            brand: UNKNOWN_LABEL.to_string(),
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            count: 0,
        }
    }
}

/// Everything one `identify` call produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: BatchId,
    pub mode: Mode,
    /// Advisory threshold echoed back to the caller; never used as a filter.
    pub confidence_threshold: f32,
    /// Successful classifications in input order.
    pub results: Vec<ClassificationResult>,
    /// Images that were skipped, in input order.
    pub failures: Vec<ImageFailure>,
    /// Present iff `results` is non-empty.
    pub aggregate: Option<BatchAggregate>,
    /// Batch-level problem (empty batch, unavailable artifacts, timeout).
    pub diagnostic: Option<BatchDiagnostic>,
    /// True when the hybrid path is known to be unavailable for this process.
    pub degraded: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl BatchResult {
    /// The aggregate, or the "Unknown" sentinel when nothing was classified.
    pub fn top_match(&self) -> BatchAggregate {
        self.aggregate.clone().unwrap_or_else(BatchAggregate::unknown)
    }

    /// Number of images submitted (classified + failed).
    pub fn submitted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Results at or above the advisory threshold.
    pub fn confident_results(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.results
            .iter()
            .filter(|r| r.meets_threshold(self.confidence_threshold))
    }
}
