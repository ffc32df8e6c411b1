// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for TraceScope.

use thiserror::Error;

use crate::types::ErrorKind;

/// Top-level error type for all TraceScope operations.
#[derive(Debug, Error)]
pub enum TraceError {
    // -- Image-level errors (skip the image, keep the batch going) --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    // -- Process-level errors (cached, path disabled for the run) --
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    // -- Batch-level errors --
    #[error("no image survived preprocessing")]
    EmptyBatch,

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("model inference timed out after {millis} ms")]
    InferenceTimeout { millis: u64 },

    // -- Configuration / plumbing --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Affects one image only; the rest of the batch continues.
    Image,
    /// Affects the whole batch call but not later calls.
    Batch,
    /// Affects every call for the remainder of the process run.
    Process,
}

impl TraceError {
    /// Shorthand for a [`TraceError::DimensionMismatch`].
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Serialisable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            Self::EmptyBatch => ErrorKind::EmptyBatch,
            Self::Inference(_) => ErrorKind::Inference,
            Self::InferenceTimeout { .. } => ErrorKind::InferenceTimeout,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Propagation scope of this error.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::Decode(_) | Self::DimensionMismatch { .. } => ErrorScope::Image,
            Self::ResourceUnavailable(_) | Self::Config(_) => ErrorScope::Process,
            Self::EmptyBatch
            | Self::Inference(_)
            | Self::InferenceTimeout { .. }
            | Self::Io(_)
            | Self::Serialization(_) => ErrorScope::Batch,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_errors_are_local() {
        assert_eq!(TraceError::Decode("bad".into()).scope(), ErrorScope::Image);
        assert_eq!(
            TraceError::dimension("scaler", 40, 38).scope(),
            ErrorScope::Image
        );
    }

    #[test]
    fn missing_artifact_is_process_wide() {
        let err = TraceError::ResourceUnavailable("model".into());
        assert_eq!(err.scope(), ErrorScope::Process);
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn dimension_message_names_both_sizes() {
        let msg = TraceError::dimension("scaler", 40, 38).to_string();
        assert!(msg.contains("40") && msg.contains("38"), "got {msg}");
    }
}
