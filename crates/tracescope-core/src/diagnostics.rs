// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language explanations of pipeline failures for forensic reports.
//
// Every technical error maps to a short message and an actionable suggestion
// so the report renderer never has to interpret raw error strings.

use crate::error::{ErrorScope, TraceError};
use crate::types::{BatchDiagnostic, ImageFailure};

/// Severity of a failure from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Re-running the same request may succeed (timeouts).
    Transient,
    /// The operator must supply a different image or fix a file.
    ActionRequired,
    /// The deployment is missing something; retrying will not help.
    Permanent,
}

/// A readable error with a suggested remedy.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the operator should try.
    pub suggestion: String,
    /// Whether repeating the call could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `TraceError` into something an examiner can act on.
pub fn humanize_error(err: &TraceError) -> HumanError {
    match err {
        TraceError::Decode(_) => HumanError {
            message: "This file could not be read as an image.".into(),
            suggestion: "The file may be damaged or not a JPEG, PNG, or TIFF scan. Re-export the scan and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TraceError::DimensionMismatch { context, .. } => HumanError {
            message: "The extracted features don't fit the loaded model.".into(),
            suggestion: format!(
                "The model artifacts were probably trained with different settings. Check that the {context} matches the fingerprint bank and feature set."
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        TraceError::ResourceUnavailable(detail) => HumanError {
            message: "A required model file is missing or unreadable.".into(),
            suggestion: format!(
                "Check the artifact directory, or use the baseline analysis mode in the meantime. ({detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        TraceError::EmptyBatch => HumanError {
            message: "None of the submitted images could be analysed.".into(),
            suggestion: "Make sure the scans are readable images of the full document area, then submit them again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TraceError::Inference(_) => HumanError {
            message: "The classifier failed while analysing this batch.".into(),
            suggestion: "Try again with fewer images. If this keeps happening the model file may be corrupt.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TraceError::InferenceTimeout { millis } => HumanError {
            message: "The analysis took too long and was abandoned.".into(),
            suggestion: format!(
                "Submit a smaller batch, or raise the inference timeout (currently {millis} ms)."
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        TraceError::Config(detail) => HumanError {
            message: "The analysis settings are invalid.".into(),
            suggestion: format!("Correct the configuration file and restart. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        TraceError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading a file.".into(),
                    suggestion: "Check file permissions and free disk space, then try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        TraceError::Serialization(_) => HumanError {
            message: "An artifact file has an unexpected format.".into(),
            suggestion: "Re-export the artifact from the training pipeline.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Record an image-level failure for the result set.
pub fn image_failure(source: impl Into<String>, err: &TraceError) -> ImageFailure {
    let human = humanize_error(err);
    ImageFailure {
        source: source.into(),
        kind: err.kind(),
        detail: err.to_string(),
        message: human.message,
        suggestion: human.suggestion,
    }
}

/// Record a batch-level failure for the result set.
pub fn batch_diagnostic(err: &TraceError) -> BatchDiagnostic {
    let human = humanize_error(err);
    BatchDiagnostic {
        kind: err.kind(),
        detail: err.to_string(),
        message: human.message,
        suggestion: human.suggestion,
        retriable: human.retriable,
    }
}

/// True when the error should disable its path for the rest of the process.
pub fn disables_path(err: &TraceError) -> bool {
    err.scope() == ErrorScope::Process
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&TraceError::InferenceTimeout { millis: 30_000 });
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
        assert!(human.suggestion.contains("30000"));
    }

    #[test]
    fn corrupt_image_needs_action() {
        let human = humanize_error(&TraceError::Decode("invalid PNG signature".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_model_is_permanent_and_disables_path() {
        let err = TraceError::ResourceUnavailable("scanner_hybrid.rten".into());
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
        assert!(disables_path(&err));
        assert!(!disables_path(&TraceError::EmptyBatch));
    }

    #[test]
    fn image_failure_carries_kind_and_detail() {
        let failure = image_failure("scan-3.png", &TraceError::Decode("truncated".into()));
        assert_eq!(failure.source, "scan-3.png");
        assert_eq!(failure.kind, ErrorKind::Decode);
        assert!(failure.detail.contains("truncated"));
        assert!(!failure.suggestion.is_empty());
    }

    #[test]
    fn batch_diagnostic_says_whether_to_resubmit() {
        let timeout = batch_diagnostic(&TraceError::InferenceTimeout { millis: 500 });
        assert_eq!(timeout.kind, ErrorKind::InferenceTimeout);
        assert!(timeout.retriable);
        assert!(timeout.suggestion.contains("500"));

        let missing = batch_diagnostic(&TraceError::ResourceUnavailable("baseline_model.json".into()));
        assert!(!missing.retriable);
        assert!(!missing.suggestion.is_empty());
    }
}
