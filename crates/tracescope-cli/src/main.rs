// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TraceScope command line.
//
// Initialises logging (stderr, so stdout stays machine-readable), resolves the
// pipeline configuration, and dispatches to the identification pipeline.

mod args;

use std::process::ExitCode;

use clap::Parser;
use tracescope_core::config::{ArtifactPaths, PipelineConfig};
use tracescope_core::diagnostics::{Severity, humanize_error};
use tracescope_core::error::Result;
use tracescope_forensics::{FeatureEngineer, Identifier, ImageInput, ResidualExtractor, feature_names};
use tracing::info;

use args::{Args, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            let human = humanize_error(&err);
            let heading = match human.severity {
                Severity::Transient => "temporary failure",
                Severity::ActionRequired => "action required",
                Severity::Permanent => "error",
            };
            eprintln!("{heading}: {}", human.message);
            eprintln!("  {}", human.suggestion);
            if human.retriable {
                eprintln!("  Running the same command again may succeed.");
            }
            eprintln!("  ({err})");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(&args)?;

    match args.command {
        Command::Identify {
            mode,
            threshold,
            compact,
            files,
        } => {
            info!(%mode, images = files.len(), "TraceScope starting");
            let threshold = threshold.unwrap_or(config.confidence_threshold);
            let images: Vec<ImageInput> = files.iter().map(ImageInput::file).collect();
            let identifier = Identifier::new(config);
            let batch = identifier.identify(&images, mode, threshold);

            print_json(&batch, compact)?;
            if batch.results.is_empty() {
                return Ok(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Features { file } => {
            let extractor = ResidualExtractor::new(&config);
            let engineer = FeatureEngineer::new(extractor.canonical_size());
            let residual = extractor.extract_input(&ImageInput::file(&file))?;
            let features = engineer.extract(&residual)?;
            let named: serde_json::Map<String, serde_json::Value> = feature_names()
                .into_iter()
                .zip(features.as_slice())
                .map(|(name, value)| (name, serde_json::json!(value)))
                .collect();
            print_json(&named, false)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Check => {
            let identifier = Identifier::new(config);
            // Force both loads so the report reflects the files on disk.
            let _ = identifier.store().baseline();
            let _ = identifier.store().hybrid();
            let availability = identifier.store().availability();
            print_json(&availability, false)?;
            if identifier.store().hybrid_degraded() {
                return Ok(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Configuration file (if any), then the artifact directory override.
/// Without either, artifacts come from `$TRACESCOPE_ARTIFACTS` or `./results`.
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.artifacts {
        config.artifacts = ArtifactPaths::from_dir(dir);
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracescope_core::config::CorrelationMetric;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_file_is_loaded_then_artifacts_flag_overrides_it() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("tracescope.json");
        let from_file = dir.path().join("from-file");
        let from_flag = dir.path().join("from-flag");
        let json = serde_json::json!({
            "canonical_size": 128,
            "correlation": {"metric": "pce", "tie_epsilon": 0.001},
            "confidence_threshold": 70.0,
            "artifacts": ArtifactPaths::from_dir(&from_file),
        });
        std::fs::write(&config_path, json.to_string()).unwrap();
        let config_arg = config_path.to_str().unwrap();

        let config = load_config(&parse(&["tracescope", "--config", config_arg, "check"])).unwrap();
        assert_eq!(config.canonical_size, 128);
        assert_eq!(config.correlation.metric, CorrelationMetric::Pce);
        assert_eq!(config.confidence_threshold, 70.0);
        assert_eq!(config.artifacts, ArtifactPaths::from_dir(&from_file));

        let config = load_config(&parse(&[
            "tracescope",
            "--config",
            config_arg,
            "--artifacts",
            from_flag.to_str().unwrap(),
            "check",
        ]))
        .unwrap();
        assert_eq!(config.canonical_size, 128);
        assert_eq!(config.artifacts, ArtifactPaths::from_dir(&from_flag));
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.json");
        std::fs::write(&config_path, r#"{"canonical_size": 100}"#).unwrap();

        let args = parse(&["tracescope", "--config", config_path.to_str().unwrap(), "check"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn artifacts_flag_applies_without_a_config_file() {
        let args = parse(&["tracescope", "--artifacts", "/srv/tracescope", "check"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.artifacts, ArtifactPaths::from_dir("/srv/tracescope"));
        assert_eq!(config.canonical_size, PipelineConfig::default().canonical_size);
    }
}
