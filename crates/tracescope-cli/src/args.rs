// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracescope_core::types::Mode;

/// Identify the scanner that produced a set of document images.
#[derive(Parser, Debug)]
#[command(name = "tracescope", author, version, about, long_about = None)]
pub struct Args {
    /// JSON pipeline configuration; omitted fields take their defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the trained artifacts (overrides the config)
    #[arg(long, global = true, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a batch of images and print the batch result as JSON
    Identify {
        /// baseline, hybrid, or comprehensive
        #[arg(long, default_value = "hybrid", value_parser = parse_mode)]
        mode: Mode,

        /// Advisory confidence threshold in percent
        #[arg(long, value_name = "PERCENT")]
        threshold: Option<f32>,

        /// Print compact JSON on one line
        #[arg(long)]
        compact: bool,

        /// Image files to classify
        #[arg(required = true, value_name = "IMAGE")]
        files: Vec<PathBuf>,
    },

    /// Print the engineered feature vector of one image
    Features {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
    },

    /// Report which classifier paths have loadable artifacts
    Check,
}

fn parse_mode(value: &str) -> Result<Mode, String> {
    value.parse::<Mode>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_accepts_mode_aliases() {
        let args = Args::try_parse_from([
            "tracescope",
            "identify",
            "--mode",
            "comprehensive",
            "--threshold",
            "90",
            "a.png",
            "b.png",
        ])
        .unwrap();
        match args.command {
            Command::Identify {
                mode, threshold, files, ..
            } => {
                assert_eq!(mode, Mode::Hybrid);
                assert_eq!(threshold, Some(90.0));
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn identify_requires_files_and_a_known_mode() {
        assert!(Args::try_parse_from(["tracescope", "identify"]).is_err());
        assert!(Args::try_parse_from(["tracescope", "identify", "--mode", "fast", "a.png"]).is_err());
    }

    #[test]
    fn artifacts_flag_is_global() {
        let args = Args::try_parse_from(["tracescope", "check", "--artifacts", "/srv/models"]).unwrap();
        assert_eq!(args.artifacts, Some(PathBuf::from("/srv/models")));
    }
}
