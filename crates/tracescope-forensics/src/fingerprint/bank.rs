// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reference fingerprint bank: one averaged residual per known device, in a
// fixed key order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracescope_core::config::ArtifactPaths;
use tracescope_core::error::{Result, TraceError};
use tracing::{info, instrument, warn};

use crate::artifacts::read_json;

/// On-disk entry of `scanner_fingerprints.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankEntry {
    pub key: String,
    pub fingerprint: Vec<f32>,
}

/// On-disk layout of `scanner_fingerprints.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankFile {
    pub width: usize,
    pub height: usize,
    pub entries: Vec<BankEntry>,
}

/// Read-only, ordered device-key to fingerprint mapping.
///
/// Iteration order is the canonical key order. Correlation scores, the
/// hybrid feature row, and tie-breaking all follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintBank {
    width: usize,
    height: usize,
    keys: Vec<String>,
    fingerprints: Vec<Vec<f32>>,
}

fn invalid(detail: impl std::fmt::Display) -> TraceError {
    TraceError::ResourceUnavailable(format!("invalid fingerprint bank: {detail}"))
}

impl FingerprintBank {
    /// Build a bank from `(key, fingerprint)` pairs in canonical order.
    pub fn from_entries(width: usize, height: usize, entries: Vec<(String, Vec<f32>)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(invalid("no entries"));
        }
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(entries.len());
        let mut fingerprints = Vec::with_capacity(entries.len());
        for (key, fingerprint) in entries {
            if !seen.insert(key.clone()) {
                return Err(invalid(format!("duplicate key '{key}'")));
            }
            if fingerprint.len() != width * height {
                return Err(invalid(format!(
                    "fingerprint '{key}' has {} samples, expected {}",
                    fingerprint.len(),
                    width * height
                )));
            }
            keys.push(key);
            fingerprints.push(fingerprint);
        }
        Ok(Self {
            width,
            height,
            keys,
            fingerprints,
        })
    }

    /// Load the bank, applying the optional keys file as the canonical order.
    #[instrument(skip_all, fields(path = %paths.fingerprints.display()))]
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let file: BankFile = read_json(&paths.fingerprints)?;
        let (width, height) = (file.width, file.height);

        let entries = if paths.fingerprint_keys.exists() {
            let order: Vec<String> = read_json(&paths.fingerprint_keys)?;
            reorder(file.entries, order)?
        } else {
            file.entries.into_iter().map(|e| (e.key, e.fingerprint)).collect()
        };

        let bank = Self::from_entries(width, height, entries)?;
        info!(devices = bank.len(), width, height, "Fingerprint bank loaded");
        Ok(bank)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.fingerprints.iter().map(Vec::as_slice))
    }
}

fn reorder(entries: Vec<BankEntry>, order: Vec<String>) -> Result<Vec<(String, Vec<f32>)>> {
    let available = entries.len();
    let mut by_key: HashMap<String, Vec<f32>> = HashMap::with_capacity(available);
    for entry in entries {
        if by_key.insert(entry.key.clone(), entry.fingerprint).is_some() {
            return Err(invalid(format!("duplicate key '{}'", entry.key)));
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let fingerprint = by_key
            .remove(&key)
            .ok_or_else(|| invalid(format!("key '{key}' listed in key order but not in bank")))?;
        out.push((key, fingerprint));
    }
    if !by_key.is_empty() {
        warn!(
            unused = by_key.len(),
            available,
            "Bank entries missing from the key order file are ignored"
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_bank(dir: &Path, keys: &[&str]) -> ArtifactPaths {
        let paths = ArtifactPaths::from_dir(dir);
        let file = BankFile {
            width: 2,
            height: 2,
            entries: keys
                .iter()
                .enumerate()
                .map(|(i, k)| BankEntry {
                    key: k.to_string(),
                    fingerprint: vec![i as f32; 4],
                })
                .collect(),
        };
        std::fs::write(&paths.fingerprints, serde_json::to_vec(&file).unwrap()).unwrap();
        paths
    }

    #[test]
    fn file_order_is_kept_without_keys_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_bank(dir.path(), &["Epson V39", "Canon 120", "HP Scanjet"]);
        let bank = FingerprintBank::load(&paths).unwrap();
        assert_eq!(bank.keys(), &["Epson V39", "Canon 120", "HP Scanjet"]);
    }

    #[test]
    fn keys_file_fixes_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_bank(dir.path(), &["Epson V39", "Canon 120", "HP Scanjet"]);
        std::fs::write(&paths.fingerprint_keys, r#"["HP Scanjet", "Epson V39"]"#).unwrap();

        let bank = FingerprintBank::load(&paths).unwrap();
        assert_eq!(bank.keys(), &["HP Scanjet", "Epson V39"]);
        let (_, fp) = bank.iter().next().unwrap();
        assert_eq!(fp, &[2.0; 4]);
    }

    #[test]
    fn unknown_key_in_order_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_bank(dir.path(), &["Epson V39"]);
        std::fs::write(&paths.fingerprint_keys, r#"["Canon 120"]"#).unwrap();
        assert!(matches!(
            FingerprintBank::load(&paths),
            Err(TraceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn missing_bank_is_unavailable() {
        let paths = ArtifactPaths::from_dir("/nonexistent/bank");
        assert!(matches!(
            FingerprintBank::load(&paths),
            Err(TraceError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn from_entries_validates() {
        assert!(FingerprintBank::from_entries(2, 2, vec![("a".into(), vec![0.0; 3])]).is_err());
        assert!(
            FingerprintBank::from_entries(
                1,
                1,
                vec![("a".into(), vec![0.0]), ("a".into(), vec![1.0])]
            )
            .is_err()
        );
        assert!(FingerprintBank::from_entries(1, 1, Vec::new()).is_err());
    }
}
