// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reference fingerprint bank and correlation against it.

pub mod bank;
pub mod correlator;

pub use bank::FingerprintBank;
pub use correlator::{CorrelationScores, FingerprintCorrelator, correlate};
