// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestration and aggregation.

pub mod aggregate;
pub mod batch;

pub use aggregate::aggregate;
pub use batch::Identifier;
