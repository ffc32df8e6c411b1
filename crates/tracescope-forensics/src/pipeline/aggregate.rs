// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch verdict over the successfully classified images.

use tracescope_core::types::{BatchAggregate, ClassificationResult};

/// Most frequent value; the first one encountered wins ties.
fn modal<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&'a str, usize)>, (v, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((v, n)),
        })
        .map(|(v, _)| v)
}

/// Modal brand, modal label, and unrounded mean confidence. `None` when
/// nothing was classified.
pub fn aggregate(results: &[ClassificationResult]) -> Option<BatchAggregate> {
    let brand = modal(results.iter().map(|r| r.brand.as_str()))?;
    let label = modal(results.iter().map(|r| r.label.as_str()))?;
    let mean = results.iter().map(|r| r.confidence as f64).sum::<f64>() / results.len() as f64;
    Some(BatchAggregate {
        brand: brand.to_string(),
        label: label.to_string(),
        confidence: mean as f32,
        count: results.len(),
    })
}
