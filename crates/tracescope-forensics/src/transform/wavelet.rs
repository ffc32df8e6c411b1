// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orthonormal 2-D Haar wavelet transform.

use tracescope_core::error::{Result, TraceError};

/// One level of a 2-D Haar decomposition.
///
/// For each 2x2 block `[a b; c d]`:
/// `ll = (a+b+c+d)/2`, `hl = (a-b+c-d)/2`, `lh = (a+b-c-d)/2`, `hh = (a-b-c+d)/2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subbands {
    /// Width and height of each subband (half the input).
    pub width: usize,
    pub height: usize,
    pub ll: Vec<f32>,
    /// Horizontal detail (differences across columns).
    pub hl: Vec<f32>,
    /// Vertical detail (differences across rows).
    pub lh: Vec<f32>,
    /// Diagonal detail.
    pub hh: Vec<f32>,
}

impl Subbands {
    /// Mutable access to the three detail bands.
    pub fn details_mut(&mut self) -> [&mut Vec<f32>; 3] {
        [&mut self.lh, &mut self.hl, &mut self.hh]
    }

    pub fn details(&self) -> [&[f32]; 3] {
        [&self.lh, &self.hl, &self.hh]
    }
}

/// Single-level forward transform. Both dimensions must be even.
pub fn dwt2(data: &[f32], width: usize, height: usize) -> Result<Subbands> {
    if width % 2 != 0 || height % 2 != 0 || width == 0 || height == 0 {
        return Err(TraceError::Config(format!(
            "Haar transform needs even dimensions, got {width}x{height}"
        )));
    }
    if data.len() != width * height {
        return Err(TraceError::dimension("wavelet input", width * height, data.len()));
    }

    let (hw, hh_) = (width / 2, height / 2);
    let mut out = Subbands {
        width: hw,
        height: hh_,
        ll: vec![0.0; hw * hh_],
        hl: vec![0.0; hw * hh_],
        lh: vec![0.0; hw * hh_],
        hh: vec![0.0; hw * hh_],
    };

    for y in 0..hh_ {
        for x in 0..hw {
            let a = data[2 * y * width + 2 * x];
            let b = data[2 * y * width + 2 * x + 1];
            let c = data[(2 * y + 1) * width + 2 * x];
            let d = data[(2 * y + 1) * width + 2 * x + 1];
            let i = y * hw + x;
            out.ll[i] = (a + b + c + d) * 0.5;
            out.hl[i] = (a - b + c - d) * 0.5;
            out.lh[i] = (a + b - c - d) * 0.5;
            out.hh[i] = (a - b - c + d) * 0.5;
        }
    }
    Ok(out)
}

/// Single-level inverse transform.
pub fn idwt2(bands: &Subbands) -> Vec<f32> {
    let (hw, hh_) = (bands.width, bands.height);
    let width = hw * 2;
    let mut out = vec![0.0f32; width * hh_ * 2];

    for y in 0..hh_ {
        for x in 0..hw {
            let i = y * hw + x;
            let (ll, hl, lh, hh) = (bands.ll[i], bands.hl[i], bands.lh[i], bands.hh[i]);
            out[2 * y * width + 2 * x] = (ll + hl + lh + hh) * 0.5;
            out[2 * y * width + 2 * x + 1] = (ll - hl + lh - hh) * 0.5;
            out[(2 * y + 1) * width + 2 * x] = (ll + hl - lh - hh) * 0.5;
            out[(2 * y + 1) * width + 2 * x + 1] = (ll - hl - lh + hh) * 0.5;
        }
    }
    out
}

/// Multi-level decomposition; `levels[0]` is the finest scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid {
    /// Detail bands per level. The `ll` field of each entry is left empty;
    /// only the coarsest approximation is kept in `approx`.
    pub levels: Vec<Subbands>,
    pub approx: Vec<f32>,
    pub approx_width: usize,
    pub approx_height: usize,
}

/// Decompose `levels` times, recursing on the approximation band.
pub fn decompose(data: &[f32], width: usize, height: usize, levels: usize) -> Result<Pyramid> {
    let mut current = data.to_vec();
    let (mut w, mut h) = (width, height);
    let mut out = Vec::with_capacity(levels);

    for _ in 0..levels {
        let mut bands = dwt2(&current, w, h)?;
        current = std::mem::take(&mut bands.ll);
        w = bands.width;
        h = bands.height;
        out.push(bands);
    }

    Ok(Pyramid {
        levels: out,
        approx: current,
        approx_width: w,
        approx_height: h,
    })
}

/// Inverse of [`decompose`].
pub fn reconstruct(pyramid: &Pyramid) -> Vec<f32> {
    let mut current = pyramid.approx.clone();
    for level in pyramid.levels.iter().rev() {
        let bands = Subbands {
            width: level.width,
            height: level.height,
            ll: current,
            hl: level.hl.clone(),
            lh: level.lh.clone(),
            hh: level.hh.clone(),
        };
        current = idwt2(&bands);
    }
    current
}
