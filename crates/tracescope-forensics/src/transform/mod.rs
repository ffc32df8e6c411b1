// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frequency and wavelet transforms used by the denoiser, feature engineer,
// and PCE correlator.

pub mod fft;
pub mod wavelet;

pub use fft::{Complex, Spectrum, fft2d, ifft2d};
pub use wavelet::{Pyramid, Subbands, decompose, dwt2, idwt2, reconstruct};
