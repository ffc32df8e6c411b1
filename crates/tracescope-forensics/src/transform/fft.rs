// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Radix-2 fast Fourier transform over row-major 2-D buffers.
//
// Computation is done in f64 and strictly sequential so that the same input
// always yields bit-identical spectra.

use tracescope_core::error::{Result, TraceError};

/// Complex sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    pub fn norm_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }
}

/// 2-D spectrum in row-major order (`bins[v * width + u]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub width: usize,
    pub height: usize,
    pub bins: Vec<Complex>,
}

impl Spectrum {
    /// Signed frequency index of bin `k` in a transform of length `n`.
    pub fn signed_frequency(k: usize, n: usize) -> isize {
        if k <= n / 2 {
            k as isize
        } else {
            k as isize - n as isize
        }
    }

    /// Element-wise product with the conjugate of `other` (cross-power).
    pub fn cross_power(&self, other: &Spectrum) -> Spectrum {
        let bins = self
            .bins
            .iter()
            .zip(&other.bins)
            .map(|(a, b)| a.mul(b.conj()))
            .collect();
        Spectrum {
            width: self.width,
            height: self.height,
            bins,
        }
    }
}

/// In-place iterative Cooley-Tukey FFT. `buf.len()` must be a power of two.
///
/// The inverse transform is scaled by `1/n`.
pub fn fft_in_place(buf: &mut [Complex], inverse: bool) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two(), "fft length {n} is not a power of two");

    // Bit-reversal permutation.
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if j > i {
            buf.swap(i, j);
        }
    }

    let sign = if inverse { 1.0 } else { -1.0 };
    let mut len = 2;
    while len <= n {
        let angle = sign * 2.0 * std::f64::consts::PI / len as f64;
        let step = Complex::new(angle.cos(), angle.sin());
        for start in (0..n).step_by(len) {
            let mut w = Complex::new(1.0, 0.0);
            for k in 0..len / 2 {
                let even = buf[start + k];
                let odd = buf[start + k + len / 2].mul(w);
                buf[start + k] = even.add(odd);
                buf[start + k + len / 2] = even.sub(odd);
                w = w.mul(step);
            }
        }
        len <<= 1;
    }

    if inverse {
        let scale = 1.0 / n as f64;
        for c in buf.iter_mut() {
            c.re *= scale;
            c.im *= scale;
        }
    }
}

fn check_shape(len: usize, width: usize, height: usize) -> Result<()> {
    if !width.is_power_of_two() || !height.is_power_of_two() {
        return Err(TraceError::Config(format!(
            "FFT needs power-of-two dimensions, got {width}x{height}"
        )));
    }
    if len != width * height {
        return Err(TraceError::dimension("fft input", width * height, len));
    }
    Ok(())
}

/// Forward 2-D transform of a real row-major buffer.
pub fn fft2d(data: &[f32], width: usize, height: usize) -> Result<Spectrum> {
    check_shape(data.len(), width, height)?;
    let bins = data.iter().map(|&v| Complex::new(v as f64, 0.0)).collect();
    let mut spectrum = Spectrum { width, height, bins };
    transform_2d(&mut spectrum, false);
    Ok(spectrum)
}

/// Inverse 2-D transform, returning the real part.
pub fn ifft2d(spectrum: &Spectrum) -> Vec<f64> {
    let mut work = spectrum.clone();
    transform_2d(&mut work, true);
    work.bins.into_iter().map(|c| c.re).collect()
}

fn transform_2d(spectrum: &mut Spectrum, inverse: bool) {
    let (w, h) = (spectrum.width, spectrum.height);

    for row in spectrum.bins.chunks_exact_mut(w) {
        fft_in_place(row, inverse);
    }

    let mut column = vec![Complex::ZERO; h];
    for x in 0..w {
        for y in 0..h {
            column[y] = spectrum.bins[y * w + x];
        }
        fft_in_place(&mut column, inverse);
        for y in 0..h {
            spectrum.bins[y * w + x] = column[y];
        }
    }
}
