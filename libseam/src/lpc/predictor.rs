//! fixed order linear predictor
//!
//! Coefficients are estimated with the autocorrelation method and the
//! Levinson-Durbin recursion, in double precision, on samples normalized to
//! the unit range of their storage type. Prediction runs the all-pole filter
//! forward from the end of a source window.

use crate::core::{Sample, LPC_ORDER};

/// lag window constant, roughly a gaussian with 0.002 normalized bandwidth
const LAG_WINDOW: f64 = 0.008 * 0.008;

/// per coefficient damping base
const DAMPING: f64 = 0.999;

/// Linear predictor with a fixed number of coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    coeffs: Vec<f32>,
}

impl Default for LinearPredictor {
    fn default() -> Self {
        Self::new(LPC_ORDER)
    }
}

impl LinearPredictor {
    /// Create an all-zero predictor of the given order
    pub fn new(order: usize) -> Self {
        Self {
            coeffs: vec![0.0; order],
        }
    }

    pub fn order(&self) -> usize {
        self.coeffs.len()
    }

    /// Coefficients of the last fit. Index `j` weighs the sample `j + 1`
    /// steps in the past, with the sign convention `x[n] = -sum(c[j] * x[n-j-1])`.
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs
    }

    /// Estimate coefficients from `samples[i * stride]` for `i < count`.
    ///
    /// A window without energy leaves an all-zero predictor behind. The count
    /// is clamped to what the slice holds.
    pub fn fit<T: Sample>(&mut self, samples: &[T], count: usize, stride: usize) {
        let stride = stride.max(1);
        let n = count.min(strided_len(samples.len(), stride));
        let at = |i: usize| samples[i * stride].to_normalized();

        let order = self.order();
        let mut aut = vec![0.0f64; order + 1];
        for (lag, a) in aut.iter_mut().enumerate() {
            *a = (lag..n).map(|i| at(i) * at(i - lag)).sum();
        }

        for (i, a) in aut.iter_mut().enumerate().skip(1) {
            *a -= *a * LAG_WINDOW * (i * i) as f64;
        }

        let lpc = levinson_durbin(&aut, order);

        let mut damp = DAMPING;
        for (c, l) in self.coeffs.iter_mut().zip(lpc) {
            *c = (l * damp) as f32;
            damp *= DAMPING;
        }
    }

    /// Extrapolate `target_count` samples past the end of the source window.
    ///
    /// Sample `i` of the target is computed from the `order` samples that
    /// precede it: earlier target samples first, then the tail of the first
    /// `source_count` source samples. Anything before the source reads as
    /// silence. Target and source are addressed with the same stride.
    pub fn predict<T: Sample>(
        &self,
        source: &[T],
        source_count: usize,
        target: &mut [T],
        target_count: usize,
        stride: usize,
    ) {
        let stride = stride.max(1);
        let n_src = source_count.min(strided_len(source.len(), stride));
        let n_tar = target_count.min(strided_len(target.len(), stride));

        for i in 0..n_tar {
            target[i * stride] = T::default();
        }

        for i in 0..n_tar {
            let mut sum = 0.0f64;
            for (j, &c) in self.coeffs.iter().enumerate() {
                let back = j + 1;
                let x = if back <= i {
                    target[(i - back) * stride].to_normalized()
                } else if back - i <= n_src {
                    source[(n_src - (back - i)) * stride].to_normalized()
                } else {
                    0.0
                };
                sum -= x * c as f64;
            }
            target[i * stride] = T::from_normalized(sum);
        }
    }
}

/// number of strided elements a slice of `len` holds
fn strided_len(len: usize, stride: usize) -> usize {
    if len == 0 {
        0
    } else {
        (len - 1) / stride + 1
    }
}

/// Levinson-Durbin recursion on `order + 1` autocorrelation lags
///
/// Stops at a noise floor about 100 dB below the window energy and leaves the
/// remaining coefficients at zero.
pub(crate) fn levinson_durbin(aut: &[f64], order: usize) -> Vec<f64> {
    let mut lpc = vec![0.0f64; order];
    if aut.len() <= order {
        return lpc;
    }

    let mut error = aut[0] * (1.0 + 1e-7);
    let epsilon = 1e-6 * aut[0] + 1e-7;

    for i in 0..order {
        if error < epsilon {
            break;
        }

        let mut r = -aut[i + 1];
        for j in 0..i {
            r -= lpc[j] * aut[i - j];
        }
        r /= error;

        lpc[i] = r;
        let half = i / 2;
        for j in 0..half {
            let tmp = lpc[j];
            lpc[j] += r * lpc[i - 1 - j];
            lpc[i - 1 - j] += r * tmp;
        }
        if i & 1 == 1 {
            lpc[half] += lpc[half] * r;
        }

        error *= 1.0 - r * r;
    }

    lpc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_zero_predicts_silence() {
        let mut lpc = LinearPredictor::new(0);
        let src: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        lpc.fit(&src, src.len(), 1);
        let mut out = vec![1.0f32; 10];
        lpc.predict(&src, src.len(), &mut out, 10, 1);
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_count_is_clamped() {
        let mut a = LinearPredictor::default();
        let mut b = LinearPredictor::default();
        let src: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        a.fit(&src, 10_000, 1);
        b.fit(&src, 64, 1);
        assert_eq!(a, b);

        let mut out = vec![0.0f32; 4];
        a.predict(&src, 64, &mut out, 100, 1);
    }

    #[test]
    fn test_strided_len() {
        assert_eq!(strided_len(0, 2), 0);
        assert_eq!(strided_len(1, 2), 1);
        assert_eq!(strided_len(7, 2), 4);
        assert_eq!(strided_len(8, 2), 4);
    }

    #[test]
    fn test_first_order_recursion() {
        // a single lag of x[n] = 0.5 x[n-1] gives c0 = -r1/r0
        let lpc = levinson_durbin(&[1.0, 0.5], 1);
        assert!((lpc[0] + 0.5 / (1.0 + 1e-7)).abs() < 1e-12);
    }
}
