//! signal extension by linear prediction
//!
//! Fills the unused tail of an interleaved buffer with a continuation of the
//! valid samples, so a frame that ends early does not end in a step.

use once_cell::sync::Lazy;

use super::LinearPredictor;
use crate::core::LPC_ORDER;

/// length of the raised cosine fade window
pub const FADE_LEN: usize = 120;

/// most recent samples used for the fit
pub const EXTENSION_INPUT: usize = 480;

/// Raised cosine from 1 down to 0 over `FADE_LEN` samples, generated with a
/// Goertzel resonator tuned to pi / FADE_LEN.
pub static FADE_WINDOW: Lazy<[f32; FADE_LEN]> = Lazy::new(|| {
    let k = 2.0 * (std::f32::consts::PI / FADE_LEN as f32).cos();
    let mut window = [0.0f32; FADE_LEN];
    let (mut m0, mut m1) = (1.0f32, 0.5 * k);
    window[0] = 1.0;
    for w in window.iter_mut().skip(1) {
        *w = k * m0 - m1;
        m1 = m0;
        m0 = *w;
    }
    for w in window.iter_mut() {
        *w = 0.5 + 0.5 * *w;
    }
    window
});

/// Extrapolate `buf[valid * channels..]` from the valid samples before it.
///
/// Each channel gets its own predictor, fitted on up to the last
/// [`EXTENSION_INPUT`] valid samples. The first extrapolated samples are
/// faded with [`FADE_WINDOW`]. With fewer than `4 * LPC_ORDER` valid samples
/// the tail is zero-filled instead.
pub fn extend_signal(buf: &mut [f32], valid: usize, channels: usize) {
    let channels = channels.max(1);
    let len = buf.len() / channels;
    if valid >= len {
        return;
    }

    let before = valid.min(EXTENSION_INPUT);
    let after = len - valid;
    let (head, tail) = buf.split_at_mut(valid * channels);

    if before < 4 * LPC_ORDER {
        tail.fill(0.0);
        return;
    }

    let mut lpc = LinearPredictor::new(LPC_ORDER);
    for c in 0..channels {
        let fit_from = (valid - before) * channels + c;
        lpc.fit(&head[fit_from..], before, channels);
        lpc.predict(&head[c..], valid, &mut tail[c..], after, channels);

        for (i, w) in FADE_WINDOW.iter().take(after.min(LPC_ORDER)).enumerate() {
            tail[i * channels + c] *= w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_shape() {
        let w = &*FADE_WINDOW;
        assert!((w[0] - 1.0).abs() < 1e-6);
        assert!((w[FADE_LEN / 2] - 0.5).abs() < 1e-3);
        assert!(w.windows(2).all(|p| p[1] <= p[0] + 1e-6));
        for (i, &v) in w.iter().enumerate() {
            let expected = 0.5 + 0.5 * (std::f32::consts::PI * i as f32 / FADE_LEN as f32).cos();
            assert!((v - expected).abs() < 1e-3, "sample {i}: {v} vs {expected}");
        }
    }

    #[test]
    fn test_short_input_zero_fills() {
        let mut buf = vec![0.7f32; 2 * 200];
        extend_signal(&mut buf, 50, 2);
        assert!(buf[..100].iter().all(|&x| x == 0.7));
        assert!(buf[100..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_full_buffer_untouched() {
        let mut buf = vec![0.3f32; 64];
        extend_signal(&mut buf, 64, 1);
        assert!(buf.iter().all(|&x| x == 0.3));
    }

    #[test]
    fn test_continues_sine_per_channel() {
        let period = 48.0f32;
        let len = 960;
        let valid = 600;
        let mut buf = vec![0.0f32; 2 * len];
        for i in 0..valid {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / period;
            buf[2 * i] = 0.5 * phase.sin();
            buf[2 * i + 1] = -0.25 * phase.sin();
        }
        extend_signal(&mut buf, valid, 2);

        // past the fade the continuation keeps the phase of each channel
        let range = valid + LPC_ORDER..valid + FADE_LEN;
        for (c, gain) in [(0usize, 0.5f32), (1, -0.25)] {
            let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
            for i in range.clone() {
                let expected = gain * (2.0 * std::f32::consts::PI * i as f32 / period).sin();
                let got = buf[2 * i + c];
                dot += got * expected;
                na += got * got;
                nb += expected * expected;
            }
            assert!(dot / (na * nb).sqrt() > 0.95);
            assert!(buf[2 * valid..].iter().skip(c).step_by(2).all(|x| x.abs() <= gain.abs()));
        }
    }
}
