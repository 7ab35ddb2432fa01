//! sample representations

/// Full scale magnitude of a 16 bit signed sample (2^15)
pub const I16_SCALE: f64 = 32768.0;

/// A storage type for audio samples.
///
/// Predictor maths runs on normalized values in roughly [-1.0, 1.0); the
/// scale of each representation is the inverse of its natural full scale
/// magnitude, so the same recursion serves every type.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Full scale magnitude of the type
    const SCALE: f64;

    /// value in normalized units
    fn to_normalized(self) -> f64;

    /// value from normalized units, rounding and saturating where needed
    fn from_normalized(value: f64) -> Self;

    /// normalized single precision value
    #[inline]
    fn to_f32(self) -> f32 {
        self.to_normalized() as f32
    }
}

impl Sample for f32 {
    const SCALE: f64 = 1.0;

    #[inline]
    fn to_normalized(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_normalized(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Sample for i16 {
    const SCALE: f64 = I16_SCALE;

    #[inline]
    fn to_normalized(self) -> f64 {
        self as f64 / I16_SCALE
    }

    #[inline]
    fn from_normalized(value: f64) -> Self {
        (value * I16_SCALE)
            .round()
            .clamp(i16::MIN as f64, i16::MAX as f64) as i16
    }
}

/// Convert a normalized f32 sample to i16
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    i16::from_normalized(sample as f64)
}

/// Convert an i16 sample to normalized f32
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample.to_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_scale_is_inverse_of_full_scale() {
        assert_eq!(i16::MIN.to_normalized(), -1.0);
        assert_eq!(i16::from_normalized(-1.0), i16::MIN);
        assert_eq!(i16::from_normalized(0.5), 16384);
    }

    #[test]
    fn test_i16_saturates() {
        assert_eq!(f32_to_i16(1.5), i16::MAX);
        assert_eq!(f32_to_i16(-3.0), i16::MIN);
    }

    #[test]
    fn test_f32_passthrough() {
        assert_eq!(0.25f32.to_normalized(), 0.25);
        assert_eq!(f32::from_normalized(-0.75), -0.75);
    }
}
