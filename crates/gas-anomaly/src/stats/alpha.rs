//! Fixed-point smoothing factor

use malachite::Integer;

use crate::error::{EngineError, Result};

/// Decimal scale of the smoothing factor (6 digits)
pub const ALPHA_SCALE: u64 = 1_000_000;

/// Smoothing factor of the exponentially weighted statistics
///
/// Stored as `round(alpha * 10^6)` so that every update is exact integer
/// arithmetic. Values are always multiplied by the scaled factor before the
/// truncating division by the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alpha {
    scaled: u64,
}

impl Alpha {
    /// Create from a fractional value in (0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(EngineError::InvalidAlpha(alpha.to_string()));
        }
        Self::from_scaled((alpha * ALPHA_SCALE as f64).round() as u64)
            .map_err(|_| EngineError::InvalidAlpha(alpha.to_string()))
    }

    /// Create from an already scaled value in `1..=ALPHA_SCALE`
    pub fn from_scaled(scaled: u64) -> Result<Self> {
        if scaled == 0 || scaled > ALPHA_SCALE {
            return Err(EngineError::InvalidAlpha(format!(
                "{}/{}",
                scaled, ALPHA_SCALE
            )));
        }
        Ok(Self { scaled })
    }

    /// `round(alpha * 10^6)`
    pub fn scaled(&self) -> u64 {
        self.scaled
    }

    /// `10^6 - round(alpha * 10^6)`, the scaled `1 - alpha`
    pub fn complement(&self) -> u64 {
        ALPHA_SCALE - self.scaled
    }

    pub fn as_f64(&self) -> f64 {
        self.scaled as f64 / ALPHA_SCALE as f64
    }

    /// Minimum number of observations before a key is scored, `ceil(1 / alpha)`
    pub fn warmup_count(&self) -> u64 {
        ALPHA_SCALE.div_ceil(self.scaled)
    }

    /// `value * alpha`, multiply then truncate
    pub(crate) fn weight(&self, value: &Integer) -> Integer {
        value * Integer::from(self.scaled) / Integer::from(ALPHA_SCALE)
    }

    /// `value * (1 - alpha)`, multiply then truncate
    pub(crate) fn weight_complement(&self, value: &Integer) -> Integer {
        value * Integer::from(self.complement()) / Integer::from(ALPHA_SCALE)
    }
}

impl Default for Alpha {
    fn default() -> Self {
        // 0.05
        Self { scaled: 50_000 }
    }
}

impl std::fmt::Display for Alpha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_rounds_to_six_digits() {
        let alpha = Alpha::new(0.05).unwrap();
        assert_eq!(alpha.scaled(), 50_000);
        assert_eq!(alpha.complement(), 950_000);

        let alpha = Alpha::new(0.1234567).unwrap();
        assert_eq!(alpha.scaled(), 123_457);
    }

    #[test]
    fn test_warmup_count() {
        assert_eq!(Alpha::new(0.05).unwrap().warmup_count(), 20);
        assert_eq!(Alpha::new(1.0).unwrap().warmup_count(), 1);
        assert_eq!(Alpha::new(0.3).unwrap().warmup_count(), 4);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Alpha::new(0.0).is_err());
        assert!(Alpha::new(-0.5).is_err());
        assert!(Alpha::new(1.5).is_err());
        assert!(Alpha::new(f64::NAN).is_err());
        // rounds to zero at 6 digits
        assert!(Alpha::new(0.0000001).is_err());
        assert!(Alpha::from_scaled(ALPHA_SCALE + 1).is_err());
    }

    #[test]
    fn test_weight_multiplies_before_dividing() {
        let alpha = Alpha::new(0.05).unwrap();
        // 19 * 50_000 / 10^6 = 0 and 39 * 50_000 / 10^6 = 1 (truncated)
        assert_eq!(alpha.weight(&Integer::from(19)), Integer::from(0));
        assert_eq!(alpha.weight(&Integer::from(39)), Integer::from(1));
        assert_eq!(alpha.weight(&Integer::from(-39)), Integer::from(-1));
        assert_eq!(
            alpha.weight_complement(&Integer::from(1_000)),
            Integer::from(950)
        );
    }
}
