//! Loss functions shared by the learning loop and the addition/exchange
//! strategies.

use serde::{Deserialize, Serialize};

/// Error between a predicted value `p` and a measured value `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LossFunction {
    /// `|(p - r) / r|`
    #[default]
    Relative,
    /// `(r - p)^2`
    LeastSquares,
    /// `|r - p|`
    Absolute,
}

impl LossFunction {
    pub fn error(self, predicted: f64, real: f64) -> f64 {
        match self {
            Self::Relative => {
                if real == 0.0 {
                    // Undefined ratio; fall back to the absolute deviation.
                    predicted.abs()
                } else {
                    ((predicted - real) / real).abs()
                }
            }
            Self::LeastSquares => (real - predicted).powi(2),
            Self::Absolute => (real - predicted).abs(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relative => "relative",
            Self::LeastSquares => "leastsquares",
            Self::Absolute => "absolute",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relative" => Some(Self::Relative),
            "leastsquares" | "least_squares" => Some(Self::LeastSquares),
            "absolute" | "abs" => Some(Self::Absolute),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_metrics_for_predicted_nine_real_ten() {
        assert!(close(LossFunction::Relative.error(9.0, 10.0), 0.1));
        assert!(close(LossFunction::Absolute.error(9.0, 10.0), 1.0));
        assert!(close(LossFunction::LeastSquares.error(9.0, 10.0), 1.0));
    }

    #[test]
    fn test_relative_with_zero_measurement() {
        assert!(close(LossFunction::Relative.error(0.0, 0.0), 0.0));
        assert!(close(LossFunction::Relative.error(-2.0, 0.0), 2.0));
    }

    #[test]
    fn test_from_str() {
        assert_eq!(LossFunction::from_str("LEASTSQUARES"), Some(LossFunction::LeastSquares));
        assert_eq!(LossFunction::from_str("abs"), Some(LossFunction::Absolute));
        assert_eq!(LossFunction::from_str("huber"), None);
    }
}
