//! Error type for the clustering engine.
//!
//! The engine rejects input whose points disagree on feature dimensionality
//! or carry NaN / infinite values, rejects out-of-range configuration, and
//! reports when the optional iteration bound runs out before the exemplars
//! settle. Everything
//! inside an iteration is infallible once the input has been validated.

use thiserror::Error;

/// Failures reported by [`crate::propagation::AffinityPropagation`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApError {
    /// A point's feature vector length differs from the first point's.
    #[error("point {index} has {found} features, expected {expected}")]
    InconsistentDimensionality {
        /// Position of the offending point in the input order.
        index: usize,
        /// Dimensionality of point 0.
        expected: usize,
        /// Dimensionality of the offending point.
        found: usize,
    },

    /// A coordinate or RSS reading is NaN or infinite.
    #[error("point {index} has a non-finite {field}")]
    NonFiniteValue {
        /// Position of the offending point in the input order.
        index: usize,
        /// Which value: `"x"`, `"y"` or `"RSS reading"`.
        field: &'static str,
    },

    /// A configuration value is outside its valid range.
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        /// Name of the configuration field.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable constraint that was violated.
        reason: &'static str,
    },

    /// The iteration bound was reached without a run of stable rounds.
    #[error("exemplars did not stabilise within {iterations} iterations")]
    DidNotConverge {
        /// Number of full iterations performed.
        iterations: usize,
    },
}

/// Convenience alias used across the engine.
pub type Result<T> = core::result::Result<T, ApError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_messages_name_the_offender() {
        let e = ApError::InconsistentDimensionality { index: 3, expected: 4, found: 2 };
        assert_eq!(e.to_string(), "point 3 has 2 features, expected 4");

        let e = ApError::NonFiniteValue { index: 5, field: "RSS reading" };
        assert_eq!(e.to_string(), "point 5 has a non-finite RSS reading");

        let e = ApError::DidNotConverge { iterations: 500 };
        assert!(e.to_string().contains("500"));
    }
}
