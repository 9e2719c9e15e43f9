//! Evaluator configuration errors.

use std::error::Error;
use std::fmt;

use crate::simd::SimdLevel;

/// Errors produced while building a [`PenaltyEvaluator`](crate::PenaltyEvaluator)
/// or gathering a [`Fan`](crate::Fan).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GeomError {
    /// A config field is NaN or infinite.
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A config field is negative.
    Negative {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A fan triangle names a vertex past the end of the point table.
    VertexOutOfRange {
        /// The offending vertex index.
        index: usize,
        /// Length of the point table.
        len: usize,
    },
    /// A fan triangle does not contain the fan's pivot vertex.
    PivotNotInTriangle {
        /// The triangle's vertex indices.
        triangle: [usize; 3],
        /// The pivot vertex index.
        pivot: usize,
    },
    /// The vector kernel was requested but the CPU has none.
    VectorUnavailable {
        /// What the CPU supports.
        detected: SimdLevel,
    },
}

impl fmt::Display for GeomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field } => write!(f, "{field} must be finite"),
            Self::Negative { field } => write!(f, "{field} must be non-negative"),
            Self::VertexOutOfRange { index, len } => {
                write!(f, "vertex {index} out of range for {len} points")
            }
            Self::PivotNotInTriangle { triangle, pivot } => {
                write!(f, "triangle {triangle:?} does not contain pivot vertex {pivot}")
            }
            Self::VectorUnavailable { detected } => {
                write!(f, "vector kernel requested but detected SIMD level is {detected}")
            }
        }
    }
}

impl Error for GeomError {}
