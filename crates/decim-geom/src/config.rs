//! Evaluator configuration.

use crate::error::GeomError;
use crate::simd::SimdLevel;

/// Which kernel an evaluator runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KernelPath {
    /// Best vector kernel the CPU supports, scalar otherwise.
    #[default]
    Auto,
    /// Always the portable kernel.
    Scalar,
    /// Best vector kernel; building fails if there is none.
    Vector,
}

/// Configuration for a [`PenaltyEvaluator`](crate::PenaltyEvaluator).
#[derive(Clone, Debug, PartialEq)]
pub struct PenaltyConfig {
    /// Compactness below which a new triangle is penalised.
    ///
    /// Default: 0.25. An equilateral triangle has compactness 1.
    pub compactness_target: f64,

    /// Factor applied to a summed fan penalty.
    ///
    /// Default: 0.00125.
    pub compactness_penalty: f64,

    /// Kernel selection. Default: [`KernelPath::Auto`].
    pub path: KernelPath,
}

impl PenaltyConfig {
    /// Default compactness target.
    pub const DEFAULT_COMPACTNESS_TARGET: f64 = 0.25;

    /// Default fan penalty factor.
    pub const DEFAULT_COMPACTNESS_PENALTY: f64 = 0.00125;

    /// Config with the given target and default everything else.
    pub fn new(compactness_target: f64) -> Self {
        Self {
            compactness_target,
            ..Self::default()
        }
    }

    /// Set the fan penalty factor.
    pub fn with_penalty(mut self, compactness_penalty: f64) -> Self {
        self.compactness_penalty = compactness_penalty;
        self
    }

    /// Set the kernel path.
    pub fn with_path(mut self, path: KernelPath) -> Self {
        self.path = path;
        self
    }

    /// Check the numeric fields and resolve `path` against the running
    /// CPU. Returns [`SimdLevel::None`] for the scalar kernel.
    pub fn validate(&self) -> Result<SimdLevel, GeomError> {
        check("compactness_target", self.compactness_target)?;
        check("compactness_penalty", self.compactness_penalty)?;

        let detected = SimdLevel::detect();
        match self.path {
            KernelPath::Scalar => Ok(SimdLevel::None),
            KernelPath::Auto => Ok(detected),
            KernelPath::Vector if detected == SimdLevel::None => {
                Err(GeomError::VectorUnavailable { detected })
            }
            KernelPath::Vector => Ok(detected),
        }
    }
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            compactness_target: Self::DEFAULT_COMPACTNESS_TARGET,
            compactness_penalty: Self::DEFAULT_COMPACTNESS_PENALTY,
            path: KernelPath::Auto,
        }
    }
}

fn check(field: &'static str, value: f64) -> Result<(), GeomError> {
    if !value.is_finite() {
        return Err(GeomError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(GeomError::Negative { field });
    }
    Ok(())
}
