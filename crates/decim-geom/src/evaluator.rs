//! Kernel-resolving penalty evaluator.

use std::any::type_name;

use tracing::debug;

use crate::config::PenaltyConfig;
use crate::error::GeomError;
use crate::fan::Fan;
use crate::real::{Point, Real};
use crate::scalar::{edge_collapse_penalty, Penalty};
use crate::simd::{Kernel, SimdLevel};

/// Scores edge collapses with a kernel chosen once at construction.
///
/// Cheap to copy and safe to share: every method is pure.
#[derive(Clone, Copy, Debug)]
pub struct PenaltyEvaluator<T: Real> {
    kernel: Kernel<T>,
    level: SimdLevel,
    target: T,
    factor: T,
}

impl<T: Real> PenaltyEvaluator<T> {
    /// Validate `config` and resolve its kernel path.
    pub fn new(config: &PenaltyConfig) -> Result<Self, GeomError> {
        let requested = config.validate()?;
        let (kernel, level) = match T::vector_kernel(requested) {
            Some(kernel) => (kernel, requested),
            None => (edge_collapse_penalty::<T> as Kernel<T>, SimdLevel::None),
        };
        debug!(
            precision = type_name::<T>(),
            path = ?config.path,
            %level,
            "resolved penalty kernel"
        );
        Ok(Self {
            kernel,
            level,
            target: T::from_f64(config.compactness_target),
            factor: T::from_f64(config.compactness_penalty),
        })
    }

    /// Instruction set of the resolved kernel; [`SimdLevel::None`] for
    /// the scalar one.
    pub fn level(&self) -> SimdLevel {
        self.level
    }

    /// Whether the resolved kernel is a vector kernel.
    pub fn is_vector(&self) -> bool {
        self.level != SimdLevel::None
    }

    /// Compactness target passed to every triangle score.
    pub fn target(&self) -> T {
        self.target
    }

    /// Factor applied to fan sums.
    pub fn factor(&self) -> T {
        self.factor
    }

    /// Score one triangle. See
    /// [`edge_collapse_penalty`](crate::edge_collapse_penalty).
    #[inline]
    pub fn evaluate(
        &self,
        new_point: &Point<T>,
        old_point: &Point<T>,
        left: &Point<T>,
        right: &Point<T>,
    ) -> Penalty<T> {
        (self.kernel)(new_point, old_point, left, right, self.target)
    }

    /// Sum the penalties of moving `fan`'s pivot to `collapse_point`,
    /// times the configured factor.
    ///
    /// Stops at the first triangle that would flip and returns a deny.
    pub fn fan_penalty(&self, collapse_point: &Point<T>, fan: &Fan<T>) -> Penalty<T> {
        let mut sum = T::ZERO;
        for edge in fan.edges() {
            let p = self.evaluate(collapse_point, fan.pivot(), &edge.left, &edge.right);
            if p.deny {
                return Penalty::DENY;
            }
            sum = sum + p.penalty;
        }
        Penalty::score(sum * self.factor)
    }

    /// Penalty of collapsing an edge into `collapse_point`: both
    /// endpoints' fan penalties, scaled by `weight` (see
    /// [`collapse_weight`](crate::collapse_weight)).
    ///
    /// The second fan is not scored if the first denies.
    pub fn collapse_penalty(
        &self,
        collapse_point: &Point<T>,
        fans: [&Fan<T>; 2],
        weight: T,
    ) -> Penalty<T> {
        let mut sum = T::ZERO;
        for fan in fans {
            let p = self.fan_penalty(collapse_point, fan);
            if p.deny {
                return Penalty::DENY;
            }
            sum = sum + p.penalty;
        }
        Penalty::score(sum * weight)
    }
}

impl<T: Real> Default for PenaltyEvaluator<T> {
    /// Scalar kernel with the default target and factor.
    fn default() -> Self {
        Self {
            kernel: edge_collapse_penalty::<T>,
            level: SimdLevel::None,
            target: T::from_f64(PenaltyConfig::DEFAULT_COMPACTNESS_TARGET),
            factor: T::from_f64(PenaltyConfig::DEFAULT_COMPACTNESS_PENALTY),
        }
    }
}
