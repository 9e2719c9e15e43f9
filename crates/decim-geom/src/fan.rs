//! Vertex fans and the collapse weight.
//!
//! Collapsing edge `(a, b)` moves both endpoints to one collapse point.
//! Every triangle around `a` except the ones shared with `b` (those
//! vanish) is reshaped; its penalty is scored against the edge opposite
//! `a`. A [`Fan`] is that list of opposite edges plus the pivot's current
//! position.

use smallvec::SmallVec;

use crate::error::GeomError;
use crate::real::{Point, Real};

/// Edge opposite the pivot in one fan triangle, in the winding the
/// penalty kernel expects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FanEdge<T> {
    /// Vertex before the pivot in the triangle's winding.
    pub left: Point<T>,
    /// Vertex after the pivot.
    pub right: Point<T>,
}

/// Triangles around one pivot vertex, reduced to their opposite edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Fan<T> {
    pivot: Point<T>,
    edges: SmallVec<[FanEdge<T>; 8]>,
}

impl<T: Real> Fan<T> {
    /// Empty fan around `pivot`.
    pub fn new(pivot: Point<T>) -> Self {
        Self {
            pivot,
            edges: SmallVec::new(),
        }
    }

    /// Add one triangle by its opposite edge.
    pub fn push(&mut self, left: Point<T>, right: Point<T>) {
        self.edges.push(FanEdge { left, right });
    }

    /// Build the fan of vertex `pivot` from indexed triangles.
    ///
    /// Every triangle must contain `pivot`. Triangles that also contain
    /// `skip` (the other end of the collapsing edge) are left out.
    pub fn gather(
        points: &[Point<T>],
        triangles: &[[usize; 3]],
        pivot: usize,
        skip: usize,
    ) -> Result<Self, GeomError> {
        let point = |index: usize| {
            points.get(index).copied().ok_or(GeomError::VertexOutOfRange {
                index,
                len: points.len(),
            })
        };

        let mut fan = Self::new(point(pivot)?);
        for &tri in triangles {
            let k = tri
                .iter()
                .position(|&v| v == pivot)
                .ok_or(GeomError::PivotNotInTriangle {
                    triangle: tri,
                    pivot,
                })?;
            let right = tri[(k + 1) % 3];
            let left = tri[(k + 2) % 3];
            if left == skip || right == skip {
                continue;
            }
            fan.push(point(left)?, point(right)?);
        }
        Ok(fan)
    }

    /// Current position of the pivot vertex.
    pub fn pivot(&self) -> &Point<T> {
        &self.pivot
    }

    /// Opposite edges, one per triangle.
    pub fn edges(&self) -> &[FanEdge<T>] {
        &self.edges
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the fan has no triangles.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Scale applied to the summed fan penalties of a collapse:
/// `(area_a + area_b)^2 / tri_refs`, where the areas are the two
/// vertices' accumulated triangle areas and `tri_refs` counts the
/// triangles referencing either vertex.
///
/// Zero when `tri_refs` is zero.
pub fn collapse_weight<T: Real>(area_a: T, area_b: T, tri_refs: usize) -> T {
    if tri_refs == 0 {
        return T::ZERO;
    }
    let area = area_a + area_b;
    area * area / T::from_f64(tri_refs as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Square split into four triangles around the centre vertex 4.
    //
    //   3 ---- 2
    //   | \  / |
    //   |  4   |
    //   | /  \ |
    //   0 ---- 1
    fn square() -> (Vec<Point<f64>>, Vec<[usize; 3]>) {
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.5, 0.5, 0.0],
        ];
        let tris = vec![[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
        (points, tris)
    }

    #[test]
    fn gather_rotates_to_the_pivot() {
        let (points, tris) = square();
        let fan = Fan::gather(&points, &tris, 4, usize::MAX).unwrap();
        assert_eq!(fan.len(), 4);
        assert_eq!(fan.pivot(), &[0.5, 0.5, 0.0]);
        // Pivot last in [0, 1, 4]: right wraps to 0, left is 1.
        assert_eq!(
            fan.edges()[0],
            FanEdge {
                left: points[1],
                right: points[0],
            }
        );
    }

    #[test]
    fn gather_skips_triangles_on_the_collapsing_edge() {
        let (points, tris) = square();
        let fan = Fan::gather(&points, &tris, 4, 0).unwrap();
        // [0, 1, 4] and [3, 0, 4] vanish with edge (4, 0).
        assert_eq!(fan.len(), 2);
    }

    #[test]
    fn gather_rejects_bad_input() {
        let (points, tris) = square();
        assert_eq!(
            Fan::gather(&points, &tris, 0, usize::MAX).err(),
            Some(GeomError::PivotNotInTriangle {
                triangle: [1, 2, 4],
                pivot: 0,
            })
        );
        assert_eq!(
            Fan::gather(&points, &[[4, 9, 1]], 4, usize::MAX).err(),
            Some(GeomError::VertexOutOfRange { index: 9, len: 5 })
        );
    }

    #[test]
    fn weight_is_area_squared_per_reference() {
        assert_eq!(collapse_weight(1.0f64, 2.0, 3), 3.0);
        assert_eq!(collapse_weight(1.0f32, 1.0, 0), 0.0);
    }
}
