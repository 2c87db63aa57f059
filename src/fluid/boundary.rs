//! Static collision surfaces.
//!
//! Surfaces are triangles in world space. A "plane" is the unit square
//! `[-1, 1] x {0} x [-1, 1]` pushed through a placement matrix and stored as
//! two triangles. The registry is append-only.

use bevy::prelude::*;

/// Relative size below which a segment counts as parallel to a triangle.
const PARALLEL_TOLERANCE: f32 = 1e-6;

/// A two-sided collision triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unnormalized normal `(a - c) x (a - b)`.
    fn cross(&self) -> Vec3 {
        (self.a - self.c).cross(self.a - self.b)
    }

    /// Unit normal, or `None` for a triangle with no area.
    pub fn normal(&self) -> Option<Vec3> {
        self.cross().try_normalize()
    }

    /// Unit normal on the side a particle moving along `displacement`
    /// approaches from.
    pub fn facing_normal(&self, displacement: Vec3) -> Option<Vec3> {
        let n = self.normal()?;
        Some(if displacement.dot(n) > 0.0 { -n } else { n })
    }

    /// Fraction `t` of the segment `origin -> origin + displacement` at which
    /// it passes through the triangle, for `0 < t < 1`.
    ///
    /// Returns `None` when the segment stays on one side of the plane, misses
    /// the triangle, runs (nearly) parallel to it, or the triangle is
    /// degenerate.
    pub fn intersect(&self, origin: Vec3, displacement: Vec3) -> Option<f32> {
        let cross = self.cross();
        let n = cross.try_normalize()?;

        let start = n.dot(origin - self.a);
        let end = n.dot(origin + displacement - self.a);
        if start * end > 0.0 {
            return None;
        }

        // Solve a + beta (b - a) + gamma (c - a) = origin + t d by Cramer's rule.
        let ab = self.a - self.b;
        let ac = self.a - self.c;
        let ao = self.a - origin;

        let det = Mat3::from_cols(ab, ac, displacement).determinant();
        if det.abs() <= PARALLEL_TOLERANCE * displacement.length() * cross.length() {
            return None;
        }

        let gamma = Mat3::from_cols(ab, ao, displacement).determinant() / det;
        if !(0.0..=1.0).contains(&gamma) {
            return None;
        }
        let beta = Mat3::from_cols(ao, ac, displacement).determinant() / det;
        if beta < 0.0 || beta > 1.0 - gamma {
            return None;
        }

        let t = Mat3::from_cols(ab, ac, ao).determinant() / det;
        (t > 0.0 && t < 1.0).then_some(t)
    }
}

/// Append-only list of collision triangles.
#[derive(Clone, Debug, Default)]
pub struct SurfaceRegistry {
    triangles: Vec<Triangle>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the transformed unit square as two triangles.
    pub fn add_plane(&mut self, transform: Mat4) {
        let corner = |x: f32, z: f32| transform.transform_point3(Vec3::new(x, 0.0, z));

        self.triangles.push(Triangle::new(
            corner(-1.0, -1.0),
            corner(1.0, 1.0),
            corner(1.0, -1.0),
        ));
        self.triangles.push(Triangle::new(
            corner(-1.0, -1.0),
            corner(-1.0, 1.0),
            corner(1.0, 1.0),
        ));
    }

    pub fn push(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Earliest crossing of the segment over all triangles, as
    /// `(triangle index, t)`. Ties keep the lowest index.
    pub fn first_hit(&self, origin: Vec3, displacement: Vec3) -> Option<(usize, f32)> {
        let mut hit = None;
        let mut min_t = 1.0;
        for (index, triangle) in self.triangles.iter().enumerate() {
            if let Some(t) = triangle.intersect(origin, displacement) {
                if t < min_t {
                    min_t = t;
                    hit = Some((index, t));
                }
            }
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor() -> SurfaceRegistry {
        let mut surfaces = SurfaceRegistry::new();
        surfaces.add_plane(Mat4::from_scale(Vec3::splat(2.0)));
        surfaces
    }

    #[test]
    fn test_add_plane_appends_two_triangles() {
        let mut surfaces = floor();
        assert_eq!(surfaces.len(), 2);

        surfaces.add_plane(Mat4::from_translation(Vec3::Y));
        assert_eq!(surfaces.len(), 4);

        // Every corner of the second plane sits at y = 1.
        for triangle in &surfaces.triangles()[2..] {
            for p in [triangle.a, triangle.b, triangle.c] {
                assert!((p.y - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_plane_covers_square() {
        let surfaces = floor();
        // Points on both sides of the diagonal hit exactly one triangle each.
        for (x, z) in [(1.5, -1.0), (-1.0, 1.5), (0.3, 0.1), (-1.9, -1.7)] {
            let hits = surfaces
                .triangles()
                .iter()
                .filter(|t| t.intersect(Vec3::new(x, 1.0, z), Vec3::new(0.0, -2.0, 0.0)).is_some())
                .count();
            assert_eq!(hits, 1, "({x}, {z})");
        }
    }

    #[test]
    fn test_segment_through_triangle() {
        let triangle = floor().triangles()[0];
        let t = triangle
            .intersect(Vec3::new(1.0, 0.5, -1.0), Vec3::new(0.0, -2.0, 0.0))
            .unwrap();
        assert!((t - 0.25).abs() < 1e-6);

        // Same crossing from below.
        let t = triangle
            .intersect(Vec3::new(1.0, -0.5, -1.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_hit_when_short_or_outside() {
        let triangle = floor().triangles()[0];

        // Stops above the plane.
        assert!(triangle.intersect(Vec3::new(1.0, 0.5, -1.0), Vec3::new(0.0, -0.4, 0.0)).is_none());
        // Crosses the plane outside the square.
        assert!(triangle.intersect(Vec3::new(5.0, 0.5, 0.0), Vec3::new(0.0, -1.0, 0.0)).is_none());
    }

    #[test]
    fn test_edge_on_segment_is_no_collision() {
        let triangle = floor().triangles()[0];

        // Lies in the plane of the triangle.
        assert_eq!(triangle.intersect(Vec3::new(1.0, 0.0, -1.0), Vec3::new(0.5, 0.0, 0.0)), None);
        // Zero displacement.
        assert_eq!(triangle.intersect(Vec3::new(1.0, 0.0, -1.0), Vec3::ZERO), None);
    }

    #[test]
    fn test_degenerate_triangle_is_ignored() {
        let sliver = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);

        assert_eq!(sliver.normal(), None);
        assert_eq!(sliver.intersect(Vec3::new(0.5, 1.0, 0.0), Vec3::new(0.0, -2.0, 0.0)), None);
    }

    #[test]
    fn test_facing_normal_opposes_motion() {
        let triangle = floor().triangles()[0];

        let down = Vec3::new(0.0, -1.0, 0.0);
        assert!(triangle.facing_normal(down).unwrap().dot(down) < 0.0);
        assert!(triangle.facing_normal(-down).unwrap().dot(-down) < 0.0);
    }

    #[test]
    fn test_first_hit_picks_earliest() {
        let mut surfaces = floor();
        surfaces.add_plane(Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)));

        let (index, t) = surfaces
            .first_hit(Vec3::new(0.3, 1.0, 0.1), Vec3::new(0.0, -2.0, 0.0))
            .unwrap();
        assert!(index >= 2);
        assert!((t - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_first_hit_tie_keeps_lowest_index() {
        let mut surfaces = floor();
        surfaces.add_plane(Mat4::from_scale(Vec3::splat(2.0)));

        // Triangles 0 and 2 are the same; the segment crosses both at t = 0.5.
        let origin = Vec3::new(0.3, 1.0, 0.1);
        let displacement = Vec3::new(0.0, -2.0, 0.0);
        assert_eq!(surfaces.triangles()[2].intersect(origin, displacement), Some(0.5));

        assert_eq!(surfaces.first_hit(origin, displacement), Some((0, 0.5)));
    }
}
