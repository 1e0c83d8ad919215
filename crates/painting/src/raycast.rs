//! Ray primitives for surface picking.
//!
//! This module provides ray-triangle intersection using the Moller-Trumbore
//! algorithm, a slab-method ray-box test, and the brute-force closest-hit scan
//! used as the reference (and fallback) for the BVH.

use glam::Vec3;

use crate::constants::{DETERMINANT_EPSILON, HIT_EPSILON, PARALLEL_EPSILON};

/// A ray with an origin and a direction.
///
/// The direction does not need to be normalized; hit distances `t` are in
/// units of the direction's length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Whether both vectors are free of NaN and infinity
    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.direction.is_finite()
    }
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Closest hit found by a scan over a triangle set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Hit position in the space the triangles are expressed in
    pub point: Vec3,
    /// Distance along the ray
    pub t: f32,
    /// Triangle number (index into the triangle list / 3)
    pub triangle: u32,
}

/// Moller-Trumbore ray-triangle intersection algorithm.
///
/// Returns the hit distance and barycentric coordinates if the ray intersects
/// the triangle in front of its origin (`t > HIT_EPSILON`).
pub fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in the plane of the triangle or misses it
    if det.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t <= HIT_EPSILON || !t.is_finite() {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Slab-method ray vs. axis-aligned box test.
///
/// Returns the entry distance (clamped to 0 when the origin is inside the
/// box), or `None` when the ray misses or the box lies entirely behind it.
pub fn ray_aabb_entry(ray: &Ray, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];

        if dir.abs() < PARALLEL_EPSILON {
            // Parallel to this slab: the origin must already be inside it
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let t1 = (min[axis] - origin) * inv;
        let t2 = (max[axis] - origin) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    if t_max < t_min || t_max < 0.0 {
        return None;
    }

    Some(t_min.max(0.0))
}

/// Vertex positions of triangle `tri`, or `None` if any index is out of range.
pub fn triangle_vertices(positions: &[Vec3], indices: &[u32], tri: usize) -> Option<[Vec3; 3]> {
    let base = tri * 3;
    let corner = |k: usize| -> Option<Vec3> {
        let index = *indices.get(base + k)? as usize;
        positions.get(index).copied()
    };
    Some([corner(0)?, corner(1)?, corner(2)?])
}

/// Cast a ray against every triangle and return the closest hit.
///
/// O(n) reference scan. Triangles with out-of-range indices are skipped; a
/// trailing partial triangle is ignored.
pub fn raycast_triangles(ray: &Ray, positions: &[Vec3], indices: &[u32]) -> Option<SurfaceHit> {
    let mut closest: Option<SurfaceHit> = None;

    for tri in 0..indices.len() / 3 {
        let Some([v0, v1, v2]) = triangle_vertices(positions, indices, tri) else {
            continue;
        };

        if let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) {
            let dominated = match &closest {
                Some(prev) => hit.t >= prev.t,
                None => false,
            };
            if !dominated {
                closest = Some(SurfaceHit {
                    point: ray.at(hit.t),
                    t: hit.t,
                    triangle: tri as u32,
                });
            }
        }
    }

    closest
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn unit_triangle() -> (Vec3, Vec3, Vec3) {
        (
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_ray_triangle_hit() {
        let (v0, v1, v2) = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -1.0));

        let hit = ray_triangle_intersection(&ray, v0, v1, v2).unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.25).abs() < EPSILON);
        assert!((hit.v - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_unnormalized_direction() {
        let (v0, v1, v2) = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, -4.0));

        let hit = ray_triangle_intersection(&ray, v0, v1, v2).unwrap();
        assert!((hit.t - 0.25).abs() < EPSILON);
        assert!((ray.at(hit.t).z).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_miss() {
        let (v0, v1, v2) = unit_triangle();
        let ray = Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_triangle_intersection(&ray, v0, v1, v2).is_none());
    }

    #[test]
    fn test_ray_triangle_behind() {
        let (v0, v1, v2) = unit_triangle();
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_triangle_intersection(&ray, v0, v1, v2).is_none());
    }

    #[test]
    fn test_ray_triangle_parallel() {
        let (v0, v1, v2) = unit_triangle();
        let ray = Ray::new(Vec3::new(-1.0, 0.25, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(ray_triangle_intersection(&ray, v0, v1, v2).is_none());
    }

    #[test]
    fn test_ray_aabb_entry() {
        let min = Vec3::splat(-1.0);
        let max = Vec3::splat(1.0);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let entry = ray_aabb_entry(&ray, min, max).unwrap();
        assert!((entry - 4.0).abs() < EPSILON);

        // Origin inside the box enters at 0
        let inside = Ray::new(Vec3::ZERO, Vec3::new(0.3, 0.2, 0.1));
        assert_eq!(ray_aabb_entry(&inside, min, max), Some(0.0));

        // Parallel ray outside the x slab
        let parallel = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_aabb_entry(&parallel, min, max).is_none());

        // Box behind the ray
        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_aabb_entry(&away, min, max).is_none());
    }

    #[test]
    fn test_raycast_triangles_closest() {
        // Two stacked triangles, the nearer one at z = 1
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let indices = vec![0, 1, 2, 3, 4, 5];
        let ray = Ray::new(Vec3::new(0.2, 0.2, 3.0), Vec3::new(0.0, 0.0, -1.0));

        let hit = raycast_triangles(&ray, &positions, &indices).unwrap();
        assert_eq!(hit.triangle, 1);
        assert!((hit.t - 2.0).abs() < EPSILON);
        assert!((hit.point.z - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_raycast_triangles_skips_malformed() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        // Out-of-range index and a trailing partial triangle
        let indices = vec![0, 1, 9, 0, 1, 2, 0];
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));

        let hit = raycast_triangles(&ray, &positions, &indices).unwrap();
        assert_eq!(hit.triangle, 1);
    }
}
