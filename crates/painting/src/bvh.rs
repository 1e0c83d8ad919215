//! Bounding volume hierarchy over a static triangle set.
//!
//! Nodes live in one flat array in pre-order and reference their children by
//! index. Leaves reference a `(start, count)` range of a single permuted
//! triangle-index array. Construction splits at the midpoint of the widest
//! centroid axis, falling back to a median split when the midpoint leaves one
//! side empty.
//!
//! Queries walk the tree with a fixed-size explicit stack. Exhausting that
//! stack is reported as [`IndexQuery::Incomplete`], never as a miss, so the
//! caller can re-run the ray through [`raycast_triangles`](crate::raycast::raycast_triangles).

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::constants::{
    BOUNDS_PADDING, CENTROID_EPSILON, LEAF_TRIANGLE_LIMIT, MAX_TRAVERSAL_STACK,
};
use crate::raycast::{ray_aabb_entry, ray_triangle_intersection, triangle_vertices, Ray, SurfaceHit};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any included point replaces
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn padded(&self, padding: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(padding),
            max: self.max + Vec3::splat(padding),
        }
    }

    /// Entry distance of `ray` into this box, if it intersects
    pub fn ray_entry(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        ray_aabb_entry(ray, self.min, self.max)
    }
}

/// A node of the flattened hierarchy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    /// Range `start..start + count` of [`SpatialIndex::triangle_indices`]
    Leaf { bounds: Aabb, start: u32, count: u32 },
    /// Children by index into [`SpatialIndex::nodes`]
    Internal { bounds: Aabb, left: u32, right: u32 },
}

impl BvhNode {
    pub fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Internal { bounds, .. } => bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// Outcome of a [`SpatialIndex::query`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexQuery {
    /// Closest hit along the ray
    Hit(SurfaceHit),
    /// Traversal finished without hitting anything
    Miss,
    /// The traversal stack overflowed before the search finished
    Incomplete,
}

/// A triangle accepted into the index, with its number in the source mesh.
#[derive(Debug, Clone, Copy)]
struct IndexedTriangle {
    id: u32,
    vertices: [Vec3; 3],
}

impl IndexedTriangle {
    fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }
}

/// Triangle BVH built once per mesh version.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: Vec<BvhNode>,
    triangle_indices: Vec<u32>,
    triangles: Vec<IndexedTriangle>,
}

impl SpatialIndex {
    /// Build an index over a triangle list.
    ///
    /// Triangles referencing missing vertices or non-finite positions are
    /// left out. With no usable triangles the index is empty and every
    /// query misses.
    pub fn build(positions: &[Vec3], indices: &[u32]) -> Self {
        let source_count = indices.len() / 3;
        let mut triangles = Vec::with_capacity(source_count);

        for tri in 0..source_count {
            match triangle_vertices(positions, indices, tri) {
                Some(vertices) if vertices.iter().all(|v| v.is_finite()) => {
                    triangles.push(IndexedTriangle {
                        id: tri as u32,
                        vertices,
                    });
                }
                _ => {}
            }
        }

        let skipped = source_count - triangles.len();
        if skipped > 0 {
            warn!("SpatialIndex::build: skipped {} malformed triangles", skipped);
        }

        if triangles.is_empty() {
            debug!("SpatialIndex::build: no triangles, index is empty");
            return Self::default();
        }

        let centroids: Vec<Vec3> = triangles.iter().map(IndexedTriangle::centroid).collect();
        let mut builder = Builder {
            triangles: &triangles,
            centroids: &centroids,
            order: (0..triangles.len() as u32).collect(),
            nodes: Vec::with_capacity(2 * triangles.len() / LEAF_TRIANGLE_LIMIT + 1),
        };
        builder.build_range(0, triangles.len());

        let Builder { order, nodes, .. } = builder;
        let index = Self {
            nodes,
            triangle_indices: order,
            triangles,
        };

        info!(
            "SpatialIndex::build: {} triangles, {} nodes, depth {}",
            index.triangle_count(),
            index.node_count(),
            index.depth()
        );
        index
    }

    /// Find the closest hit along `ray`.
    pub fn query(&self, ray: &Ray) -> IndexQuery {
        self.query_with_stack_limit(ray, MAX_TRAVERSAL_STACK)
    }

    /// Query with a traversal stack smaller than the default cap.
    pub(crate) fn query_with_stack_limit(&self, ray: &Ray, limit: usize) -> IndexQuery {
        let limit = limit.clamp(1, MAX_TRAVERSAL_STACK);

        let Some(root) = self.nodes.first() else {
            return IndexQuery::Miss;
        };
        if !ray.is_finite() || root.bounds().ray_entry(ray).is_none() {
            return IndexQuery::Miss;
        }

        let mut stack = [0u32; MAX_TRAVERSAL_STACK];
        let mut len = 1;
        let mut best: Option<SurfaceHit> = None;
        let mut best_t = f32::INFINITY;

        while len > 0 {
            len -= 1;
            let node = &self.nodes[stack[len] as usize];

            // The best hit may have improved since this node was pushed
            match node.bounds().ray_entry(ray) {
                Some(entry) if entry <= best_t => {}
                _ => continue,
            }

            match *node {
                BvhNode::Leaf { start, count, .. } => {
                    let range = start as usize..(start + count) as usize;
                    for &slot in &self.triangle_indices[range] {
                        let triangle = &self.triangles[slot as usize];
                        let [v0, v1, v2] = triangle.vertices;
                        if let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) {
                            if hit.t < best_t {
                                best_t = hit.t;
                                best = Some(SurfaceHit {
                                    point: ray.at(hit.t),
                                    t: hit.t,
                                    triangle: triangle.id,
                                });
                            }
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let left_t = self.child_entry(left, ray, best_t);
                    let right_t = self.child_entry(right, ray, best_t);

                    match (left_t, right_t) {
                        (Some(lt), Some(rt)) => {
                            if len + 2 > limit {
                                debug!("SpatialIndex::query: traversal stack exhausted");
                                return IndexQuery::Incomplete;
                            }
                            // Nearer child on top so it is visited first
                            let (near, far) = if lt <= rt { (left, right) } else { (right, left) };
                            stack[len] = far;
                            stack[len + 1] = near;
                            len += 2;
                        }
                        (Some(_), None) | (None, Some(_)) => {
                            if len + 1 > limit {
                                debug!("SpatialIndex::query: traversal stack exhausted");
                                return IndexQuery::Incomplete;
                            }
                            stack[len] = if left_t.is_some() { left } else { right };
                            len += 1;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        best.map_or(IndexQuery::Miss, IndexQuery::Hit)
    }

    fn child_entry(&self, child: u32, ray: &Ray, best_t: f32) -> Option<f32> {
        self.nodes[child as usize]
            .bounds()
            .ray_entry(ray)
            .filter(|&entry| entry <= best_t)
    }

    /// Bounds of the whole index, `None` when empty
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|node| *node.bounds())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of triangles accepted into the index
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Permutation of `0..triangle_count()` referenced by leaf ranges
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    /// Longest root-to-leaf path, counted in nodes
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut deepest = 0;
        let mut pending = vec![(0u32, 1usize)];
        while let Some((index, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            if let BvhNode::Internal { left, right, .. } = self.nodes[index as usize] {
                pending.push((left, depth + 1));
                pending.push((right, depth + 1));
            }
        }
        deepest
    }
}

/// Scratch state for one recursive build.
struct Builder<'a> {
    triangles: &'a [IndexedTriangle],
    centroids: &'a [Vec3],
    order: Vec<u32>,
    nodes: Vec<BvhNode>,
}

impl Builder<'_> {
    /// Emit the subtree for `order[start..end]` and return its node index.
    fn build_range(&mut self, start: usize, end: usize) -> u32 {
        let mut bounds = Aabb::empty();
        let mut centroid_bounds = Aabb::empty();
        for &slot in &self.order[start..end] {
            for &vertex in &self.triangles[slot as usize].vertices {
                bounds.include_point(vertex);
            }
            centroid_bounds.include_point(self.centroids[slot as usize]);
        }
        let bounds = bounds.padded(BOUNDS_PADDING);

        let count = end - start;
        let extent = centroid_bounds.extent();
        let node_index = self.nodes.len() as u32;

        if count <= LEAF_TRIANGLE_LIMIT || extent.max_element() <= CENTROID_EPSILON {
            self.nodes.push(BvhNode::Leaf {
                bounds,
                start: start as u32,
                count: count as u32,
            });
            return node_index;
        }

        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        let split = (centroid_bounds.min[axis] + centroid_bounds.max[axis]) * 0.5;

        let mut mid = self.partition(start, end, axis, split);
        if mid == start || mid == end {
            // Midpoint left one side empty: split by count instead
            let half = count / 2;
            let centroids = self.centroids;
            self.order[start..end].select_nth_unstable_by(half, |a, b| {
                centroids[*a as usize][axis].total_cmp(&centroids[*b as usize][axis])
            });
            mid = start + half;
        }

        // Placeholder keeps pre-order; children are patched in below
        self.nodes.push(BvhNode::Internal {
            bounds,
            left: 0,
            right: 0,
        });
        let left = self.build_range(start, mid);
        let right = self.build_range(mid, end);
        self.nodes[node_index as usize] = BvhNode::Internal {
            bounds,
            left,
            right,
        };

        node_index
    }

    /// Two-pointer partition into `<= split` followed by `> split`.
    fn partition(&mut self, start: usize, end: usize, axis: usize, split: f32) -> usize {
        let mut i = start;
        let mut j = end;
        while i < j {
            if self.centroids[self.order[i] as usize][axis] <= split {
                i += 1;
            } else {
                j -= 1;
                self.order.swap(i, j);
            }
        }
        i
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::raycast::raycast_triangles;

    /// Unit cube centered at the origin: 8 vertices, 12 triangles
    pub(crate) fn unit_cube() -> (Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let indices = vec![
            4, 5, 6, 4, 6, 7, // +z
            1, 0, 3, 1, 3, 2, // -z
            5, 1, 2, 5, 2, 6, // +x
            0, 4, 7, 0, 7, 3, // -x
            7, 6, 2, 7, 2, 3, // +y
            0, 1, 5, 0, 5, 4, // -y
        ];
        (positions, indices)
    }

    /// Latitude/longitude sphere of radius 1
    pub(crate) fn uv_sphere(rings: usize, segments: usize) -> (Vec<Vec3>, Vec<u32>) {
        let mut positions = Vec::new();
        for r in 0..=rings {
            let theta = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let phi = std::f32::consts::TAU * s as f32 / segments as f32;
                positions.push(Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                ));
            }
        }

        let mut indices = Vec::new();
        let stride = (segments + 1) as u32;
        for r in 0..rings as u32 {
            for s in 0..segments as u32 {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        (positions, indices)
    }

    /// Small deterministic generator for test rays
    pub(crate) struct Lcg(u64);

    impl Lcg {
        pub(crate) fn new(seed: u64) -> Self {
            Self(seed)
        }

        /// Uniform value in [-1, 1)
        pub(crate) fn next_signed(&mut self) -> f32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        }

        pub(crate) fn next_vec3(&mut self) -> Vec3 {
            Vec3::new(self.next_signed(), self.next_signed(), self.next_signed())
        }
    }

    /// Two clusters of x-facing triangles far apart along x
    pub(crate) fn split_clusters() -> (Vec<Vec3>, Vec<u32>) {
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for cluster_x in [0.0f32, 10.0] {
            for k in 0..20 {
                let x = cluster_x + k as f32 * 0.05;
                let base = positions.len() as u32;
                positions.push(Vec3::new(x, 0.0, 0.0));
                positions.push(Vec3::new(x, 1.0, 0.0));
                positions.push(Vec3::new(x, 0.0, 1.0));
                indices.extend_from_slice(&[base, base + 1, base + 2]);
            }
        }
        (positions, indices)
    }

    #[test]
    fn test_empty_index_never_hits() {
        let index = SpatialIndex::build(&[], &[]);
        assert!(index.is_empty());
        assert_eq!(index.bounds(), None);

        let mut rng = Lcg::new(3);
        for _ in 0..32 {
            let ray = Ray::new(rng.next_vec3() * 5.0, rng.next_vec3());
            assert_eq!(index.query(&ray), IndexQuery::Miss);
        }

        // Positions without any complete triangle
        let index = SpatialIndex::build(&[Vec3::ZERO, Vec3::X], &[0, 1]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_unit_cube_hit_and_miss() {
        let (positions, indices) = unit_cube();
        let index = SpatialIndex::build(&positions, &indices);
        assert_eq!(index.triangle_count(), 12);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        match index.query(&ray) {
            IndexQuery::Hit(hit) => {
                assert!((hit.point.z - 0.5).abs() < 1e-6);
                assert!((hit.t - 4.5).abs() < 1e-6);
            }
            other => panic!("expected hit, got {:?}", other),
        }

        let ray = Ray::new(Vec3::new(10.0, 10.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(index.query(&ray), IndexQuery::Miss);
    }

    #[test]
    fn test_structure_invariants() {
        let (positions, indices) = uv_sphere(24, 48);
        let index = SpatialIndex::build(&positions, &indices);

        // Leaf ranges cover the permutation exactly once
        let mut sorted = index.triangle_indices().to_vec();
        sorted.sort_unstable();
        let expected: Vec<u32> = (0..index.triangle_count() as u32).collect();
        assert_eq!(sorted, expected);

        let mut covered = 0;
        for (i, node) in index.nodes().iter().enumerate() {
            match *node {
                BvhNode::Leaf { count, .. } => {
                    assert!(count as usize <= LEAF_TRIANGLE_LIMIT);
                    covered += count as usize;
                }
                BvhNode::Internal { left, right, .. } => {
                    // Pre-order: children come after their parent
                    assert!(left as usize > i);
                    assert!(right as usize > left as usize);
                }
            }
        }
        assert_eq!(covered, index.triangle_count());
        assert!(index.depth() < 32);
    }

    #[test]
    fn test_matches_brute_force() {
        let (positions, indices) = uv_sphere(24, 48);
        let index = SpatialIndex::build(&positions, &indices);
        let mut rng = Lcg::new(0x5eed);
        let mut hits = 0;

        for _ in 0..400 {
            let origin = rng.next_vec3().normalize_or(Vec3::Z) * 3.0;
            let target = rng.next_vec3() * 1.2;
            let ray = Ray::new(origin, target - origin);

            let brute = raycast_triangles(&ray, &positions, &indices);
            match (index.query(&ray), brute) {
                (IndexQuery::Hit(a), Some(b)) => {
                    assert!((a.t - b.t).abs() < 1e-5, "t mismatch: {} vs {}", a.t, b.t);
                    assert!((a.point - b.point).length() < 1e-4);
                    hits += 1;
                }
                (IndexQuery::Miss, None) => {}
                (outcome, brute) => panic!("bvh {:?} vs brute force {:?}", outcome, brute),
            }
        }

        assert!(hits > 100, "too few hits to be meaningful: {}", hits);
    }

    #[test]
    fn test_degenerate_centroids_make_a_leaf() {
        // Many identical triangles cannot be split
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let indices: Vec<u32> = (0..40).flat_map(|_| [0, 1, 2]).collect();
        let index = SpatialIndex::build(&positions, &indices);

        assert_eq!(index.node_count(), 1);
        assert!(index.nodes()[0].is_leaf());

        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(matches!(index.query(&ray), IndexQuery::Hit(_)));
    }

    #[test]
    fn test_stack_exhaustion_is_reported() {
        let (positions, indices) = split_clusters();
        let index = SpatialIndex::build(&positions, &indices);
        assert!(!index.nodes()[0].is_leaf());

        // Along x the ray crosses both clusters, so both children are candidates
        let ray = Ray::new(Vec3::new(20.0, 0.3, 0.3), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(index.query_with_stack_limit(&ray, 1), IndexQuery::Incomplete);

        match index.query(&ray) {
            IndexQuery::Hit(hit) => {
                assert!((hit.point.x - 10.95).abs() < 1e-4);
                assert!((hit.t - 9.05).abs() < 1e-4);
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_triangles_are_skipped() {
        let (mut positions, mut indices) = unit_cube();
        indices.extend_from_slice(&[0, 1, 99]);
        positions.push(Vec3::new(f32::NAN, 0.0, 0.0));
        indices.extend_from_slice(&[0, 1, 8]);

        let index = SpatialIndex::build(&positions, &indices);
        assert_eq!(index.triangle_count(), 12);
    }
}
