//! Screen-to-surface picking.
//!
//! A screen point is un-projected through the orthographic [`CameraBasis`]
//! into a world ray, the ray is tested against every candidate mesh in that
//! mesh's local frame, and the nearest hit is resolved to a UV location. When
//! nothing is hit the caller may ask for an analytic projection onto the
//! object's face plane instead, so strokes keep flowing over gaps in the mesh.

use glam::{Vec2, Vec3};
use tracing::{debug, warn};

use crate::bvh::{Aabb, IndexQuery, SpatialIndex};
use crate::camera::CameraBasis;
use crate::constants::{GRAZING_EPSILON, MAX_TRAVERSAL_STACK, RAY_ORIGIN_RADIUS_FACTOR};
use crate::raycast::{raycast_triangles, Ray, SurfaceHit};

/// Rotation of an object about the world up axis, as a cosine/sine pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRotation {
    pub cos: f32,
    pub sin: f32,
}

impl Default for ObjectRotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ObjectRotation {
    pub const IDENTITY: Self = Self { cos: 1.0, sin: 0.0 };

    pub fn from_angle(radians: f32) -> Self {
        if radians.is_finite() {
            let (sin, cos) = radians.sin_cos();
            Self { cos, sin }
        } else {
            Self::IDENTITY
        }
    }

    /// Build from a cosine/sine pair, normalizing it; degenerate pairs become identity
    pub fn new(cos: f32, sin: f32) -> Self {
        let length = (cos * cos + sin * sin).sqrt();
        if length.is_finite() && length > f32::EPSILON {
            Self {
                cos: cos / length,
                sin: sin / length,
            }
        } else {
            Self::IDENTITY
        }
    }

    /// Local to world
    pub fn apply(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.cos * v.x + self.sin * v.z,
            v.y,
            -self.sin * v.x + self.cos * v.z,
        )
    }

    /// World to local
    pub fn inverse_apply(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.cos * v.x - self.sin * v.z,
            v.y,
            self.sin * v.x + self.cos * v.z,
        )
    }

    /// Express a world ray in the object's local frame. Distances are preserved.
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        Ray::new(self.inverse_apply(ray.origin), self.inverse_apply(ray.direction))
    }
}

/// Independent mirroring of the resolved UV axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UvFlip {
    pub u: bool,
    pub v: bool,
}

/// One pickable sub-mesh (e.g. the knob body or an attachment)
#[derive(Debug, Clone, Copy)]
pub struct PickCandidate<'a> {
    pub object_id: u32,
    pub index: &'a SpatialIndex,
    pub rotation: ObjectRotation,
    /// Local-space positions the index was built from
    pub positions: &'a [Vec3],
    pub indices: &'a [u32],
    /// Local-space bounds used to reject rays before querying the index
    pub bounds: Option<Aabb>,
}

impl<'a> PickCandidate<'a> {
    pub fn new(
        object_id: u32,
        index: &'a SpatialIndex,
        positions: &'a [Vec3],
        indices: &'a [u32],
    ) -> Self {
        Self {
            object_id,
            index,
            rotation: ObjectRotation::IDENTITY,
            positions,
            indices,
            bounds: index.bounds(),
        }
    }

    pub fn with_rotation(mut self, rotation: ObjectRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Override the reject bounds with the mesh's own bounds
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Result of picking against all candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickResult {
    Hit {
        /// Hit position in the hit object's local frame
        local_point: Vec3,
        object_id: u32,
        /// Distance along the world ray
        t: f32,
    },
    Miss,
}

/// Where a sampled surface coordinate came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleSource {
    /// A triangle was hit
    MeshHit,
    /// Analytic projection onto the face plane
    Fallback,
    /// Nothing usable under the pointer
    #[default]
    Idle,
}

/// A resolved surface sample, tagged with its source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceSample {
    MeshHit { uv: Vec2, object_id: u32 },
    Fallback { uv: Vec2 },
    Idle,
}

impl SurfaceSample {
    pub fn source(&self) -> SampleSource {
        match self {
            SurfaceSample::MeshHit { .. } => SampleSource::MeshHit,
            SurfaceSample::Fallback { .. } => SampleSource::Fallback,
            SurfaceSample::Idle => SampleSource::Idle,
        }
    }

    pub fn uv(&self) -> Option<Vec2> {
        match *self {
            SurfaceSample::MeshHit { uv, .. } | SurfaceSample::Fallback { uv } => Some(uv),
            SurfaceSample::Idle => None,
        }
    }
}

/// Un-project a screen point into a world ray looking along the camera's forward axis.
///
/// The origin is pulled back `6 * reference_radius` behind the scene center so
/// every candidate mesh lies in front of it.
pub fn build_ray(screen: Vec2, camera: &CameraBasis, reference_radius: f32) -> Ray {
    let on_center_plane = camera.screen_to_world(screen);
    let pull_back = RAY_ORIGIN_RADIUS_FACTOR * reference_radius.abs();
    Ray::new(on_center_plane - camera.forward * pull_back, camera.forward)
}

/// Pick the nearest hit among `candidates`.
pub fn pick(ray: &Ray, candidates: &[PickCandidate<'_>]) -> PickResult {
    let mut best = PickResult::Miss;
    let mut best_t = f32::INFINITY;

    for candidate in candidates {
        let local_ray = candidate.rotation.ray_to_local(ray);

        let reachable = candidate
            .bounds
            .and_then(|bounds| bounds.ray_entry(&local_ray))
            .is_some();
        if !reachable {
            continue;
        }

        if let Some(hit) = query_candidate(&local_ray, candidate, MAX_TRAVERSAL_STACK) {
            if hit.t < best_t {
                best_t = hit.t;
                best = PickResult::Hit {
                    local_point: hit.point,
                    object_id: candidate.object_id,
                    t: hit.t,
                };
            }
        }
    }

    best
}

/// Query one candidate, re-checking with a brute-force scan if traversal was cut short.
fn query_candidate(
    local_ray: &Ray,
    candidate: &PickCandidate<'_>,
    stack_limit: usize,
) -> Option<SurfaceHit> {
    match candidate.index.query_with_stack_limit(local_ray, stack_limit) {
        IndexQuery::Hit(hit) => Some(hit),
        IndexQuery::Miss => None,
        IndexQuery::Incomplete => {
            warn!(
                "pick: BVH traversal incomplete for object {}, scanning {} triangles",
                candidate.object_id,
                candidate.indices.len() / 3
            );
            raycast_triangles(local_ray, candidate.positions, candidate.indices)
        }
    }
}

/// Map a local-space point to UV space.
///
/// `(x, y)` in `[-r, r]` maps to `[0, 1]`, then each axis is optionally mirrored.
pub fn resolve_uv(local_point: Vec3, reference_radius: f32, flip: UvFlip) -> Vec2 {
    let diameter = 2.0 * reference_radius;
    let mut uv = Vec2::new(
        local_point.x / diameter + 0.5,
        local_point.y / diameter + 0.5,
    );
    if flip.u {
        uv.x = 1.0 - uv.x;
    }
    if flip.v {
        uv.y = 1.0 - uv.y;
    }
    uv
}

/// Analytic projection of a screen point onto the object's local `z = 0` face plane.
///
/// Returns the local point, or `None` when the view is edge-on to the plane.
pub fn planar_fallback(
    screen: Vec2,
    camera: &CameraBasis,
    rotation: ObjectRotation,
    reference_radius: f32,
) -> Option<Vec3> {
    let local_ray = rotation.ray_to_local(&build_ray(screen, camera, reference_radius));

    let direction = local_ray.direction;
    if direction.z.abs() < GRAZING_EPSILON * direction.length() {
        return None;
    }

    let t = -local_ray.origin.z / direction.z;
    let point = local_ray.at(t);
    point.is_finite().then_some(point)
}

/// Everything needed to turn a screen point into a surface sample
#[derive(Debug, Clone, Copy)]
pub struct PickContext<'a> {
    pub camera: CameraBasis,
    pub candidates: &'a [PickCandidate<'a>],
    pub reference_radius: f32,
    pub uv_flip: UvFlip,
    /// Rotation of the object the planar fallback projects onto
    pub fallback_rotation: ObjectRotation,
}

impl<'a> PickContext<'a> {
    pub fn new(
        camera: CameraBasis,
        candidates: &'a [PickCandidate<'a>],
        reference_radius: f32,
    ) -> Self {
        Self {
            camera,
            candidates,
            reference_radius,
            uv_flip: UvFlip::default(),
            fallback_rotation: candidates
                .first()
                .map(|c| c.rotation)
                .unwrap_or_default(),
        }
    }

    pub fn with_uv_flip(mut self, flip: UvFlip) -> Self {
        self.uv_flip = flip;
        self
    }

    /// Whether the camera and radius can produce meaningful rays
    pub fn is_valid(&self) -> bool {
        self.camera.is_valid() && self.reference_radius.is_finite() && self.reference_radius > 0.0
    }

    /// Resolve the surface under `screen`.
    pub fn sample(&self, screen: Vec2, allow_fallback: bool) -> SurfaceSample {
        if !self.is_valid() || !screen.is_finite() {
            debug!("PickContext::sample: invalid camera, radius, or screen point");
            return SurfaceSample::Idle;
        }

        let ray = build_ray(screen, &self.camera, self.reference_radius);
        match pick(&ray, self.candidates) {
            PickResult::Hit {
                local_point,
                object_id,
                ..
            } => SurfaceSample::MeshHit {
                uv: resolve_uv(local_point, self.reference_radius, self.uv_flip),
                object_id,
            },
            PickResult::Miss if allow_fallback => {
                let point = planar_fallback(
                    screen,
                    &self.camera,
                    self.fallback_rotation,
                    self.reference_radius,
                );
                match point {
                    Some(point) => SurfaceSample::Fallback {
                        uv: resolve_uv(point, self.reference_radius, self.uv_flip),
                    },
                    None => SurfaceSample::Idle,
                }
            }
            PickResult::Miss => SurfaceSample::Idle,
        }
    }
}
