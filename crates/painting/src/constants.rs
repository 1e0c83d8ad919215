/// Maximum triangles stored in a BVH leaf.
pub const LEAF_TRIANGLE_LIMIT: usize = 12;

/// Fixed depth of the explicit BVH traversal stack.
pub const MAX_TRAVERSAL_STACK: usize = 128;

/// Centroid extent at or below which a range can no longer be split.
pub const CENTROID_EPSILON: f32 = 1e-6;

/// Padding added to every node AABB so hits on box faces are not lost to rounding.
pub const BOUNDS_PADDING: f32 = 1e-5;

/// Determinant magnitude below which a ray is treated as parallel to a triangle.
pub const DETERMINANT_EPSILON: f32 = 1e-7;

/// Minimum accepted hit distance along a ray.
pub const HIT_EPSILON: f32 = 1e-5;

/// Direction component magnitude treated as zero by the slab test.
pub const PARALLEL_EPSILON: f32 = 1e-8;

/// Maximum resample steps per pointer segment.
pub const MAX_RESAMPLE_STEPS: usize = 96;

/// Ray origins sit this many reference radii behind the scene center.
pub const RAY_ORIGIN_RADIUS_FACTOR: f32 = 6.0;

/// Smallest UV radius a stamp may carry.
pub const MIN_UV_RADIUS: f32 = 1e-5;

/// Minimum |cos| between the view ray and the face normal for a planar fallback.
pub const GRAZING_EPSILON: f32 = 1e-3;
