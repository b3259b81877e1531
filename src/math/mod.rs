pub mod aabb;
pub mod polygon_2d;

pub use aabb::Aabb;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Default tolerance of vertices, edges and faces built by the kernel.
///
/// This is the radius of positional uncertainty a freshly constructed
/// entity carries; boolean operations may enlarge it on new entities.
pub const CONFUSION: f64 = 1e-7;

/// Returns a unit vector perpendicular to `v`.
///
/// `v` must be a unit vector.
#[must_use]
pub fn any_perpendicular(v: &Vector3) -> Vector3 {
    let reference = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&reference).normalize()
}

/// Maps `t` into the periodic window `[start, start + period)`.
#[must_use]
pub fn wrap_parameter(t: f64, start: f64, period: f64) -> f64 {
    let shifted = (t - start).rem_euclid(period);
    start + shifted
}
