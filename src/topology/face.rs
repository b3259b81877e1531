use crate::error::Result;
use crate::geometry::surface::{Plane, Sphere, Surface, SurfaceDomain};
use crate::math::{Point3, Vector3, CONFUSION};

use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar surface.
    Plane(Plane),
    /// A spherical surface.
    Sphere(Sphere),
}

impl FaceSurface {
    /// Returns `true` if both surfaces hold the same point set.
    #[must_use]
    pub fn coincides_with(&self, other: &FaceSurface, tol: f64) -> bool {
        match (self, other) {
            (Self::Plane(a), Self::Plane(b)) => a.coincides_with(b, tol),
            (Self::Sphere(a), Self::Sphere(b)) => a.coincides_with(b, tol),
            _ => false,
        }
    }
}

impl Surface for FaceSurface {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        match self {
            Self::Plane(s) => s.evaluate(u, v),
            Self::Sphere(s) => s.evaluate(u, v),
        }
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        match self {
            Self::Plane(s) => s.normal(u, v),
            Self::Sphere(s) => s.normal(u, v),
        }
    }

    fn partials(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        match self {
            Self::Plane(s) => s.partials(u, v),
            Self::Sphere(s) => s.partials(u, v),
        }
    }

    fn domain(&self) -> SurfaceDomain {
        match self {
            Self::Plane(s) => s.domain(),
            Self::Sphere(s) => s.domain(),
        }
    }

    fn project(&self, point: &Point3) -> Result<(f64, f64)> {
        match self {
            Self::Plane(s) => s.project(point),
            Self::Sphere(s) => s.project(point),
        }
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        match self {
            Self::Plane(s) => s.signed_distance(point),
            Self::Sphere(s) => s.signed_distance(point),
        }
    }

    fn u_period(&self) -> Option<f64> {
        match self {
            Self::Plane(s) => s.u_period(),
            Self::Sphere(s) => s.u_period(),
        }
    }

    fn metric_scale(&self) -> f64 {
        match self {
            Self::Plane(s) => s.metric_scale(),
            Self::Sphere(s) => s.metric_scale(),
        }
    }
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface, defined by an outer wire
/// and optionally inner wires (holes). Wires run counter-clockwise (outer)
/// and clockwise (holes) in the `(u, v)` space of the surface.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes).
    pub inner_wires: Vec<WireId>,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
    /// Distance within which points count as lying on the face.
    pub tolerance: f64,
}

impl FaceData {
    /// Creates a face with the default tolerance.
    #[must_use]
    pub fn new(
        surface: FaceSurface,
        outer_wire: WireId,
        inner_wires: Vec<WireId>,
        same_sense: bool,
    ) -> Self {
        Self {
            surface,
            outer_wire,
            inner_wires,
            same_sense,
            tolerance: CONFUSION,
        }
    }

    /// All boundary wires, the outer one first.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied())
    }
}
