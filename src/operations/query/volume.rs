use crate::error::Result;
use crate::geometry::surface::Surface;
use crate::math::Point2;
use crate::tessellation::{TessellateFace, TessellationParams};
use crate::topology::{FaceId, ShapeId, ShapeKind, ShellId, TopologyStore};

/// Symmetric 7-point quadrature rule on a triangle, exact to degree 5:
/// barycentric coordinates and weights.
const TRIANGLE_RULE: [([f64; 3], f64); 7] = [
    ([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 0.225),
    ([0.059_715_871_789_770, 0.470_142_064_105_115, 0.470_142_064_105_115], 0.132_394_152_788_506),
    ([0.470_142_064_105_115, 0.059_715_871_789_770, 0.470_142_064_105_115], 0.132_394_152_788_506),
    ([0.470_142_064_105_115, 0.470_142_064_105_115, 0.059_715_871_789_770], 0.132_394_152_788_506),
    ([0.797_426_985_353_087, 0.101_286_507_323_456, 0.101_286_507_323_456], 0.125_939_180_544_827),
    ([0.101_286_507_323_456, 0.797_426_985_353_087, 0.101_286_507_323_456], 0.125_939_180_544_827),
    ([0.101_286_507_323_456, 0.101_286_507_323_456, 0.797_426_985_353_087], 0.125_939_180_544_827),
];

/// Computes the enclosed volume of a shape.
///
/// Uses the divergence theorem: `V = 1/3 * sum over faces of the integral
/// of P . n dA`. Each face is triangulated in parameter space and the
/// integrand `P . (dP/du x dP/dv)` is integrated exactly on the surface,
/// so only the polygonal approximation of the boundary limits accuracy.
///
/// Solids contribute their outer shell and (negative) voids; compounds sum
/// their solids. Lower-dimensional shapes have zero volume.
pub struct Volume {
    shape: ShapeId,
    params: TessellationParams,
}

impl Volume {
    /// Creates a new `Volume` query with default tessellation parameters.
    #[must_use]
    pub fn new(shape: impl Into<ShapeId>) -> Self {
        Self {
            shape: shape.into(),
            params: TessellationParams::default(),
        }
    }

    /// Sets custom tessellation parameters.
    #[must_use]
    pub fn with_params(mut self, params: TessellationParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the query, returning the signed volume.
    ///
    /// A negative result means the shells are oriented inward.
    ///
    /// # Errors
    ///
    /// Returns an error if a face cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<f64> {
        let mut volume = 0.0;
        for id in store.explore(self.shape, ShapeKind::Shell)? {
            if let ShapeId::Shell(shell) = id {
                volume += shell_signed_volume(store, shell, &self.params)?;
            }
        }
        Ok(volume)
    }
}

/// Signed volume enclosed by a shell; positive when its faces point outward.
///
/// # Errors
///
/// Returns an error if a face cannot be tessellated.
pub fn shell_signed_volume(
    store: &TopologyStore,
    shell: ShellId,
    params: &TessellationParams,
) -> Result<f64> {
    let mut volume = 0.0;
    for of in &store.shell(shell)?.faces {
        volume += face_volume_contribution(store, of.face, of.forward, params)?;
    }
    Ok(volume)
}

/// Contribution `1/3 * integral of P . n_out dA` of one oriented face.
///
/// # Errors
///
/// Returns an error if the face cannot be tessellated.
pub fn face_volume_contribution(
    store: &TopologyStore,
    face_id: FaceId,
    forward: bool,
    params: &TessellationParams,
) -> Result<f64> {
    let surface = &store.face(face_id)?.surface;
    let mesh = TessellateFace::new(face_id, *params)
        .with_orientation(forward)
        .execute(store)?;
    let mut total = 0.0;
    for tri in &mesh.indices {
        let a = mesh.uvs[tri[0] as usize];
        let b = mesh.uvs[tri[1] as usize];
        let c = mesh.uvs[tri[2] as usize];
        // The mesh winding already folds in the outward orientation.
        let signed_area = 0.5 * (b - a).perp(&(c - a));
        let mut mean = 0.0;
        for (bary, weight) in TRIANGLE_RULE {
            let uv = Point2::from(a.coords * bary[0] + b.coords * bary[1] + c.coords * bary[2]);
            let p = surface.evaluate(uv.x, uv.y)?;
            let (du, dv) = surface.partials(uv.x, uv.y)?;
            mean += weight * p.coords.dot(&du.cross(&dv));
        }
        total += signed_area * mean;
    }
    Ok(total / 3.0)
}
