mod bounding_box;
mod curve_surface_intersect;
mod intersect;
mod is_valid;
mod point_in_face;
mod point_in_solid;
mod surface_intersect;
mod volume;

pub use bounding_box::{face_bounding_box, BoundingBox};
pub use curve_surface_intersect::{intersect_curve_surface, CurveSurfaceHit, CurveSurfaceIntersect};
pub use intersect::{intersect_curves, CurveCurveHit, CurveCurveIntersect};
pub use is_valid::{IsValid, ValidityIssue};
pub use point_in_face::{
    face_uv_loops, locate_uv, oriented_edge_pcurve, project_pcurve, sample_count, PointInFace,
};
pub use point_in_solid::{PointClassifier, PointInSolid, PointLocation};
pub use surface_intersect::{intersect_surfaces, SurfaceIntersection};
pub use volume::{face_volume_contribution, shell_signed_volume, Volume};
