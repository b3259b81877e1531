use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

use spade::handles::FixedFaceHandle;
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{Result, TessellationError};
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::{locate_in_loops, PolygonLocation};
use crate::math::Point2;
use crate::operations::query::face_uv_loops;
use crate::topology::{FaceId, FaceSurface, TopologyStore};

use super::{TessellationParams, TriangleMesh};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Tessellates a trimmed face into a triangle mesh.
///
/// The face boundary is triangulated in parameter space with a constrained
/// Delaunay triangulation. Curved faces get additional interior points on a
/// regular parameter grid so that the triangles follow the surface.
pub struct TessellateFace {
    face: FaceId,
    forward: bool,
    params: TessellationParams,
}

impl TessellateFace {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: FaceId, params: TessellationParams) -> Self {
        Self {
            face,
            forward: true,
            params,
        }
    }

    /// Sets the orientation the face has in its shell.
    #[must_use]
    pub fn with_orientation(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Executes the tessellation, returning a triangle mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the face cannot be read or triangulated.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        let face = store.face(self.face)?;
        let outward = face.same_sense == self.forward;
        let loops: Vec<Vec<Point2>> = face_uv_loops(store, self.face)?
            .into_iter()
            .filter(|l| l.len() >= 3)
            .collect();

        let loops = match &face.surface {
            FaceSurface::Sphere(sphere) => {
                #[allow(clippy::cast_precision_loss)]
                let step = PI / adaptive_angular_segments(sphere.radius(), PI, &self.params) as f64;
                loops.iter().map(|l| densify(l, step)).collect()
            }
            FaceSurface::Plane(_) => loops,
        };

        let mut cdt = Cdt::new();
        for l in &loops {
            insert_constraint_loop(&mut cdt, l)?;
        }
        if let FaceSurface::Sphere(sphere) = &face.surface {
            insert_grid_points(&mut cdt, &loops, sphere.radius(), &self.params)?;
        }

        let interior_faces = classify_interior_faces(&cdt);
        let mut mesh = TriangleMesh::default();
        let mut vertex_map: HashMap<usize, u32> = HashMap::new();

        for face_handle in cdt.inner_faces() {
            if !interior_faces.contains(&face_handle.fix().index()) {
                continue;
            }
            let verts = face_handle.vertices();
            let mut tri = [0u32; 3];
            let mut uv = [Point2::origin(); 3];
            for (i, vh) in verts.iter().enumerate() {
                let pos = vh.position();
                uv[i] = Point2::new(pos.x, pos.y);
                let idx = vh.fix().index();
                tri[i] = if let Some(&existing) = vertex_map.get(&idx) {
                    existing
                } else {
                    let new_idx = mesh.vertices.len() as u32;
                    let n = face.surface.normal(pos.x, pos.y)?;
                    mesh.vertices.push(face.surface.evaluate(pos.x, pos.y)?);
                    mesh.normals.push(if outward { n } else { -n });
                    mesh.uvs.push(uv[i]);
                    vertex_map.insert(idx, new_idx);
                    new_idx
                };
            }
            let ccw = (uv[1] - uv[0]).perp(&(uv[2] - uv[0])) > 0.0;
            if ccw != outward {
                tri.swap(1, 2);
            }
            mesh.indices.push(tri);
        }

        Ok(mesh)
    }
}

/// Computes the number of segments for an angular parameter range based on chord error.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn adaptive_angular_segments(radius: f64, sweep: f64, params: &TessellationParams) -> usize {
    if radius > params.tolerance {
        let half_angle = (1.0 - params.tolerance / radius).acos();
        let computed = (sweep / (2.0 * half_angle)).ceil() as usize;
        computed.clamp(params.min_segments, params.max_segments)
    } else {
        params.min_segments
    }
}

/// Splits every segment of a closed loop into pieces no longer than `step`.
///
/// Seam and pole edges span a whole parameter range in one segment; left
/// alone they produce triangles that cut through the surface.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn densify(points: &[Point2], step: f64) -> Vec<Point2> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        let pieces = ((b - a).norm() / step).ceil().max(1.0) as usize;
        for k in 0..pieces {
            out.push(a + (b - a) * (k as f64 / pieces as f64));
        }
    }
    out
}

/// Inserts grid points lying well inside the loops.
fn insert_grid_points(
    cdt: &mut Cdt,
    loops: &[Vec<Point2>],
    radius: f64,
    params: &TessellationParams,
) -> Result<()> {
    let (mut lo, mut hi) = (
        Point2::new(f64::INFINITY, f64::INFINITY),
        Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    );
    for p in loops.iter().flatten() {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }
    if lo.x >= hi.x || lo.y >= hi.y {
        return Ok(());
    }
    let n_u = adaptive_angular_segments(radius, hi.x - lo.x, params);
    let n_v = adaptive_angular_segments(radius, hi.y - lo.y, params);
    #[allow(clippy::cast_precision_loss)]
    let (du, dv) = ((hi.x - lo.x) / n_u as f64, (hi.y - lo.y) / n_v as f64);
    let clearance = 0.25 * du.min(dv);
    for i in 1..n_u {
        for j in 1..n_v {
            #[allow(clippy::cast_precision_loss)]
            let p = Point2::new(lo.x + du * i as f64, lo.y + dv * j as f64);
            if locate_in_loops(&p, loops, clearance) == PolygonLocation::Inside {
                cdt.insert(SpadePoint2::new(p.x, p.y)).map_err(|e: InsertionError| {
                    TessellationError::Failed(format!("CDT insert: {e}"))
                })?;
            }
        }
    }
    Ok(())
}

/// Inserts a closed polygon as constraint edges into the CDT.
///
/// Segments that would cross an existing constraint are skipped; such
/// crossings only come from polyline approximations of touching curves.
fn insert_constraint_loop(cdt: &mut Cdt, points: &[Point2]) -> Result<()> {
    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to && cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the polygon using flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each time
/// a constraint edge is crossed, depth increments. Odd depth = interior.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<spade::handles::InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            if let Some(inner) = edge.rev().face().as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let n_idx = neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((neighbor.fix(), new_depth));
            }
        }
    }

    interior
}
