use std::collections::HashMap;

use crate::error::Result;
use crate::geometry::curve::Curve;
use crate::math::Aabb;
use crate::tessellation::TessellationParams;
use crate::topology::{EdgeId, ShapeId, ShapeKind, ShellId, SolidId, TopologyStore};

use super::intersect::{intersect_curves, CurveCurveHit};
use super::volume::shell_signed_volume;

/// A consistency problem found in a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidityIssue {
    /// A shape refers to a sub-shape that is not in the store.
    DanglingReference {
        /// Kind of the missing sub-shape.
        kind: ShapeKind,
    },
    /// An edge of a closed shell is not shared by exactly two face sides.
    NonManifoldEdge {
        /// The offending edge.
        edge: EdgeId,
        /// Number of face sides using it.
        uses: usize,
    },
    /// An edge end lies further from its vertex than their tolerances allow.
    ToleranceNotCovered {
        /// The offending edge.
        edge: EdgeId,
        /// Gap between the curve end and the vertex point.
        gap: f64,
    },
    /// Two edges meet away from a shared vertex.
    SelfIntersection {
        /// First edge.
        a: EdgeId,
        /// Second edge.
        b: EdgeId,
    },
    /// A shell that should bound material is not closed.
    OpenShell {
        /// The offending shell.
        shell: ShellId,
    },
    /// A solid encloses negative volume.
    InvertedSolid {
        /// The offending solid.
        solid: SolidId,
    },
}

/// Validates the topological and geometric consistency of a shape.
pub struct IsValid {
    shape: ShapeId,
    check_orientation: bool,
    require_closed: bool,
}

impl IsValid {
    /// Creates a new `IsValid` query.
    #[must_use]
    pub fn new(shape: impl Into<ShapeId>) -> Self {
        Self {
            shape: shape.into(),
            check_orientation: false,
            require_closed: false,
        }
    }

    /// Also checks that every solid encloses positive volume.
    #[must_use]
    pub fn with_orientation_check(mut self, check: bool) -> Self {
        self.check_orientation = check;
        self
    }

    /// Also reports every shell that is not closed, for shapes that are
    /// expected to bound volumes.
    #[must_use]
    pub fn with_closed_shells(mut self, require: bool) -> Self {
        self.require_closed = require;
        self
    }

    /// Executes the validation, returning every issue found.
    ///
    /// An empty list means the shape is valid.
    ///
    /// # Errors
    ///
    /// Returns an error if geometry evaluation fails.
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<ValidityIssue>> {
        let mut issues = Vec::new();
        if !check_references(store, self.shape, &mut issues) {
            return Ok(issues);
        }
        for id in store.explore(self.shape, ShapeKind::Shell)? {
            if let ShapeId::Shell(s) = id {
                if self.require_closed && !store.shell(s)?.is_closed {
                    issues.push(ValidityIssue::OpenShell { shell: s });
                }
                check_manifold(store, s, &mut issues)?;
            }
        }
        let edges: Vec<EdgeId> = store
            .explore(self.shape, ShapeKind::Edge)?
            .into_iter()
            .filter_map(|id| match id {
                ShapeId::Edge(e) => Some(e),
                _ => None,
            })
            .collect();
        for &e in &edges {
            check_tolerance(store, e, &mut issues)?;
        }
        check_self_intersection(store, &edges, &mut issues)?;
        if self.check_orientation {
            for id in store.explore(self.shape, ShapeKind::Solid)? {
                if let ShapeId::Solid(s) = id {
                    let outer = store.solid(s)?.outer_shell;
                    if shell_signed_volume(store, outer, &TessellationParams::default())? < 0.0 {
                        issues.push(ValidityIssue::InvertedSolid { solid: s });
                    }
                }
            }
        }
        Ok(issues)
    }
}

/// Walks the shape graph; returns `false` if any reference is dangling.
fn check_references(store: &TopologyStore, root: ShapeId, issues: &mut Vec<ValidityIssue>) -> bool {
    let mut stack = vec![root];
    let mut ok = true;
    while let Some(id) = stack.pop() {
        if !store.contains(id) {
            issues.push(ValidityIssue::DanglingReference { kind: id.kind() });
            ok = false;
            continue;
        }
        if let Ok(children) = store.sub_shapes(id) {
            stack.extend(children);
        }
    }
    ok
}

fn check_manifold(store: &TopologyStore, shell: ShellId, issues: &mut Vec<ValidityIssue>) -> Result<()> {
    let data = store.shell(shell)?;
    if !data.is_closed {
        return Ok(());
    }
    let mut uses: HashMap<EdgeId, usize> = HashMap::new();
    for of in &data.faces {
        for wire in store.face(of.face)?.wires() {
            for oe in &store.wire(wire)?.edges {
                *uses.entry(oe.edge).or_default() += 1;
            }
        }
    }
    let mut bad: Vec<_> = uses
        .into_iter()
        .filter(|(e, n)| *n != 2 && !store.edge(*e).is_ok_and(crate::topology::EdgeData::is_degenerate))
        .collect();
    bad.sort_by_key(|(_, n)| *n);
    issues.extend(
        bad.into_iter()
            .map(|(edge, uses)| ValidityIssue::NonManifoldEdge { edge, uses }),
    );
    Ok(())
}

fn check_tolerance(store: &TopologyStore, e: EdgeId, issues: &mut Vec<ValidityIssue>) -> Result<()> {
    let edge = store.edge(e)?;
    for (vertex, t) in [(edge.start, edge.t_start), (edge.end, edge.t_end)] {
        let v = store.vertex(vertex)?;
        let gap = (edge.curve.evaluate(t)? - v.point).norm();
        if gap > v.tolerance + edge.tolerance {
            issues.push(ValidityIssue::ToleranceNotCovered { edge: e, gap });
        }
    }
    Ok(())
}

fn check_self_intersection(
    store: &TopologyStore,
    edges: &[EdgeId],
    issues: &mut Vec<ValidityIssue>,
) -> Result<()> {
    let boxes: Vec<Aabb> = edges
        .iter()
        .map(|&e| store.edge(e).map(|d| d.bounding_box().enlarged(d.tolerance)))
        .collect::<std::result::Result<_, _>>()?;
    for i in 0..edges.len() {
        for j in i + 1..edges.len() {
            if !boxes[i].overlaps(&boxes[j]) {
                continue;
            }
            let a = store.edge(edges[i])?;
            let b = store.edge(edges[j])?;
            if a.is_degenerate() || b.is_degenerate() {
                continue;
            }
            let tol = a.tolerance + b.tolerance;
            let hits = intersect_curves(&a.curve, a.range(), &b.curve, b.range(), tol)?;
            let shared: Vec<_> = [a.start, a.end]
                .into_iter()
                .filter(|v| *v == b.start || *v == b.end)
                .map(|v| store.vertex(v).map(|d| (d.point, d.tolerance)))
                .collect::<std::result::Result<_, _>>()?;
            let offending = hits.iter().any(|hit| match hit {
                CurveCurveHit::Overlap { .. } => true,
                CurveCurveHit::Point { point, .. } => !shared
                    .iter()
                    .any(|(p, vt)| (p - point).norm() <= vt + tol),
            });
            if offending {
                issues.push(ValidityIssue::SelfIntersection {
                    a: edges[i],
                    b: edges[j],
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeCompound, MakeEdge, MakeSphere};
    use crate::topology::{ShellData, SolidData};

    #[test]
    fn primitives_are_valid() {
        let mut store = TopologyStore::new();
        let b = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let s = MakeSphere::new(Point3::new(5.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        assert!(IsValid::new(b).with_orientation_check(true).execute(&store).unwrap().is_empty());
        assert!(IsValid::new(s).with_orientation_check(true).execute(&store).unwrap().is_empty());
    }

    #[test]
    fn crossing_edges_are_reported() {
        let mut store = TopologyStore::new();
        let a = MakeEdge::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeEdge::new(Point3::new(1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let c = MakeCompound::new(vec![a.into(), b.into()])
            .execute(&mut store)
            .unwrap();
        let issues = IsValid::new(c).execute(&store).unwrap();
        assert_eq!(issues, vec![ValidityIssue::SelfIntersection { a, b }]);
    }

    #[test]
    fn open_face_set_in_closed_shell_is_non_manifold() {
        let mut store = TopologyStore::new();
        let b = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(b).unwrap().outer_shell;
        let mut faces = store.shell(shell).unwrap().faces.clone();
        faces.pop();
        let broken = store.add_shell(ShellData {
            faces,
            is_closed: true,
        });
        let solid = store.add_solid(SolidData {
            outer_shell: broken,
            inner_shells: Vec::new(),
        });
        let issues = IsValid::new(solid).execute(&store).unwrap();
        assert_eq!(
            issues
                .iter()
                .filter(|i| matches!(i, ValidityIssue::NonManifoldEdge { uses: 1, .. }))
                .count(),
            4
        );
    }

    #[test]
    fn open_shell_is_reported_only_when_closure_is_required() {
        let mut store = TopologyStore::new();
        let b = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(b).unwrap().outer_shell;
        let mut faces = store.shell(shell).unwrap().faces.clone();
        faces.pop();
        let open = store.add_shell(ShellData {
            faces,
            is_closed: false,
        });
        assert!(IsValid::new(open).execute(&store).unwrap().is_empty());
        let issues = IsValid::new(open)
            .with_closed_shells(true)
            .execute(&store)
            .unwrap();
        assert_eq!(issues, vec![ValidityIssue::OpenShell { shell: open }]);
        assert!(IsValid::new(b)
            .with_closed_shells(true)
            .execute(&store)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn inverted_solid_is_reported() {
        let mut store = TopologyStore::new();
        let b = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(b).unwrap().outer_shell;
        let faces = store
            .shell(shell)
            .unwrap()
            .faces
            .iter()
            .map(|of| crate::topology::OrientedFace::new(of.face, !of.forward))
            .collect();
        let flipped = store.add_shell(ShellData {
            faces,
            is_closed: true,
        });
        let solid = store.add_solid(SolidData {
            outer_shell: flipped,
            inner_shells: Vec::new(),
        });
        let issues = IsValid::new(solid)
            .with_orientation_check(true)
            .execute(&store)
            .unwrap();
        assert_eq!(issues, vec![ValidityIssue::InvertedSolid { solid }]);
    }
}
