use crate::math::Point2;

/// The image of an edge in the parameter space of a face.
///
/// Stored as `(t, uv)` samples ordered by increasing edge parameter `t`,
/// so a pcurve always follows the natural direction of its edge. Values
/// between samples are interpolated linearly.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcurve {
    samples: Vec<(f64, Point2)>,
}

impl Pcurve {
    /// Creates a pcurve from samples. Samples are sorted by parameter.
    #[must_use]
    pub fn new(mut samples: Vec<(f64, Point2)>) -> Self {
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { samples }
    }

    /// A straight segment in parameter space between `t0` and `t1`.
    #[must_use]
    pub fn segment(t0: f64, uv0: Point2, t1: f64, uv1: Point2) -> Self {
        Self::new(vec![(t0, uv0), (t1, uv1)])
    }

    /// Returns the raw samples.
    #[must_use]
    pub fn samples(&self) -> &[(f64, Point2)] {
        &self.samples
    }

    /// Parameter range covered by the samples.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.0, self.samples.last()?.0))
    }

    /// Evaluates the pcurve at edge parameter `t`, clamping outside the range.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Option<Point2> {
        let first = self.samples.first()?;
        if t <= first.0 {
            return Some(first.1);
        }
        for pair in self.samples.windows(2) {
            let ((t0, a), (t1, b)) = (pair[0], pair[1]);
            if t <= t1 {
                let span = t1 - t0;
                if span <= f64::EPSILON {
                    return Some(b);
                }
                let s = (t - t0) / span;
                return Some(a + (b - a) * s);
            }
        }
        self.samples.last().map(|s| s.1)
    }

    /// Returns the part of the pcurve between `t0` and `t1`.
    #[must_use]
    pub fn restricted(&self, t0: f64, t1: f64) -> Option<Self> {
        let start = self.evaluate(t0)?;
        let end = self.evaluate(t1)?;
        let mut samples = vec![(t0, start)];
        samples.extend(
            self.samples
                .iter()
                .filter(|(t, _)| *t > t0 && *t < t1)
                .copied(),
        );
        samples.push((t1, end));
        Some(Self { samples })
    }

    /// Returns the sample points in traversal order.
    #[must_use]
    pub fn points(&self, forward: bool) -> Vec<Point2> {
        let mut pts: Vec<Point2> = self.samples.iter().map(|s| s.1).collect();
        if !forward {
            pts.reverse();
        }
        pts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_interpolates() {
        let pc = Pcurve::segment(0.0, Point2::new(0.0, 0.0), 2.0, Point2::new(4.0, 2.0));
        let p = pc.evaluate(0.5).unwrap_or_else(Point2::origin);
        assert!((p - Point2::new(1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn restricted_keeps_inner_samples() {
        let pc = Pcurve::new(vec![
            (0.0, Point2::new(0.0, 0.0)),
            (1.0, Point2::new(1.0, 1.0)),
            (2.0, Point2::new(2.0, 0.0)),
        ]);
        let sub = pc.restricted(0.5, 1.5).unwrap_or_else(|| pc.clone());
        assert_eq!(sub.samples().len(), 3);
        assert_eq!(sub.range(), Some((0.5, 1.5)));
    }

    #[test]
    fn reversed_points() {
        let pc = Pcurve::segment(0.0, Point2::new(0.0, 0.0), 1.0, Point2::new(1.0, 0.0));
        let pts = pc.points(false);
        assert!((pts[0].x - 1.0).abs() < 1e-12);
    }
}
