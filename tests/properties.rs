//! Property tests of the boolean operations on randomly placed boxes.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use geobool::math::Point3;
use geobool::operations::boolean::{BooleanOp, BooleanOperation, BooleanOptions, BooleanOutput};
use geobool::operations::creation::MakeBox;
use geobool::operations::query::Volume;
use geobool::topology::{SolidId, TopologyStore};

const TOL: f64 = 1e-7;

/// Box corner and extents; extents stay clear of zero.
fn arb_box() -> impl Strategy<Value = ((f64, f64, f64), (f64, f64, f64))> {
    (
        (-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0),
        (0.3f64..2.0, 0.3f64..2.0, 0.3f64..2.0),
    )
}

fn make(store: &mut TopologyStore, ((x, y, z), (dx, dy, dz)): ((f64, f64, f64), (f64, f64, f64))) -> SolidId {
    MakeBox::new(Point3::new(x, y, z), Point3::new(x + dx, y + dy, z + dz))
        .execute(store)
        .unwrap()
}

fn run(store: &mut TopologyStore, op: BooleanOp, a: SolidId, b: SolidId, options: &BooleanOptions) -> BooleanOutput {
    BooleanOperation::new(op)
        .with_arguments(vec![a.into()])
        .with_tools(vec![b.into()])
        .with_options(options.clone())
        .execute(store)
        .unwrap()
}

fn volume(store: &TopologyStore, output: &BooleanOutput) -> f64 {
    output
        .shape
        .map_or(0.0, |s| Volume::new(s.id).execute(store).unwrap())
}

/// Exact volume of the overlap of two axis-aligned boxes.
fn overlap(
    ((ax, ay, az), (adx, ady, adz)): ((f64, f64, f64), (f64, f64, f64)),
    ((bx, by, bz), (bdx, bdy, bdz)): ((f64, f64, f64), (f64, f64, f64)),
) -> f64 {
    let span = |a0: f64, da: f64, b0: f64, db: f64| ((a0 + da).min(b0 + db) - a0.max(b0)).max(0.0);
    span(ax, adx, bx, bdx) * span(ay, ady, by, bdy) * span(az, adz, bz, bdz)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn volumes_follow_inclusion_exclusion(a in arb_box(), b in arb_box()) {
        let mut store = TopologyStore::new();
        let sa = make(&mut store, a);
        let sb = make(&mut store, b);
        let options = BooleanOptions::default();
        let va = (a.1).0 * (a.1).1 * (a.1).2;
        let vb = (b.1).0 * (b.1).1 * (b.1).2;
        let common = overlap(a, b);

        let i_out = run(&mut store, BooleanOp::Intersect, sa, sb, &options);
        let i = volume(&store, &i_out);
        let u_out = run(&mut store, BooleanOp::Union, sa, sb, &options);
        let u = volume(&store, &u_out);
        let c_out = run(&mut store, BooleanOp::Subtract, sa, sb, &options);
        let c = volume(&store, &c_out);
        prop_assert!((i - common).abs() < TOL, "intersection {} != {}", i, common);
        prop_assert!((u - (va + vb - common)).abs() < TOL, "union {} != {}", u, va + vb - common);
        prop_assert!((c - (va - common)).abs() < TOL, "cut {} != {}", c, va - common);
    }

    #[test]
    fn union_commutes(a in arb_box(), b in arb_box()) {
        let mut store = TopologyStore::new();
        let sa = make(&mut store, a);
        let sb = make(&mut store, b);
        let options = BooleanOptions::default();
        let ab_out = run(&mut store, BooleanOp::Union, sa, sb, &options);
        let ab = volume(&store, &ab_out);
        let ba_out = run(&mut store, BooleanOp::Union, sb, sa, &options);
        let ba = volume(&store, &ba_out);
        prop_assert!((ab - ba).abs() < TOL);
    }

    #[test]
    fn fuzzy_value_does_not_change_clear_results(a in arb_box(), b in arb_box(), fuzzy in 0.0f64..1e-6) {
        let mut store = TopologyStore::new();
        let sa = make(&mut store, a);
        let sb = make(&mut store, b);
        let exact_out = run(&mut store, BooleanOp::Intersect, sa, sb, &BooleanOptions::default());
        let exact = volume(&store, &exact_out);
        let fuzzy_options = BooleanOptions::default().with_fuzzy_value(fuzzy);
        let fuzzy_out = run(&mut store, BooleanOp::Intersect, sa, sb, &fuzzy_options);
        let fuzzy = volume(&store, &fuzzy_out);
        prop_assert!((exact - fuzzy).abs() < 1e-5);
    }
}
