//! Console probe for the inset sweep and the bevel operation.
//!
//! Runs the engine over a few canned areas, then bevels a one-face model,
//! and prints what each run produced.
//!
//! ```text
//! cargo run --example inset_debug              # all scenes
//! cargo run --example inset_debug -- chevron   # a single scene
//! RUST_LOG=bevelis=debug cargo run --example inset_debug
//! ```

use std::f64::consts::FRAC_PI_6;

use bevelis::math::Point3;
use bevelis::model::{Model, Points, PolyArea};
use bevelis::operations::{BevelOptions, BevelSelection, OffsetEngine, OffsetResult};
use bevelis::Result;

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("bevelis=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let scene = std::env::args().nth(1);
    let want = |name: &str| scene.as_deref().is_none_or(|s| s == name);

    if want("square") {
        let area = area_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], &[]);
        let result = OffsetEngine::new(area, FRAC_PI_6, 0.25)?.execute()?;
        dump("square, depth 0.25, pitch 30 deg", &result);
    }

    if want("annulus") {
        let area = area_from(
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            &[&[(0.3, 0.3), (0.3, 0.7), (0.7, 0.7), (0.7, 0.3)]],
        );
        let engine = OffsetEngine::new(area, 0.0, 0.1)?;
        println!("annulus collapses at depth {:.4}", engine.collapse_time()?);
        let result = engine.execute()?;
        dump("annulus, depth 0.1", &result);
    }

    if want("chevron") {
        let area = area_from(
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (2.0, 1.0), (0.0, 3.0)],
            &[],
        );
        let result = OffsetEngine::new(area, 0.0, 0.8)?.execute()?;
        dump("chevron, depth 0.8", &result);
    }

    if want("bevel") {
        let mut model = Model::new();
        let face = vec![
            model.points.add(p(0.0, 0.0)),
            model.points.add(p(2.0, 0.0)),
            model.points.add(p(2.0, 2.0)),
            model.points.add(p(0.0, 2.0)),
        ];
        let face_index = model.add_face(face, Some(1))?;
        let before = model.face_count();

        let options = BevelOptions {
            amount: 0.5,
            pitch: FRAC_PI_6,
            quadrangulate: true,
            ..BevelOptions::default()
        };
        let outcome = BevelSelection::new(vec![face_index], options).execute(&mut model)?;

        println!("== bevel, amount 0.5, pitch 30 deg");
        println!(
            "   {} face(s) added ({} -> {}), {} region(s) skipped",
            outcome.faces_added,
            before,
            model.face_count(),
            outcome.regions_skipped,
        );
        for diagnostic in &outcome.diagnostics {
            println!("   region {}: {}", diagnostic.region, diagnostic.message);
        }
    }

    Ok(())
}

fn p(x: f64, y: f64) -> Point3 {
    Point3::new(x, y, 0.0)
}

fn area_from(outer: &[(f64, f64)], holes: &[&[(f64, f64)]]) -> PolyArea {
    let mut pool = Points::new();
    let ring: Vec<usize> = outer.iter().map(|&(x, y)| pool.add(p(x, y))).collect();
    let hole_rings: Vec<Vec<usize>> = holes
        .iter()
        .map(|h| h.iter().map(|&(x, y)| pool.add(p(x, y))).collect())
        .collect();
    let mut area = PolyArea::new(pool, ring);
    for hole in hole_rings {
        area.add_hole(hole);
    }
    area
}

fn dump(label: &str, result: &OffsetResult) {
    println!("== {label}");
    println!(
        "   depth reached {:.4}, {} side wall(s), {} residual(s), {} sweep node(s)",
        result.end_time,
        result.side_walls.len(),
        result.inner_polyareas.len(),
        result.tree.len(),
    );
    if let Some(depth) = result.first_collapse {
        println!("   first collapse at {depth:.4}");
    }
    for (i, residual) in result.inner_polyareas.iter().enumerate() {
        let net = residual.signed_area().unwrap_or(f64::NAN);
        println!(
            "   residual {i}: net area {net:.4}, {} hole(s)",
            residual.holes().len(),
        );
    }
}
