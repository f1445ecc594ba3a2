//! # Survey floor clustering
//!
//! Builds a synthetic survey of one floor: three rooms, four access points,
//! readings from a log-distance path-loss model with a wall penalty. Clusters
//! it with a low preference quantile and prints each cluster with the room
//! its members were taken in.

use refpoint_ap::{AffinityPropagation, ApConfig, ApError, ReferencePoint};

// ── Floor model ──────────────────────────────────────────────────────────────

const ACCESS_POINTS: [(f64, f64); 4] = [(2.0, 2.0), (12.0, 2.0), (22.0, 2.0), (12.0, 9.0)];
const ORIENTATIONS: [char; 4] = ['N', 'E', 'S', 'W'];

fn room_of(x: f64) -> usize {
    (x / 10.0) as usize
}

fn rss(x: f64, y: f64, ap: (f64, f64)) -> f64 {
    let d = ((x - ap.0).powi(2) + (y - ap.1).powi(2)).sqrt().max(0.5);
    let walls = room_of(x).abs_diff(room_of(ap.0)) as f64;
    (-35.0 - 25.0 * d.log10() - 8.0 * walls).round()
}

fn survey() -> Vec<ReferencePoint> {
    let mut points = Vec::new();
    for room in 0..3 {
        for step in 0..4 {
            let x = room as f64 * 10.0 + 2.0 + 2.0 * step as f64;
            let y = 2.0 + (step % 2) as f64 * 3.0;
            let features = ACCESS_POINTS.iter().map(|&ap| rss(x, y, ap)).collect();
            points.push(ReferencePoint::with_features(x, y, ORIENTATIONS[step], features));
        }
    }
    points
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() {
    let config = ApConfig::default().with_quantile(0.05).with_max_iterations(Some(5_000));
    let mut ap = match AffinityPropagation::new(survey(), config) {
        Ok(ap) => ap,
        Err(e) => {
            eprintln!("setup failed: {e}");
            return;
        }
    };

    println!("▶  {} reference points, preference {:?}\n", ap.points().len(), ap.preference());

    match ap.run() {
        Ok(outcome) => println!("converged after {} iterations\n", outcome.iterations),
        Err(ApError::DidNotConverge { iterations }) => {
            println!("no convergence within {iterations} iterations, showing last assignment\n")
        }
        Err(e) => {
            eprintln!("clustering failed: {e}");
            return;
        }
    }

    for (n, cluster) in ap.clusters().iter().enumerate() {
        let head = &ap.points()[cluster.exemplar];
        println!(
            "  cluster {n}: exemplar #{} at ({}, {}) facing {}",
            cluster.exemplar, head.x, head.y, head.orientation
        );
        for &m in &cluster.members {
            let p = &ap.points()[m];
            println!("    #{m:<2} room {} ({:>4}, {:>3})  rss {:?}", room_of(p.x), p.x, p.y, p.features);
        }
    }
}
