//! # Step-by-step trace
//!
//! Drives a run one iteration at a time and prints how many points changed
//! exemplar, the stable-round streak, and each point's current exemplar.

use refpoint_ap::{AffinityPropagation, ApConfig, ConvergenceState, ReferencePoint};

fn main() {
    let points = vec![
        ReferencePoint::with_features(0.0, 0.0, 'N', vec![-40.0, -70.0]),
        ReferencePoint::with_features(1.0, 0.0, 'N', vec![-41.0, -71.0]),
        ReferencePoint::with_features(1.0, 1.0, 'E', vec![-40.0, -71.0]),
        ReferencePoint::with_features(8.0, 0.0, 'N', vec![-75.0, -45.0]),
        ReferencePoint::with_features(8.0, 1.0, 'S', vec![-76.0, -44.0]),
        ReferencePoint::with_features(9.0, 1.0, 'W', vec![-75.0, -44.0]),
    ];

    let mut ap = match AffinityPropagation::new(points, ApConfig::default()) {
        Ok(ap) => ap,
        Err(e) => {
            eprintln!("setup failed: {e}");
            return;
        }
    };
    println!("preference {:?}\n", ap.preference());
    println!("  iter  changed  streak  exemplars");

    loop {
        let report = ap.step();
        let exemplars: Vec<String> = ap
            .points()
            .iter()
            .map(|p| p.exemplar.map_or_else(|| "-".to_string(), |e| e.to_string()))
            .collect();
        println!(
            "  {:>4}  {:>7}  {:>6}  [{}]",
            report.iteration,
            report.changed,
            report.stable_rounds,
            exemplars.join(" ")
        );
        if report.state == ConvergenceState::Converged {
            break;
        }
    }

    println!("\n{} clusters:", ap.cluster_count());
    for cluster in ap.clusters() {
        println!("  exemplar {} ← {:?}", cluster.exemplar, cluster.members);
    }
    let diag: Vec<f64> = (0..ap.points().len()).map(|k| ap.combined()[(k, k)]).collect();
    println!("\ncombined diagonal: {diag:.3?}");
}
