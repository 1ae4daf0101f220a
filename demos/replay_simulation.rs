//! Replay a LinUCB estimator over synthetic logged clicks and compare its
//! coefficients against a batch regression.
//!
//! Run with:
//! `RUST_LOG=linucb=debug cargo run --example replay_simulation`

use linucb::{compare_coefficients, fit_baseline, replay, LinUcb, LinUcbConfig, SyntheticConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data = SyntheticConfig::default();
    let rounds = data.generate()?;

    let mut est = LinUcb::new(LinUcbConfig {
        dim: data.dim(),
        alpha: 7.0,
        arms: Some(data.arm_names()),
        seed: 0,
    })?;
    let report = replay(&mut est, &rounds)?;

    println!(
        "rounds={} matched={} match_rate={:.3} avg_reward={:.4}",
        report.rounds,
        report.matched,
        report.match_rate(),
        report.average_reward().unwrap_or(0.0)
    );
    for (arm, n) in &report.arm_matches {
        println!("  arm {arm}: {n} updates");
    }

    // Final point of each cumulative-average series (what a plot would end on).
    println!("\nsegment  arm  points  final_avg");
    for s in &report.series {
        if let Some(last) = s.points.last() {
            println!(
                "{:>7}  {:>3}  {:>6}  {:.4}",
                s.segment,
                s.arm,
                s.points.len(),
                last.cumulative_average
            );
        }
    }

    let truth = data.true_theta();
    let estimates = est.theta_vectors()?;
    let baseline = fit_baseline(&rounds, 0.0)?;
    println!("\narm  idx  truth   linucb  baseline  pct_diff");
    for d in compare_coefficients(&estimates, &baseline) {
        let t = truth.get(&d.arm).and_then(|t| t.get(d.index)).copied().unwrap_or(f64::NAN);
        let pct = d
            .pct_diff
            .map(|p| format!("{p:+.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:>3}  {:>3}  {:.3}   {:.3}   {:.3}     {}",
            d.arm, d.index, t, d.estimate, d.baseline, pct
        );
    }
    Ok(())
}
