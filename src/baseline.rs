//! Offline baseline regression and coefficient comparison.
//!
//! The replayed estimator only learns from rounds where it agreed with the
//! logging policy. A batch regression per logged arm over *all* logged rounds
//! is a natural yardstick for its `theta` estimates; [`compare_coefficients`]
//! lines the two up and reports percentage differences.

use std::collections::BTreeMap;

use crate::linalg::{add_outer, Cholesky};
use crate::{LinUcbError, ReplayRound, Result};

/// Fit `(X^T X + ridge * I) theta = X^T y` per logged arm.
///
/// `ridge = 0` is ordinary least squares; a design that does not span every
/// feature then fails with [`LinUcbError::NumericInstability`] for that arm.
pub fn fit_baseline(rounds: &[ReplayRound], ridge: f64) -> Result<BTreeMap<String, Vec<f64>>> {
    if !ridge.is_finite() || ridge < 0.0 {
        return Err(LinUcbError::invalid(format!(
            "ridge must be finite and >= 0, got {ridge}"
        )));
    }
    let Some(first) = rounds.first() else {
        return Ok(BTreeMap::new());
    };
    let d = first.context.len();
    if d == 0 {
        return Err(LinUcbError::invalid("context is empty"));
    }

    // Per arm: (X^T X, X^T y).
    let mut acc: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in rounds {
        crate::error::check_context(&r.context, d)?;
        if !r.reward.is_finite() {
            return Err(LinUcbError::invalid(format!("reward is not finite ({})", r.reward)));
        }
        let (xtx, xty) = acc
            .entry(r.logged_arm.as_str())
            .or_insert_with(|| (vec![0.0; d * d], vec![0.0; d]));
        add_outer(xtx, d, &r.context);
        for (v, x) in xty.iter_mut().zip(r.context.iter()) {
            *v += r.reward * x;
        }
    }

    let mut out = BTreeMap::new();
    for (arm, (mut xtx, xty)) in acc {
        for i in 0..d {
            xtx[i * d + i] += ridge;
        }
        let f = Cholesky::factor(&xtx, d)
            .ok_or_else(|| LinUcbError::numeric(arm, "baseline design matrix is singular"))?;
        let theta = f.solve(&xty);
        if !theta.iter().all(|v| v.is_finite()) {
            return Err(LinUcbError::numeric(arm, "baseline coefficients are not finite"));
        }
        out.insert(arm.to_string(), theta);
    }
    Ok(out)
}

/// One coefficient of one arm, estimate vs baseline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefficientDiff {
    pub arm: String,
    pub index: usize,
    pub estimate: f64,
    pub baseline: f64,
    /// `100 * (estimate - baseline) / |baseline|`; `None` if the baseline is zero.
    pub pct_diff: Option<f64>,
}

/// Compare every coefficient of every arm present in both maps.
///
/// Arms missing from either side are skipped, as are trailing coefficients
/// when the two vectors disagree in length.
pub fn compare_coefficients(
    estimates: &BTreeMap<String, Vec<f64>>,
    baseline: &BTreeMap<String, Vec<f64>>,
) -> Vec<CoefficientDiff> {
    let mut out = Vec::new();
    for (arm, est) in estimates {
        let Some(base) = baseline.get(arm) else {
            continue;
        };
        for (index, (&e, &b)) in est.iter().zip(base.iter()).enumerate() {
            let pct_diff = (b != 0.0).then(|| 100.0 * (e - b) / b.abs());
            out.push(CoefficientDiff {
                arm: arm.clone(),
                index,
                estimate: e,
                baseline: b,
                pct_diff,
            });
        }
    }
    out
}
