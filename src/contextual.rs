//! Disjoint LinUCB: one independent ridge regression per arm.
//!
//! Each arm `a` keeps the sufficient statistics of a ridge regression with a
//! unit penalty:
//!
//! ```text
//!   A_a = I + sum x_t x_t^T        (covariance / design matrix, d x d)
//!   b_a = sum r_t x_t              (reward-weighted context sum, d)
//!   theta_a = A_a^{-1} b_a         (coefficient estimate)
//!   UCB_a(x) = x^T theta_a + alpha * sqrt(x^T A_a^{-1} x)
//! ```
//!
//! Selection and update are separate calls. A caller that only wants to learn
//! from some rounds (see [`replay`][crate::replay]) simply skips `update`.
//!
//! `A_a` starts at the identity and only ever receives positive semi-definite
//! rank-1 updates, so it stays symmetric positive-definite. Solves go through a
//! Cholesky factor; if rounding on an ill-conditioned matrix breaks the
//! factorization, one retry with a tiny diagonal jitter is made before the call
//! fails with [`LinUcbError::NumericInstability`].
//!
//! The estimator is deterministic given its seed: the RNG is consumed only when
//! several arms tie exactly on the maximum score.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

use crate::error::check_context;
use crate::linalg::{add_outer, asymmetry, dot, identity, Cholesky};
use crate::{LinUcbError, Result, Selection, SelectionNote};

/// Configuration for the disjoint LinUCB estimator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinUcbConfig {
    /// Feature vector dimension `d` (must be >= 1).
    pub dim: usize,
    /// Exploration strength (alpha, must be finite and >= 0).
    pub alpha: f64,
    /// Pre-known arm set.
    ///
    /// - `Some(arms)`: every arm is registered at construction and any other
    ///   arm is rejected with [`LinUcbError::UnknownArm`].
    /// - `None`: arms are registered lazily the first time they appear.
    #[cfg_attr(feature = "serde", serde(default))]
    pub arms: Option<Vec<String>>,
    /// Seed for the RNG used only for tie-breaking between equal scores.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: u64,
}

impl Default for LinUcbConfig {
    fn default() -> Self {
        Self {
            dim: 8,
            alpha: 1.0,
            arms: None,
            seed: 0,
        }
    }
}

impl LinUcbConfig {
    /// Check the configuration without building an estimator.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(LinUcbError::invalid("dim must be >= 1"));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(LinUcbError::invalid(format!(
                "alpha must be finite and >= 0, got {}",
                self.alpha
            )));
        }
        if let Some(arms) = &self.arms {
            if arms.is_empty() {
                return Err(LinUcbError::invalid("arm set is empty"));
            }
            check_distinct(arms)?;
        }
        Ok(())
    }
}

/// Per-arm UCB score breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmScore {
    /// `mean + bonus`.
    pub ucb: f64,
    /// Predicted payoff `x^T theta`.
    pub mean: f64,
    /// `alpha * sqrt(variance)`.
    pub bonus: f64,
    /// `x^T A^{-1} x` (never negative).
    pub variance: f64,
}

/// Ridge-regression sufficient statistics for one arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmState {
    // A (d x d, row-major), starts at I.
    covariance: Vec<f64>,
    // b (d), starts at 0.
    weighted_reward: Vec<f64>,
    updates: u64,
    dim: usize,
}

impl ArmState {
    fn new(dim: usize) -> Self {
        Self {
            covariance: identity(dim),
            weighted_reward: vec![0.0; dim],
            updates: 0,
            dim,
        }
    }

    /// Covariance matrix `A` (row-major, `d x d`).
    pub fn covariance(&self) -> &[f64] {
        &self.covariance
    }

    /// Reward-weighted context sum `b`.
    pub fn weighted_reward(&self) -> &[f64] {
        &self.weighted_reward
    }

    /// Number of updates applied to this arm.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Whether `A` is exactly symmetric and factors without jitter.
    pub fn is_positive_definite(&self) -> bool {
        asymmetry(&self.covariance, self.dim) == 0.0
            && Cholesky::factor(&self.covariance, self.dim).is_some()
    }

    fn factor(&self, arm: &str) -> Result<Cholesky> {
        match Cholesky::factor_jittered(&self.covariance, self.dim) {
            Some((f, false)) => Ok(f),
            Some((f, true)) => {
                warn!(arm, updates = self.updates, "covariance needed jitter to factor");
                Ok(f)
            }
            None => Err(LinUcbError::numeric(
                arm,
                "covariance is not positive-definite (cholesky failed after jitter)",
            )),
        }
    }

    fn theta(&self, arm: &str) -> Result<Vec<f64>> {
        let theta = self.factor(arm)?.solve(&self.weighted_reward);
        if !theta.iter().all(|v| v.is_finite()) {
            return Err(LinUcbError::numeric(arm, "theta is not finite"));
        }
        Ok(theta)
    }

    fn score(&self, arm: &str, x: &[f64], alpha: f64) -> Result<ArmScore> {
        let f = self.factor(arm)?;
        let theta = f.solve(&self.weighted_reward);
        let mean = dot(x, &theta);
        let variance = f.inv_quad_form(x).max(0.0);
        let bonus = alpha * variance.sqrt();
        let ucb = mean + bonus;
        if !(ucb.is_finite() && mean.is_finite() && bonus.is_finite()) {
            return Err(LinUcbError::numeric(arm, "score is not finite"));
        }
        Ok(ArmScore {
            ucb,
            mean,
            bonus,
            variance,
        })
    }
}

fn check_distinct(arms: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for a in arms {
        if !seen.insert(a.as_str()) {
            return Err(LinUcbError::invalid(format!("arm {a:?} listed twice")));
        }
    }
    Ok(())
}

/// Seedable disjoint LinUCB estimator.
///
/// Usage:
/// - call `score_and_select(context, candidates)` to get a choice + per-arm scores
/// - call `update(chosen_arm, context, reward)` after observing the reward
///
/// # Example
///
/// ```rust
/// use linucb::{LinUcb, LinUcbConfig};
///
/// let arms = vec!["a".to_string(), "b".to_string()];
/// let mut p = LinUcb::new(LinUcbConfig { dim: 2, ..LinUcbConfig::default() }).unwrap();
/// let ctx = [1.0, 0.0];
/// let sel = p.score_and_select(&ctx, &arms).unwrap();
/// p.update(&sel.arm, &ctx, 1.0).unwrap();
/// assert_eq!(p.arm_state(&sel.arm).unwrap().updates(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct LinUcb {
    cfg: LinUcbConfig,
    rng: StdRng,
    state: BTreeMap<String, ArmState>,
}

impl LinUcb {
    /// Create a new estimator (deterministic given `cfg.seed`).
    pub fn new(cfg: LinUcbConfig) -> Result<Self> {
        cfg.validate()?;
        let mut state = BTreeMap::new();
        if let Some(arms) = &cfg.arms {
            for a in arms {
                state.insert(a.clone(), ArmState::new(cfg.dim));
            }
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
            state,
        })
    }

    /// The configuration this estimator was built with.
    pub fn config(&self) -> &LinUcbConfig {
        &self.cfg
    }

    /// Feature dimension `d`.
    pub fn dim(&self) -> usize {
        self.cfg.dim
    }

    fn lazy(&self) -> bool {
        self.cfg.arms.is_none()
    }

    /// Registered arms, in identifier order.
    pub fn arms(&self) -> impl Iterator<Item = &str> + '_ {
        self.state.keys().map(String::as_str)
    }

    /// Sufficient statistics for `arm`, if registered.
    pub fn arm_state(&self, arm: &str) -> Option<&ArmState> {
        self.state.get(arm)
    }

    /// Score every candidate, returning the breakdowns and the unseen arms
    /// (scored under a fresh ridge prior).
    fn score_candidates(
        &self,
        context: &[f64],
        candidates: &[String],
    ) -> Result<(BTreeMap<String, ArmScore>, Vec<String>)> {
        if candidates.is_empty() {
            return Err(LinUcbError::invalid("candidate arm set is empty"));
        }
        check_context(context, self.dim())?;
        check_distinct(candidates)?;

        let mut unseen = Vec::new();
        let mut cold: Option<ArmState> = None;
        let mut out = BTreeMap::new();
        for a in candidates {
            let st: &ArmState = match self.state.get(a) {
                Some(st) => st,
                None if self.lazy() => {
                    unseen.push(a.clone());
                    cold.get_or_insert_with(|| ArmState::new(self.dim()))
                }
                None => return Err(LinUcbError::UnknownArm(a.clone())),
            };
            out.insert(a.clone(), st.score(a, context, self.cfg.alpha)?);
        }
        Ok((out, unseen))
    }

    /// Per-arm `(ucb, mean, bonus, variance)` for a context, without selecting.
    ///
    /// Unseen candidates are scored under the ridge prior but not registered.
    pub fn scores(
        &self,
        context: &[f64],
        candidates: &[String],
    ) -> Result<BTreeMap<String, ArmScore>> {
        self.score_candidates(context, candidates).map(|(s, _)| s)
    }

    /// Score every candidate and select the arm with the largest UCB score.
    ///
    /// Policy:
    /// - Unseen candidates are registered with the ridge prior (`A = I`,
    ///   `b = 0`) when the arm set is lazy; otherwise they are `UnknownArm`.
    /// - The strictly largest score wins. Exact ties are broken uniformly at
    ///   random among the tied arms with the seeded RNG.
    /// - No arm statistics change. On error nothing changes at all.
    pub fn score_and_select(&mut self, context: &[f64], candidates: &[String]) -> Result<Selection> {
        let (scores, unseen) = self.score_candidates(context, candidates)?;

        let best_score = candidates
            .iter()
            .filter_map(|a| scores.get(a).map(|s| s.ucb))
            .fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<&String> = candidates
            .iter()
            .filter(|a| scores.get(*a).map(|s| s.ucb) == Some(best_score))
            .collect();

        let mut notes = Vec::new();
        let chosen = match tied.as_slice() {
            [] => {
                // Only reachable if no score compares equal to the max.
                return Err(LinUcbError::numeric(&candidates[0], "no maximal score"));
            }
            [only] => {
                notes.push(SelectionNote::ArgmaxChoice);
                (*only).clone()
            }
            many => {
                let pick = many[self.rng.random_range(0..many.len())].clone();
                let tied: Vec<String> = many.iter().map(|a| (*a).clone()).collect();
                debug!(chosen = %pick, ?tied, score = best_score, "random tie-break");
                notes.push(SelectionNote::RandomTieBreak { tied });
                pick
            }
        };

        if !unseen.is_empty() {
            for a in &unseen {
                debug!(arm = %a, dim = self.dim(), "registered arm");
                self.state.insert(a.clone(), ArmState::new(self.dim()));
            }
            notes.push(SelectionNote::RegisteredArms { arms: unseen });
        }

        Ok(Selection {
            arm: chosen,
            score: best_score,
            scores,
            notes,
        })
    }

    /// Fold an observed reward into `arm`'s state.
    ///
    /// `A <- A + x x^T` and `b <- b + r x`. The reward is not constrained to
    /// `{0, 1}`; it only has to be finite. The new statistics are computed
    /// aside and committed only if they are finite.
    pub fn update(&mut self, arm: &str, context: &[f64], reward: f64) -> Result<()> {
        check_context(context, self.dim())?;
        if !reward.is_finite() {
            return Err(LinUcbError::invalid(format!("reward is not finite ({reward})")));
        }
        let d = self.dim();
        let current = match self.state.get(arm) {
            Some(st) => st.clone(),
            None if self.lazy() => {
                debug!(arm, dim = d, "registered arm");
                ArmState::new(d)
            }
            None => return Err(LinUcbError::UnknownArm(arm.to_string())),
        };

        let mut next = current;
        add_outer(&mut next.covariance, d, context);
        for (bi, xi) in next.weighted_reward.iter_mut().zip(context.iter()) {
            *bi += reward * xi;
        }
        if !next.covariance.iter().all(|v| v.is_finite())
            || !next.weighted_reward.iter().all(|v| v.is_finite())
        {
            return Err(LinUcbError::numeric(arm, "update overflowed"));
        }
        next.updates = next.updates.saturating_add(1);
        trace!(arm, reward, updates = next.updates, "updated arm");
        self.state.insert(arm.to_string(), next);
        Ok(())
    }

    /// Coefficient estimate `theta = A^{-1} b` for one arm.
    pub fn theta(&self, arm: &str) -> Result<Vec<f64>> {
        self.state
            .get(arm)
            .ok_or_else(|| LinUcbError::UnknownArm(arm.to_string()))?
            .theta(arm)
    }

    /// Per-arm theta vectors for every registered arm.
    ///
    /// Each arm's theta is its learned response function:
    /// `E[reward | context x] = theta^T x`.
    pub fn theta_vectors(&self) -> Result<BTreeMap<String, Vec<f64>>> {
        let mut out = BTreeMap::new();
        for (a, st) in &self.state {
            out.insert(a.clone(), st.theta(a)?);
        }
        Ok(out)
    }

    /// Confidence-width term `x^T A^{-1} x` for one arm.
    pub fn variance(&self, arm: &str, context: &[f64]) -> Result<f64> {
        check_context(context, self.dim())?;
        let st = self
            .state
            .get(arm)
            .ok_or_else(|| LinUcbError::UnknownArm(arm.to_string()))?;
        Ok(st.factor(arm)?.inv_quad_form(context).max(0.0))
    }

    /// Explicit `A^{-1}` for one arm (row-major). Meant for diagnostics.
    pub fn inverse_covariance(&self, arm: &str) -> Result<Vec<f64>> {
        let st = self
            .state
            .get(arm)
            .ok_or_else(|| LinUcbError::UnknownArm(arm.to_string()))?;
        Ok(st.factor(arm)?.inverse())
    }
}
