//! Seeded synthetic logged data.
//!
//! Each arm has a linear click-probability model `p = clamp(theta . x, 0, 1)`.
//! Every round draws a binary context from `{0,1}^d`, a logged arm uniformly
//! at random (the logging policy replay assumes), and a Bernoulli reward from
//! the logged arm's model. The same seed always yields the same rounds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution};
use std::collections::BTreeMap;

use crate::linalg::dot;
use crate::{LinUcbError, ReplayRound, Result};

/// Ground-truth model for one arm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntheticArm {
    pub name: String,
    /// Click-probability coefficients (length `d`).
    pub theta: Vec<f64>,
}

/// Configuration for [`SyntheticConfig::generate`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntheticConfig {
    pub arms: Vec<SyntheticArm>,
    /// Number of logged rounds to produce.
    pub rounds: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    /// Two arms over two binary features, 10k rounds.
    fn default() -> Self {
        Self {
            arms: vec![
                SyntheticArm {
                    name: "1".to_string(),
                    theta: vec![0.5, 0.1],
                },
                SyntheticArm {
                    name: "2".to_string(),
                    theta: vec![0.1, 0.4],
                },
            ],
            rounds: 10_000,
            seed: 0,
        }
    }
}

impl SyntheticConfig {
    /// Context dimension implied by the arm models.
    pub fn dim(&self) -> usize {
        self.arms.first().map(|a| a.theta.len()).unwrap_or(0)
    }

    /// Arm names, in configuration order.
    pub fn arm_names(&self) -> Vec<String> {
        self.arms.iter().map(|a| a.name.clone()).collect()
    }

    /// Generating coefficients keyed by arm.
    pub fn true_theta(&self) -> BTreeMap<String, Vec<f64>> {
        self.arms
            .iter()
            .map(|a| (a.name.clone(), a.theta.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.arms.is_empty() {
            return Err(LinUcbError::invalid("synthetic config has no arms"));
        }
        let d = self.dim();
        if d == 0 {
            return Err(LinUcbError::invalid("arm models must have at least one coefficient"));
        }
        let mut seen = std::collections::BTreeSet::new();
        for a in &self.arms {
            if !seen.insert(a.name.as_str()) {
                return Err(LinUcbError::invalid(format!("arm {:?} listed twice", a.name)));
            }
            if a.theta.len() != d {
                return Err(LinUcbError::invalid(format!(
                    "arm {:?} has {} coefficients, expected {d}",
                    a.name,
                    a.theta.len()
                )));
            }
            if !a.theta.iter().all(|v| v.is_finite()) {
                return Err(LinUcbError::invalid(format!(
                    "arm {:?} has a non-finite coefficient",
                    a.name
                )));
            }
        }
        Ok(())
    }

    /// Produce `rounds` logged rounds.
    pub fn generate(&self) -> Result<Vec<ReplayRound>> {
        self.validate()?;
        let d = self.dim();
        let names = self.arm_names();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut out = Vec::with_capacity(self.rounds);
        for _ in 0..self.rounds {
            let context: Vec<f64> = (0..d)
                .map(|_| if rng.random_bool(0.5) { 1.0 } else { 0.0 })
                .collect();
            let logged = &self.arms[rng.random_range(0..self.arms.len())];
            let p = dot(&logged.theta, &context).clamp(0.0, 1.0);
            let click = Bernoulli::new(p)
                .map_err(|e| LinUcbError::invalid(format!("click probability {p}: {e}")))?
                .sample(&mut rng);
            out.push(ReplayRound {
                context,
                candidates: names.clone(),
                logged_arm: logged.name.clone(),
                reward: if click { 1.0 } else { 0.0 },
            });
        }
        Ok(out)
    }
}
