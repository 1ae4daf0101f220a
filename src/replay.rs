//! Off-policy replay by rejection sampling.
//!
//! Logged rounds come from some fixed randomized logging policy. For each
//! round the estimator scores the candidates and picks an arm; if its pick
//! equals the logged arm, the logged reward is revealed and folded in with
//! `update`. Otherwise the round is skipped and no statistics change.
//!
//! The average reward over matched rounds is the usual replay estimate of the
//! estimator's policy value (Li et al. 2011). It is unbiased only when the
//! logging policy chose uniformly at random over a fixed candidate set; no
//! correction is applied for any other logging policy.
//!
//! Besides the totals, a [`ReplayReport`] carries cumulative-average-reward
//! series per `(context segment, arm)`, which is what a plotting collaborator
//! wants to draw.

use std::collections::BTreeMap;
use tracing::info;

use crate::{LinUcb, LinUcbError, Result, Selection};

/// One logged decision round.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayRound {
    /// Context observed at this round.
    pub context: Vec<f64>,
    /// Arms that were offered.
    pub candidates: Vec<String>,
    /// Arm the logging policy actually played.
    pub logged_arm: String,
    /// Reward observed for `logged_arm`.
    pub reward: f64,
}

impl ReplayRound {
    /// Compact label for the context, e.g. `"1,0"`.
    pub fn segment(&self) -> String {
        segment_label(&self.context)
    }
}

/// Render a context as a comma-separated label.
pub fn segment_label(context: &[f64]) -> String {
    context
        .iter()
        .map(|v| if *v == 0.0 { 0.0 } else { *v })
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// One point of a cumulative-average-reward series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesPoint {
    /// Zero-based index of the logged round this point was recorded at.
    pub round: u64,
    /// Average matched reward up to and including this round.
    pub cumulative_average: f64,
}

/// Cumulative-average series for one `(segment, arm)` cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentSeries {
    pub segment: String,
    pub arm: String,
    pub points: Vec<SeriesPoint>,
}

/// Summary of a replay run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayReport {
    /// Logged rounds consumed.
    pub rounds: u64,
    /// Rounds where the estimator agreed with the logged arm (and updated).
    pub matched: u64,
    /// Sum of rewards over matched rounds.
    pub total_reward: f64,
    /// Matched rounds per arm.
    pub arm_matches: BTreeMap<String, u64>,
    /// Reward sum over matched rounds per arm.
    pub arm_rewards: BTreeMap<String, f64>,
    /// Overall cumulative-average series, one point per matched round.
    pub overall: Vec<SeriesPoint>,
    /// Per `(segment, arm)` series, ordered by segment then arm.
    pub series: Vec<SegmentSeries>,
}

impl ReplayReport {
    /// Replay estimate of the policy value: mean reward over matched rounds.
    pub fn average_reward(&self) -> Option<f64> {
        (self.matched > 0).then(|| self.total_reward / self.matched as f64)
    }

    /// Fraction of logged rounds that were matched.
    pub fn match_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.matched as f64 / self.rounds as f64
        }
    }
}

#[derive(Debug, Default)]
struct Cell {
    n: u64,
    sum: f64,
    points: Vec<SeriesPoint>,
}

/// Streaming replay driver.
///
/// Feed rounds in chronological order with [`Replayer::step`], then call
/// [`Replayer::finish`]. [`replay`] wraps the loop for in-memory data.
#[derive(Debug, Default)]
pub struct Replayer {
    report: ReplayReport,
    cells: BTreeMap<(String, String), Cell>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one logged round.
    ///
    /// Returns the estimator's selection and whether it matched (and so
    /// updated). A round that fails validation changes nothing.
    pub fn step(&mut self, est: &mut LinUcb, round: &ReplayRound) -> Result<(Selection, bool)> {
        if !round.candidates.iter().any(|a| a == &round.logged_arm) {
            return Err(LinUcbError::invalid(format!(
                "logged arm {:?} is not among the candidates",
                round.logged_arm
            )));
        }
        if !round.reward.is_finite() {
            return Err(LinUcbError::invalid(format!(
                "reward is not finite ({})",
                round.reward
            )));
        }

        let sel = est.score_and_select(&round.context, &round.candidates)?;
        let index = self.report.rounds;
        if sel.arm != round.logged_arm {
            self.report.rounds += 1;
            return Ok((sel, false));
        }

        // A failed update leaves both the estimator and the report untouched.
        est.update(&round.logged_arm, &round.context, round.reward)?;

        let r = &mut self.report;
        r.rounds += 1;
        r.matched += 1;
        r.total_reward += round.reward;
        *r.arm_matches.entry(round.logged_arm.clone()).or_default() += 1;
        *r.arm_rewards.entry(round.logged_arm.clone()).or_default() += round.reward;
        r.overall.push(SeriesPoint {
            round: index,
            cumulative_average: r.total_reward / r.matched as f64,
        });

        let cell = self
            .cells
            .entry((round.segment(), round.logged_arm.clone()))
            .or_default();
        cell.n += 1;
        cell.sum += round.reward;
        cell.points.push(SeriesPoint {
            round: index,
            cumulative_average: cell.sum / cell.n as f64,
        });

        Ok((sel, true))
    }

    /// Close the run and return the report.
    pub fn finish(self) -> ReplayReport {
        let mut report = self.report;
        report.series = self
            .cells
            .into_iter()
            .map(|((segment, arm), cell)| SegmentSeries {
                segment,
                arm,
                points: cell.points,
            })
            .collect();
        info!(
            rounds = report.rounds,
            matched = report.matched,
            average_reward = report.average_reward().unwrap_or(0.0),
            "replay finished"
        );
        report
    }
}

/// Replay `rounds` in order against `est`.
///
/// The first failing round aborts the run; the estimator keeps everything
/// learned from the rounds before it.
pub fn replay(est: &mut LinUcb, rounds: &[ReplayRound]) -> Result<ReplayReport> {
    let mut r = Replayer::new();
    for round in rounds {
        r.step(est, round)?;
    }
    Ok(r.finish())
}
