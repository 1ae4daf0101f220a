//! Selection envelope returned by [`LinUcb::score_and_select`][crate::LinUcb::score_and_select].
//!
//! A `Selection` is an audit-friendly record of one decision: the chosen arm,
//! the full per-arm score breakdown, and typed notes explaining how the choice
//! was made. It can be logged, replayed, or handed to a plotting/tabular
//! collaborator (with the `serde` feature) without re-deriving anything.

use std::collections::BTreeMap;

use crate::ArmScore;

/// Audit-friendly notes attached to a selection.
///
/// Notes are small, typed, and stable. Prefer adding new variants over
/// changing existing semantics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionNote {
    /// A single arm had the strictly largest UCB score.
    ArgmaxChoice,

    /// Several arms tied exactly on the maximum score; the choice was drawn
    /// uniformly from `tied` with the estimator's seeded RNG.
    RandomTieBreak { tied: Vec<String> },

    /// These candidates were unseen and got a fresh ridge prior before scoring.
    RegisteredArms { arms: Vec<String> },
}

/// The outcome of scoring a candidate set for one context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    /// The selected arm.
    pub arm: String,
    /// UCB score of the selected arm.
    pub score: f64,
    /// Score breakdown for every candidate.
    pub scores: BTreeMap<String, ArmScore>,
    /// Notes describing why this choice happened.
    pub notes: Vec<SelectionNote>,
}

impl Selection {
    /// Whether the choice needed a random tie-break.
    pub fn was_tie_break(&self) -> bool {
        self.notes
            .iter()
            .any(|n| matches!(n, SelectionNote::RandomTieBreak { .. }))
    }
}
