//! `linucb`: a small, deterministic disjoint LinUCB estimator.
//!
//! Designed for contextual “arm selection”: each decision comes with a
//! fixed-length feature vector (the context), a handful of candidate arms,
//! and a scalar reward revealed only for the arm that was played.
//! [`LinUcb`] keeps one independent ridge regression per arm and picks the arm
//! with the largest upper confidence bound (Li, Chu, Langford & Schapire 2010,
//! arXiv:1003.0146, Algorithm 1).
//!
//! **Goals:**
//! - **Deterministic by default**: same rounds + same seed → same choices and
//!   the same per-arm state. The RNG is touched only for exact ties.
//! - **Never silently wrong**: every call returns a [`Result`]; bad input is
//!   [`LinUcbError::InvalidInput`], a design matrix that cannot be factored is
//!   [`LinUcbError::NumericInstability`]. Failed calls change nothing.
//! - **Selection and update are separate**, so a caller can learn from a
//!   subset of rounds (off-policy replay).
//!
//! **Pieces:**
//! - [`LinUcb`] / [`LinUcbConfig`]: the estimator (`score_and_select`, `update`,
//!   `theta`, `variance`).
//! - [`replay`] / [`Replayer`]: rejection-sampling replay over logged rounds,
//!   with per `(context segment, arm)` cumulative-average-reward series.
//! - [`SyntheticConfig`]: seeded logged data from per-arm linear
//!   click-probability models.
//! - [`fit_baseline`] / [`compare_coefficients`]: a batch regression per logged
//!   arm and percentage differences against the estimator's coefficients.
//!
//! **Non-goals:**
//! - Not a serving system: no persistence, no concurrency control beyond
//!   `&mut self`, no telemetry export.
//! - Disjoint model only (no hybrid shared features).
//!
//! # Quick start
//!
//! ```rust
//! use linucb::{compare_coefficients, fit_baseline, replay, LinUcb, LinUcbConfig, SyntheticConfig};
//!
//! let data = SyntheticConfig { rounds: 2_000, ..SyntheticConfig::default() };
//! let rounds = data.generate().unwrap();
//!
//! let mut est = LinUcb::new(LinUcbConfig { dim: data.dim(), alpha: 7.0, ..LinUcbConfig::default() }).unwrap();
//! let report = replay(&mut est, &rounds).unwrap();
//! assert!(report.matched > 0);
//!
//! let diffs = compare_coefficients(&est.theta_vectors().unwrap(), &fit_baseline(&rounds, 1.0).unwrap());
//! assert_eq!(diffs.len(), 4);
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (arm registration and tie-breaks at
//! `debug`, updates at `trace`, jittered factorizations at `warn`, replay
//! summaries at `info`). It never installs a subscriber.
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configs and output records
//!   ([`Selection`], [`ArmScore`], [`ReplayReport`], [`CoefficientDiff`], ...).

mod error;
pub use error::*;

mod linalg;

mod decision;
pub use decision::*;

mod contextual;
pub use contextual::*;

mod replay;
pub use replay::*;

mod synthetic;
pub use synthetic::*;

mod baseline;
pub use baseline::*;

pub const LINUCB_VERSION: &str = env!("CARGO_PKG_VERSION");
