//! Error type shared by the estimator, replay driver, and diagnostics.
//!
//! Every error is local to the call that produced it: the estimator is left
//! exactly as it was before the failing call.

use thiserror::Error;

/// Errors reported by this crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinUcbError {
    /// Empty candidate set, context of the wrong length, non-finite values,
    /// or an invalid configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The arm was never registered and the arm set is fixed.
    #[error("unknown arm: {0}")]
    UnknownArm(String),

    /// A design matrix could not be factored (even with jitter), or a
    /// computation produced a non-finite value.
    #[error("numeric instability for arm {arm}: {reason}")]
    NumericInstability { arm: String, reason: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LinUcbError>;

impl LinUcbError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn numeric(arm: &str, reason: impl Into<String>) -> Self {
        Self::NumericInstability {
            arm: arm.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check a context vector against the configured dimension.
pub(crate) fn check_context(context: &[f64], dim: usize) -> Result<()> {
    if context.len() != dim {
        return Err(LinUcbError::invalid(format!(
            "context has length {}, expected {dim}",
            context.len()
        )));
    }
    if let Some(i) = context.iter().position(|v| !v.is_finite()) {
        return Err(LinUcbError::invalid(format!(
            "context[{i}] is not finite ({})",
            context[i]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let e = LinUcbError::numeric("a", "cholesky failed");
        assert_eq!(e.to_string(), "numeric instability for arm a: cholesky failed");
        assert_eq!(LinUcbError::UnknownArm("z".into()).to_string(), "unknown arm: z");
    }

    #[test]
    fn check_context_rejects_wrong_length_and_nan() {
        assert!(check_context(&[1.0, 0.0], 2).is_ok());
        assert!(matches!(
            check_context(&[1.0], 2),
            Err(LinUcbError::InvalidInput(_))
        ));
        assert!(matches!(
            check_context(&[1.0, f64::INFINITY], 2),
            Err(LinUcbError::InvalidInput(_))
        ));
    }
}
