use thiserror::Error;

use crate::types::Seat;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The action is not legal for the acting seat in the current phase.
    /// Nothing was mutated; the caller may retry with a corrected action.
    #[error("illegal action by seat {seat}: {message}")]
    IllegalAction { seat: Seat, message: String },

    /// An operation was invoked in the wrong phase (e.g. drawing while a
    /// discard is outstanding).
    #[error("invalid phase: expected {expected}, found {found}")]
    InvalidPhase { expected: &'static str, found: String },

    /// The scoring oracle refused a win claim.
    #[error("win claim by seat {seat} rejected: {reason}")]
    ScoringRejected { seat: Seat, reason: String },

    /// Tile accounting no longer adds up. Fatal for the round and match.
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    pub fn illegal(seat: Seat, message: impl Into<String>) -> Self {
        EngineError::IllegalAction {
            seat,
            message: message.into(),
        }
    }

    /// A win the scoring oracle refused; `reason` is the oracle's message.
    pub fn rejected(seat: Seat, reason: &impl std::fmt::Display) -> Self {
        EngineError::ScoringRejected {
            seat,
            reason: reason.to_string(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            message: message.into(),
        }
    }

    /// Fatal errors abort the match instance instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::InvariantViolation { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violation_is_fatal() {
        assert!(EngineError::invariant("136 != 135").is_fatal());
        assert!(!EngineError::illegal(2, "tile not held").is_fatal());
        assert!(!EngineError::rejected(1, &"no yaku").is_fatal());
    }

    #[test]
    fn messages_name_the_seat() {
        let err = EngineError::illegal(3, "discard 5m not in hand");
        assert_eq!(err.to_string(), "illegal action by seat 3: discard 5m not in hand");
        let err = EngineError::rejected(1, &crate::scoring::OracleError::NoYaku);
        assert_eq!(err.to_string(), "win claim by seat 1 rejected: hand is complete but has no yaku");
    }
}
