//! Error taxonomy shared by the domain layer
//!
//! Every domain error maps onto one of these kinds so callers can branch on
//! the category without matching each concrete enum.

use serde::Serialize;
use std::fmt;

/// Category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed ID, self-dependency, missing reference or cycle
    Validation,
    /// A task or subtask is absent
    NotFound,
    /// The operation conflicts with the current state of the document
    StateConflict,
    /// Persistence failure
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
