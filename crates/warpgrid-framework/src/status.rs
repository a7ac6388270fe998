//! Result carrier for plugin calls and framework operations.
//!
//! Success is the absent case: operations return `Ok(..)` and only carry a
//! `Status` when something went wrong. `Code::Success` exists so that
//! metric labels can name the outcome of a successful call.

use std::fmt;

use thiserror::Error;

/// Outcome category of a plugin call or extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The call succeeded. Only used as a metric label for `Ok` results;
    /// never put it in an `Err(Status)`.
    Success,
    /// An internal plugin or framework error.
    Error,
    /// The pod cannot be scheduled on the evaluated node(s).
    Unschedulable,
    /// The pod should wait before proceeding.
    Wait,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Success => "Success",
            Code::Error => "Error",
            Code::Unschedulable => "Unschedulable",
            Code::Wait => "Wait",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-success outcome: code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

/// Result of a plugin call or framework phase.
pub type StatusResult<T = ()> = Result<T, Status>;

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a `Code::Error` status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Code::Error, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The code reported for a phase or plugin result.
    pub fn code_of<T>(result: &StatusResult<T>) -> Code {
        match result {
            Ok(_) => Code::Success,
            Err(status) => status.code,
        }
    }
}
