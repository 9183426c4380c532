//! Error types for the analysis engine.
//!
//! Only two kinds of failure are modeled as recoverable `Result`s:
//! configuration errors (reported at initialization) and taint-config
//! parsing errors. IR inconsistencies — a collaborator handing the
//! solver a call site whose argument count doesn't match the callee's
//! parameter count, for instance — are collaborator contract violations
//! and are asserted, not returned, since there is nothing the solver can
//! do to continue meaningfully. Dispatch misses are not errors at all.

use std::fmt;

#[derive(Debug)]
pub enum AnalysisError {
    /// A required configuration key was missing or held a value of the
    /// wrong shape.
    Configuration(String),
    /// The taint configuration document could not be parsed.
    TaintConfig(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            AnalysisError::TaintConfig(msg) => write!(f, "taint configuration error: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

pub type Result<T> = std::result::Result<T, AnalysisError>;
