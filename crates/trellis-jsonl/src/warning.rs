//! Warning types for non-fatal problems during JSONL reading.
//!
//! Resilient loading keeps going when an individual line cannot be parsed;
//! each skipped line is reported as a [`Warning`] so the caller can decide
//! whether the losses are acceptable.

/// A non-fatal warning raised while reading a JSONL file.
///
/// Each variant carries the 1-based line number where the problem occurred
/// so it can be located in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A non-empty line could not be parsed into the requested record type.
    ///
    /// The line is skipped and reading continues with the next one.
    MalformedJson {
        /// The 1-based line number where the error occurred.
        line_number: usize,
        /// A description of the JSON parsing error.
        error: String,
    },
}

impl Warning {
    /// Returns the line number associated with this warning.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. } => *line_number,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed JSON: {error}")
            }
        }
    }
}

impl std::error::Error for Warning {}
