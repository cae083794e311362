//! Resolution errors and their machine-readable codes.
//!
//! Every failure the pipeline can surface is a distinct [`ResolveError`]
//! variant. Callers triaging a failed batch run use [`ResolveError::kind`] to
//! separate bad input data from a broken internal invariant, and
//! [`ResolveError::code`] for a stable identifier in logs and alerts.

use std::fmt;

/// Machine-readable error codes for operational triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedRow,
    MissingReference,
    ResolutionIncomplete,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MalformedRow => "E1001",
            Self::MissingReference => "E1002",
            Self::ResolutionIncomplete => "E9001",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedRow => "Malformed input row",
            Self::MissingReference => "Redirect target missing from input",
            Self::ResolutionIncomplete => "Parent resolution did not terminate",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MalformedRow => {
                Some("Check the extract query returns six columns with the documented types.")
            }
            Self::MissingReference => Some(
                "Include the redirect target in the extract, or set on_missing_reference = \"drop_redirect\".",
            ),
            Self::ResolutionIncomplete => Some("Report a bug with the input snapshot and logs."),
        }
    }

    /// Whether the failure stems from the input data or from the algorithm.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::MalformedRow | Self::MissingReference => ErrorKind::Input,
            Self::ResolutionIncomplete => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The rows handed to the pipeline are unusable.
    Input,
    /// An internal invariant was broken; the input may be fine.
    Internal,
}

/// Errors surfaced by the resolution pipeline.
///
/// None of these are retried inside the crate. Row numbers are zero-based
/// positions in the caller's input sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A row does not carry the six expected fields or their types.
    #[error("malformed row {row}: {reason}")]
    MalformedRow {
        /// Position of the offending row.
        row: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A row redirects to an id that is not among the input rows.
    #[error("row {row}: '{source_id}' redirects to '{target_id}', which is not in the input")]
    MissingReference {
        /// Position of the offending row.
        row: usize,
        /// Id of the redirecting record.
        source_id: String,
        /// The dangling redirect target.
        target_id: String,
    },

    /// Following redirects from `node` did not reach a parent within `bound` hops.
    #[error("resolution incomplete: no parent reached from '{node}' within {bound} hops")]
    ResolutionIncomplete {
        /// Node whose walk did not terminate.
        node: String,
        /// Hop bound that was exceeded (the node count).
        bound: usize,
    },
}

impl ResolveError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedRow { .. } => ErrorCode::MalformedRow,
            Self::MissingReference { .. } => ErrorCode::MissingReference,
            Self::ResolutionIncomplete { .. } => ErrorCode::ResolutionIncomplete,
        }
    }

    /// Input versus internal classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.code().kind()
    }

    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            row,
            reason: reason.into(),
        }
    }
}
