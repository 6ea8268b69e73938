use thiserror::Error;

/// Invocation-level failure kinds and their host-visible exit codes.
///
/// Failures of individual quality commands are not errors; they are recorded
/// on the command's outcome and reported with exit code 1. This enum covers
/// the conditions that short-circuit the whole invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed JSON, missing required field, invalid regex, unknown regex
    /// flag, or an out-of-range numeric bound in the configuration. Exit 2.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed event envelope, missing required envelope field, or a
    /// malformed embedded tool descriptor. Exit 3.
    #[error("invalid event: {0}")]
    Event(String),

    /// The security validator vetoed a resolved command specification. Exit 4.
    #[error("security rejection: {0}")]
    Security(String),

    /// Invariant breach that should be impossible by construction. Exit 5.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The process exit code the host assistant interprets for this kind.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Event(_) => 3,
            Self::Security(_) => 4,
            Self::Internal(_) => 5,
        }
    }
}
