use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// Everything below the orchestrator is fail-soft, so the only errors that
/// reach this type are systemic: bad configuration, or a report that could
/// not be serialized or persisted.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] goldscreen_core::ValidationError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
