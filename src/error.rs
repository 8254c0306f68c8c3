use std::backtrace::Backtrace;
use thiserror::Error;

/// Failures that abort an extraction.
///
/// `Unsupported` and `UnexpectedDependency` capture a backtrace at
/// construction; the orchestrator surfaces it in the user-visible message.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("entry point not found")]
    NotFound,

    #[error("unrecognized entry point request")]
    InvalidInput,

    #[error("dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("unsupported construct: {reason}")]
    Unsupported { reason: String, trace: String },

    #[error("unexpected dependency: {reason}")]
    UnexpectedDependency { reason: String, trace: String },
}

impl ExtractError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        ExtractError::Unsupported {
            reason: reason.into(),
            trace: Backtrace::force_capture().to_string(),
        }
    }

    pub fn unexpected(reason: impl Into<String>) -> Self {
        ExtractError::UnexpectedDependency {
            reason: reason.into(),
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Translate to the diagnostic text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::NotFound => "Not found!".to_owned(),
            ExtractError::InvalidInput => {
                "Unrecognized input. \
                 Expected: fully qualified function name or \
                 [fully qualified class name]::[method_name]"
                    .to_owned()
            }
            ExtractError::DependencyNotFound(desc) => {
                format!("Dependency not found: {desc}")
            }
            ExtractError::Unsupported { reason, trace }
            | ExtractError::UnexpectedDependency { reason, trace } => {
                format!("{reason}\n{trace}")
            }
        }
    }
}
