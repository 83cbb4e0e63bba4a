use std::path::PathBuf;

use thiserror::Error;

/// Unified application error type; every failure kind ends the run.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Revision '{rev}' does not resolve to a commit. {reason}")]
    RevisionResolution { rev: String, reason: String },
    #[error("Unable to read object {object} from the repository. {reason}")]
    RepositoryAccess { object: String, reason: String },
    #[error("Output path {} already exists with conflicting content. {reason}", path.display())]
    OutputConflict { path: PathBuf, reason: String },
    #[error("Unable to load URL strategy '{reference}'. {reason}")]
    LinkStrategyResolution { reference: String, reason: String },
    #[error("Invalid configuration in {}. {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    #[error("Errored while handling a file. {0}")]
    Io(#[from] std::io::Error),
    #[error("Error from git. {0}")]
    Git(#[from] git2::Error),
    #[error("Error serializing json. {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Error while writing information to a string. {0}")]
    BufferWrite(#[from] std::fmt::Error),
    #[error("Runtime error. {0}")]
    TokioJoin(#[from] tokio::task::JoinError),
}

impl AppError {
    pub(crate) fn repository_access(object: impl ToString, reason: impl ToString) -> Self {
        AppError::RepositoryAccess {
            object: object.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn output_conflict(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AppError::OutputConflict {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
