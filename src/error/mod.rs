use crate::coordinator::CoordinatorError;
use crate::render::RenderError;
use crate::session::SessionError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{failed} of {total} images could not be processed")]
    Incomplete { failed: usize, total: usize },
}

impl AppError {
    /// Whether the error came from the persistence collaborator and was
    /// already reported to the operator.
    pub const fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
