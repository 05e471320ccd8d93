use super::event::StageEvent;
use super::model::Stage;
use thiserror::Error;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid stage transition: from {from:?} using event {event:?}")]
    InvalidStageTransition { from: Stage, event: StageEvent },
    #[error("image geometry is not available yet")]
    GeometryUnavailable,
}
