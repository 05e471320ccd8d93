use super::activity::Activity;
use thiserror::Error;

pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{operation} refused while {activity:?} is in progress")]
    Busy {
        activity: Activity,
        operation: &'static str,
    },
    #[error("no image is selected")]
    NoActiveImage,
}
