//! Single owner of the live crop session, display geometry and gesture state.

pub mod activity;
pub mod controller;
pub mod error;

pub use activity::{Activity, ActivityEvent, ActivityToken};
pub use controller::{Completion, Coordinator, CropSettings, SelectionTicket, SyncTicket};
pub use error::{CoordinatorError, CoordinatorResult};
