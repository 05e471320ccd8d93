pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{SessionError, SessionResult};
pub use event::{StageEvent, StageTransition};
pub use machine::{CropSession, StageContext};
pub use model::Stage;
