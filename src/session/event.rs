use super::model::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Advance,
    Skip,
    Back,
    Reset,
    /// Automatic return to portrait when review has nothing to show.
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: Stage,
    pub event: StageEvent,
    pub to: Stage,
}

impl StageTransition {
    pub const fn new(from: Stage, event: StageEvent, to: Stage) -> Self {
        Self { from, event, to }
    }
}
