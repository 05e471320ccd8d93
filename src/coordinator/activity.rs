use super::error::{CoordinatorError, CoordinatorResult};

/// What the coordinator is busy with. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Selecting,
    Syncing,
    Gesturing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    BeginSelection,
    FinishSelection,
    BeginSync,
    FinishSync,
    BeginGesture,
    EndGesture,
}

impl ActivityEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BeginSelection => "image selection",
            Self::FinishSelection => "selection completion",
            Self::BeginSync => "library sync",
            Self::FinishSync => "sync completion",
            Self::BeginGesture => "crop gesture",
            Self::EndGesture => "gesture release",
        }
    }
}

#[derive(Debug, Default)]
pub struct ActivityToken {
    activity: Activity,
}

impl ActivityToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_idle(&self) -> bool {
        self.activity == Activity::Idle
    }

    /// Viewport changes are applied while idle and while an image is loading;
    /// otherwise they stay queued.
    pub fn allows_reflow(&self) -> bool {
        matches!(self.activity, Activity::Idle | Activity::Selecting)
    }

    pub fn can_transition(&self, event: ActivityEvent) -> bool {
        self.next_activity(event).is_some()
    }

    pub fn next_activity(&self, event: ActivityEvent) -> Option<Activity> {
        use ActivityEvent::*;
        match (self.activity, event) {
            (Activity::Idle, BeginSelection) => Some(Activity::Selecting),
            (Activity::Selecting, FinishSelection) => Some(Activity::Idle),
            (Activity::Idle, BeginSync) => Some(Activity::Syncing),
            (Activity::Syncing, FinishSync) => Some(Activity::Idle),
            (Activity::Idle, BeginGesture) => Some(Activity::Gesturing),
            (Activity::Gesturing, EndGesture) => Some(Activity::Idle),
            _ => None,
        }
    }

    pub fn check(&self, event: ActivityEvent) -> CoordinatorResult<Activity> {
        self.next_activity(event).ok_or_else(|| {
            tracing::debug!(activity = ?self.activity, ?event, "activity transition refused");
            CoordinatorError::Busy {
                activity: self.activity,
                operation: event.label(),
            }
        })
    }

    pub fn transition(&mut self, event: ActivityEvent) -> CoordinatorResult<Activity> {
        let next = self.check(event)?;
        tracing::trace!(from = ?self.activity, ?event, to = ?next, "activity transition");
        self.activity = next;
        Ok(next)
    }

    /// Returns to idle if a gesture is running. Reports whether one was.
    pub fn end_gesture(&mut self) -> bool {
        if self.activity != Activity::Gesturing {
            return false;
        }
        tracing::trace!("gesture activity ended");
        self.activity = Activity::Idle;
        true
    }

    /// Refuses `operation` unless nothing else is in progress.
    pub fn ensure_idle(&self, operation: &'static str) -> CoordinatorResult<()> {
        if self.is_idle() {
            return Ok(());
        }
        Err(CoordinatorError::Busy {
            activity: self.activity,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_activity_is_entered_and_left_from_idle() {
        let mut token = ActivityToken::new();
        for (begin, end, busy) in [
            (
                ActivityEvent::BeginSelection,
                ActivityEvent::FinishSelection,
                Activity::Selecting,
            ),
            (
                ActivityEvent::BeginSync,
                ActivityEvent::FinishSync,
                Activity::Syncing,
            ),
            (
                ActivityEvent::BeginGesture,
                ActivityEvent::EndGesture,
                Activity::Gesturing,
            ),
        ] {
            assert_eq!(token.transition(begin).expect("begin"), busy);
            assert!(!token.is_idle());
            assert_eq!(token.transition(end).expect("end"), Activity::Idle);
        }
    }

    #[test]
    fn overlapping_activities_are_refused() {
        let mut token = ActivityToken::new();
        token
            .transition(ActivityEvent::BeginSync)
            .expect("sync should start");

        assert!(!token.can_transition(ActivityEvent::BeginGesture));
        assert!(!token.can_transition(ActivityEvent::BeginSelection));
        let err = token
            .transition(ActivityEvent::BeginSync)
            .expect_err("second sync should be refused");
        assert!(matches!(
            err,
            CoordinatorError::Busy {
                activity: Activity::Syncing,
                operation: "library sync"
            }
        ));
        assert_eq!(token.activity(), Activity::Syncing);
    }

    #[test]
    fn finish_without_begin_is_refused() {
        let mut token = ActivityToken::new();
        assert!(token.transition(ActivityEvent::EndGesture).is_err());
        assert!(token.transition(ActivityEvent::FinishSelection).is_err());
        assert!(token.is_idle());
    }

    #[test]
    fn end_gesture_only_leaves_gesturing() {
        let mut token = ActivityToken::new();
        assert!(!token.end_gesture());

        token
            .transition(ActivityEvent::BeginSync)
            .expect("sync should start");
        assert!(!token.end_gesture());
        assert_eq!(token.activity(), Activity::Syncing);
        token.transition(ActivityEvent::FinishSync).expect("finish");

        token.transition(ActivityEvent::BeginGesture).expect("gesture");
        assert!(token.end_gesture());
        assert!(token.is_idle());
    }

    #[test]
    fn reflow_is_allowed_only_while_idle_or_selecting() {
        let mut token = ActivityToken::new();
        assert!(token.allows_reflow());
        token
            .transition(ActivityEvent::BeginSelection)
            .expect("selection");
        assert!(token.allows_reflow());
        token
            .transition(ActivityEvent::FinishSelection)
            .expect("finish");
        token.transition(ActivityEvent::BeginGesture).expect("gesture");
        assert!(!token.allows_reflow());
        assert!(token.ensure_idle("advance").is_err());
    }
}
