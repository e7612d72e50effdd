use super::model::SessionPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Image selected or captured.
    Start,
    /// Any non-destructive edit of the working state.
    Edit,
    /// A crop replaced the working image.
    Crop,
    Finalize,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<SessionPhase>,
    pub event: SessionEvent,
    pub to: SessionPhase,
}

impl StateTransition {
    pub const fn new(from: Option<SessionPhase>, event: SessionEvent, to: SessionPhase) -> Self {
        Self { from, event, to }
    }
}
