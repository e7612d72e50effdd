use super::error::{StateError, StateResult};
use super::{event::StateTransition, SessionEvent, SessionPhase};

/// Only the most recent transitions are kept; a long session crops repeatedly.
const TRANSITION_HISTORY_LIMIT: usize = 64;

#[derive(Debug)]
pub struct StateMachine {
    state: SessionPhase,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionPhase::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionPhase {
        self.state
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionPhase> {
        use SessionEvent::*;
        match (self.state, event) {
            (SessionPhase::Idle, Start) => Some(SessionPhase::Editing),
            (SessionPhase::Editing, Edit | Crop) => Some(SessionPhase::Editing),
            (SessionPhase::Editing, Finalize) => Some(SessionPhase::Finalized),
            (SessionPhase::Idle | SessionPhase::Editing, Discard) => Some(SessionPhase::Discarded),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionPhase> {
        tracing::debug!(from = ?self.state, event = ?event, "request session transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid session transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        self.transition_history.push(record);
        let overflow = self
            .transition_history
            .len()
            .saturating_sub(TRANSITION_HISTORY_LIMIT);
        self.transition_history.drain(..overflow);

        Ok(self.state)
    }

    /// Fails with the error `event` would produce, without transitioning.
    pub fn ensure(&self, event: SessionEvent) -> StateResult<()> {
        if self.can_transition(event) {
            Ok(())
        } else {
            Err(StateError::InvalidStateTransition {
                from: self.state,
                event,
            })
        }
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionPhase::{:?}", self.state)
    }
}
