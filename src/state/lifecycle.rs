use std::fmt;

use thiserror::Error;

/// Phases a poll moves through. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Built in memory, not yet persisted nor accepting answers.
    Created,
    /// Persisted and accepting answers.
    Active,
    /// Closed; tallies are final.
    Ended,
}

/// Why an active poll was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The voting window elapsed.
    Timeout,
    /// Every connected participant has answered.
    AllAnswered,
    /// The teacher closed the poll explicitly.
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CloseReason::Timeout => "timeout",
            CloseReason::AllAnswered => "all_answered",
            CloseReason::Manual => "manual",
        };
        f.write_str(label)
    }
}

/// Events that can be applied to a poll's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// Open the poll for answers.
    Start,
    /// Close the poll.
    Close(CloseReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the poll was in when the invalid event was received.
    pub from: PollPhase,
    /// The event that cannot be applied from this phase.
    pub event: PollEvent,
}

impl PollPhase {
    /// Compute the phase reached by applying `event`, if the transition is valid.
    pub fn transition(self, event: PollEvent) -> Result<PollPhase, InvalidTransition> {
        let next = match (self, event) {
            (PollPhase::Created, PollEvent::Start) => PollPhase::Active,
            (PollPhase::Active, PollEvent::Close(_)) => PollPhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Whether the phase is terminal.
    pub fn is_ended(self) -> bool {
        matches!(self, PollPhase::Ended)
    }
}
