use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Answer option stored inside a poll document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOptionEntity {
    /// Label shown to participants.
    pub text: String,
    /// Denormalized vote counter for this option.
    pub votes: u32,
}

/// A single recorded answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Display name of the participant at submission time.
    pub participant_name: String,
    /// Index of the chosen option.
    pub option_index: usize,
    /// Submission timestamp.
    pub answered_at: SystemTime,
}

/// Aggregate poll entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollEntity {
    /// Primary key of the poll.
    pub id: Uuid,
    /// Question asked to the participants.
    pub question: String,
    /// Ordered options; the position is the answer key.
    pub options: Vec<PollOptionEntity>,
    /// Voting window in seconds.
    pub duration_secs: u64,
    /// Creation timestamp, used for history ordering.
    pub created_at: SystemTime,
    /// Last time the poll was written.
    pub updated_at: SystemTime,
    /// Moment the poll started accepting answers.
    pub started_at: SystemTime,
    /// Whether the poll is closed.
    pub ended: bool,
    /// Moment the poll was closed, present iff `ended`.
    pub ended_at: Option<SystemTime>,
    /// Answer log.
    pub answers: Vec<AnswerEntity>,
}
