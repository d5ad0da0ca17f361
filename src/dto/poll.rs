//! DTO definitions for poll snapshots and poll-related requests.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_duration, validate_not_blank, validate_poll_options},
    },
    state::poll::{Poll, PollOption},
};

/// Public projection of a poll pushed to clients and returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<OptionSnapshot>,
    /// Voting window in seconds.
    pub duration: u64,
    /// RFC 3339 timestamp at which voting opened.
    pub started_at: String,
    pub ended: bool,
}

/// One option of a [`PollSnapshot`] with its current tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptionSnapshot {
    pub text: String,
    pub votes: u32,
}

impl From<&PollOption> for OptionSnapshot {
    fn from(option: &PollOption) -> Self {
        Self {
            text: option.text.clone(),
            votes: option.votes,
        }
    }
}

impl From<&Poll> for PollSnapshot {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id,
            question: poll.question.clone(),
            options: poll.options.iter().map(Into::into).collect(),
            duration: poll.duration_secs,
            started_at: format_system_time(poll.started_at),
            ended: poll.is_ended(),
        }
    }
}

impl From<Poll> for PollSnapshot {
    fn from(poll: Poll) -> Self {
        (&poll).into()
    }
}

/// Payload used to open a new poll.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    /// Voting window in seconds. The configured default applies when omitted.
    #[serde(default)]
    pub duration: Option<u64>,
}

impl Validate for CreatePollRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.question) {
            errors.add("question", e);
        }

        if let Err(e) = validate_poll_options(&self.options) {
            errors.add("options", e);
        }

        if let Some(duration) = self.duration {
            if let Err(e) = validate_duration(duration) {
                errors.add("duration", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Role announced by a client when it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

/// Identification sent by a client right after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    pub role: Role,
}

/// A participant's answer to the active poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Identifier of the poll being answered, as received in the snapshot.
    pub poll_id: String,
    /// Zero-based index into the poll options.
    pub option_index: i64,
}

/// Teacher request to remove a student by display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickStudentRequest {
    pub student_name: String,
}
