use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, PollEntity, PollOptionEntity},
    state::lifecycle::{CloseReason, InvalidTransition, PollEvent, PollPhase},
};

/// Display name recorded for answers coming from connections that never joined.
pub const ANONYMOUS_PARTICIPANT: &str = "Anonymous";

/// A question with its ordered options and the answers collected so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    /// Primary key of the poll.
    pub id: Uuid,
    /// Question shown to participants.
    pub question: String,
    /// Ordered options; the position is the answer key.
    pub options: Vec<PollOption>,
    /// Voting window in seconds.
    pub duration_secs: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the poll was mutated.
    pub updated_at: SystemTime,
    /// Moment the poll started accepting answers.
    pub started_at: SystemTime,
    /// Moment the poll was closed.
    pub ended_at: Option<SystemTime>,
    /// Answer log, in submission order.
    pub answers: Vec<Answer>,
    phase: PollPhase,
}

/// One selectable option with its running tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    /// Label shown to participants.
    pub text: String,
    /// Answers recorded for this option.
    pub votes: u32,
}

/// A participant's recorded choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Display name at submission time.
    pub participant_name: String,
    /// Position of the chosen option.
    pub option_index: usize,
    /// Submission timestamp.
    pub answered_at: SystemTime,
}

/// Reasons an answer cannot be recorded on a poll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The poll no longer accepts answers.
    #[error("poll has already ended")]
    AlreadyEnded,
    /// `index` does not name one of the poll's options.
    #[error("option index {index} is out of range (poll has {options} options)")]
    OptionOutOfRange { index: i64, options: usize },
}

impl Poll {
    /// Build a fresh poll in the `Created` phase with every tally at zero.
    pub fn new(question: String, options: Vec<String>, duration_secs: u64) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            question,
            options: options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            duration_secs,
            created_at: now,
            updated_at: now,
            started_at: now,
            ended_at: None,
            answers: Vec::new(),
            phase: PollPhase::Created,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase.is_ended()
    }

    /// Move a created poll to `Active`, stamping its start time.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.phase = self.phase.transition(PollEvent::Start)?;
        let now = SystemTime::now();
        self.started_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Move an active poll to `Ended`, stamping its end time.
    pub fn close(&mut self, reason: CloseReason) -> Result<(), InvalidTransition> {
        self.phase = self.phase.transition(PollEvent::Close(reason))?;
        let now = SystemTime::now();
        self.ended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Check that an answer for `index` would be accepted, without mutating anything.
    pub fn check_answer(&self, index: i64) -> Result<usize, PollError> {
        if self.phase != PollPhase::Active {
            return Err(PollError::AlreadyEnded);
        }

        usize::try_from(index)
            .ok()
            .filter(|index| *index < self.options.len())
            .ok_or(PollError::OptionOutOfRange {
                index,
                options: self.options.len(),
            })
    }

    /// Append an answer and bump the matching option counter.
    pub fn record_answer(&mut self, participant_name: String, index: i64) -> Result<(), PollError> {
        let option_index = self.check_answer(index)?;
        let now = SystemTime::now();
        self.options[option_index].votes += 1;
        self.answers.push(Answer {
            participant_name,
            option_index,
            answered_at: now,
        });
        self.updated_at = now;
        Ok(())
    }
}

impl From<PollOptionEntity> for PollOption {
    fn from(value: PollOptionEntity) -> Self {
        Self {
            text: value.text,
            votes: value.votes,
        }
    }
}

impl From<PollOption> for PollOptionEntity {
    fn from(value: PollOption) -> Self {
        Self {
            text: value.text,
            votes: value.votes,
        }
    }
}

impl From<AnswerEntity> for Answer {
    fn from(value: AnswerEntity) -> Self {
        Self {
            participant_name: value.participant_name,
            option_index: value.option_index,
            answered_at: value.answered_at,
        }
    }
}

impl From<Answer> for AnswerEntity {
    fn from(value: Answer) -> Self {
        Self {
            participant_name: value.participant_name,
            option_index: value.option_index,
            answered_at: value.answered_at,
        }
    }
}

impl From<PollEntity> for Poll {
    fn from(value: PollEntity) -> Self {
        Self {
            id: value.id,
            question: value.question,
            options: value.options.into_iter().map(Into::into).collect(),
            duration_secs: value.duration_secs,
            created_at: value.created_at,
            updated_at: value.updated_at,
            started_at: value.started_at,
            ended_at: value.ended_at,
            answers: value.answers.into_iter().map(Into::into).collect(),
            phase: if value.ended {
                PollPhase::Ended
            } else {
                PollPhase::Active
            },
        }
    }
}

impl From<Poll> for PollEntity {
    fn from(value: Poll) -> Self {
        Self {
            id: value.id,
            question: value.question,
            options: value.options.into_iter().map(Into::into).collect(),
            duration_secs: value.duration_secs,
            created_at: value.created_at,
            updated_at: value.updated_at,
            started_at: value.started_at,
            ended: value.phase.is_ended(),
            ended_at: value.ended_at,
            answers: value.answers.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_poll() -> Poll {
        let mut poll = Poll::new("Pick one".into(), vec!["A".into(), "B".into()], 30);
        poll.start().unwrap();
        poll
    }

    #[test]
    fn new_poll_starts_created_with_zero_votes() {
        let poll = Poll::new("Q".into(), vec!["A".into(), "B".into(), "C".into()], 10);
        assert_eq!(poll.phase(), PollPhase::Created);
        assert!(poll.options.iter().all(|option| option.votes == 0));
        assert!(poll.ended_at.is_none());
    }

    #[test]
    fn created_poll_rejects_answers() {
        let mut poll = Poll::new("Q".into(), vec!["A".into(), "B".into()], 10);
        assert_eq!(
            poll.record_answer("Ada".into(), 0),
            Err(PollError::AlreadyEnded)
        );
    }

    #[test]
    fn answer_increments_matching_counter() {
        let mut poll = active_poll();
        poll.record_answer("Ada".into(), 1).unwrap();
        assert_eq!(poll.options[0].votes, 0);
        assert_eq!(poll.options[1].votes, 1);
        assert_eq!(poll.answers.len(), 1);
        assert_eq!(poll.answers[0].participant_name, "Ada");
    }

    #[test]
    fn out_of_range_index_leaves_poll_untouched() {
        let mut poll = active_poll();
        let before = poll.clone();
        assert_eq!(
            poll.record_answer("Ada".into(), 5),
            Err(PollError::OptionOutOfRange {
                index: 5,
                options: 2
            })
        );
        assert!(matches!(
            poll.record_answer("Ada".into(), -1),
            Err(PollError::OptionOutOfRange { index: -1, .. })
        ));
        assert_eq!(poll, before);
    }

    #[test]
    fn closed_poll_rejects_answers_and_second_close() {
        let mut poll = active_poll();
        poll.close(CloseReason::AllAnswered).unwrap();
        assert!(poll.is_ended());
        assert!(poll.ended_at.is_some());
        assert_eq!(
            poll.record_answer("Ada".into(), 0),
            Err(PollError::AlreadyEnded)
        );
        assert!(poll.close(CloseReason::Timeout).is_err());
    }

    #[test]
    fn entity_conversion_maps_phase_to_ended_flag() {
        let mut poll = active_poll();
        poll.record_answer("Ada".into(), 0).unwrap();

        let entity = PollEntity::from(poll.clone());
        assert!(!entity.ended);
        assert_eq!(Poll::from(entity), poll);

        poll.close(CloseReason::Timeout).unwrap();
        let entity = PollEntity::from(poll.clone());
        assert!(entity.ended);
        assert_eq!(Poll::from(entity).phase(), PollPhase::Ended);
    }
}
