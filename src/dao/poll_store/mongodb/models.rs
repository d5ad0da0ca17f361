use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{AnswerEntity, PollEntity, PollOptionEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPollDocument {
    #[serde(rename = "_id")]
    id: String,
    question: String,
    options: Vec<MongoOptionDocument>,
    duration_secs: i64,
    created_at: DateTime,
    updated_at: DateTime,
    started_at: DateTime,
    ended: bool,
    #[serde(default)]
    ended_at: Option<DateTime>,
    #[serde(default)]
    answers: Vec<MongoAnswerDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOptionDocument {
    text: String,
    #[serde(default)]
    votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    student_name: String,
    option_index: i64,
    answered_at: DateTime,
}

impl From<PollEntity> for MongoPollDocument {
    fn from(value: PollEntity) -> Self {
        Self {
            id: value.id.to_string(),
            question: value.question,
            options: value
                .options
                .into_iter()
                .map(|option| MongoOptionDocument {
                    text: option.text,
                    votes: i64::from(option.votes),
                })
                .collect(),
            duration_secs: i64::try_from(value.duration_secs).unwrap_or(i64::MAX),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            started_at: DateTime::from_system_time(value.started_at),
            ended: value.ended,
            ended_at: value.ended_at.map(DateTime::from_system_time),
            answers: value
                .answers
                .into_iter()
                .map(|answer| MongoAnswerDocument {
                    student_name: answer.participant_name,
                    option_index: i64::try_from(answer.option_index).unwrap_or(i64::MAX),
                    answered_at: DateTime::from_system_time(answer.answered_at),
                })
                .collect(),
        }
    }
}

impl TryFrom<MongoPollDocument> for PollEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPollDocument) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| MongoDaoError::MalformedDocument {
            id: value.id.clone(),
            reason: reason.to_owned(),
        };

        let id = Uuid::parse_str(&value.id).map_err(|_| malformed("identifier is not a UUID"))?;
        let duration_secs =
            u64::try_from(value.duration_secs).map_err(|_| malformed("negative duration"))?;

        let options = value
            .options
            .iter()
            .map(|option| {
                Ok(PollOptionEntity {
                    text: option.text.clone(),
                    votes: u32::try_from(option.votes)
                        .map_err(|_| malformed("vote counter out of range"))?,
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;

        let answers = value
            .answers
            .iter()
            .map(|answer| {
                Ok(AnswerEntity {
                    participant_name: answer.student_name.clone(),
                    option_index: usize::try_from(answer.option_index)
                        .map_err(|_| malformed("negative option index"))?,
                    answered_at: answer.answered_at.to_system_time(),
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;

        Ok(Self {
            id,
            question: value.question,
            options,
            duration_secs,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            started_at: value.started_at.to_system_time(),
            ended: value.ended,
            ended_at: value.ended_at.map(|at| at.to_system_time()),
            answers,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn sample() -> PollEntity {
        let at = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);
        PollEntity {
            id: Uuid::new_v4(),
            question: "Favourite colour?".into(),
            options: vec![
                PollOptionEntity {
                    text: "Red".into(),
                    votes: 2,
                },
                PollOptionEntity {
                    text: "Blue".into(),
                    votes: 1,
                },
            ],
            duration_secs: 45,
            created_at: at,
            updated_at: at,
            started_at: at,
            ended: true,
            ended_at: Some(at + Duration::from_secs(45)),
            answers: vec![AnswerEntity {
                participant_name: "Ada".into(),
                option_index: 1,
                answered_at: at + Duration::from_secs(3),
            }],
        }
    }

    #[test]
    fn document_conversion_keeps_tallies_and_answers() {
        let entity = sample();
        let document = MongoPollDocument::from(entity.clone());
        assert_eq!(document.id, entity.id.to_string());

        let back = PollEntity::try_from(document).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn malformed_identifier_is_rejected() {
        let mut document = MongoPollDocument::from(sample());
        document.id = "not-a-uuid".into();
        let err = PollEntity::try_from(document).unwrap_err();
        assert!(matches!(err, MongoDaoError::MalformedDocument { .. }));
    }
}
