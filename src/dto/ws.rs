use serde::{Deserialize, Serialize};

use crate::dto::poll::{
    CreatePollRequest, JoinRequest, KickStudentRequest, PollSnapshot, SubmitAnswerRequest,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Messages accepted from teacher and student WebSocket clients.
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    Join(JoinRequest),
    CreatePoll(CreatePollRequest),
    SubmitAnswer(SubmitAnswerRequest),
    KickStudent(KickStudentRequest),
    EndPoll,
}

impl ClientMessage {
    /// Parse a text frame received from a client.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Messages pushed to clients, either broadcast or targeted at one connection.
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    NewPoll(PollSnapshot),
    PollResults(PollSnapshot),
    PollEnded(PollSnapshot),
    UpdateParticipants(Vec<String>),
    ErrorMessage(String),
    Kicked,
}

impl ServerMessage {
    /// Wire name of the message, also used as the SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::NewPoll(_) => "newPoll",
            Self::PollResults(_) => "pollResults",
            Self::PollEnded(_) => "pollEnded",
            Self::UpdateParticipants(_) => "updateParticipants",
            Self::ErrorMessage(_) => "errorMessage",
            Self::Kicked => "kicked",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dto::poll::Role;

    #[test]
    fn parses_join_frame() {
        let message = ClientMessage::from_json_str(
            r#"{"event":"join","payload":{"name":"Ada","role":"student"}}"#,
        )
        .unwrap();
        let ClientMessage::Join(join) = message else {
            panic!("expected join, got {message:?}");
        };
        assert_eq!(join.name, "Ada");
        assert_eq!(join.role, Role::Student);
    }

    #[test]
    fn parses_submit_answer_frame() {
        let message = ClientMessage::from_json_str(
            r#"{"event":"submitAnswer","payload":{"pollId":"abc","optionIndex":-1}}"#,
        )
        .unwrap();
        let ClientMessage::SubmitAnswer(answer) = message else {
            panic!("expected submitAnswer, got {message:?}");
        };
        assert_eq!(answer.poll_id, "abc");
        assert_eq!(answer.option_index, -1);
    }

    #[test]
    fn parses_end_poll_without_payload() {
        let message = ClientMessage::from_json_str(r#"{"event":"endPoll"}"#).unwrap();
        assert!(matches!(message, ClientMessage::EndPoll));
    }

    #[test]
    fn rejects_unknown_event() {
        assert!(ClientMessage::from_json_str(r#"{"event":"dance","payload":{}}"#).is_err());
    }

    #[test]
    fn server_messages_use_event_and_payload_fields() {
        let value = serde_json::to_value(ServerMessage::UpdateParticipants(vec![
            "Ada".into(),
            "Grace".into(),
        ]))
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "updateParticipants", "payload": ["Ada", "Grace"]})
        );

        let value = serde_json::to_value(ServerMessage::ErrorMessage("nope".into())).unwrap();
        assert_eq!(value, json!({"event": "errorMessage", "payload": "nope"}));
    }

    #[test]
    fn event_name_matches_serialized_tag() {
        let messages = [
            ServerMessage::Kicked,
            ServerMessage::ErrorMessage("x".into()),
            ServerMessage::UpdateParticipants(Vec::new()),
        ];
        for message in messages {
            let value = serde_json::to_value(&message).unwrap();
            assert_eq!(value["event"], json!(message.event_name()));
        }
    }
}
