use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::poll_service,
    state::{ConnectionId, SharedState},
};

/// Writer channel closed; the connection should be torn down.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// Handle the full lifecycle of one teacher or student WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id: ConnectionId = Uuid::new_v4();
    state.fanout().register(connection_id, outbound_tx.clone());
    info!(connection_id = %connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text, "received client message");

                let outcome = match ClientMessage::from_json_str(&text) {
                    Ok(message) => dispatch(&state, connection_id, message).await,
                    Err(err) => {
                        warn!(connection_id = %connection_id, error = %err, "failed to parse client message");
                        Err(ServiceError::Validation("malformed message".into()))
                    }
                };

                if let Err(err) = outcome {
                    debug!(connection_id = %connection_id, error = %err, "rejecting client request");
                    let reply = ServerMessage::ErrorMessage(err.to_string());
                    if send_message_to_websocket(&outbound_tx, &reply).is_err() {
                        info!(connection_id = %connection_id, "connection closed while reporting an error");
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection_id = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    poll_service::leave(&state, connection_id).await;
    info!(connection_id = %connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed client message to the poll coordinator.
async fn dispatch(
    state: &SharedState,
    connection_id: ConnectionId,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::Join(request) => {
            poll_service::join(state, connection_id, request).await;
        }
        ClientMessage::CreatePoll(request) => {
            poll_service::create_poll(state, request).await?;
        }
        ClientMessage::SubmitAnswer(request) => {
            poll_service::submit_answer(state, connection_id, request).await?;
        }
        ClientMessage::KickStudent(request) => {
            poll_service::kick_student(state, request).await;
        }
        ClientMessage::EndPoll => {
            poll_service::end_active_poll(state).await?;
        }
    }
    Ok(())
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// A serialization failure is logged and swallowed; a closed writer is reported.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::poll_store::MemoryPollStore,
        state::AppState,
    };

    async fn setup() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_poll_store(Arc::new(MemoryPollStore::new())).await;
        state
    }

    fn parse(text: &str) -> ClientMessage {
        ClientMessage::from_json_str(text).unwrap()
    }

    #[tokio::test]
    async fn dispatch_drives_the_poll_lifecycle() {
        let state = setup().await;
        let student = Uuid::new_v4();

        dispatch(
            &state,
            student,
            parse(r#"{"event":"join","payload":{"name":"Ada","role":"student"}}"#),
        )
        .await
        .unwrap();
        dispatch(
            &state,
            Uuid::new_v4(),
            parse(r#"{"event":"createPoll","payload":{"question":"Q?","options":["A","B"],"duration":30}}"#),
        )
        .await
        .unwrap();

        let active = poll_service::active_poll(&state).await.unwrap();
        let submit = format!(
            r#"{{"event":"submitAnswer","payload":{{"pollId":"{}","optionIndex":1}}}}"#,
            active.id
        );
        dispatch(&state, student, parse(&submit)).await.unwrap();

        // The only student answered, so the poll is closed.
        assert!(poll_service::active_poll(&state).await.is_none());
        let err = dispatch(&state, student, parse(r#"{"event":"endPoll"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_poll_is_reported_to_the_caller() {
        let state = setup().await;
        let err = dispatch(
            &state,
            Uuid::new_v4(),
            parse(r#"{"event":"createPoll","payload":{"question":"","options":["A"]}}"#),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn error_replies_are_framed_as_error_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_message_to_websocket(&tx, &ServerMessage::ErrorMessage("Already answered".into()))
            .unwrap();

        let Ok(Message::Text(text)) = rx.try_recv() else {
            panic!("expected a text frame");
        };
        assert_eq!(
            text.as_str(),
            r#"{"event":"errorMessage","payload":"Already answered"}"#
        );

        drop(rx);
        assert!(send_message_to_websocket(&tx, &ServerMessage::Kicked).is_err());
    }
}
