use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dto::{sse::ServerEvent, ws::ServerMessage},
    state::{ConnectionId, SseHub},
};

#[derive(Clone)]
/// Handle used to push messages to a connected WebSocket client.
pub struct ClientConnection {
    /// Identity of the connection.
    pub id: ConnectionId,
    /// Writer channel of the connection.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of live client connections plus the public SSE mirror.
///
/// Delivery is best-effort: messages are not queued for clients that join
/// later, and connections whose writer has gone away are pruned on send.
pub struct Fanout {
    connections: DashMap<ConnectionId, ClientConnection>,
    sse: SseHub,
}

impl Fanout {
    /// Empty registry whose SSE hub buffers `sse_capacity` events.
    pub fn new(sse_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            sse: SseHub::new(sse_capacity),
        }
    }

    /// Start delivering messages to `id`.
    pub fn register(&self, id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(id, ClientConnection { id, tx });
    }

    /// Stop delivering messages to `id`. Returns whether it was registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Broadcast hub backing the public SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Deliver `message` to every registered connection and mirror it on SSE.
    pub fn broadcast(&self, message: &ServerMessage) {
        let value = match serde_json::to_value(message) {
            Ok(value) => value,
            Err(err) => {
                warn!(event = message.event_name(), error = %err, "failed to serialize broadcast");
                return;
            }
        };
        let frame = Message::Text(value.to_string().into());

        self.connections.retain(|id, connection| {
            let delivered = connection.tx.send(frame.clone()).is_ok();
            if !delivered {
                debug!(connection_id = %id, "pruning closed connection");
            }
            delivered
        });

        let payload = value
            .get("payload")
            .map(ToString::to_string)
            .unwrap_or_else(|| "null".into());
        self.sse.broadcast(ServerEvent::new(
            Some(message.event_name().to_string()),
            payload,
        ));
    }

    /// Deliver `message` to a single connection, if it is still registered.
    pub fn notify(&self, id: &ConnectionId, message: &ServerMessage) -> bool {
        let Some(tx) = self.connections.get(id).map(|entry| entry.tx.clone()) else {
            debug!(connection_id = %id, event = message.event_name(), "dropping message for unknown connection");
            return false;
        };

        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(event = message.event_name(), error = %err, "failed to serialize message");
                return false;
            }
        };

        if tx.send(Message::Text(payload.into())).is_err() {
            self.connections.remove(id);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn connect(fanout: &Fanout) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        fanout.register(id, tx);
        (id, rx)
    }

    fn received(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            messages.push(serde_json::from_str(text.as_str()).unwrap());
        }
        messages
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let fanout = Fanout::new(4);
        let (_, mut first) = connect(&fanout);
        let (_, mut second) = connect(&fanout);

        fanout.broadcast(&ServerMessage::UpdateParticipants(vec!["Ada".into()]));

        let expected = vec![ServerMessage::UpdateParticipants(vec!["Ada".into()])];
        assert_eq!(received(&mut first), expected);
        assert_eq!(received(&mut second), expected);
    }

    #[test]
    fn notify_targets_one_connection() {
        let fanout = Fanout::new(4);
        let (target, mut target_rx) = connect(&fanout);
        let (_, mut other_rx) = connect(&fanout);

        assert!(fanout.notify(&target, &ServerMessage::Kicked));
        assert_eq!(received(&mut target_rx), vec![ServerMessage::Kicked]);
        assert!(received(&mut other_rx).is_empty());
        assert!(!fanout.notify(&Uuid::new_v4(), &ServerMessage::Kicked));
    }

    #[test]
    fn closed_connections_are_pruned_on_broadcast() {
        let fanout = Fanout::new(4);
        let (_, rx) = connect(&fanout);
        let (_, mut alive) = connect(&fanout);
        drop(rx);

        fanout.broadcast(&ServerMessage::Kicked);
        assert_eq!(fanout.connection_count(), 1);
        assert_eq!(received(&mut alive), vec![ServerMessage::Kicked]);
    }

    #[test]
    fn broadcast_is_mirrored_on_sse_with_event_name() {
        let fanout = Fanout::new(4);
        let mut sse = fanout.sse().subscribe();

        fanout.broadcast(&ServerMessage::UpdateParticipants(vec!["Ada".into()]));

        let event = sse.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some("updateParticipants"));
        assert_eq!(event.data, r#"["Ada"]"#);
    }

    #[test]
    fn unregistered_connection_no_longer_receives() {
        let fanout = Fanout::new(4);
        let (id, mut rx) = connect(&fanout);
        assert!(fanout.unregister(&id));
        assert!(!fanout.unregister(&id));

        fanout.broadcast(&ServerMessage::Kicked);
        assert!(received(&mut rx).is_empty());
    }
}
