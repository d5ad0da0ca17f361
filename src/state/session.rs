use std::collections::HashSet;

use tokio::task::AbortHandle;

use crate::state::{ConnectionId, poll::Poll, roster::Roster};

/// Coordinator state guarded by a single lock: the active poll and the roster.
#[derive(Debug, Default)]
pub struct PollSession {
    /// Poll currently accepting answers, if any.
    pub active: Option<ActivePoll>,
    /// Students currently joined.
    pub roster: Roster,
}

/// The active poll together with its pending auto-close timer.
#[derive(Debug)]
pub struct ActivePoll {
    /// In-memory copy of the poll, kept in sync with the store.
    pub poll: Poll,
    timer: Option<AbortHandle>,
    responders: HashSet<ConnectionId>,
}

impl ActivePoll {
    /// Track `poll` as active, owning the timer that closes it.
    pub fn new(poll: Poll, timer: AbortHandle) -> Self {
        Self {
            poll,
            timer: Some(timer),
            responders: HashSet::new(),
        }
    }

    /// Whether `connection` already has an answer recorded on this poll,
    /// whether or not it is still on the roster.
    pub fn has_responded(&self, connection: &ConnectionId) -> bool {
        self.responders.contains(connection)
    }

    /// Remember that `connection` answered this poll.
    pub fn record_responder(&mut self, connection: ConnectionId) {
        self.responders.insert(connection);
    }

    /// Abort the pending timer so it never fires for this poll.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn responders_are_tracked_per_connection() {
        let handle = tokio::spawn(async {}).abort_handle();
        let poll = Poll::new("Q?".into(), vec!["A".into(), "B".into()], 10);
        let mut active = ActivePoll::new(poll, handle);
        let connection = Uuid::new_v4();

        assert!(!active.has_responded(&connection));
        active.record_responder(connection);
        assert!(active.has_responded(&connection));
        assert!(!active.has_responded(&Uuid::new_v4()));
    }
}
