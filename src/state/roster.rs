use indexmap::IndexMap;

use crate::state::ConnectionId;

/// A student currently connected to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Name chosen by the student; not unique across participants.
    pub name: String,
    /// Whether the student already answered the current poll.
    pub answered: bool,
}

/// In-memory table of connected students keyed by connection identity.
///
/// Entries keep their join order, which is the order used for name snapshots and
/// for resolving kicks by name. The roster lives only as long as the process:
/// after a restart clients must join again.
#[derive(Debug, Default)]
pub struct Roster {
    participants: IndexMap<ConnectionId, Participant>,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `name`.
    ///
    /// A new identity starts with `answered = false`; joining again on the same
    /// connection only renames it.
    pub fn upsert(&mut self, id: ConnectionId, name: String) {
        self.participants
            .entry(id)
            .and_modify(|participant| participant.name.clone_from(&name))
            .or_insert(Participant {
                name,
                answered: false,
            });
    }

    /// Drop `id` from the roster, returning its entry.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Participant> {
        self.participants.shift_remove(id)
    }

    /// Entry registered for `id`.
    pub fn get(&self, id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Flag `id` as having answered. Returns `false` when the identity is unknown.
    pub fn mark_answered(&mut self, id: &ConnectionId) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.answered = true;
                true
            }
            None => false,
        }
    }

    /// Clear every answered flag, ahead of a new poll.
    pub fn reset_all_answered(&mut self) {
        for participant in self.participants.values_mut() {
            participant.answered = false;
        }
    }

    /// Number of joined students.
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    /// Display names in join order.
    pub fn names_snapshot(&self) -> Vec<String> {
        self.participants
            .values()
            .map(|participant| participant.name.clone())
            .collect()
    }

    /// First identity, in join order, whose display name equals `name`.
    pub fn find_first_by_name(&self, name: &str) -> Option<ConnectionId> {
        self.participants
            .iter()
            .find(|(_, participant)| participant.name == name)
            .map(|(id, _)| *id)
    }
}
