//! Domain entities.

use std::collections::BTreeSet;

use serde::Serialize;

use super::value_object::{ConnectionId, EventId, EventName, Timestamp};
use flashcrowd_shared::protocol::{EffectDescriptor, Role};

/// An event record owned by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: EventId,
    /// Attendee join code
    pub pin: String,
    pub name: EventName,
    /// Anonymous id of the host who created the event
    pub host_id: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Input for creating an event
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: EventName,
    pub host_id: String,
}

/// A connection's participation in one event
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub event_id: EventId,
    pub role: Role,
    pub is_active: bool,
    pub joined_at: Timestamp,
}

/// Participant counts of a room, derived from session records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParticipantStats {
    pub active_now: usize,
    pub total_joined: usize,
}

/// Relay-side state of one room.
///
/// Owned by the relay router task; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomState {
    pub event_id: EventId,
    pub members: BTreeSet<ConnectionId>,
    /// The only connection allowed to broadcast effects (last host join wins)
    pub authorized_host: Option<ConnectionId>,
    pub last_effect: Option<EffectDescriptor>,
}

impl RoomState {
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            members: BTreeSet::new(),
            authorized_host: None,
            last_effect: None,
        }
    }

    /// Add a member. A host join overwrites the authorized host unconditionally.
    pub fn admit(&mut self, connection_id: ConnectionId, role: Role) {
        if role == Role::Host {
            self.authorized_host = Some(connection_id.clone());
        }
        self.members.insert(connection_id);
    }

    /// Remove a member, returning whether it was present.
    ///
    /// The authorized host slot is left untouched: host authority only moves on
    /// a new host join.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> bool {
        self.members.remove(connection_id)
    }

    pub fn is_authorized_host(&self, connection_id: &ConnectionId) -> bool {
        self.authorized_host.as_ref() == Some(connection_id)
    }

    pub fn record_effect(&mut self, effect: EffectDescriptor) {
        self.last_effect = Some(effect);
    }

    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members.iter().cloned().collect()
    }
}
