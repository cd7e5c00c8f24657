use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::{directory::RoomDirectory, models::MembershipEntry};
use crate::shared::ChatError;
use crate::websockets::ConnectionRegistry;

/// Live members of one room, keyed by connection id
#[derive(Debug, Default)]
struct RoomMembers {
    entries: HashMap<String, MembershipEntry>,
}

impl RoomMembers {
    fn distinct_users(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|entry| entry.user_id.clone())
            .collect()
    }

    fn snapshot(&self) -> RoomSnapshot {
        let mut user_connections = BTreeMap::new();
        for entry in self.entries.values() {
            *user_connections.entry(entry.user_id.clone()).or_insert(0) += 1;
        }

        RoomSnapshot {
            connection_ids: self.entries.keys().cloned().collect(),
            members: user_connections.keys().cloned().collect(),
            user_connections,
        }
    }
}

/// Consistent view of a room taken under its lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Fan-out set
    pub connection_ids: Vec<String>,
    /// Distinct user ids
    pub members: BTreeSet<String>,
    /// Live connections per user
    pub user_connections: BTreeMap<String, usize>,
}

impl RoomSnapshot {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// How many of the user's connections are in the room
    pub fn connections_of_user(&self, user_id: &str) -> usize {
        self.user_connections.get(user_id).copied().unwrap_or(0)
    }
}

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub entry: MembershipEntry,
    /// False when the connection was already a member
    pub newly_joined: bool,
    pub members: BTreeSet<String>,
    /// False when the roster write for this join failed
    pub roster_synced: bool,
}

/// Result of removing a connection from a room
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub entry: MembershipEntry,
    pub remaining: BTreeSet<String>,
    /// False when the roster write for this leave failed
    pub roster_synced: bool,
}

/// Why a connection is leaving a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Explicit `leave-room`; drops the user from the roster once their last
    /// connection in the room is gone
    Leave,
    /// Socket closed; the roster keeps the user so a reconnect can restore them
    Disconnect,
}

/// Tracks which connections are in which rooms.
///
/// Each room has its own mutex so join/leave on the same room serialize while
/// different rooms proceed independently. The outer map lock is only held to
/// find, create or prune a room slot.
pub struct MembershipTracker {
    rooms: RwLock<HashMap<String, Arc<Mutex<RoomMembers>>>>,
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn RoomDirectory>,
}

impl MembershipTracker {
    pub fn new(registry: Arc<ConnectionRegistry>, directory: Arc<dyn RoomDirectory>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
            directory,
        }
    }

    async fn existing_slot(&self, room_id: &str) -> Option<Arc<Mutex<RoomMembers>>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    async fn room_slot(&self, room_id: &str) -> Arc<Mutex<RoomMembers>> {
        if let Some(slot) = self.existing_slot(room_id).await {
            return slot;
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id = %room_id, "Creating membership slot");
                Arc::new(Mutex::new(RoomMembers::default()))
            })
            .clone()
    }

    /// True while `slot` is still the one registered for the room
    async fn is_current(&self, room_id: &str, slot: &Arc<Mutex<RoomMembers>>) -> bool {
        self.rooms
            .read()
            .await
            .get(room_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Drops the slot of an empty room.
    ///
    /// A join that fetched the slot before it was pruned notices on
    /// `is_current` and retries, so readers holding a clone never keep an
    /// empty room alive.
    async fn prune_if_empty(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(slot) = rooms.get(room_id) else {
            return;
        };

        let is_empty = match slot.try_lock() {
            Ok(members) => members.entries.is_empty(),
            Err(_) => false,
        };
        if is_empty {
            rooms.remove(room_id);
            debug!(room_id = %room_id, "Pruned empty membership slot");
        }
    }

    /// Adds the connection to the room under the identity on record for it.
    ///
    /// Fails with `AuthRequired` for an unauthenticated connection and
    /// `RoomNotFound` for an unknown room; neither changes any state.
    #[instrument(skip(self))]
    pub async fn join(&self, room_id: &str, connection_id: &str) -> Result<JoinOutcome, ChatError> {
        let user_id = self
            .registry
            .user_id(connection_id)
            .await
            .ok_or(ChatError::AuthRequired)?;

        let exists = self.directory.exists(room_id).await.map_err(|e| {
            warn!(room_id = %room_id, error = %e, "Room lookup failed");
            ChatError::Internal("Failed to join debate".to_string())
        })?;
        if !exists {
            debug!(room_id = %room_id, "Join rejected, room not found");
            return Err(ChatError::RoomNotFound(room_id.to_string()));
        }

        let (entry, current, roster_synced) = loop {
            let slot = self.room_slot(room_id).await;
            let mut members = slot.lock().await;
            if !self.is_current(room_id, &slot).await {
                debug!(room_id = %room_id, "Membership slot was pruned, retrying");
                continue;
            }

            if let Some(existing) = members.entries.get(connection_id) {
                debug!(
                    room_id = %room_id,
                    connection_id = %connection_id,
                    "Connection already a member"
                );
                return Ok(JoinOutcome {
                    entry: existing.clone(),
                    newly_joined: false,
                    members: members.distinct_users(),
                    roster_synced: true,
                });
            }

            // The connection may have gone away since the identity lookup
            if !self.registry.track_room(connection_id, room_id).await {
                drop(members);
                drop(slot);
                self.prune_if_empty(room_id).await;
                return Err(ChatError::AuthRequired);
            }

            let entry = MembershipEntry::new(room_id, &user_id, connection_id);
            members
                .entries
                .insert(connection_id.to_string(), entry.clone());

            // Roster writes happen under the room lock so they land in the
            // same order as the membership changes they follow.
            let roster_synced = self.sync_roster(room_id, &user_id, true).await;
            break (entry, members.distinct_users(), roster_synced);
        };

        info!(
            room_id = %room_id,
            user_id = %user_id,
            connection_id = %connection_id,
            member_count = current.len(),
            "Connection joined room"
        );

        Ok(JoinOutcome {
            entry,
            newly_joined: true,
            members: current,
            roster_synced,
        })
    }

    /// Removes the connection from the room; `None` when it was not a member.
    ///
    /// On an explicit leave the user is dropped from the roster once none of
    /// their connections remain in the room.
    #[instrument(skip(self))]
    pub async fn leave(
        &self,
        room_id: &str,
        connection_id: &str,
        departure: Departure,
    ) -> Option<LeaveOutcome> {
        let slot = self.existing_slot(room_id).await?;

        let outcome = {
            let mut members = slot.lock().await;
            let entry = members.entries.remove(connection_id)?;
            self.registry.untrack_room(connection_id, room_id).await;
            let remaining = members.distinct_users();

            let roster_synced =
                if departure == Departure::Leave && !remaining.contains(&entry.user_id) {
                    self.sync_roster(room_id, &entry.user_id, false).await
                } else {
                    true
                };

            LeaveOutcome {
                entry,
                remaining,
                roster_synced,
            }
        };
        drop(slot);

        info!(
            room_id = %room_id,
            user_id = %outcome.entry.user_id,
            connection_id = %connection_id,
            member_count = outcome.remaining.len(),
            ?departure,
            "Connection left room"
        );

        self.prune_if_empty(room_id).await;
        Some(outcome)
    }

    /// Adds or removes the user on the roster, logging a failure
    async fn sync_roster(&self, room_id: &str, user_id: &str, present: bool) -> bool {
        let result = if present {
            self.directory.add_participant(room_id, user_id).await
        } else {
            self.directory.remove_participant(room_id, user_id).await
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    room_id = %room_id,
                    user_id = %user_id,
                    present,
                    error = %e,
                    "Failed to update participant roster"
                );
                false
            }
        }
    }

    /// Distinct user ids currently in the room
    pub async fn members_of(&self, room_id: &str) -> BTreeSet<String> {
        match self.existing_slot(room_id).await {
            Some(slot) => slot.lock().await.distinct_users(),
            None => BTreeSet::new(),
        }
    }

    /// Connection ids currently in the room
    pub async fn connections_of(&self, room_id: &str) -> Vec<String> {
        self.snapshot(room_id).await.connection_ids
    }

    pub async fn snapshot(&self, room_id: &str) -> RoomSnapshot {
        match self.existing_slot(room_id).await {
            Some(slot) => slot.lock().await.snapshot(),
            None => RoomSnapshot::default(),
        }
    }

    pub async fn membership_of(&self, room_id: &str, connection_id: &str) -> Option<MembershipEntry> {
        let slot = self.existing_slot(room_id).await?;
        let members = slot.lock().await;
        members.entries.get(connection_id).cloned()
    }

    /// Number of rooms with at least one live member
    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
