//! Persistence facade for room state.
//!
//! The registry treats storage as a synchronous load/save collaborator and
//! calls it inside the owning room's critical section, so a single room's
//! saves are always applied in order. [`MemoryStore`] is the default
//! backend; alternative backends implement [`RoomStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tycoon_engine::room::Room;

/// Unexpected storage failures. Distinct from game-rule violations; callers
/// should treat these as transient and retryable.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("room store lock poisoned")]
    LockPoisoned,
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub trait RoomStore: Send + Sync {
    fn load(&self, room_id: &str) -> Result<Option<Room>, StorageError>;
    fn save(&self, room: &Room) -> Result<(), StorageError>;
    fn delete(&self, room_id: &str) -> Result<(), StorageError>;
}

/// In-memory store keyed by room id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<String, Room>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoomStore for MemoryStore {
    fn load(&self, room_id: &str) -> Result<Option<Room>, StorageError> {
        let rooms = self.rooms.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(rooms.get(room_id).cloned())
    }

    fn save(&self, room: &Room) -> Result<(), StorageError> {
        let mut rooms = self.rooms.write().map_err(|_| StorageError::LockPoisoned)?;
        rooms.insert(room.id().to_string(), room.clone());
        Ok(())
    }

    fn delete(&self, room_id: &str) -> Result<(), StorageError> {
        let mut rooms = self.rooms.write().map_err(|_| StorageError::LockPoisoned)?;
        rooms.remove(room_id);
        Ok(())
    }
}
