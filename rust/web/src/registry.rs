use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use tycoon_engine::errors::GameError;
use tycoon_engine::room::{Phase, Room};
use tycoon_engine::rules::validate_play;

use crate::storage::{MemoryStore, RoomStore, StorageError};

pub type RoomId = String;

const DEFAULT_IDLE_TTL: Duration = Duration::minutes(30);

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(RoomId),
    #[error("player name must not be empty")]
    EmptyPlayerName,
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("room registry lock poisoned")]
    LockPoisoned,
}

/// Payload returned when a room is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
    pub player_id: String,
}

/// Payload returned when a player joins an existing room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub player_id: String,
}

/// Minimal lobby listing entry. Hands are never exposed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub phase: Phase,
    pub player_count: usize,
    pub player_names: Vec<String>,
}

impl RoomSummary {
    fn from_room(room: &Room) -> Self {
        Self {
            id: room.id().to_string(),
            phase: room.phase(),
            player_count: room.players().iter().filter(|p| !p.has_departed()).count(),
            player_names: room
                .players()
                .iter()
                .filter(|p| !p.has_departed())
                .map(|p| p.name.clone())
                .collect(),
        }
    }
}

/// The only shared mutable structure in the system. Owns every live room:
/// a coarse `RwLock` guards registry membership while each room carries its
/// own `Mutex`, so operations on different rooms run in parallel and
/// operations on the same room serialize. Rooms never escape the registry
/// by reference; callers get cloned snapshots.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    store: Arc<dyn RoomStore>,
    idle_ttl: Duration,
}

impl fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.room_count())
            .field("idle_ttl", &self.idle_ttl)
            .finish()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn RoomStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    pub fn with_ttl(store: Arc<dyn RoomStore>, idle_ttl: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            idle_ttl,
        }
    }

    /// Creates a new room seeded with its first player.
    pub fn create_room(&self, player_name: &str) -> Result<CreatedRoom, RoomError> {
        let name = player_name.trim();
        if name.is_empty() {
            return Err(RoomError::EmptyPlayerName);
        }

        let player_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut guard = self.rooms.write().map_err(|_| RoomError::LockPoisoned)?;
        let room_id = loop {
            let candidate = Self::room_code();
            if !guard.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Room::new(room_id.clone(), player_id.clone(), name, now);
        self.store.save(&room)?;
        guard.insert(room_id.clone(), Arc::new(Mutex::new(room)));
        drop(guard);

        tracing::info!(room_id = %room_id, player_id = %player_id, "room created");
        Ok(CreatedRoom { room_id, player_id })
    }

    /// Full room snapshot. Reads are not free of side effects: an expired
    /// turn is auto-passed before the snapshot is taken, and the idle clock
    /// restarts.
    pub fn get_room(&self, room_id: &str) -> Result<Room, RoomError> {
        self.with_room(room_id, |room| {
            let now = Utc::now();
            if room.advance_on_timeout(now) {
                tracing::info!(room_id = %room.id(), "turn deadline passed, auto-passed");
            }
            room.touch(now);
            Ok(room.clone())
        })
    }

    pub fn list_rooms(&self) -> Result<Vec<RoomSummary>, RoomError> {
        let handles: Vec<Arc<Mutex<Room>>> = {
            let guard = self.rooms.read().map_err(|_| RoomError::LockPoisoned)?;
            guard.values().cloned().collect()
        };

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let room = handle.lock().map_err(|_| RoomError::LockPoisoned)?;
            summaries.push(RoomSummary::from_room(&room));
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    pub fn join_room(&self, room_id: &str, player_name: &str) -> Result<JoinedRoom, RoomError> {
        let name = player_name.trim().to_string();
        if name.is_empty() {
            return Err(RoomError::EmptyPlayerName);
        }

        let player_id = Uuid::new_v4().to_string();
        self.with_room(room_id, |room| {
            room.join(player_id.clone(), &name, Utc::now())?;
            Ok(())
        })?;

        tracing::info!(room_id = %room_id, player_id = %player_id, "player joined");
        Ok(JoinedRoom { player_id })
    }

    pub fn start_game(&self, room_id: &str) -> Result<(), RoomError> {
        self.with_room(room_id, |room| {
            room.start(None, Utc::now())?;
            tracing::info!(
                room_id = %room.id(),
                opener = %room.current_player().map(|p| p.name.as_str()).unwrap_or(""),
                "game started"
            );
            Ok(())
        })
    }

    /// Validates the selection against the player's hand and the current
    /// trick, then commits the play. The room itself only enforces turn
    /// ownership; the rule check happens here, at the transport boundary.
    pub fn play_cards(
        &self,
        room_id: &str,
        player_id: &str,
        card_ids: &[String],
    ) -> Result<(), RoomError> {
        self.with_room(room_id, |room| {
            room.require_turn(player_id)?;
            let cards = room.cards_for(player_id, card_ids)?;
            let last = room.last_play().map(|p| p.cards.clone());
            validate_play(&cards, last.as_deref(), room.is_opening()).map_err(RoomError::Game)?;

            room.play(player_id, card_ids, Utc::now())?;
            tracing::debug!(
                room_id = %room.id(),
                player_id = %player_id,
                cards = cards.len(),
                "play accepted"
            );
            Ok(())
        })
    }

    pub fn pass_turn(&self, room_id: &str, player_id: &str) -> Result<(), RoomError> {
        self.with_room(room_id, |room| {
            room.pass(player_id, Utc::now())?;
            tracing::debug!(room_id = %room.id(), player_id = %player_id, "turn passed");
            Ok(())
        })
    }

    /// Best-effort removal; the room is destroyed once its last seated
    /// player leaves.
    pub fn leave_room(&self, room_id: &str, player_id: &str) -> Result<(), RoomError> {
        let handle = self.room_handle(room_id)?;
        let empty = {
            let mut room = handle.lock().map_err(|_| RoomError::LockPoisoned)?;
            let empty = room.leave(player_id, Utc::now());
            if empty {
                self.store.delete(room.id())?;
            } else {
                self.store.save(&room)?;
            }
            empty
        };

        if empty {
            let mut guard = self.rooms.write().map_err(|_| RoomError::LockPoisoned)?;
            guard.remove(room_id);
            tracing::info!(room_id = %room_id, "room emptied, deleted");
        }
        Ok(())
    }

    /// Deletes rooms whose `last_activity` is older than the idle TTL.
    /// Takes each room's own lock before deciding, so a room mid-operation
    /// is never swept. Returns the number of rooms removed.
    pub fn sweep_idle_rooms(&self) -> usize {
        let now = Utc::now();
        let mut expired = Vec::new();
        {
            let mut guard = match self.rooms.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.retain(|id, handle| match handle.lock() {
                Ok(room) => {
                    if room.is_idle(now, self.idle_ttl) {
                        expired.push(id.clone());
                        false
                    } else {
                        true
                    }
                }
                Err(_) => {
                    expired.push(id.clone());
                    false
                }
            });
        }

        for id in &expired {
            if let Err(err) = self.store.delete(id) {
                tracing::warn!(room_id = %id, error = %err, "failed to delete swept room from store");
            }
            tracing::info!(room_id = %id, "idle room swept");
        }
        expired.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    fn room_code() -> String {
        let mut rng = rand::rng();
        (0..ROOM_CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..ROOM_CODE_CHARSET.len());
                ROOM_CODE_CHARSET[idx] as char
            })
            .collect()
    }

    /// Looks the room up in the live map, falling back to the store so a
    /// persisted room survives a registry restart.
    fn room_handle(&self, room_id: &str) -> Result<Arc<Mutex<Room>>, RoomError> {
        {
            let guard = self.rooms.read().map_err(|_| RoomError::LockPoisoned)?;
            if let Some(handle) = guard.get(room_id) {
                return Ok(Arc::clone(handle));
            }
        }

        match self.store.load(room_id)? {
            Some(room) => {
                let mut guard = self.rooms.write().map_err(|_| RoomError::LockPoisoned)?;
                let handle = guard
                    .entry(room_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(room)));
                Ok(Arc::clone(handle))
            }
            None => Err(RoomError::NotFound(room_id.to_string())),
        }
    }

    /// Runs `f` under the room's lock and writes the room through to the
    /// store before releasing it, keeping save order consistent with the
    /// mutation order.
    fn with_room<T>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Room) -> Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        let handle = self.room_handle(room_id)?;
        let mut room = handle.lock().map_err(|_| RoomError::LockPoisoned)?;
        let out = f(&mut room)?;
        self.store.save(&room)?;
        Ok(out)
    }
}

impl crate::errors::IntoErrorResponse for RoomError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::EmptyPlayerName => StatusCode::BAD_REQUEST,
            RoomError::Game(GameError::PlayerNotFound) => StatusCode::NOT_FOUND,
            RoomError::Game(GameError::NameTaken) => StatusCode::CONFLICT,
            RoomError::Game(_) => StatusCode::BAD_REQUEST,
            RoomError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RoomError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RoomError::NotFound(_) => "room_not_found",
            RoomError::EmptyPlayerName => "invalid_request",
            RoomError::Game(game) => match game {
                GameError::PlayerNotFound => "player_not_found",
                GameError::NotYourTurn => "not_your_turn",
                GameError::NameTaken => "name_taken",
                GameError::RoomFull => "room_full",
                GameError::AlreadyStarted => "game_already_started",
                GameError::NeedFourPlayers => "need_four_players",
                GameError::NotPlaying => "game_not_in_progress",
                _ => "invalid_play",
            },
            RoomError::Storage(_) => "storage_error",
            RoomError::LockPoisoned => "registry_lock_poisoned",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            RoomError::NotFound(id) => Some(serde_json::json!({ "roomId": id })),
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        use crate::errors::ErrorSeverity;
        match self {
            RoomError::LockPoisoned => ErrorSeverity::Critical,
            RoomError::Storage(_) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}
