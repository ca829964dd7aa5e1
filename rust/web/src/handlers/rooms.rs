use crate::registry::{RoomError, RoomId, RoomRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::{self, StatusCode};
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub player_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    pub player_id: String,
    pub card_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_id: String,
}

/// Creates a new room seeded with its first player.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms`
///
/// # Request Format
/// ```json
/// { "playerName": "Alice" }
/// ```
///
/// # Response Format
/// - **Success (201 Created)**: `{ "roomId": "AB12CD", "playerId": "uuid" }`
/// - **Error (400 Bad Request)**: `invalid_request` when the name is blank
///
/// The returned player id is the caller's credential for every later move
/// in this room; it is never recoverable afterwards.
pub async fn create_room(registry: Arc<RoomRegistry>, request: CreateRoomRequest) -> Response {
    match registry.create_room(&request.player_name) {
        Ok(created) => success_response(StatusCode::CREATED, created),
        Err(err) => room_error(err),
    }
}

/// Lists every live room as a lobby summary. Hands and turn state are
/// deliberately absent from the payload.
pub async fn list_rooms(registry: Arc<RoomRegistry>) -> Response {
    match registry.list_rooms() {
        Ok(rooms) => success_response(StatusCode::OK, rooms),
        Err(err) => room_error(err),
    }
}

/// Returns the full room snapshot.
///
/// # HTTP Method and Path
/// - **Method**: GET
/// - **Path**: `/api/rooms/{room_id}`
///
/// # Purpose
/// The polling endpoint clients hit for game state. An expired turn is
/// auto-passed before the snapshot is assembled, so a stalled room heals
/// as soon as anyone looks at it.
///
/// # Error Cases
/// - `room_not_found`: no room with the given id exists
pub async fn get_room(registry: Arc<RoomRegistry>, room_id: RoomId) -> Response {
    match registry.get_room(&room_id) {
        Ok(room) => success_response(StatusCode::OK, room),
        Err(err) => room_error(err),
    }
}

/// Seats a new player in an existing room.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms/{room_id}/join`
///
/// # Response Format
/// - **Success (200 OK)**: `{ "playerId": "uuid" }`
/// - **Error (400)**: `game_already_started`, `room_full`
/// - **Error (404)**: `room_not_found`
/// - **Error (409)**: `name_taken`
pub async fn join_room(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    request: JoinRoomRequest,
) -> Response {
    match registry.join_room(&room_id, &request.player_name) {
        Ok(joined) => success_response(StatusCode::OK, joined),
        Err(err) => room_error(err),
    }
}

/// Deals the deck and opens play. Requires exactly four seated players.
pub async fn start_game(registry: Arc<RoomRegistry>, room_id: RoomId) -> Response {
    match registry
        .start_game(&room_id)
        .and_then(|()| registry.get_room(&room_id))
    {
        Ok(room) => success_response(StatusCode::OK, room),
        Err(err) => room_error(err),
    }
}

/// Submits a play for the turn-holder.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/api/rooms/{room_id}/play`
///
/// # Request Format
/// ```json
/// { "playerId": "uuid", "cardIds": ["♥-5", "♠-5"] }
/// ```
///
/// # Response Format
/// - **Success (200 OK)**: the updated room snapshot
/// - **Error (400)**: rule violations (`invalid_play`, `not_your_turn`, ...)
/// - **Error (404)**: `room_not_found`, `player_not_found`
pub async fn play_cards(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    request: PlayRequest,
) -> Response {
    match registry
        .play_cards(&room_id, &request.player_id, &request.card_ids)
        .and_then(|()| registry.get_room(&room_id))
    {
        Ok(room) => success_response(StatusCode::OK, room),
        Err(err) => room_error(err),
    }
}

/// Passes the turn for the turn-holder.
pub async fn pass_turn(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    request: PlayerRequest,
) -> Response {
    match registry
        .pass_turn(&room_id, &request.player_id)
        .and_then(|()| registry.get_room(&room_id))
    {
        Ok(room) => success_response(StatusCode::OK, room),
        Err(err) => room_error(err),
    }
}

/// Removes a player from the room. The room is destroyed when the last
/// seated player leaves, so a follow-up GET may 404.
pub async fn leave_room(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    request: PlayerRequest,
) -> Response {
    match registry.leave_room(&room_id, &request.player_id) {
        Ok(()) => empty_response(StatusCode::NO_CONTENT),
        Err(err) => room_error(err),
    }
}

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn empty_response(status: StatusCode) -> Response {
    http::Response::builder()
        .status(status)
        .body(warp::hyper::Body::empty())
        .expect("build empty response")
}

fn room_error(err: RoomError) -> Response {
    use crate::errors::IntoErrorResponse;
    err.into_http_response()
}
