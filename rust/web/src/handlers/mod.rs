pub mod health;
pub mod rooms;

pub use health::health;
pub use rooms::{
    create_room, get_room, join_room, leave_room, list_rooms, pass_turn, play_cards, start_game,
    CreateRoomRequest, JoinRoomRequest, PlayRequest, PlayerRequest,
};
