use thiserror::Error;

/// Rule and lifecycle violations surfaced to players. All variants are
/// expected, recoverable conditions; the display strings are the
/// user-facing reasons.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("must play at least one card")]
    EmptyPlay,
    #[error("all cards must have the same rank")]
    MixedRanks,
    #[error("must play {required} card(s)")]
    WrongCardCount { required: usize },
    #[error("cards must be higher than previous play")]
    CardTooLow,
    #[error("invalid card selection")]
    CardsNotInHand,
    #[error("not your turn")]
    NotYourTurn,
    #[error("player not found")]
    PlayerNotFound,
    #[error("game already started")]
    AlreadyStarted,
    #[error("room is full")]
    RoomFull,
    #[error("name already taken")]
    NameTaken,
    #[error("need exactly 4 players to start")]
    NeedFourPlayers,
    #[error("game is not in progress")]
    NotPlaying,
}
