//! # tycoon-engine: president/scum game core
//!
//! The rules and state machine for a four-player shedding card game
//! ("president/scum" ranking). Each room is an independent, timed state
//! machine tracking hands, turn order, the trick in play, pass accounting,
//! and end-of-game ranking. The crate is synchronous and I/O-free; all
//! randomness flows through a seedable RNG so games are reproducible.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation (Suit, Rank, Card) and deck construction
//! - [`deck`] - Deterministic shuffling and the round-robin 4-way deal
//! - [`rules`] - Pure play validation and the "can this hand beat it" check
//! - [`player`] - Seat state: hand, liveness flag, final ranking
//! - [`room`] - The room state machine: lifecycle, turns, tricks, timeouts
//! - [`errors`] - User-facing rule and lifecycle violations
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Utc;
//! use tycoon_engine::room::{Phase, Room};
//!
//! let now = Utc::now();
//! let mut room = Room::new("ABC123", "p1", "Alice", now);
//! room.join("p2", "Bob", now)?;
//! room.join("p3", "Carol", now)?;
//! room.join("p4", "Dave", now)?;
//!
//! room.start(Some(42), now)?;
//! assert_eq!(room.phase(), Phase::Playing);
//!
//! // The opening player holds the lowest card in the deal.
//! let opener = room.current_player().unwrap();
//! assert_eq!(opener.lowest_card().unwrap().value(), 3);
//! # Ok::<(), tycoon_engine::errors::GameError>(())
//! ```
//!
//! ## Deterministic Deals
//!
//! Same seed, same hands:
//!
//! ```rust
//! use tycoon_engine::deck::Deck;
//!
//! let mut d1 = Deck::new_with_seed(7);
//! let mut d2 = Deck::new_with_seed(7);
//! d1.shuffle();
//! d2.shuffle();
//! assert_eq!(d1.deal(4), d2.deal(4));
//! ```

pub mod cards;
pub mod deck;
pub mod errors;
pub mod player;
pub mod room;
pub mod rules;
