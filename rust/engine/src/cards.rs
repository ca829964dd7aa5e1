use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents one of the four suits in a standard 52-card deck.
/// Used as a component of [`Card`] to fully define a playing card.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Suit {
    /// Clubs suit (♣)
    #[serde(rename = "♣")]
    Clubs,
    /// Diamonds suit (♦)
    #[serde(rename = "♦")]
    Diamonds,
    /// Hearts suit (♥)
    #[serde(rename = "♥")]
    Hearts,
    /// Spades suit (♠)
    #[serde(rename = "♠")]
    Spades,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        f.write_str(symbol)
    }
}

/// Represents the rank of a playing card, ordered by shedding-game strength.
/// Three is the weakest rank and Two the strongest; the discriminant is the
/// integer strength used for play comparison (`3..=15`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Rank {
    /// Rank 3 (weakest)
    #[serde(rename = "3")]
    Three = 3,
    /// Rank 4
    #[serde(rename = "4")]
    Four,
    /// Rank 5
    #[serde(rename = "5")]
    Five,
    /// Rank 6
    #[serde(rename = "6")]
    Six,
    /// Rank 7
    #[serde(rename = "7")]
    Seven,
    /// Rank 8
    #[serde(rename = "8")]
    Eight,
    /// Rank 9
    #[serde(rename = "9")]
    Nine,
    /// Rank 10
    #[serde(rename = "10")]
    Ten,
    /// Jack (11)
    #[serde(rename = "J")]
    Jack,
    /// Queen (12)
    #[serde(rename = "Q")]
    Queen,
    /// King (13)
    #[serde(rename = "K")]
    King,
    /// Ace (14)
    #[serde(rename = "A")]
    Ace,
    /// Rank 2 (strongest, 15)
    #[serde(rename = "2")]
    Two = 15,
}

impl Rank {
    /// Integer strength of the rank, strictly increasing along
    /// `3 < 4 < ... < 10 < J < Q < K < A < 2`.
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
        };
        f.write_str(label)
    }
}

/// Represents a single playing card with a suit and rank.
/// Cards are immutable values; id and strength are derived from the
/// suit/rank pair, so every card in a 52-card deck has a distinct id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(into = "CardWire", from = "CardWire")]
pub struct Card {
    /// The suit of the card
    pub suit: Suit,
    /// The rank of the card
    pub rank: Rank,
}

impl Card {
    /// Integer strength used for play comparison (3 lowest, 2 → 15 highest).
    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    /// Stable identifier derived from suit and rank (e.g. `"♣-3"`).
    /// Unique within a 52-card deck, never reused across different cards.
    pub fn id(&self) -> String {
        format!("{}-{}", self.suit, self.rank)
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value()
            .cmp(&other.value())
            .then(self.suit.cmp(&other.suit))
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.suit, self.rank)
    }
}

/// Wire form of a card. Carries the derived strength and id alongside the
/// suit/rank pair so clients never have to recompute them.
#[derive(Serialize, Deserialize)]
struct CardWire {
    suit: Suit,
    rank: Rank,
    value: u8,
    id: String,
}

impl From<Card> for CardWire {
    fn from(card: Card) -> Self {
        Self {
            suit: card.suit,
            rank: card.rank,
            value: card.value(),
            id: card.id(),
        }
    }
}

impl From<CardWire> for Card {
    fn from(wire: CardWire) -> Self {
        Self {
            suit: wire.suit,
            rank: wire.rank,
        }
    }
}

pub fn all_suits() -> [Suit; 4] {
    [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades]
}

pub fn all_ranks() -> [Rank; 13] {
    [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
    ]
}

pub fn full_deck() -> Vec<Card> {
    let mut v = Vec::with_capacity(52);
    for &s in &all_suits() {
        for &r in &all_ranks() {
            v.push(Card { suit: s, rank: r });
        }
    }
    v
}
