use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::errors::GameError;

/// Final standing assigned at game end, mapped from the order in which
/// players emptied their hands (first out → President, last remaining
/// active player → Scum).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ranking {
    President,
    VicePresident,
    ViceScum,
    Scum,
}

/// A seated player. The hand is owned exclusively by the room while a game
/// is active and stays sorted ascending by strength; `cards_remaining` is a
/// cache of the hand length kept in lockstep with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Opaque identifier, unique within a room, assigned at join time.
    pub id: String,
    /// Display name, unique within a room at join time.
    pub name: String,
    hand: Vec<Card>,
    cards_remaining: usize,
    is_active: bool,
    #[serde(default)]
    departed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Ranking>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hand: Vec::new(),
            cards_remaining: 0,
            is_active: true,
            departed: false,
            position: None,
        }
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn cards_remaining(&self) -> usize {
        self.cards_remaining
    }

    /// False once the hand is emptied or the player has left; inactive
    /// players are skipped in turn order.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn has_departed(&self) -> bool {
        self.departed
    }

    pub fn position(&self) -> Option<Ranking> {
        self.position
    }

    /// Lowest card, relying on the hand's ascending sort order.
    pub fn lowest_card(&self) -> Option<Card> {
        self.hand.first().copied()
    }

    pub(crate) fn assign_hand(&mut self, cards: Vec<Card>) {
        self.cards_remaining = cards.len();
        self.hand = cards;
    }

    /// Removes the cards with the given ids from the hand, all or nothing.
    /// Duplicate ids in the request count as missing cards.
    pub(crate) fn take_cards(&mut self, card_ids: &[String]) -> Result<Vec<Card>, GameError> {
        let mut remaining = self.hand.clone();
        let mut taken = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            match remaining.iter().position(|c| c.id() == *id) {
                Some(i) => taken.push(remaining.remove(i)),
                None => return Err(GameError::CardsNotInHand),
            }
        }
        self.cards_remaining = remaining.len();
        self.hand = remaining;
        Ok(taken)
    }

    pub(crate) fn retire(&mut self) {
        self.is_active = false;
    }

    pub(crate) fn mark_departed(&mut self) {
        self.departed = true;
        self.is_active = false;
    }

    pub(crate) fn set_position(&mut self, position: Ranking) {
        self.position = Some(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};

    fn card(suit: Suit, rank: Rank) -> Card {
        Card { suit, rank }
    }

    #[test]
    fn take_cards_is_all_or_nothing() {
        let mut player = Player::new("p1", "Alice");
        player.assign_hand(vec![
            card(Suit::Clubs, Rank::Three),
            card(Suit::Hearts, Rank::Five),
        ]);

        let err = player.take_cards(&["♣-3".to_string(), "♠-9".to_string()]);
        assert_eq!(err, Err(GameError::CardsNotInHand));
        assert_eq!(player.cards_remaining(), 2, "failed take must not mutate");

        let taken = player
            .take_cards(&["♥-5".to_string()])
            .expect("card present");
        assert_eq!(taken[0].rank, Rank::Five);
        assert_eq!(player.cards_remaining(), 1);
        assert_eq!(player.hand().len(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut player = Player::new("p1", "Alice");
        player.assign_hand(vec![card(Suit::Clubs, Rank::Three)]);

        let err = player.take_cards(&["♣-3".to_string(), "♣-3".to_string()]);
        assert_eq!(err, Err(GameError::CardsNotInHand));
        assert_eq!(player.cards_remaining(), 1);
    }
}
