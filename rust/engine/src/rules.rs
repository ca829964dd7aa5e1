use std::collections::HashMap;

use crate::cards::Card;
use crate::errors::GameError;

/// Validates a candidate play against the last accepted play of the trick.
///
/// Rules are checked in order, short-circuiting on the first failure:
/// the set must be non-empty, all cards must share one rank, an opening
/// play (or a play with no predecessor) is then unconditionally legal,
/// otherwise the card count must match the last play and the rank strength
/// must be strictly greater.
///
/// # Examples
///
/// ```
/// use tycoon_engine::cards::{Card, Rank, Suit};
/// use tycoon_engine::errors::GameError;
/// use tycoon_engine::rules::validate_play;
///
/// let five = [Card { suit: Suit::Hearts, rank: Rank::Five }];
/// let nine = [Card { suit: Suit::Spades, rank: Rank::Nine }];
///
/// // Any same-rank set may open a trick
/// assert!(validate_play(&five, None, true).is_ok());
///
/// // A follow-up must be strictly higher at the same count
/// assert!(validate_play(&nine, Some(&five), false).is_ok());
/// assert_eq!(
///     validate_play(&five, Some(&nine), false),
///     Err(GameError::CardTooLow)
/// );
/// ```
pub fn validate_play(
    cards: &[Card],
    last_play: Option<&[Card]>,
    opening: bool,
) -> Result<(), GameError> {
    if cards.is_empty() {
        return Err(GameError::EmptyPlay);
    }

    let rank = cards[0].rank;
    if cards.iter().any(|c| c.rank != rank) {
        return Err(GameError::MixedRanks);
    }

    let last = match last_play {
        Some(last) if !opening => last,
        _ => return Ok(()),
    };

    if cards.len() != last.len() {
        return Err(GameError::WrongCardCount {
            required: last.len(),
        });
    }

    if cards[0].value() <= last[0].value() {
        return Err(GameError::CardTooLow);
    }

    Ok(())
}

/// Whether `hand` contains any same-rank group able to beat the last play.
///
/// Advisory only: the UI uses this to enable or disable the play control.
/// Enforcement always happens through [`validate_play`] at play time.
pub fn can_beat(hand: &[Card], last_play: Option<&[Card]>, opening: bool) -> bool {
    let last = match last_play {
        Some(last) if !opening => last,
        _ => return !hand.is_empty(),
    };

    let required = last.len();
    let last_value = last[0].value();

    let mut groups: HashMap<u8, usize> = HashMap::new();
    for card in hand {
        *groups.entry(card.value()).or_insert(0) += 1;
    }

    groups
        .iter()
        .any(|(&value, &count)| count >= required && value > last_value)
}
