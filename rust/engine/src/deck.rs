use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};

#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
    rng: ChaCha20Rng,
}

impl Deck {
    pub fn new() -> Self {
        Self::new_with_seed(rand::rng().random())
    }

    pub fn new_with_seed(seed: u64) -> Self {
        let rng = ChaCha20Rng::seed_from_u64(seed);
        // Keep initial order until shuffle is called explicitly
        Self {
            cards: full_deck(),
            rng,
        }
    }

    /// Fisher-Yates shuffle over a fresh 52-card deck. Rebuilding first means
    /// repeated shuffles always permute the full deck, never a partial one.
    pub fn shuffle(&mut self) {
        self.cards = full_deck();
        self.cards.shuffle(&mut self.rng);
    }

    /// Deals the whole deck round-robin into `hands` piles (card `i` goes to
    /// pile `i % hands`), each pile sorted ascending by strength. The shuffle
    /// is the only randomness source; the deal itself is deterministic.
    pub fn deal(&mut self, hands: usize) -> Vec<Vec<Card>> {
        let mut piles = vec![Vec::with_capacity(self.cards.len() / hands + 1); hands];
        for (i, card) in self.cards.drain(..).enumerate() {
            piles[i % hands].push(card);
        }
        for pile in &mut piles {
            pile.sort();
        }
        piles
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
