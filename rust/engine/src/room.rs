use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Rank, Suit};
use crate::deck::Deck;
use crate::errors::GameError;
use crate::player::{Player, Ranking};

/// Seats per room; a game starts only with exactly this many players.
pub const MAX_PLAYERS: usize = 4;

/// Default per-turn deadline in milliseconds.
pub const DEFAULT_TURN_TIME_LIMIT_MS: i64 = 30_000;

/// Room lifecycle. Round completion resets trick state without leaving
/// `Playing`; `Finished` is terminal and rejects every mutation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

/// One accepted play. Immutable once appended to the play area; the player
/// name is a denormalized snapshot taken at play time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub player_id: String,
    pub player_name: String,
    pub cards: Vec<Card>,
    pub timestamp: DateTime<Utc>,
}

/// One room's full game state: seats, turn order, the trick in play, pass
/// accounting, and finish ranking. Every operation either fully applies or
/// fully rejects; validation happens before any mutation.
///
/// Seats are never physically removed once a game is running — finished and
/// departed players keep their index and are skipped via the active flag,
/// which keeps `current_turn` and the ranking math stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    id: String,
    players: Vec<Player>,
    current_turn: usize,
    phase: Phase,
    play_area: Vec<Play>,
    last_play: Option<Play>,
    current_round_winner: Option<String>,
    passed_players: HashSet<String>,
    finish_order: Vec<String>,
    round_number: u32,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    turn_start_time: DateTime<Utc>,
    turn_time_limit_ms: i64,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        creator_id: impl Into<String>,
        creator_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            players: vec![Player::new(creator_id, creator_name)],
            current_turn: 0,
            phase: Phase::Waiting,
            play_area: Vec::new(),
            last_play: None,
            current_round_winner: None,
            passed_players: HashSet::new(),
            finish_order: Vec::new(),
            round_number: 1,
            created_at: now,
            last_activity: now,
            turn_start_time: now,
            turn_time_limit_ms: DEFAULT_TURN_TIME_LIMIT_MS,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_turn)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn play_area(&self) -> &[Play] {
        &self.play_area
    }

    pub fn last_play(&self) -> Option<&Play> {
        self.last_play.as_ref()
    }

    pub fn current_round_winner(&self) -> Option<&str> {
        self.current_round_winner.as_deref()
    }

    pub fn passed_players(&self) -> &HashSet<String> {
        &self.passed_players
    }

    /// Player ids in the order their hands emptied; drives final ranking.
    pub fn finish_order(&self) -> &[String] {
        &self.finish_order
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn turn_start_time(&self) -> DateTime<Utc> {
        self.turn_start_time
    }

    pub fn turn_time_limit_ms(&self) -> i64 {
        self.turn_time_limit_ms
    }

    /// Players still holding a seat (everyone who has not left).
    pub fn seated_count(&self) -> usize {
        self.players.iter().filter(|p| !p.has_departed()).count()
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    /// Whether the next play opens a fresh trick.
    pub fn is_opening(&self) -> bool {
        self.last_play.is_none()
    }

    /// Bumped on every read and every mutating operation; the registry uses
    /// it for idle expiry.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn is_idle(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity >= ttl
    }

    /// Resolves the ids to cards in the player's hand without mutating it.
    /// The transport layer uses this to validate a play before committing.
    pub fn cards_for(&self, player_id: &str, card_ids: &[String]) -> Result<Vec<Card>, GameError> {
        let player = self.player(player_id).ok_or(GameError::PlayerNotFound)?;
        let mut remaining: Vec<Card> = player.hand().to_vec();
        let mut cards = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            match remaining.iter().position(|c| c.id() == *id) {
                Some(i) => cards.push(remaining.remove(i)),
                None => return Err(GameError::CardsNotInHand),
            }
        }
        Ok(cards)
    }

    /// Checks that the game is running and `player_id` holds the turn.
    pub fn require_turn(&self, player_id: &str) -> Result<(), GameError> {
        if self.phase != Phase::Playing {
            return Err(GameError::NotPlaying);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(GameError::PlayerNotFound)?;
        if idx != self.current_turn {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    pub fn join(
        &mut self,
        player_id: impl Into<String>,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(GameError::NameTaken);
        }
        self.players.push(Player::new(player_id, name));
        self.touch(now);
        Ok(())
    }

    /// Removes a player. In the waiting phase the seat is freed outright;
    /// mid-game the seat stays but is marked departed and inactive, and a
    /// departing turn-holder forfeits the turn immediately. Returns whether
    /// the room is now empty (caller destroys it).
    pub fn leave(&mut self, player_id: &str, now: DateTime<Utc>) -> bool {
        let idx = match self.players.iter().position(|p| p.id == player_id) {
            Some(idx) => idx,
            None => return self.seated_count() == 0,
        };

        if self.phase == Phase::Waiting {
            self.players.remove(idx);
            self.current_turn = 0;
        } else {
            self.players[idx].mark_departed();
            self.passed_players.remove(player_id);
            if self.phase == Phase::Playing {
                if idx == self.current_turn {
                    self.advance_turn();
                    self.turn_start_time = now;
                } else if self.active_count() <= 1 {
                    self.finish();
                }
            }
        }

        self.touch(now);
        self.seated_count() == 0
    }

    /// Deals a shuffled deck into four 13-card hands and opens play. The
    /// opening turn goes to the holder of the 3 of clubs, or failing that
    /// to the player with the lowest card overall.
    pub fn start(&mut self, seed: Option<u64>, now: DateTime<Utc>) -> Result<(), GameError> {
        if self.phase != Phase::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() != MAX_PLAYERS {
            return Err(GameError::NeedFourPlayers);
        }

        let mut deck = match seed {
            Some(seed) => Deck::new_with_seed(seed),
            None => Deck::new(),
        };
        deck.shuffle();
        let hands = deck.deal(MAX_PLAYERS);
        for (player, hand) in self.players.iter_mut().zip(hands) {
            player.assign_hand(hand);
        }

        self.current_turn = self.starting_player();
        self.phase = Phase::Playing;
        self.turn_start_time = now;
        self.touch(now);
        Ok(())
    }

    /// Commits a play for the turn-holder. Rule validation against the last
    /// play is the transport layer's responsibility ([`crate::rules::validate_play`]);
    /// this operation only enforces turn ownership and card possession.
    pub fn play(
        &mut self,
        player_id: &str,
        card_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), GameError> {
        self.require_turn(player_id)?;
        let idx = self.current_turn;

        let cards = self.players[idx].take_cards(card_ids)?;
        let play = Play {
            player_id: self.players[idx].id.clone(),
            player_name: self.players[idx].name.clone(),
            cards,
            timestamp: now,
        };
        self.last_play = Some(play.clone());
        self.play_area.push(play);
        self.current_round_winner = Some(player_id.to_string());
        self.passed_players.clear();

        if self.players[idx].cards_remaining() == 0 {
            self.players[idx].retire();
            self.finish_order.push(player_id.to_string());
        }

        self.advance_turn();
        self.turn_start_time = now;
        self.touch(now);
        Ok(())
    }

    /// Records a pass for the turn-holder. When every active player except
    /// the trick-winner has passed, the trick resets and the winner opens
    /// the next round; otherwise the turn advances.
    pub fn pass(&mut self, player_id: &str, now: DateTime<Utc>) -> Result<(), GameError> {
        self.require_turn(player_id)?;

        // Insert is idempotent: a repeated pass before the reset is a no-op.
        self.passed_players.insert(player_id.to_string());

        let active_count = self.active_count();
        let passed_active = self
            .passed_players
            .iter()
            .filter(|id| self.player(id).is_some_and(|p| p.is_active()))
            .count();

        if passed_active == active_count.saturating_sub(1) {
            self.start_new_round();
        } else {
            self.advance_turn();
        }

        self.turn_start_time = now;
        self.touch(now);
        Ok(())
    }

    /// Lazy turn-timeout enforcement: if the game is running and the current
    /// turn's deadline has passed, force a pass on behalf of the turn-holder.
    /// Non-punitive; identical effects to an explicit pass. Returns whether
    /// an auto-pass happened.
    pub fn advance_on_timeout(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        if now - self.turn_start_time < Duration::milliseconds(self.turn_time_limit_ms) {
            return false;
        }
        let player_id = match self.current_player() {
            Some(p) if p.is_active() => p.id.clone(),
            _ => return false,
        };
        self.pass(&player_id, now).is_ok()
    }

    fn starting_player(&self) -> usize {
        let three_of_clubs = Card {
            suit: Suit::Clubs,
            rank: Rank::Three,
        };
        if let Some(idx) = self
            .players
            .iter()
            .position(|p| p.hand().contains(&three_of_clubs))
        {
            return idx;
        }

        // Variant decks may lack the 3♣; fall back to the lowest card held.
        let mut lowest = u8::MAX;
        let mut start = 0;
        for (idx, player) in self.players.iter().enumerate() {
            if let Some(card) = player.lowest_card() {
                if card.value() < lowest {
                    lowest = card.value();
                    start = idx;
                }
            }
        }
        start
    }

    /// Clears the trick and seats the trick-winner (if still active) for the
    /// next round. The winner id is kept so a winner who just emptied their
    /// hand still concedes the opening to whoever triggered the reset.
    fn start_new_round(&mut self) {
        self.play_area.clear();
        self.last_play = None;
        self.passed_players.clear();

        if let Some(winner_id) = self.current_round_winner.clone() {
            if let Some(idx) = self.players.iter().position(|p| p.id == winner_id) {
                if self.players[idx].is_active() {
                    self.current_turn = idx;
                }
            }
        }

        self.round_number += 1;
    }

    /// Moves `current_turn` to the next active seat, scanning circularly in
    /// join order. With one (or zero) active players left the game ends
    /// instead.
    fn advance_turn(&mut self) {
        if self.active_count() <= 1 {
            self.finish();
            return;
        }
        let len = self.players.len();
        let mut next = (self.current_turn + 1) % len;
        while !self.players[next].is_active() {
            next = (next + 1) % len;
        }
        self.current_turn = next;
    }

    /// Terminal transition: assigns titles from the hand-emptying order and
    /// gives the surviving active player the bottom rank. Departed players
    /// that never emptied their hand receive no position.
    fn finish(&mut self) {
        self.phase = Phase::Finished;

        const TITLES: [Ranking; 3] = [Ranking::President, Ranking::VicePresident, Ranking::ViceScum];
        let order = self.finish_order.clone();
        for (finished_id, title) in order.iter().zip(TITLES) {
            if let Some(player) = self.players.iter_mut().find(|p| p.id == *finished_id) {
                player.set_position(title);
            }
        }
        if let Some(survivor) = self.players.iter_mut().find(|p| p.is_active()) {
            survivor.set_position(Ranking::Scum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{can_beat, validate_play};

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn full_room(t0: DateTime<Utc>) -> Room {
        let mut room = Room::new("ROOM01", "p1", "Alice", t0);
        room.join("p2", "Bob", t0).expect("join Bob");
        room.join("p3", "Carol", t0).expect("join Carol");
        room.join("p4", "Dave", t0).expect("join Dave");
        room
    }

    fn started_room(t0: DateTime<Utc>) -> Room {
        let mut room = full_room(t0);
        room.start(Some(42), t0).expect("start game");
        room
    }

    fn play_lowest(room: &mut Room, t: DateTime<Utc>) -> String {
        let player = room.current_player().expect("current player");
        let pid = player.id.clone();
        let card_id = player.lowest_card().expect("non-empty hand").id();
        room.play(&pid, &[card_id], t).expect("legal play");
        pid
    }

    #[test]
    fn join_rules_enforced() {
        let t0 = now();
        let mut room = full_room(t0);
        assert_eq!(room.join("p5", "Eve", t0), Err(GameError::RoomFull));

        let mut partial = Room::new("ROOM02", "p1", "Alice", t0);
        assert_eq!(partial.join("p2", "Alice", t0), Err(GameError::NameTaken));

        let mut started = started_room(t0);
        assert_eq!(started.join("p9", "Eve", t0), Err(GameError::AlreadyStarted));
        assert!(matches!(started.phase(), Phase::Playing));
    }

    #[test]
    fn start_requires_exactly_four_players() {
        let t0 = now();
        let mut room = Room::new("ROOM03", "p1", "Alice", t0);
        room.join("p2", "Bob", t0).expect("join Bob");
        assert_eq!(room.start(Some(1), t0), Err(GameError::NeedFourPlayers));

        let mut started = started_room(t0);
        assert_eq!(started.start(Some(1), t0), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn start_deals_thirteen_each_and_seats_the_three_of_clubs() {
        let t0 = now();
        let room = started_room(t0);

        let total: usize = room.players().iter().map(|p| p.cards_remaining()).sum();
        assert_eq!(total, 52);
        for player in room.players() {
            assert_eq!(player.hand().len(), 13);
            assert_eq!(player.cards_remaining(), 13);
            let mut sorted = player.hand().to_vec();
            sorted.sort();
            assert_eq!(player.hand(), &sorted[..], "hands are sorted ascending");
        }

        let opener = room.current_player().expect("current player");
        assert!(
            opener.hand().contains(&Card {
                suit: Suit::Clubs,
                rank: Rank::Three
            }),
            "opening turn goes to the 3♣ holder"
        );
        assert_eq!(opener.lowest_card().map(|c| c.value()), Some(3));
    }

    #[test]
    fn opening_play_advances_to_next_seat() {
        let t0 = now();
        let mut room = started_room(t0);
        let opener_idx = room.current_turn();

        let pid = play_lowest(&mut room, t0);

        assert_eq!(room.play_area().len(), 1);
        let last = room.last_play().expect("play recorded");
        assert_eq!(last.player_id, pid);
        assert_eq!(last.cards[0].value(), 3);
        assert_eq!(room.current_round_winner(), Some(pid.as_str()));
        assert_eq!(room.current_turn(), (opener_idx + 1) % 4);
        assert!(room.passed_players().is_empty());
    }

    #[test]
    fn play_and_pass_require_turn_ownership() {
        let t0 = now();
        let mut room = started_room(t0);
        let bystander = room
            .players()
            .iter()
            .enumerate()
            .find(|(i, _)| *i != room.current_turn())
            .map(|(_, p)| p.id.clone())
            .expect("someone off-turn");

        assert_eq!(room.pass(&bystander, t0), Err(GameError::NotYourTurn));
        let card_id = room
            .player(&bystander)
            .and_then(|p| p.lowest_card())
            .expect("card")
            .id();
        assert_eq!(
            room.play(&bystander, &[card_id], t0),
            Err(GameError::NotYourTurn)
        );
        assert_eq!(room.pass("ghost", t0), Err(GameError::PlayerNotFound));
    }

    #[test]
    fn round_resets_when_everyone_but_the_winner_passes() {
        let t0 = now();
        let mut room = started_room(t0);
        let opener_idx = room.current_turn();

        let winner = play_lowest(&mut room, t0);
        for _ in 0..3 {
            let pid = room.current_player().expect("current").id.clone();
            room.pass(&pid, t0).expect("pass accepted");
        }

        assert!(room.play_area().is_empty());
        assert!(room.last_play().is_none());
        assert!(room.passed_players().is_empty());
        assert_eq!(room.round_number(), 2);
        assert_eq!(room.current_turn(), opener_idx, "winner opens next round");
        assert_eq!(room.current_round_winner(), Some(winner.as_str()));
    }

    #[test]
    fn repeated_pass_does_not_grow_the_passed_set() {
        let t0 = now();
        let mut room = started_room(t0);
        play_lowest(&mut room, t0);

        let pid = room.current_player().expect("current").id.clone();
        room.pass(&pid, t0).expect("first pass");
        let size = room.passed_players().len();
        room.passed_players.insert(pid);
        assert_eq!(room.passed_players().len(), size);
    }

    #[test]
    fn timeout_forces_a_pass_for_the_turn_holder() {
        let t0 = now();
        let mut room = started_room(t0);
        let slow = room.current_player().expect("current").id.clone();

        let early = t0 + Duration::milliseconds(DEFAULT_TURN_TIME_LIMIT_MS - 1);
        assert!(!room.advance_on_timeout(early));
        assert_eq!(room.current_player().map(|p| p.id.clone()), Some(slow.clone()));

        let late = t0 + Duration::milliseconds(DEFAULT_TURN_TIME_LIMIT_MS);
        assert!(room.advance_on_timeout(late));
        assert!(room.passed_players().contains(&slow));
        assert_ne!(room.current_player().map(|p| p.id.clone()), Some(slow));
        assert_eq!(room.turn_start_time(), late, "deadline restarts for the next turn");
    }

    #[test]
    fn leave_in_waiting_phase_frees_the_seat() {
        let t0 = now();
        let mut room = full_room(t0);
        assert!(!room.leave("p2", t0));
        assert_eq!(room.players().len(), 3);
        room.join("p5", "Eve", t0).expect("seat is free again");

        let mut solo = Room::new("ROOM04", "p1", "Alice", t0);
        assert!(solo.leave("p1", t0), "last player out empties the room");
    }

    #[test]
    fn leaving_turn_holder_forfeits_the_turn() {
        let t0 = now();
        let mut room = started_room(t0);
        let holder_idx = room.current_turn();
        let holder = room.current_player().expect("current").id.clone();

        assert!(!room.leave(&holder, t0));
        assert_eq!(room.seated_count(), 3);
        assert_ne!(room.current_turn(), holder_idx);
        assert!(room.current_player().expect("current").is_active());
        assert!(room.player(&holder).expect("seat kept").has_departed());
    }

    #[test]
    fn rotation_skips_inactive_seats() {
        let t0 = now();
        let mut room = started_room(t0);
        let next_idx = (room.current_turn() + 1) % 4;
        let skipped = room.players()[next_idx].id.clone();
        room.leave(&skipped, t0);

        play_lowest(&mut room, t0);
        assert_ne!(room.current_player().expect("current").id, skipped);
        assert!(room.current_player().expect("current").is_active());
    }

    #[test]
    fn leaving_down_to_one_active_player_finishes_the_game() {
        let t0 = now();
        let mut room = started_room(t0);
        let leavers: Vec<String> = room
            .players()
            .iter()
            .take(3)
            .map(|p| p.id.clone())
            .collect();
        for pid in leavers {
            room.leave(&pid, t0);
        }

        assert_eq!(room.phase(), Phase::Finished);
        assert_eq!(room.pass("p4", t0), Err(GameError::NotPlaying));
        let survivor = room.players().iter().find(|p| p.is_active());
        assert_eq!(
            survivor.and_then(|p| p.position()),
            Some(Ranking::Scum),
            "the survivor takes the bottom rank"
        );
    }

    #[test]
    fn full_game_produces_a_complete_ranking() {
        let t0 = now();
        let mut room = started_room(t0);

        // Greedy driver: open with the single lowest card, beat singles with
        // the lowest higher card, otherwise pass.
        let mut guard = 0;
        while room.phase() == Phase::Playing {
            guard += 1;
            assert!(guard < 10_000, "game failed to terminate");

            let player = room.current_player().expect("current player");
            let pid = player.id.clone();
            let hand = player.hand().to_vec();
            let last_cards = room.last_play().map(|p| p.cards.clone());

            let opening = room.is_opening();
            if !can_beat(&hand, last_cards.as_deref(), opening) {
                room.pass(&pid, t0).expect("pass accepted");
                continue;
            }

            let choice = if opening {
                hand[0]
            } else {
                let floor = last_cards.as_ref().expect("non-opening has a last play")[0].value();
                *hand
                    .iter()
                    .find(|c| c.value() > floor)
                    .expect("can_beat promised a higher card")
            };
            let cards = [choice];
            validate_play(&cards, last_cards.as_deref(), opening).expect("driver plays legally");
            room.play(&pid, &[choice.id()], t0).expect("play accepted");
        }

        assert_eq!(room.phase(), Phase::Finished);
        assert_eq!(room.finish_order().len(), 3);

        let expected = [Ranking::President, Ranking::VicePresident, Ranking::ViceScum];
        for (pid, want) in room.finish_order().iter().zip(expected) {
            let player = room.player(pid).expect("finisher seated");
            assert_eq!(player.position(), Some(want));
            assert_eq!(player.cards_remaining(), 0);
        }

        let scum = room
            .players()
            .iter()
            .find(|p| p.position() == Some(Ranking::Scum))
            .expect("one player holds the bottom rank");
        assert!(scum.cards_remaining() > 0, "the scum never emptied their hand");
    }

    #[test]
    fn serde_round_trip_preserves_room_state() {
        let t0 = now();
        let mut room = started_room(t0);
        play_lowest(&mut room, t0);

        let json = serde_json::to_string(&room).expect("serialize room");
        let restored: Room = serde_json::from_str(&json).expect("deserialize room");

        assert_eq!(restored.id(), room.id());
        assert_eq!(restored.phase(), room.phase());
        assert_eq!(restored.current_turn(), room.current_turn());
        assert_eq!(restored.round_number(), room.round_number());
        for (a, b) in restored.players().iter().zip(room.players()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.cards_remaining(), b.cards_remaining());
            let ids_a: Vec<String> = a.hand().iter().map(|c| c.id()).collect();
            let ids_b: Vec<String> = b.hand().iter().map(|c| c.id()).collect();
            assert_eq!(ids_a, ids_b);
        }
        assert_eq!(
            restored.last_play().map(|p| p.cards[0].id()),
            room.last_play().map(|p| p.cards[0].id())
        );
    }
}
