// ═══════════════════════════════════════════════════════════════════════
// Game setup — role validation, dealing, restart
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("a game can only be started from the lobby")]
    NotInLobby,
    #[error("{0} players seated; a game needs {min} to {max}", min = MIN_PLAYERS, max = MAX_PLAYERS)]
    PlayerCount(usize),
    #[error("{players} players need {needed} roles, but {roles} were selected", needed = .players + CENTER_CARDS)]
    RoleCount { players: usize, roles: usize },
    #[error("{role} selected {count} times; at most {max} allowed")]
    TooManyCopies { role: Role, count: usize, max: u8 },
    #[error("seat {0} appears more than once")]
    DuplicateSeat(PlayerId),
}

/// Check a role selection against the number of seated players.
pub fn validate_roles(player_count: usize, roles: &[Role]) -> Result<(), SetupError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) {
        return Err(SetupError::PlayerCount(player_count));
    }
    if player_count + CENTER_CARDS != roles.len() {
        return Err(SetupError::RoleCount { players: player_count, roles: roles.len() });
    }

    let mut counts: BTreeMap<Role, usize> = BTreeMap::new();
    for &role in roles {
        *counts.entry(role).or_insert(0) += 1;
    }
    for (role, count) in counts {
        let max = role.info().max_count;
        if count > max as usize {
            return Err(SetupError::TooManyCopies { role, count, max });
        }
    }
    Ok(())
}

/// A reasonable selection for `player_count` players: two werewolves, a seer,
/// a robber and a troublemaker, topped up from a fixed list.
pub fn default_roles(player_count: usize) -> Vec<Role> {
    const FILL: [Role; 13] = [
        Role::Werewolf,
        Role::Werewolf,
        Role::Seer,
        Role::Robber,
        Role::Troublemaker,
        Role::Villager,
        Role::Villager,
        Role::Insomniac,
        Role::Drunk,
        Role::Mason,
        Role::Mason,
        Role::Minion,
        Role::Tanner,
    ];
    FILL.iter().copied().take(player_count + CENTER_CARDS).collect()
}

/// Shuffle the selected roles with `seed`, deal one per seat and put the last
/// three in the center. The game moves to the night, waiting for the first
/// turn to be announced.
pub fn start_game(game: &mut Game, roles: &[Role], seed: u64) -> Result<Vec<Notice>, SetupError> {
    if game.phase != Phase::Lobby {
        return Err(SetupError::NotInLobby);
    }
    let mut seen = BTreeSet::new();
    for seat in &game.seats {
        if !seen.insert(seat.id) {
            return Err(SetupError::DuplicateSeat(seat.id));
        }
    }
    validate_roles(game.seats.len(), roles)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut deck = roles.to_vec();
    deck.shuffle(&mut rng);

    let center = deck.split_off(game.seats.len());
    game.players = game.seats.iter()
        .zip(deck)
        .map(|(seat, role)| Player {
            id: seat.id,
            name: seat.name.clone(),
            original_role: role,
            role,
            host: seat.host,
            connected: seat.connected,
        })
        .collect();
    game.center = center;
    game.selected_roles = roles.to_vec();
    game.seed = seed;
    game.night_index = 0;
    game.night_log = NightLog::default();
    game.shielded.clear();
    game.revealed.clear();
    game.votes.clear();
    game.results = None;
    game.phase = Phase::Night(NightStage::TurnPending);

    Ok(vec![Notice::PhaseChange { phase: PhaseKind::Night, roster: game.roster() }])
}

/// Back to the lobby with the same roster. Everything dealt or decided during
/// the last game is dropped.
pub fn restart(game: &mut Game) -> Vec<Notice> {
    game.phase = Phase::Lobby;
    game.players.clear();
    game.center.clear();
    game.night_index = 0;
    game.night_log = NightLog::default();
    game.shielded.clear();
    game.revealed.clear();
    game.votes.clear();
    game.results = None;
    vec![Notice::PhaseChange { phase: PhaseKind::Lobby, roster: game.roster() }]
}
