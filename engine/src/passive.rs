// ═══════════════════════════════════════════════════════════════════════
// Auto-resolve — results for turns that need no input from the players
// ═══════════════════════════════════════════════════════════════════════

use crate::roles::NightSlot;
use crate::types::*;
use std::collections::BTreeMap;

/// Compute the result for every player awake on a non-interactive turn and
/// append one night log entry for the turn. Interactive turns yield nothing.
pub fn auto_resolve(game: &mut Game, turn: &NightTurn) -> BTreeMap<PlayerId, ActionResult> {
    if turn.interactive || turn.players.is_empty() {
        return BTreeMap::new();
    }
    match turn.slot {
        NightSlot::WolfPack => wolf_pack(game, &turn.players),
        NightSlot::Solo(Role::Minion) => minion(game, &turn.players),
        NightSlot::Solo(Role::Mason) => masons(game, &turn.players),
        NightSlot::Solo(Role::Insomniac) => insomniac(game, &turn.players),
        NightSlot::Solo(_) => BTreeMap::new(),
    }
}

/// Players identified by their dealt card.
fn sightings(game: &Game, ids: impl IntoIterator<Item = PlayerId>) -> Vec<Sighting> {
    ids.into_iter()
        .filter_map(|id| game.player(id))
        .map(|p| Sighting { player: p.id, name: p.name.clone(), role: p.original_role })
        .collect()
}

fn describe(seen: &[Sighting]) -> String {
    seen.iter()
        .map(|s| format!("{} ({})", s.name, s.role))
        .collect::<Vec<_>>()
        .join(", ")
}

fn names(game: &Game, ids: &[PlayerId]) -> String {
    ids.iter().map(|&id| game.name_of(id)).collect::<Vec<_>>().join(", ")
}

fn wolf_pack(game: &mut Game, awake: &[PlayerId]) -> BTreeMap<PlayerId, ActionResult> {
    let mut results = BTreeMap::new();
    for &wolf in awake {
        let seen = sightings(game, awake.iter().copied().filter(|&id| id != wolf));
        let message = format!("Your fellow werewolves: {}.", describe(&seen));
        results.insert(wolf, ActionResult::Info { message, shielded: false, seen });
    }
    game.night_log.append(
        Role::Werewolf,
        format!("Werewolves {} woke up and saw each other", names(game, awake)),
    );
    results
}

fn minion(game: &mut Game, awake: &[PlayerId]) -> BTreeMap<PlayerId, ActionResult> {
    // The Dream Wolf never wakes, but the Minion still sees it.
    let wolves = game.players_dealt(Role::is_wolf);
    let seen = sightings(game, wolves);
    let message = if seen.is_empty() {
        "There are no werewolves among the players.".to_string()
    } else {
        format!("The werewolves are: {}.", describe(&seen))
    };

    let log = if seen.is_empty() {
        format!("Minion {} saw that there were no werewolves", names(game, awake))
    } else {
        format!("Minion {} saw the werewolves: {}", names(game, awake), describe(&seen))
    };
    game.night_log.append(Role::Minion, log);

    awake.iter()
        .map(|&id| {
            (id, ActionResult::Info { message: message.clone(), shielded: false, seen: seen.clone() })
        })
        .collect()
}

fn masons(game: &mut Game, awake: &[PlayerId]) -> BTreeMap<PlayerId, ActionResult> {
    let mut results = BTreeMap::new();
    for &mason in awake {
        let seen = sightings(game, awake.iter().copied().filter(|&id| id != mason));
        let message = if seen.is_empty() {
            "You are the only Mason.".to_string()
        } else {
            format!("The other Masons: {}.", describe(&seen))
        };
        results.insert(mason, ActionResult::Info { message, shielded: false, seen });
    }

    let log = if awake.len() == 1 {
        format!("Mason {} woke up alone", names(game, awake))
    } else {
        format!("Masons {} woke up and saw each other", names(game, awake))
    };
    game.night_log.append(Role::Mason, log);
    results
}

fn insomniac(game: &mut Game, awake: &[PlayerId]) -> BTreeMap<PlayerId, ActionResult> {
    let mut results = BTreeMap::new();
    let mut notes = Vec::new();
    for &id in awake {
        let Some(player) = game.player(id) else { continue };
        notes.push(format!("{} woke up as a {}", player.name, player.role));
        results.insert(
            id,
            ActionResult::View { player: id, name: player.name.clone(), role: player.role },
        );
    }
    game.night_log.append(Role::Insomniac, format!("Insomniac {}", notes.join("; ")));
    results
}
