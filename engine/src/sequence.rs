// ═══════════════════════════════════════════════════════════════════════
// Turn sequencer — which role wakes next
// ═══════════════════════════════════════════════════════════════════════

use crate::roles::{self, night_order, NightSlot};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTurn {
    Done,
    Turn(NightTurn),
}

/// Walk the night order from `game.night_index`, skipping roles nobody was
/// dealt. Never moves the index itself, so calling it twice gives the same
/// answer.
pub fn next_turn(game: &Game) -> NextTurn {
    for (index, slot) in night_order().into_iter().enumerate().skip(game.night_index) {
        let (players, interactive) = match slot {
            NightSlot::WolfPack => {
                let wolves = game.players_dealt(Role::wakes_with_pack);
                // A lone wolf gets to peek at the center instead.
                let lone = wolves.len() == 1;
                (wolves, lone)
            }
            NightSlot::Solo(role) => (game.players_dealt(|r| r == role), role.info().interactive),
        };

        if players.is_empty() {
            continue;
        }

        let lone_wolf = slot == NightSlot::WolfPack && interactive;
        return NextTurn::Turn(NightTurn {
            index,
            slot,
            players,
            prompt: roles::prompt(slot, lone_wolf).to_string(),
            interactive,
        });
    }
    NextTurn::Done
}

/// Every turn the night would visit if nobody's dealt card changed, in order.
pub fn remaining_turns(game: &Game) -> Vec<NightTurn> {
    let mut probe = game.clone();
    let mut turns = Vec::new();
    while let NextTurn::Turn(turn) = next_turn(&probe) {
        probe.night_index = turn.index + 1;
        turns.push(turn);
    }
    turns
}
