// ═══════════════════════════════════════════════════════════════════════
// Visibility / Information Model
//
// During the game a player knows:
//   PUBLIC  — the roster, the phase, cards the Revealer flipped face up,
//             who has already voted (not for whom)
//   PRIVATE — their own dealt card, the turn they are woken for, and
//             whatever their own results told them (kept by the client)
//   HIDDEN  — everyone else's cards, the center, every swap made tonight
//
// Bots MUST only receive PlayerView, never the raw Game.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use serde::{Deserialize, Serialize};

/// The view of the game a specific player is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub viewer: PlayerId,
    pub name: String,
    /// The card the viewer was dealt. Their current card may differ.
    pub original_role: Role,
    pub phase: PhaseKind,
    pub roster: Vec<RosterEntry>,
    /// Cards flipped face up during the night.
    pub revealed: Vec<Sighting>,

    /// The open turn, only when the viewer is woken for it.
    pub turn: Option<NightTurn>,
    pub must_act: bool,
    pub must_acknowledge: bool,

    pub has_voted: bool,
    pub voted: Vec<PlayerId>,
}

impl PlayerView {
    /// Everyone at the table except the viewer.
    pub fn others(&self) -> Vec<PlayerId> {
        self.roster.iter().map(|r| r.id).filter(|&id| id != self.viewer).collect()
    }
}

/// Build the view for `viewer`. None if the viewer was not dealt a card.
pub fn player_view(game: &Game, viewer: PlayerId) -> Option<PlayerView> {
    let me = game.player(viewer)?;

    let revealed = game.players.iter()
        .filter(|p| game.revealed.contains(&p.id))
        .map(|p| Sighting { player: p.id, name: p.name.clone(), role: p.role })
        .collect();

    let (turn, must_act, must_acknowledge) = match &game.phase {
        Phase::Night(NightStage::AwaitingAction { turn, to_act, to_ack }) => (
            turn.players.contains(&viewer).then(|| turn.clone()),
            to_act.contains(&viewer),
            to_ack.contains(&viewer),
        ),
        Phase::Night(NightStage::AwaitingAck { turn, to_ack }) => (
            turn.players.contains(&viewer).then(|| turn.clone()),
            false,
            to_ack.contains(&viewer),
        ),
        _ => (None, false, false),
    };

    Some(PlayerView {
        viewer,
        name: me.name.clone(),
        original_role: me.original_role,
        phase: game.phase.kind(),
        roster: game.roster(),
        revealed,
        turn,
        must_act,
        must_acknowledge,
        has_voted: game.votes.contains_key(&viewer),
        voted: game.votes.keys().copied().collect(),
    })
}
