// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — interface that all bot participants implement
//
// KEY DESIGN PRINCIPLE:
//   Agents receive a `PlayerView` (not the raw Game), which only
//   contains information the player is legally allowed to see.
//   Anything else a bot knows it must have learned from its own
//   action results, passed in through `observe`.
//
//   The agent never gets to see:
//     - Other players' cards (unless flipped face up by the Revealer)
//     - The center cards
//     - Swaps made by other roles during the night
//     - Who voted for whom before the results
// ═══════════════════════════════════════════════════════════════════════

use nightfall_engine::roles::NightSlot;
use nightfall_engine::types::*;
use nightfall_engine::visibility::PlayerView;
use serde::{Deserialize, Serialize};

/// What a bot wants to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "value", rename_all = "snake_case")]
pub enum Decision {
    Act(Vec<Target>),
    Acknowledge,
    Vote(VoteTarget),
}

/// The kind of selection a night turn accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    OtherPlayer,
    TwoOtherPlayers,
    /// Paranormal Investigator.
    UpToTwoOtherPlayers,
    CenterCard,
    /// Seer: one other player or two center cards.
    PlayerOrTwoCenter,
    /// Witch: a center card, optionally followed by any player.
    CenterThenAnyPlayer,
    Nothing,
}

pub fn shape_of(turn: &NightTurn) -> Shape {
    match turn.slot {
        NightSlot::WolfPack if turn.is_lone_wolf() => Shape::CenterCard,
        NightSlot::WolfPack => Shape::Nothing,
        NightSlot::Solo(role) => match role {
            Role::Sentinel | Role::AlphaWolf | Role::MysticWolf | Role::Robber | Role::Revealer => {
                Shape::OtherPlayer
            }
            Role::Troublemaker => Shape::TwoOtherPlayers,
            Role::ParanormalInvestigator => Shape::UpToTwoOtherPlayers,
            Role::ApprenticeSeer | Role::Drunk => Shape::CenterCard,
            Role::Seer => Shape::PlayerOrTwoCenter,
            Role::Witch => Shape::CenterThenAnyPlayer,
            _ => Shape::Nothing,
        },
    }
}

/// Trait that all bots implement.
pub trait Agent: Send + Sync {
    /// Human-readable name for this agent (e.g., "Random", "Heuristic").
    fn name(&self) -> &str;

    /// The seat this agent is playing.
    fn player(&self) -> PlayerId;

    /// Make a decision based on the current player view. None when the
    /// game is not waiting on this player.
    fn decide(&mut self, view: &PlayerView) -> Option<Decision> {
        if view.must_act {
            let turn = view.turn.as_ref()?;
            return Some(Decision::Act(self.choose_targets(view, turn)));
        }
        if view.must_acknowledge {
            return Some(Decision::Acknowledge);
        }
        if view.phase == PhaseKind::Day && !view.has_voted {
            return Some(Decision::Vote(self.vote(view)));
        }
        None
    }

    /// Learn from a result delivered to this player.
    fn observe(&mut self, _result: &ActionResult) {}

    // ── Individual decision methods ────────────────────────────────────
    // The default selection is built from `pick_player` and `pick_center`,
    // so agents only override what they care about.

    /// Another player to target, never one in `exclude`.
    fn pick_player(&mut self, view: &PlayerView, exclude: &[PlayerId]) -> Option<PlayerId>;

    /// A center card index.
    fn pick_center(&mut self, view: &PlayerView, exclude: &[u8]) -> u8;

    /// Vote at the end of the day.
    fn vote(&mut self, view: &PlayerView) -> VoteTarget;

    /// Selection for the turn this player was woken for.
    fn choose_targets(&mut self, view: &PlayerView, turn: &NightTurn) -> Vec<Target> {
        shaped_targets(self, view, turn)
    }
}

/// A selection of the right shape for `turn`, built from the agent's
/// `pick_player` and `pick_center`.
pub fn shaped_targets<A: Agent + ?Sized>(agent: &mut A, view: &PlayerView, turn: &NightTurn) -> Vec<Target> {
    let me = view.viewer;
    match shape_of(turn) {
        Shape::OtherPlayer | Shape::PlayerOrTwoCenter => {
            agent.pick_player(view, &[me]).map(Target::Player).into_iter().collect()
        }
        Shape::TwoOtherPlayers | Shape::UpToTwoOtherPlayers => {
            let mut targets = Vec::new();
            if let Some(first) = agent.pick_player(view, &[me]) {
                targets.push(Target::Player(first));
                if let Some(second) = agent.pick_player(view, &[me, first]) {
                    targets.push(Target::Player(second));
                }
            }
            targets
        }
        Shape::CenterCard | Shape::CenterThenAnyPlayer => {
            vec![Target::Center(agent.pick_center(view, &[]))]
        }
        Shape::Nothing => Vec::new(),
    }
}
