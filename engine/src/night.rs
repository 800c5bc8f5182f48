// ═══════════════════════════════════════════════════════════════════════
// Night state machine — turn announcement, submissions, acknowledgments
//
// Architecture:
//   Like the rest of the engine this is pure. It never does I/O; it moves
//   `game.phase` forward and returns the notices that should go out.
//   The session layer persists the game and delivers the notices.
//
// Flow:
//   1. `advance()` announces the next turn (or starts the day)
//   2. interactive turn → players `submit_action()`, then `acknowledge()`
//      passive turn    → results are computed immediately, players acknowledge
//   3. when nobody is left to act or acknowledge the stage returns to
//      TurnPending and `advance()` is called again
// ═══════════════════════════════════════════════════════════════════════

use crate::passive::auto_resolve;
use crate::resolve::resolve;
use crate::sequence::{next_turn, NextTurn};
use crate::types::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NightError {
    #[error("the game is not in the night phase")]
    NotNight,
    #[error("no turn is waiting for an action")]
    NotAwaitingAction,
    #[error("player {0} is not expected to act on this turn")]
    NotYourTurn(PlayerId),
    #[error("player {0} has no result waiting to be acknowledged")]
    NothingToAcknowledge(PlayerId),
}

/// What an acknowledgment did to the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnProgress {
    /// Someone still has to act or acknowledge.
    Waiting,
    /// The turn is over; the night index has moved on.
    TurnComplete,
}

/// Push the night forward until it needs player input or the day starts.
/// Does nothing while a turn is open or outside the night.
pub fn advance(game: &mut Game) -> Vec<Notice> {
    let mut notices = Vec::new();

    loop {
        match &game.phase {
            Phase::Night(NightStage::TurnPending) => {}
            _ => return notices,
        }

        let turn = match next_turn(game) {
            NextTurn::Done => {
                begin_day(game, &mut notices);
                return notices;
            }
            NextTurn::Turn(turn) => turn,
        };
        game.night_index = turn.index;

        notices.push(Notice::NightTurn { to: turn.players.clone(), turn: turn.clone() });

        if turn.interactive {
            let to_act: BTreeSet<PlayerId> = turn.players.iter().copied().collect();
            game.phase = Phase::Night(NightStage::AwaitingAction {
                turn,
                to_act,
                to_ack: BTreeSet::new(),
            });
            return notices;
        }

        let results = auto_resolve(game, &turn);
        if results.is_empty() {
            // Nobody to wait for.
            game.night_index = turn.index + 1;
            continue;
        }

        let to_ack: BTreeSet<PlayerId> = results.keys().copied().collect();
        for (to, result) in results {
            notices.push(Notice::ActionResult { to, result });
        }
        game.phase = Phase::Night(NightStage::AwaitingAck { turn, to_ack });
        return notices;
    }
}

/// Apply an action from one of the players the current turn is waiting on.
///
/// `Ok(None)` means the selection was not valid for this role: nothing
/// changed and the player should be prompted again. `Err` means the
/// submission was out of turn and is ignored.
pub fn submit_action(
    game: &mut Game,
    actor: PlayerId,
    targets: &[Target],
) -> Result<Option<ActionResult>, NightError> {
    let (slot, lone_wolf) = match &game.phase {
        Phase::Night(NightStage::AwaitingAction { turn, to_act, .. }) => {
            if !to_act.contains(&actor) {
                return Err(NightError::NotYourTurn(actor));
            }
            (turn.slot, turn.is_lone_wolf())
        }
        Phase::Night(_) => return Err(NightError::NotAwaitingAction),
        _ => return Err(NightError::NotNight),
    };

    let Some(result) = resolve(game, slot, lone_wolf, actor, targets) else {
        return Ok(None);
    };

    if let Phase::Night(NightStage::AwaitingAction { turn, to_act, to_ack }) = &mut game.phase {
        to_act.remove(&actor);
        to_ack.insert(actor);
        if to_act.is_empty() {
            let turn = turn.clone();
            let to_ack = std::mem::take(to_ack);
            game.phase = Phase::Night(NightStage::AwaitingAck { turn, to_ack });
        }
    }
    Ok(Some(result))
}

/// Record that `player` has read their result. When the last outstanding
/// player acknowledges, the turn closes and the night index moves past it.
pub fn acknowledge(game: &mut Game, player: PlayerId) -> Result<TurnProgress, NightError> {
    let next_index = match &mut game.phase {
        Phase::Night(NightStage::AwaitingAction { to_ack, .. }) => {
            // Early acknowledgment while others are still choosing.
            if !to_ack.remove(&player) {
                return Err(NightError::NothingToAcknowledge(player));
            }
            return Ok(TurnProgress::Waiting);
        }
        Phase::Night(NightStage::AwaitingAck { turn, to_ack }) => {
            if !to_ack.remove(&player) {
                return Err(NightError::NothingToAcknowledge(player));
            }
            if !to_ack.is_empty() {
                return Ok(TurnProgress::Waiting);
            }
            turn.index + 1
        }
        Phase::Night(NightStage::TurnPending) => return Err(NightError::NothingToAcknowledge(player)),
        _ => return Err(NightError::NotNight),
    };

    game.night_index = next_index;
    game.phase = Phase::Night(NightStage::TurnPending);
    Ok(TurnProgress::TurnComplete)
}

fn begin_day(game: &mut Game, notices: &mut Vec<Notice>) {
    game.votes.clear();
    game.phase = Phase::Day;
    notices.push(Notice::PhaseChange { phase: PhaseKind::Day, roster: game.roster() });
}
