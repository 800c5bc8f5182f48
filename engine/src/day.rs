// ═══════════════════════════════════════════════════════════════════════
// Day — vote collection, tally and win resolution
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("votes are only accepted during the day")]
    NotDay,
    #[error("player {0} is not in this game")]
    UnknownVoter(PlayerId),
    #[error("player {0} has already voted")]
    AlreadyVoted(PlayerId),
    #[error("no player {0} to vote for")]
    UnknownTarget(PlayerId),
    #[error("player {0} cannot vote for themself")]
    SelfVote(PlayerId),
}

/// Record a vote. Once every player has voted the tally runs, the game
/// moves to RESULTS and the results are returned.
pub fn cast_vote(
    game: &mut Game,
    voter: PlayerId,
    target: VoteTarget,
) -> Result<Option<VoteResults>, VoteError> {
    if game.phase != Phase::Day {
        return Err(VoteError::NotDay);
    }
    if game.player(voter).is_none() {
        return Err(VoteError::UnknownVoter(voter));
    }
    if game.votes.contains_key(&voter) {
        return Err(VoteError::AlreadyVoted(voter));
    }
    if let VoteTarget::Player(id) = target {
        if id == voter {
            return Err(VoteError::SelfVote(voter));
        }
        if game.player(id).is_none() {
            return Err(VoteError::UnknownTarget(id));
        }
    }

    game.votes.insert(voter, target);
    if game.votes.len() != game.players.len() {
        return Ok(None);
    }

    let results = tally(game);
    game.results = Some(results.clone());
    game.phase = Phase::Results;
    Ok(Some(results))
}

/// Which side(s) won, before it is turned into per-player flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinOutcome {
    pub tanner: bool,
    /// None = every team lost.
    pub team: Option<Team>,
}

impl WinOutcome {
    pub fn winners(&self) -> Vec<Team> {
        let mut winners = Vec::new();
        if let Some(team) = self.team {
            winners.push(team);
        }
        if self.tanner {
            winners.push(Team::Tanner);
        }
        winners
    }

    /// Whether a player whose final card is `role` won.
    pub fn did_win(&self, role: Role) -> bool {
        match role.team() {
            Team::Tanner => self.tanner,
            team => self.team == Some(team),
        }
    }
}

/// Count the votes currently recorded. Every destination tied for the most
/// votes is eliminated; a center tie eliminates nobody but is noted.
pub fn tally(game: &Game) -> VoteResults {
    let mut by_target: BTreeMap<VoteTarget, Vec<PlayerId>> = BTreeMap::new();
    for (&voter, &target) in &game.votes {
        by_target.entry(target).or_default().push(voter);
    }

    let mut breakdown: Vec<VoteCount> = by_target.into_iter()
        .map(|(target, voters)| VoteCount { target, votes: voters.len(), voters })
        .collect();
    breakdown.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.target.cmp(&b.target)));

    let max = breakdown.first().map_or(0, |c| c.votes);
    let tied: Vec<VoteTarget> = breakdown.iter()
        .filter(|c| max > 0 && c.votes == max)
        .map(|c| c.target)
        .collect();

    let center_tied = tied.contains(&VoteTarget::Center);
    let eliminated: Vec<PlayerId> = tied.iter()
        .filter_map(|t| match t {
            VoteTarget::Player(id) => Some(*id),
            VoteTarget::Center => None,
        })
        .collect();

    let center_voted = game.votes.values().any(|t| *t == VoteTarget::Center);
    let (outcome, win_reason) = decide_winners(game, &eliminated, center_voted);

    let cards = game.players.iter()
        .map(|p| FinalCard {
            player: p.id,
            name: p.name.clone(),
            original_role: p.original_role,
            role: p.role,
            revealed: game.revealed.contains(&p.id),
            did_win: outcome.did_win(p.role),
        })
        .collect();

    VoteResults {
        eliminated,
        center_tied,
        winners: outcome.winners(),
        win_reason,
        breakdown,
        cards,
        center: game.center.clone(),
        night_log: game.night_log.entries().to_vec(),
    }
}

/// Apply the win rules to the final cards.
///
/// 1. An eliminated Tanner wins, whatever else happens.
/// 2. With no wolf-team card among the players, the village wins only if
///    nobody was eliminated; otherwise every team loses.
/// 3. Otherwise the village wins if a wolf-team card was eliminated, and the
///    werewolf team wins if not.
pub fn decide_winners(game: &Game, eliminated: &[PlayerId], center_voted: bool) -> (WinOutcome, String) {
    let final_role = |id: &PlayerId| game.player(*id).map(|p| p.role);

    let tanner = eliminated.iter().any(|id| final_role(id) == Some(Role::Tanner));
    let any_wolf_team = game.players.iter().any(|p| p.role.is_wolf_team());
    let wolf_eliminated = eliminated.iter()
        .any(|id| final_role(id).is_some_and(Role::is_wolf_team));

    let (team, mut reason) = if !any_wolf_team {
        if eliminated.is_empty() {
            let why = if center_voted {
                "There were no werewolves among the players and the village voted for the center."
            } else {
                "There were no werewolves among the players and nobody was eliminated."
            };
            (Some(Team::Village), why.to_string())
        } else {
            (None, "There were no werewolves among the players, but an innocent player was eliminated.".to_string())
        }
    } else if wolf_eliminated {
        (Some(Team::Village), "A member of the werewolf team was eliminated.".to_string())
    } else {
        (Some(Team::Werewolf), "No member of the werewolf team was eliminated.".to_string())
    };

    if tanner {
        reason = format!("The Tanner was eliminated. {}", reason);
    }
    (WinOutcome { tanner, team }, reason)
}
