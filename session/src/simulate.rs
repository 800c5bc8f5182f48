// ═══════════════════════════════════════════════════════════════════════
// Headless games — bots play a full game against the engine directly,
// or through a Coordinator the way connected clients would.
// ═══════════════════════════════════════════════════════════════════════

use crate::coordinator::Coordinator;
use crate::error::SimulationError;
use crate::notify::Envelope;
use nightfall_agents::{Agent, Decision, HeuristicAgent, RandomAgent};
use nightfall_engine::types::*;
use nightfall_engine::visibility::player_view;
use nightfall_engine::{day, night, setup, TurnProgress};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Result of a completed game.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub seed: u64,
    pub winners: Vec<Team>,
    pub win_reason: String,
    pub eliminated: Vec<PlayerId>,
    pub decisions: usize,
    pub night_log_len: usize,
    pub seats: Vec<SeatSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatSummary {
    pub player: PlayerId,
    pub agent_name: String,
    pub original_role: Role,
    pub final_role: Role,
    pub won: bool,
}

/// One bot per seat, seeded from `seed`. `kind` is "random", "heuristic"
/// or "mixed" (alternating, heuristic first).
pub fn make_agents(kind: &str, players: u32, seed: u64) -> Vec<Box<dyn Agent>> {
    (0..players)
        .map(|i| {
            let id = PlayerId(i);
            let agent_seed = seed.wrapping_add(i as u64);
            let agent: Box<dyn Agent> = match kind {
                "heuristic" => Box::new(HeuristicAgent::new(id, agent_seed)),
                "mixed" if i % 2 == 0 => Box::new(HeuristicAgent::new(id, agent_seed)),
                _ => Box::new(RandomAgent::new(id, agent_seed)),
            };
            agent
        })
        .collect()
}

pub fn seats_for(players: u32) -> Vec<Seat> {
    (0..players).map(|i| Seat::new(i, format!("Bot {}", i))).collect()
}

fn hand_out(agents: &mut [Box<dyn Agent>], notice: &Notice) {
    if let Notice::ActionResult { to, result } = notice {
        if let Some(agent) = agents.iter_mut().find(|a| a.player() == *to) {
            agent.observe(result);
        }
    }
}

/// Run a complete game against the engine with no store in between.
pub fn run_game(
    agents: &mut [Box<dyn Agent>],
    seats: Vec<Seat>,
    roles: &[Role],
    seed: u64,
    max_decisions: usize, // safety limit to prevent infinite loops
) -> Result<GameSummary, SimulationError> {
    let mut game = Game::new(format!("sim-{}", seed), seats);
    setup::start_game(&mut game, roles, seed)?;
    for player in &game.players {
        if !agents.iter().any(|a| a.player() == player.id) {
            return Err(SimulationError::NoAgent(player.id));
        }
    }

    let mut inbox = night::advance(&mut game);
    let mut decisions = 0;

    loop {
        for notice in inbox.drain(..) {
            hand_out(agents, &notice);
        }
        if let Some(results) = &game.results {
            return Ok(summarize(&game, results, agents, seed, decisions));
        }

        let mut acted = false;
        for i in 0..agents.len() {
            let id = agents[i].player();
            let Some(view) = player_view(&game, id) else { continue };
            let Some(decision) = agents[i].decide(&view) else { continue };

            acted = true;
            decisions += 1;
            if decisions > max_decisions {
                return Err(SimulationError::DecisionLimit(max_decisions));
            }

            match decision {
                Decision::Act(targets) => {
                    // An invalid selection is simply asked again next pass.
                    if let Some(result) = night::submit_action(&mut game, id, &targets)? {
                        agents[i].observe(&result);
                    }
                }
                Decision::Acknowledge => {
                    if night::acknowledge(&mut game, id)? == TurnProgress::TurnComplete {
                        inbox.extend(night::advance(&mut game));
                    }
                }
                Decision::Vote(target) => {
                    day::cast_vote(&mut game, id, target)?;
                }
            }

            for notice in inbox.drain(..) {
                hand_out(agents, &notice);
            }
        }

        if !acted && game.results.is_none() {
            return Err(SimulationError::Stuck(game.phase.kind()));
        }
    }
}

fn summarize(
    game: &Game,
    results: &VoteResults,
    agents: &[Box<dyn Agent>],
    seed: u64,
    decisions: usize,
) -> GameSummary {
    let seats = results.cards.iter()
        .map(|card| SeatSummary {
            player: card.player,
            agent_name: agents.iter()
                .find(|a| a.player() == card.player)
                .map(|a| a.name().to_string())
                .unwrap_or_default(),
            original_role: card.original_role,
            final_role: card.role,
            won: card.did_win,
        })
        .collect();

    GameSummary {
        seed,
        winners: results.winners.clone(),
        win_reason: results.win_reason.clone(),
        eliminated: results.eliminated.clone(),
        decisions,
        night_log_len: game.night_log.len(),
        seats,
    }
}

/// Play a started room to the end through the coordinator. With an inbox,
/// agents learn their results from delivered notices; without one, only
/// from what their own submissions return.
pub async fn drive_room(
    coordinator: &Coordinator,
    room: &str,
    agents: &mut [Box<dyn Agent>],
    mut inbox: Option<&mut broadcast::Receiver<Envelope>>,
    max_decisions: usize,
) -> Result<VoteResults, SimulationError> {
    let mut decisions = 0;

    loop {
        let game = coordinator.snapshot(room).await?;
        if let (Phase::Results, Some(results)) = (&game.phase, game.results) {
            return Ok(results);
        }

        let mut acted = false;
        for i in 0..agents.len() {
            if let Some(rx) = inbox.as_deref_mut() {
                drain(rx, agents);
            }
            let id = agents[i].player();
            let view = coordinator.view(room, id).await?;
            let Some(decision) = agents[i].decide(&view) else { continue };

            acted = true;
            decisions += 1;
            if decisions > max_decisions {
                return Err(SimulationError::DecisionLimit(max_decisions));
            }

            match decision {
                Decision::Act(targets) => {
                    let result = coordinator.submit_night_action(room, id, &targets).await?;
                    if let (None, Some(result)) = (inbox.as_ref(), result) {
                        agents[i].observe(&result);
                    }
                }
                Decision::Acknowledge => {
                    coordinator.acknowledge_result(room, id).await?;
                }
                Decision::Vote(target) => {
                    coordinator.cast_vote(room, id, target).await?;
                }
            }
        }

        if !acted && !coordinator.advance_night(room).await? {
            let phase = coordinator.snapshot(room).await?.phase.kind();
            if phase != PhaseKind::Results {
                return Err(SimulationError::Stuck(phase));
            }
        }
    }
}

fn drain(rx: &mut broadcast::Receiver<Envelope>, agents: &mut [Box<dyn Agent>]) {
    loop {
        match rx.try_recv() {
            Ok(envelope) => hand_out(agents, &envelope.notice),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "bot inbox lagged; results were lost");
            }
            Err(_) => break,
        }
    }
}

// ── Batches ────────────────────────────────────────────────────────────

/// Win tallies over a batch. A game can count for two sides when the
/// Tanner wins alongside a team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub games: usize,
    pub village: usize,
    pub werewolf: usize,
    pub tanner: usize,
    /// Finished with nobody winning.
    pub nobody: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &Result<GameSummary, SimulationError>) {
        self.games += 1;
        let summary = match outcome {
            Ok(summary) => summary,
            Err(_) => {
                self.failed += 1;
                return;
            }
        };
        if summary.winners.is_empty() {
            self.nobody += 1;
        }
        for team in &summary.winners {
            match team {
                Team::Village => self.village += 1,
                Team::Werewolf => self.werewolf += 1,
                Team::Tanner => self.tanner += 1,
            }
        }
    }
}

/// Play `count` independent games in parallel, game `i` seeded `seed + i`.
pub fn run_batch(count: usize, players: u32, roles: &[Role], agent_kind: &str, seed: u64) -> BatchSummary {
    let outcomes: Vec<Result<GameSummary, SimulationError>> = (0..count)
        .into_par_iter()
        .map(|i| {
            let game_seed = seed.wrapping_add(i as u64);
            let mut agents = make_agents(agent_kind, players, game_seed);
            run_game(&mut agents, seats_for(players), roles, game_seed, 10_000)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (i, outcome) in outcomes.iter().enumerate() {
        if let Err(e) = outcome {
            tracing::warn!(game = i, error = %e, "simulated game failed");
        }
        summary.record(outcome);
    }
    summary
}
