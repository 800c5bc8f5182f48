// ═══════════════════════════════════════════════════════════════════════
// Random Agent — picks uniformly among well-shaped selections.
// Serves as baseline and for testing game engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{shape_of, shaped_targets, Agent, Shape};
use nightfall_engine::types::*;
use nightfall_engine::visibility::PlayerView;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct RandomAgent {
    player: PlayerId,
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        RandomAgent {
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str { "Random" }
    fn player(&self) -> PlayerId { self.player }

    fn pick_player(&mut self, view: &PlayerView, exclude: &[PlayerId]) -> Option<PlayerId> {
        let candidates: Vec<PlayerId> = view.roster.iter()
            .map(|r| r.id)
            .filter(|id| !exclude.contains(id))
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    fn pick_center(&mut self, _view: &PlayerView, exclude: &[u8]) -> u8 {
        let candidates: Vec<u8> = (0..CENTER_CARDS as u8).filter(|i| !exclude.contains(i)).collect();
        candidates.choose(&mut self.rng).copied().unwrap_or(0)
    }

    fn vote(&mut self, view: &PlayerView) -> VoteTarget {
        if self.rng.gen_bool(0.1) {
            return VoteTarget::Center;
        }
        self.pick_player(view, &[view.viewer]).map_or(VoteTarget::Center, VoteTarget::Player)
    }

    fn choose_targets(&mut self, view: &PlayerView, turn: &NightTurn) -> Vec<Target> {
        let me = view.viewer;
        match shape_of(turn) {
            Shape::PlayerOrTwoCenter if self.rng.gen_bool(0.5) => {
                let first = self.pick_center(view, &[]);
                let second = self.pick_center(view, &[first]);
                vec![Target::Center(first), Target::Center(second)]
            }
            Shape::UpToTwoOtherPlayers if self.rng.gen_bool(0.5) => {
                self.pick_player(view, &[me]).map(Target::Player).into_iter().collect()
            }
            Shape::CenterThenAnyPlayer => {
                let mut targets = vec![Target::Center(self.pick_center(view, &[]))];
                if self.rng.gen_bool(0.5) {
                    // Any player, the witch included.
                    if let Some(id) = self.pick_player(view, &[]) {
                        targets.push(Target::Player(id));
                    }
                }
                targets
            }
            _ => shaped_targets(self, view, turn),
        }
    }
}
