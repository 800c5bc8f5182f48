// ═══════════════════════════════════════════════════════════════════════
// Heuristic Agent — remembers what its night results showed it and
// votes accordingly. Significantly stronger than RandomAgent.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{shape_of, shaped_targets, Agent, Decision, Shape};
use nightfall_engine::types::*;
use nightfall_engine::visibility::PlayerView;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

pub struct HeuristicAgent {
    player: PlayerId,
    rng: ChaCha8Rng,
    /// Last card seen in front of each other player.
    known: BTreeMap<PlayerId, Role>,
    /// Our own card as far as we know. None after a blind swap.
    believed: Option<Role>,
    dealt: Option<Role>,
}

impl HeuristicAgent {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        HeuristicAgent {
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
            known: BTreeMap::new(),
            believed: None,
            dealt: None,
        }
    }

    /// The side we think we are playing for.
    fn side(&self) -> Team {
        self.believed.or(self.dealt).map_or(Team::Village, Role::team)
    }

    fn learn(&mut self, view: &PlayerView) {
        if self.dealt.is_none() {
            self.dealt = Some(view.original_role);
            self.believed = Some(view.original_role);
        }
        for card in &view.revealed {
            if card.player == self.player {
                self.believed = Some(card.role);
            } else {
                self.known.insert(card.player, card.role);
            }
        }
    }

    fn known_where(&self, view: &PlayerView, pred: impl Fn(Role) -> bool) -> Vec<PlayerId> {
        view.others()
            .into_iter()
            .filter(|id| self.known.get(id).is_some_and(|&r| pred(r)))
            .collect()
    }

    fn unknown_others(&self, view: &PlayerView, exclude: &[PlayerId]) -> Vec<PlayerId> {
        view.others()
            .into_iter()
            .filter(|id| !exclude.contains(id) && !self.known.contains_key(id))
            .collect()
    }
}

impl Agent for HeuristicAgent {
    fn name(&self) -> &str { "Heuristic" }
    fn player(&self) -> PlayerId { self.player }

    fn decide(&mut self, view: &PlayerView) -> Option<Decision> {
        self.learn(view);
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

    fn observe(&mut self, result: &ActionResult) {
        match result {
            ActionResult::Info { seen, .. } => {
                for s in seen {
                    self.known.insert(s.player, s.role);
                }
            }
            ActionResult::View { player, role, .. } | ActionResult::Reveal { player, role, .. } => {
                if *player == self.player {
                    self.believed = Some(*role);
                } else {
                    self.known.insert(*player, *role);
                }
            }
            ActionResult::SwapView { player, new_role, .. } => {
                // The robbed player now holds our old card.
                if let Some(old) = self.believed {
                    self.known.insert(*player, old);
                }
                self.believed = Some(*new_role);
            }
            ActionResult::PiResult { viewed, became_role } => {
                for card in viewed {
                    if let Some(role) = card.role {
                        self.known.insert(card.player, role);
                    }
                }
                if let Some(role) = became_role {
                    self.believed = Some(*role);
                }
            }
            ActionResult::SwapCenter { .. } => self.believed = None,
            ActionResult::Swap { .. } => {
                // Names only; what we knew about either seat is stale.
                self.known.clear();
            }
            ActionResult::ViewCenter { .. } | ActionResult::WitchResult { .. } => {}
        }
    }

    fn pick_player(&mut self, view: &PlayerView, exclude: &[PlayerId]) -> Option<PlayerId> {
        // Look where we have not looked yet.
        let unknown = self.unknown_others(view, exclude);
        if let Some(&id) = unknown.choose(&mut self.rng) {
            return Some(id);
        }
        let rest: Vec<PlayerId> = view.others().into_iter().filter(|id| !exclude.contains(id)).collect();
        rest.choose(&mut self.rng).copied()
    }

    fn pick_center(&mut self, _view: &PlayerView, exclude: &[u8]) -> u8 {
        (0..CENTER_CARDS as u8).find(|i| !exclude.contains(i)).unwrap_or(0)
    }

    fn choose_targets(&mut self, view: &PlayerView, turn: &NightTurn) -> Vec<Target> {
        let me = view.viewer;
        match (turn.role(), shape_of(turn)) {
            (Role::AlphaWolf, _) => {
                // Convert someone not already on our side.
                let mut candidates = self.unknown_others(view, &[me]);
                candidates.extend(self.known_where(view, |r| !r.is_wolf_team()));
                match candidates.choose(&mut self.rng) {
                    Some(&id) => vec![Target::Player(id)],
                    None => shaped_targets(self, view, turn),
                }
            }
            (_, Shape::CenterThenAnyPlayer) => {
                // Look only.
                vec![Target::Center(self.pick_center(view, &[]))]
            }
            _ => shaped_targets(self, view, turn),
        }
    }

    fn vote(&mut self, view: &PlayerView) -> VoteTarget {
        let side = self.side();
        let preferred = match side {
            Team::Village => self.known_where(view, Role::is_wolf_team),
            Team::Werewolf => self.known_where(view, |r| !r.is_wolf_team() && r != Role::Tanner),
            Team::Tanner => Vec::new(),
        };
        if let Some(&id) = preferred.choose(&mut self.rng) {
            return VoteTarget::Player(id);
        }

        // Nobody known: a wolf points at anyone not known to be a wolf,
        // the village picks among the unknowns.
        let fallback: Vec<PlayerId> = match side {
            Team::Werewolf => {
                let wolves = self.known_where(view, Role::is_wolf_team);
                view.others().into_iter().filter(|id| !wolves.contains(id)).collect()
            }
            _ => {
                let cleared = self.known_where(view, |r| !r.is_wolf_team());
                view.others().into_iter().filter(|id| !cleared.contains(id)).collect()
            }
        };
        fallback.choose(&mut self.rng).map_or(VoteTarget::Center, |&id| VoteTarget::Player(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_engine::roles::NightSlot;

    fn roster(count: u32) -> Vec<RosterEntry> {
        (0..count)
            .map(|i| RosterEntry { id: PlayerId(i), name: format!("P{}", i), host: i == 0, connected: true })
            .collect()
    }

    fn view(viewer: u32, role: Role, phase: PhaseKind) -> PlayerView {
        PlayerView {
            viewer: PlayerId(viewer),
            name: format!("P{}", viewer),
            original_role: role,
            phase,
            roster: roster(5),
            revealed: Vec::new(),
            turn: None,
            must_act: false,
            must_acknowledge: false,
            has_voted: false,
            voted: Vec::new(),
        }
    }

    #[test]
    fn test_villager_votes_for_known_wolf() {
        let mut agent = HeuristicAgent::new(PlayerId(0), 1);
        agent.decide(&view(0, Role::Seer, PhaseKind::Night));
        agent.observe(&ActionResult::View { player: PlayerId(3), name: "P3".into(), role: Role::Werewolf });

        let decision = agent.decide(&view(0, Role::Seer, PhaseKind::Day));
        assert_eq!(decision, Some(Decision::Vote(VoteTarget::Player(PlayerId(3)))));
    }

    #[test]
    fn test_wolf_never_votes_for_known_partner() {
        for seed in 0..20 {
            let mut agent = HeuristicAgent::new(PlayerId(1), seed);
            agent.decide(&view(1, Role::Werewolf, PhaseKind::Night));
            agent.observe(&ActionResult::Info {
                message: String::new(),
                shielded: false,
                seen: vec![Sighting { player: PlayerId(4), name: "P4".into(), role: Role::Werewolf }],
            });
            let vote = agent.vote(&view(1, Role::Werewolf, PhaseKind::Day));
            assert_ne!(vote, VoteTarget::Player(PlayerId(4)));
            assert_ne!(vote, VoteTarget::Player(PlayerId(1)));
        }
    }

    #[test]
    fn test_robbed_card_changes_side() {
        let mut agent = HeuristicAgent::new(PlayerId(0), 7);
        agent.decide(&view(0, Role::Robber, PhaseKind::Night));
        agent.observe(&ActionResult::SwapView { player: PlayerId(2), name: "P2".into(), new_role: Role::Werewolf });
        assert_eq!(agent.side(), Team::Werewolf);
        assert_eq!(agent.known.get(&PlayerId(2)), Some(&Role::Robber));
    }

    #[test]
    fn test_troublemaker_picks_two_distinct_others() {
        let mut agent = HeuristicAgent::new(PlayerId(2), 3);
        let turn = NightTurn {
            index: 11,
            slot: NightSlot::Solo(Role::Troublemaker),
            players: vec![PlayerId(2)],
            prompt: String::new(),
            interactive: true,
        };
        let mut v = view(2, Role::Troublemaker, PhaseKind::Night);
        v.turn = Some(turn);
        v.must_act = true;

        match agent.decide(&v) {
            Some(Decision::Act(targets)) => {
                assert_eq!(targets.len(), 2);
                assert_ne!(targets[0], targets[1]);
                assert!(!targets.contains(&Target::Player(PlayerId(2))));
            }
            other => panic!("unexpected decision {:?}", other),
        }
    }
}
