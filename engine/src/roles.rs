// ═══════════════════════════════════════════════════════════════════════
// Role catalog — static metadata for every card, and the night order
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Static metadata for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleInfo {
    pub name: &'static str,
    /// None = never wakes at night.
    pub wake_order: Option<u8>,
    /// Needs live input from the player when it wakes.
    pub interactive: bool,
    pub max_count: u8,
    pub team: Team,
}

impl Role {
    pub const ALL: [Role; 18] = [
        Role::Sentinel,
        Role::Werewolf,
        Role::AlphaWolf,
        Role::MysticWolf,
        Role::DreamWolf,
        Role::Minion,
        Role::Mason,
        Role::Seer,
        Role::ApprenticeSeer,
        Role::ParanormalInvestigator,
        Role::Robber,
        Role::Witch,
        Role::Troublemaker,
        Role::Drunk,
        Role::Insomniac,
        Role::Revealer,
        Role::Villager,
        Role::Tanner,
    ];

    pub fn info(self) -> RoleInfo {
        use Team::*;
        let (name, wake_order, interactive, max_count, team) = match self {
            Role::Sentinel               => ("Sentinel",                Some(0),  true,  1, Village),
            // Stands for the whole wolf group; interactivity decided per night.
            Role::Werewolf               => ("Werewolf",                Some(1),  false, 2, Werewolf),
            Role::AlphaWolf              => ("Alpha Wolf",              Some(2),  true,  1, Werewolf),
            Role::MysticWolf             => ("Mystic Wolf",             Some(3),  true,  1, Werewolf),
            Role::Minion                 => ("Minion",                  Some(4),  false, 1, Werewolf),
            Role::Mason                  => ("Mason",                   Some(5),  false, 2, Village),
            Role::Seer                   => ("Seer",                    Some(6),  true,  1, Village),
            Role::ApprenticeSeer         => ("Apprentice Seer",         Some(7),  true,  1, Village),
            Role::ParanormalInvestigator => ("Paranormal Investigator", Some(8),  true,  1, Village),
            Role::Robber                 => ("Robber",                  Some(9),  true,  1, Village),
            Role::Witch                  => ("Witch",                   Some(10), true,  1, Village),
            Role::Troublemaker           => ("Troublemaker",            Some(11), true,  1, Village),
            Role::Drunk                  => ("Drunk",                   Some(12), true,  1, Village),
            Role::Insomniac              => ("Insomniac",               Some(13), false, 1, Village),
            Role::Revealer               => ("Revealer",                Some(14), true,  1, Village),
            Role::DreamWolf              => ("Dream Wolf",              None,     false, 1, Werewolf),
            Role::Villager               => ("Villager",                None,     false, 3, Village),
            Role::Tanner                 => ("Tanner",                  None,     false, 1, Tanner),
        };
        RoleInfo { name, wake_order, interactive, max_count, team }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn team(self) -> Team {
        self.info().team
    }

    /// Any of the four wolf cards, including the one that never wakes.
    pub fn is_wolf(self) -> bool {
        matches!(self, Role::Werewolf | Role::AlphaWolf | Role::MysticWolf | Role::DreamWolf)
    }

    /// Wolves plus the Minion.
    pub fn is_wolf_team(self) -> bool {
        self.team() == Team::Werewolf
    }

    /// Wolves that open their eyes together in the shared group slot.
    pub fn wakes_with_pack(self) -> bool {
        matches!(self, Role::Werewolf | Role::AlphaWolf | Role::MysticWolf)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Role::ALL.iter()
            .copied()
            .find(|r| normalize(r.name()) == wanted)
            .ok_or_else(|| format!("Unknown role '{}'", s))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Night order ────────────────────────────────────────────────────────

/// One entry of the night order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NightSlot {
    /// Werewolf, Alpha Wolf and Mystic Wolf wake together.
    WolfPack,
    Solo(Role),
}

impl NightSlot {
    pub fn role(self) -> Role {
        match self {
            NightSlot::WolfPack => Role::Werewolf,
            NightSlot::Solo(role) => role,
        }
    }
}

/// Roles that wake, in ascending wake order. The Werewolf entry becomes the
/// shared wolf-group slot.
pub fn night_order() -> Vec<NightSlot> {
    let mut waking: Vec<(u8, Role)> = Role::ALL.iter()
        .filter_map(|&r| r.info().wake_order.map(|o| (o, r)))
        .collect();
    waking.sort_by_key(|&(order, _)| order);
    waking.into_iter()
        .map(|(_, r)| if r == Role::Werewolf { NightSlot::WolfPack } else { NightSlot::Solo(r) })
        .collect()
}

/// Flavor text shown to the players who wake.
pub fn prompt(slot: NightSlot, lone_wolf: bool) -> &'static str {
    match slot {
        NightSlot::WolfPack if lone_wolf => {
            "Werewolf, wake up. You are the only wolf awake. You may look at one center card."
        }
        NightSlot::WolfPack => "Werewolves, wake up and look for other werewolves.",
        NightSlot::Solo(role) => match role {
            Role::Sentinel => "Sentinel, wake up. You may place a shield on another player's card.",
            Role::AlphaWolf => "Alpha Wolf, wake up. Choose a player to turn into a Werewolf.",
            Role::MysticWolf => "Mystic Wolf, wake up. You may look at another player's card.",
            Role::Minion => "Minion, wake up. Werewolves, stick out your thumb so the Minion can see you.",
            Role::Mason => "Masons, wake up and look for other Masons.",
            Role::Seer => "Seer, wake up. You may look at another player's card or two of the center cards.",
            Role::ApprenticeSeer => "Apprentice Seer, wake up. You may look at one of the center cards.",
            Role::ParanormalInvestigator => {
                "Paranormal Investigator, wake up. You may look at up to two other players' cards."
            }
            Role::Robber => "Robber, wake up. You may exchange your card with another player's card.",
            Role::Witch => {
                "Witch, wake up. You may look at one of the center cards. If you do, you may exchange it with any player's card."
            }
            Role::Troublemaker => "Troublemaker, wake up. You may exchange cards between two other players.",
            Role::Drunk => "Drunk, wake up and exchange your card with a card from the center.",
            Role::Insomniac => "Insomniac, wake up and look at your card.",
            Role::Revealer => "Revealer, wake up. You may flip over any other player's card.",
            _ => "Close your eyes.",
        },
    }
}
