// ═══════════════════════════════════════════════════════════════════════
// Core types — players, the per-room game record, night turns and results
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::roles::NightSlot;

/// Number of undealt cards in the middle of the table.
pub const CENTER_CARDS: usize = 3;
pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 10;

// ── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    Village,
    Werewolf,
    Tanner,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Village => write!(f, "Village"),
            Team::Werewolf => write!(f, "Werewolf"),
            Team::Tanner => write!(f, "Tanner"),
        }
    }
}

/// Every card in the box. Metadata lives in the catalog (roles.rs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Sentinel,
    Werewolf,
    #[serde(rename = "Alpha Wolf")]
    AlphaWolf,
    #[serde(rename = "Mystic Wolf")]
    MysticWolf,
    #[serde(rename = "Dream Wolf")]
    DreamWolf,
    Minion,
    Mason,
    Seer,
    #[serde(rename = "Apprentice Seer")]
    ApprenticeSeer,
    #[serde(rename = "Paranormal Investigator")]
    ParanormalInvestigator,
    Robber,
    Witch,
    Troublemaker,
    Drunk,
    Insomniac,
    Revealer,
    Villager,
    Tanner,
}

/// Coarse phase name, as announced in `phase_change` notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKind {
    Lobby,
    Night,
    Day,
    Results,
}

// ── Player ID ──────────────────────────────────────────────────────────
// Identifier of a live connection's seat. Compact and copyable.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Seat / Player ──────────────────────────────────────────────────────

/// Lobby roster entry. Membership itself is managed outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: PlayerId,
    pub name: String,
    pub host: bool,
    pub connected: bool,
}

impl Seat {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Seat {
            id: PlayerId(id),
            name: name.into(),
            host: id == 0,
            connected: true,
        }
    }
}

/// A dealt player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Dealt at game start, never changes. Decides whose turn it is.
    pub original_role: Role,
    /// Current card in front of the player. Decides the win condition.
    pub role: Role,
    pub host: bool,
    pub connected: bool,
}

// ── Targets ────────────────────────────────────────────────────────────

/// One element of a night-action selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Player(PlayerId),
    Center(u8),
}

/// Where a day vote points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTarget {
    Player(PlayerId),
    Center,
}

// ── Night Turn ─────────────────────────────────────────────────────────

/// The role whose turn is active and who may act on it. Not persisted on its
/// own; the stage embeds a copy while the turn is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightTurn {
    /// Position in the night order table.
    pub index: usize,
    pub slot: NightSlot,
    pub players: Vec<PlayerId>,
    pub prompt: String,
    pub interactive: bool,
}

impl NightTurn {
    pub fn role(&self) -> Role {
        self.slot.role()
    }

    /// True for the shared wolf-group slot with exactly one awake wolf.
    pub fn is_lone_wolf(&self) -> bool {
        self.slot == NightSlot::WolfPack && self.interactive
    }
}

// ── Action Results ─────────────────────────────────────────────────────

/// A player identified by a revealed role, as seen during the night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub player: PlayerId,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterView {
    pub index: u8,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigatedCard {
    pub player: PlayerId,
    pub name: String,
    /// None when the card was shielded.
    pub role: Option<Role>,
    pub shielded: bool,
}

/// Outcome of one resolved action, sent only to the acting player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionResult {
    Info {
        message: String,
        #[serde(default)]
        shielded: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        seen: Vec<Sighting>,
    },
    View {
        player: PlayerId,
        name: String,
        role: Role,
    },
    ViewCenter {
        cards: Vec<CenterView>,
    },
    SwapView {
        player: PlayerId,
        name: String,
        new_role: Role,
    },
    Swap {
        first: String,
        second: String,
    },
    SwapCenter {
        index: u8,
    },
    PiResult {
        viewed: Vec<InvestigatedCard>,
        became_role: Option<Role>,
    },
    WitchResult {
        index: u8,
        viewed: Role,
        swapped_with: Option<String>,
        blocked: bool,
    },
    Reveal {
        player: PlayerId,
        name: String,
        role: Role,
        flipped: bool,
    },
}

impl ActionResult {
    pub fn info(message: impl Into<String>) -> Self {
        ActionResult::Info { message: message.into(), shielded: false, seen: Vec::new() }
    }

    pub fn shielded(name: &str) -> Self {
        ActionResult::Info {
            message: format!("{} is protected by a shield. Nothing happens.", name),
            shielded: true,
            seen: Vec::new(),
        }
    }

    pub fn is_shield_block(&self) -> bool {
        matches!(self, ActionResult::Info { shielded: true, .. })
    }
}

// ── Night Log ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightLogEntry {
    pub role: Role,
    pub description: String,
}

/// Append-only record of the night. Entries are never handed out mutably.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NightLog(Vec<NightLogEntry>);

impl NightLog {
    pub fn append(&mut self, role: Role, description: impl Into<String>) {
        self.0.push(NightLogEntry { role, description: description.into() });
    }

    pub fn entries(&self) -> &[NightLogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NightLogEntry>> for NightLog {
    fn from(entries: Vec<NightLogEntry>) -> Self {
        NightLog(entries)
    }
}

// ── Phase / Night Stage ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NightStage {
    /// The current slot has not been announced yet.
    TurnPending,
    /// Eligible players still have to submit a valid action.
    AwaitingAction {
        turn: NightTurn,
        to_act: BTreeSet<PlayerId>,
        to_ack: BTreeSet<PlayerId>,
    },
    /// Everyone acted (or the turn auto-resolved); waiting for players to
    /// confirm they read their result.
    AwaitingAck {
        turn: NightTurn,
        to_ack: BTreeSet<PlayerId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Night(NightStage),
    Day,
    Results,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Lobby => PhaseKind::Lobby,
            Phase::Night(_) => PhaseKind::Night,
            Phase::Day => PhaseKind::Day,
            Phase::Results => PhaseKind::Results,
        }
    }
}

// ── Vote Results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub target: VoteTarget,
    pub votes: usize,
    pub voters: Vec<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalCard {
    pub player: PlayerId,
    pub name: String,
    pub original_role: Role,
    pub role: Role,
    pub revealed: bool,
    pub did_win: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResults {
    pub eliminated: Vec<PlayerId>,
    /// The center was among the destinations tied for most votes.
    pub center_tied: bool,
    pub winners: Vec<Team>,
    pub win_reason: String,
    pub breakdown: Vec<VoteCount>,
    pub cards: Vec<FinalCard>,
    pub center: Vec<Role>,
    pub night_log: Vec<NightLogEntry>,
}

// ── Notices ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub host: bool,
    pub connected: bool,
}

/// Outbound notifications produced by the engine. The session layer decides
/// how they travel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum Notice {
    NightTurn { to: Vec<PlayerId>, turn: NightTurn },
    ActionResult { to: PlayerId, result: ActionResult },
    PhaseChange { phase: PhaseKind, roster: Vec<RosterEntry> },
    VoteResults { results: VoteResults },
}

impl Notice {
    /// None means everyone in the room.
    pub fn recipients(&self) -> Option<Vec<PlayerId>> {
        match self {
            Notice::NightTurn { to, .. } => Some(to.clone()),
            Notice::ActionResult { to, .. } => Some(vec![*to]),
            Notice::PhaseChange { .. } | Notice::VoteResults { .. } => None,
        }
    }
}

// ── Game ───────────────────────────────────────────────────────────────

/// The whole per-room record. Everything here is what a store must retain to
/// resume the room after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub room: String,
    pub phase: Phase,
    /// Lobby roster; kept across restarts.
    pub seats: Vec<Seat>,
    pub selected_roles: Vec<Role>,
    pub seed: u64,

    /// Dealt players, empty in the lobby.
    pub players: Vec<Player>,
    /// Exactly CENTER_CARDS once dealt.
    pub center: Vec<Role>,

    /// Position in the night order table.
    pub night_index: usize,
    pub night_log: NightLog,
    pub shielded: BTreeSet<PlayerId>,
    pub revealed: BTreeSet<PlayerId>,

    pub votes: BTreeMap<PlayerId, VoteTarget>,
    pub results: Option<VoteResults>,
}

impl Game {
    pub fn new(room: impl Into<String>, seats: Vec<Seat>) -> Self {
        Game {
            room: room.into(),
            phase: Phase::Lobby,
            seats,
            selected_roles: Vec::new(),
            seed: 0,
            players: Vec::new(),
            center: Vec::new(),
            night_index: 0,
            night_log: NightLog::default(),
            shielded: BTreeSet::new(),
            revealed: BTreeSet::new(),
            votes: BTreeMap::new(),
            results: None,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn name_of(&self, id: PlayerId) -> String {
        self.player(id).map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    pub fn is_shielded(&self, id: PlayerId) -> bool {
        self.shielded.contains(&id)
    }

    /// Players whose dealt card satisfies `pred`, in seating order.
    pub fn players_dealt(&self, pred: impl Fn(Role) -> bool) -> Vec<PlayerId> {
        self.players.iter()
            .filter(|p| pred(p.original_role))
            .map(|p| p.id)
            .collect()
    }

    /// Swap the current cards of two players.
    pub fn swap_roles(&mut self, a: PlayerId, b: PlayerId) {
        let (Some(ia), Some(ib)) = (
            self.players.iter().position(|p| p.id == a),
            self.players.iter().position(|p| p.id == b),
        ) else {
            return;
        };
        let role_a = self.players[ia].role;
        self.players[ia].role = self.players[ib].role;
        self.players[ib].role = role_a;
    }

    /// Swap a player's current card with a center card. Returns the card the
    /// player now holds.
    pub fn swap_with_center(&mut self, id: PlayerId, index: usize) -> Option<Role> {
        let center = *self.center.get(index)?;
        let player = self.player_mut(id)?;
        let old = player.role;
        player.role = center;
        self.center[index] = old;
        Some(center)
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.seats.iter()
            .map(|s| RosterEntry {
                id: s.id,
                name: s.name.clone(),
                host: s.host,
                connected: s.connected,
            })
            .collect()
    }

    pub fn set_connected(&mut self, id: PlayerId, connected: bool) -> bool {
        let mut found = false;
        if let Some(seat) = self.seats.iter_mut().find(|s| s.id == id) {
            seat.connected = connected;
            found = true;
        }
        if let Some(player) = self.player_mut(id) {
            player.connected = connected;
        }
        found
    }
}
