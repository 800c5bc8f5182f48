// ═══════════════════════════════════════════════════════════════════════
// Room storage — the game record of every open room
//
// Every coordinator operation loads the record, mutates a copy and saves
// it back before anyone is told about the change. Two backends:
//   MemoryStore — a mutex-guarded map, for tests and throwaway servers
//   SqliteStore — SQLite; one transaction per save, night log rows are
//                 insert-only
// ═══════════════════════════════════════════════════════════════════════

use crate::error::StoreError;
use nightfall_engine::*;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub trait RoomStore: Send + Sync {
    fn load(&self, room: &str) -> Result<Option<Game>, StoreError>;
    fn save(&self, game: &Game) -> Result<(), StoreError>;
    /// Returns whether the room existed.
    fn delete(&self, room: &str) -> Result<bool, StoreError>;
    fn rooms(&self) -> Result<Vec<String>, StoreError>;
}

// ── In-memory ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<String, Game>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn load(&self, room: &str) -> Result<Option<Game>, StoreError> {
        let games = self.games.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(games.get(room).cloned())
    }

    fn save(&self, game: &Game) -> Result<(), StoreError> {
        let mut games = self.games.lock().map_err(|_| StoreError::LockPoisoned)?;
        games.insert(game.room.clone(), game.clone());
        Ok(())
    }

    fn delete(&self, room: &str) -> Result<bool, StoreError> {
        let mut games = self.games.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(games.remove(room).is_some())
    }

    fn rooms(&self) -> Result<Vec<String>, StoreError> {
        let games = self.games.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut rooms: Vec<String> = games.keys().cloned().collect();
        rooms.sort();
        Ok(rooms)
    }
}

// ── SQLite ─────────────────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

struct RoomRow {
    phase: String,
    night_index: i64,
    seed: i64,
    selected_roles: String,
    center: String,
    shielded: String,
    revealed: String,
    votes: String,
    roster: String,
    results: Option<String>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        create_schema(&conn)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    /// Number of stored night log rows for a room.
    pub fn log_rows(&self, room: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM night_log WHERE room = ?1",
            params![room],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS rooms (
            room            TEXT PRIMARY KEY,
            phase           TEXT NOT NULL,
            night_index     INTEGER NOT NULL,
            seed            INTEGER NOT NULL,
            selected_roles  TEXT NOT NULL,
            center          TEXT NOT NULL,
            shielded        TEXT NOT NULL,
            revealed        TEXT NOT NULL,
            votes           TEXT NOT NULL,
            roster          TEXT NOT NULL,
            results         TEXT,
            updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS room_players (
            room            TEXT NOT NULL,
            seat            INTEGER NOT NULL,
            player_id       INTEGER NOT NULL,
            name            TEXT NOT NULL,
            original_role   TEXT NOT NULL,
            role            TEXT NOT NULL,
            host            INTEGER NOT NULL,
            connected       INTEGER NOT NULL,
            PRIMARY KEY (room, seat)
        );

        CREATE TABLE IF NOT EXISTS night_log (
            room            TEXT NOT NULL,
            seq             INTEGER NOT NULL,
            role            TEXT NOT NULL,
            description     TEXT NOT NULL,
            PRIMARY KEY (room, seq)
        );
    ")?;
    Ok(())
}

fn parse_role(room: &str, text: &str) -> Result<Role, StoreError> {
    text.parse().map_err(|reason| StoreError::Corrupt { room: room.to_string(), reason })
}

impl RoomStore for SqliteStore {
    fn load(&self, room: &str) -> Result<Option<Game>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let row = conn.query_row(
            "SELECT phase, night_index, seed, selected_roles, center, shielded, revealed, votes, roster, results
             FROM rooms WHERE room = ?1",
            params![room],
            |row| {
                Ok(RoomRow {
                    phase: row.get(0)?,
                    night_index: row.get(1)?,
                    seed: row.get(2)?,
                    selected_roles: row.get(3)?,
                    center: row.get(4)?,
                    shielded: row.get(5)?,
                    revealed: row.get(6)?,
                    votes: row.get(7)?,
                    roster: row.get(8)?,
                    results: row.get(9)?,
                })
            },
        ).optional()?;
        let Some(row) = row else { return Ok(None) };

        let mut stmt = conn.prepare(
            "SELECT player_id, name, original_role, role, host, connected
             FROM room_players WHERE room = ?1 ORDER BY seat",
        )?;
        let raw_players = stmt.query_map(params![room], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

        let players = raw_players.into_iter()
            .map(|(id, name, original, current, host, connected)| {
                Ok(Player {
                    id: PlayerId(id as u32),
                    name,
                    original_role: parse_role(room, &original)?,
                    role: parse_role(room, &current)?,
                    host,
                    connected,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let mut stmt = conn.prepare(
            "SELECT role, description FROM night_log WHERE room = ?1 ORDER BY seq",
        )?;
        let raw_log = stmt.query_map(params![room], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
        let log = raw_log.into_iter()
            .map(|(role, description)| Ok(NightLogEntry { role: parse_role(room, &role)?, description }))
            .collect::<Result<Vec<_>, StoreError>>()?;

        let votes: Vec<(PlayerId, VoteTarget)> = serde_json::from_str(&row.votes)?;
        let results = row.results.as_deref().map(serde_json::from_str).transpose()?;

        Ok(Some(Game {
            room: room.to_string(),
            phase: serde_json::from_str(&row.phase)?,
            seats: serde_json::from_str(&row.roster)?,
            selected_roles: serde_json::from_str(&row.selected_roles)?,
            seed: row.seed as u64,
            players,
            center: serde_json::from_str(&row.center)?,
            night_index: row.night_index as usize,
            night_log: NightLog::from(log),
            shielded: serde_json::from_str(&row.shielded)?,
            revealed: serde_json::from_str(&row.revealed)?,
            votes: votes.into_iter().collect::<BTreeMap<_, _>>(),
            results,
        }))
    }

    fn save(&self, game: &Game) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;

        let votes: Vec<(PlayerId, VoteTarget)> = game.votes.iter().map(|(&k, &v)| (k, v)).collect();
        let results = game.results.as_ref().map(serde_json::to_string).transpose()?;

        tx.execute(
            "INSERT INTO rooms (room, phase, night_index, seed, selected_roles, center, shielded, revealed, votes, roster, results)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(room) DO UPDATE SET
                phase = excluded.phase,
                night_index = excluded.night_index,
                seed = excluded.seed,
                selected_roles = excluded.selected_roles,
                center = excluded.center,
                shielded = excluded.shielded,
                revealed = excluded.revealed,
                votes = excluded.votes,
                roster = excluded.roster,
                results = excluded.results,
                updated_at = datetime('now')",
            params![
                game.room,
                serde_json::to_string(&game.phase)?,
                game.night_index as i64,
                game.seed as i64,
                serde_json::to_string(&game.selected_roles)?,
                serde_json::to_string(&game.center)?,
                serde_json::to_string(&game.shielded)?,
                serde_json::to_string(&game.revealed)?,
                serde_json::to_string(&votes)?,
                serde_json::to_string(&game.seats)?,
                results,
            ],
        )?;

        tx.execute("DELETE FROM room_players WHERE room = ?1", params![game.room])?;
        for (seat, player) in game.players.iter().enumerate() {
            tx.execute(
                "INSERT INTO room_players (room, seat, player_id, name, original_role, role, host, connected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    game.room,
                    seat as i64,
                    player.id.0 as i64,
                    player.name,
                    player.original_role.name(),
                    player.role.name(),
                    player.host,
                    player.connected,
                ],
            )?;
        }

        // Rows past the current log belong to a previous game in this room.
        tx.execute(
            "DELETE FROM night_log WHERE room = ?1 AND seq >= ?2",
            params![game.room, game.night_log.len() as i64],
        )?;
        for (seq, entry) in game.night_log.entries().iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO night_log (room, seq, role, description) VALUES (?1, ?2, ?3, ?4)",
                params![game.room, seq as i64, entry.role.name(), entry.description],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, room: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM rooms WHERE room = ?1", params![room])?;
        tx.execute("DELETE FROM room_players WHERE room = ?1", params![room])?;
        tx.execute("DELETE FROM night_log WHERE room = ?1", params![room])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn rooms(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT room FROM rooms ORDER BY room")?;
        let rooms = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rooms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightfall_engine::night::{advance, submit_action};
    use nightfall_engine::setup::{default_roles, start_game};

    fn dealt_game(room: &str) -> Game {
        let seats = (0..4).map(|i| Seat::new(i, format!("P{}", i))).collect();
        let mut game = Game::new(room, seats);
        start_game(&mut game, &default_roles(4), 11).unwrap();
        advance(&mut game);
        game
    }

    #[test]
    fn test_sqlite_restores_mid_night_game() {
        let store = SqliteStore::in_memory().unwrap();
        let mut game = dealt_game("alpha");
        game.shielded.insert(PlayerId(2));
        game.votes.insert(PlayerId(1), VoteTarget::Center);

        store.save(&game).unwrap();
        let loaded = store.load("alpha").unwrap().unwrap();
        assert_eq!(loaded, game);
    }

    #[test]
    fn test_sqlite_missing_room() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load("nowhere").unwrap().is_none());
        assert!(!store.delete("nowhere").unwrap());
    }

    #[test]
    fn test_night_log_rows_are_never_rewritten() {
        let store = SqliteStore::in_memory().unwrap();
        let mut game = dealt_game("beta");
        game.night_log = NightLog::from(vec![NightLogEntry {
            role: Role::Seer,
            description: "P0 looked at P1's card: Villager".into(),
        }]);
        store.save(&game).unwrap();

        game.night_log = NightLog::from(vec![NightLogEntry {
            role: Role::Seer,
            description: "rewritten".into(),
        }]);
        store.save(&game).unwrap();

        let loaded = store.load("beta").unwrap().unwrap();
        assert_eq!(loaded.night_log.entries()[0].description, "P0 looked at P1's card: Villager");
    }

    #[test]
    fn test_restart_clears_stored_log() {
        let store = SqliteStore::in_memory().unwrap();
        let mut game = dealt_game("gamma");
        // Play whatever the first turn needs so the log is not empty.
        if let Phase::Night(NightStage::AwaitingAction { turn, .. }) = game.phase.clone() {
            let actor = turn.players[0];
            let target = game.players.iter().map(|p| p.id).find(|&id| id != actor).unwrap();
            let _ = submit_action(&mut game, actor, &[Target::Center(0)]);
            let _ = submit_action(&mut game, actor, &[Target::Player(target)]);
        }
        store.save(&game).unwrap();

        nightfall_engine::setup::restart(&mut game);
        store.save(&game).unwrap();
        assert_eq!(store.log_rows("gamma").unwrap(), 0);
        assert_eq!(store.load("gamma").unwrap().unwrap().phase, Phase::Lobby);
    }

    #[test]
    fn test_rooms_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&dealt_game("b")).unwrap();
        store.save(&dealt_game("a")).unwrap();
        assert_eq!(store.rooms().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.delete("a").unwrap());
        assert_eq!(store.rooms().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let game = dealt_game("mem");
        store.save(&game).unwrap();
        assert_eq!(store.load("mem").unwrap(), Some(game));
        assert!(store.delete("mem").unwrap());
        assert!(store.load("mem").unwrap().is_none());
    }
}
