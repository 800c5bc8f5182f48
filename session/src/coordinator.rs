// ═══════════════════════════════════════════════════════════════════════
// Room Coordinator
//
// Every operation runs under the room's lock and follows the same path:
//   load the record → apply the engine call to that copy → save → deliver
// Notices only leave after the save succeeded, so a failed save means
// nobody hears about a change that never happened.
//
// advance_night is single-flight per room: a second caller that finds the
// room busy returns immediately instead of queueing behind the first.
//
// The lock registry only holds entries for rooms that exist. An entry is
// retired while its guard is still held (room closed, or found missing),
// and anyone who was queued on a retired lock starts over with the
// current one. Store calls run on the blocking pool.
// ═══════════════════════════════════════════════════════════════════════

use crate::error::SessionError;
use crate::notify::Notifier;
use crate::store::RoomStore;
use nightfall_engine::visibility::{player_view, PlayerView};
use nightfall_engine::*;
use nightfall_engine::{day, night, setup};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, info_span, warn, Instrument};

type RoomLock = Arc<tokio::sync::Mutex<()>>;

/// Proof that the caller holds the room's current lock.
struct RoomGuard {
    lock: RoomLock,
    _held: OwnedMutexGuard<()>,
}

#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn RoomStore>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<Mutex<HashMap<String, RoomLock>>>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn RoomStore>, notifier: Arc<dyn Notifier>) -> Self {
        Coordinator { store, notifier, locks: Arc::new(Mutex::new(HashMap::new())) }
    }

    // ── Room locks ─────────────────────────────────────────────────────

    fn registry(&self) -> MutexGuard<'_, HashMap<String, RoomLock>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn room_lock(&self, room: &str) -> RoomLock {
        self.registry().entry(room.to_string()).or_default().clone()
    }

    fn is_current(&self, room: &str, lock: &RoomLock) -> bool {
        self.registry().get(room).is_some_and(|current| Arc::ptr_eq(current, lock))
    }

    async fn acquire(&self, room: &str) -> RoomGuard {
        loop {
            let lock = self.room_lock(room);
            let held = lock.clone().lock_owned().await;
            if self.is_current(room, &lock) {
                return RoomGuard { lock, _held: held };
            }
        }
    }

    /// None when another holder has the room right now.
    fn try_acquire(&self, room: &str) -> Option<RoomGuard> {
        loop {
            let lock = self.room_lock(room);
            let held = lock.clone().try_lock_owned().ok()?;
            if self.is_current(room, &lock) {
                return Some(RoomGuard { lock, _held: held });
            }
        }
    }

    /// Drop the registry entry. Must be the last thing done under `guard`.
    fn retire(&self, room: &str, guard: &RoomGuard) {
        let mut locks = self.registry();
        if locks.get(room).is_some_and(|current| Arc::ptr_eq(current, &guard.lock)) {
            locks.remove(room);
        }
    }

    // ── Store access ───────────────────────────────────────────────────

    async fn fetch(&self, room: &str) -> Result<Option<Game>, SessionError> {
        let store = self.store.clone();
        let room = room.to_string();
        Ok(tokio::task::spawn_blocking(move || store.load(&room)).await??)
    }

    /// Load under the lock; a missing room also retires its lock.
    async fn load(&self, room: &str, guard: &RoomGuard) -> Result<Game, SessionError> {
        match self.fetch(room).await? {
            Some(game) => Ok(game),
            None => {
                self.retire(room, guard);
                Err(SessionError::RoomNotFound(room.to_string()))
            }
        }
    }

    async fn commit(&self, game: &Game, notices: Vec<Notice>) -> Result<(), SessionError> {
        let store = self.store.clone();
        let record = game.clone();
        tokio::task::spawn_blocking(move || store.save(&record)).await??;
        for notice in &notices {
            self.notifier.deliver(&game.room, notice);
        }
        Ok(())
    }

    // ── Lobby ──────────────────────────────────────────────────────────

    pub async fn open_room(&self, room: &str, seats: Vec<Seat>) -> Result<(), SessionError> {
        let guard = self.acquire(room).await;
        if self.fetch(room).await?.is_some() {
            return Err(SessionError::RoomExists(room.to_string()));
        }

        let game = Game::new(room, seats);
        let notice = Notice::PhaseChange { phase: PhaseKind::Lobby, roster: game.roster() };
        if let Err(e) = self.commit(&game, vec![notice]).await {
            self.retire(room, &guard);
            return Err(e);
        }
        info!(room, seats = game.seats.len(), "room opened");
        Ok(())
    }

    /// Deal and run the night up to the first turn that needs someone.
    pub async fn start_game(&self, room: &str, roles: &[Role], seed: u64) -> Result<(), SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        let mut notices = setup::start_game(&mut game, roles, seed)?;
        notices.extend(night::advance(&mut game));
        self.commit(&game, notices).await?;
        info!(room, seed, players = game.players.len(), "game started");
        Ok(())
    }

    pub async fn restart(&self, room: &str) -> Result<(), SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        let notices = setup::restart(&mut game);
        self.commit(&game, notices).await?;
        info!(room, "room back in lobby");
        Ok(())
    }

    /// Returns whether the room existed.
    pub async fn close_room(&self, room: &str) -> Result<bool, SessionError> {
        let guard = self.acquire(room).await;
        let store = self.store.clone();
        let key = room.to_string();
        let existed = tokio::task::spawn_blocking(move || store.delete(&key)).await??;

        self.notifier.close(room);
        self.retire(room, &guard);
        info!(room, existed, "room closed");
        Ok(existed)
    }

    pub async fn set_connected(&self, room: &str, player: PlayerId, connected: bool) -> Result<(), SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        if !game.set_connected(player, connected) {
            return Err(SessionError::UnknownPlayer(player));
        }
        let notice = Notice::PhaseChange { phase: game.phase.kind(), roster: game.roster() };
        self.commit(&game, vec![notice]).await?;
        debug!(room, player = %player, connected, "presence changed");
        Ok(())
    }

    // ── Night ──────────────────────────────────────────────────────────

    /// Push the night forward. Returns false when another advance is
    /// already running for the room, the room is gone, or there was
    /// nothing to do.
    pub async fn advance_night(&self, room: &str) -> Result<bool, SessionError> {
        let Some(guard) = self.try_acquire(room) else {
            debug!(room, "advance already in flight");
            return Ok(false);
        };
        let Some(mut game) = self.fetch(room).await? else {
            self.retire(room, &guard);
            warn!(room, "advance requested for a missing room");
            return Ok(false);
        };

        let span = info_span!("advance_night", room, night_index = game.night_index);
        async {
            let notices = night::advance(&mut game);
            if notices.is_empty() {
                return Ok(false);
            }
            self.commit(&game, notices).await?;
            debug!(phase = ?game.phase.kind(), night_index = game.night_index, "night advanced");
            Ok(true)
        }
        .instrument(span)
        .await
    }

    /// `Ok(None)`: the selection was not valid for the role and nothing was
    /// saved; the player should choose again.
    pub async fn submit_night_action(
        &self,
        room: &str,
        player: PlayerId,
        targets: &[Target],
    ) -> Result<Option<ActionResult>, SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        let result = match night::submit_action(&mut game, player, targets) {
            Ok(result) => result,
            Err(e) => {
                debug!(room, player = %player, error = %e, "night action rejected");
                return Err(e.into());
            }
        };
        let Some(result) = result else {
            debug!(room, player = %player, ?targets, "invalid selection");
            return Ok(None);
        };

        let notice = Notice::ActionResult { to: player, result: result.clone() };
        self.commit(&game, vec![notice]).await?;
        info!(room, player = %player, night_index = game.night_index, "night action resolved");
        Ok(Some(result))
    }

    /// Closing the last acknowledgment of a turn advances the night in the
    /// same save.
    pub async fn acknowledge_result(&self, room: &str, player: PlayerId) -> Result<TurnProgress, SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        let progress = night::acknowledge(&mut game, player)?;
        let notices = match progress {
            TurnProgress::TurnComplete => night::advance(&mut game),
            TurnProgress::Waiting => Vec::new(),
        };
        self.commit(&game, notices).await?;
        debug!(room, player = %player, ?progress, "result acknowledged");
        Ok(progress)
    }

    // ── Day ────────────────────────────────────────────────────────────

    pub async fn cast_vote(
        &self,
        room: &str,
        voter: PlayerId,
        target: VoteTarget,
    ) -> Result<Option<VoteResults>, SessionError> {
        let guard = self.acquire(room).await;
        let mut game = self.load(room, &guard).await?;

        let results = day::cast_vote(&mut game, voter, target)?;
        let notices = match &results {
            Some(results) => vec![
                Notice::VoteResults { results: results.clone() },
                Notice::PhaseChange { phase: PhaseKind::Results, roster: game.roster() },
            ],
            None => Vec::new(),
        };
        self.commit(&game, notices).await?;

        match &results {
            Some(r) => info!(room, winners = ?r.winners, eliminated = ?r.eliminated, "votes tallied"),
            None => debug!(room, voter = %voter, votes = game.votes.len(), "vote recorded"),
        }
        Ok(results)
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub async fn snapshot(&self, room: &str) -> Result<Game, SessionError> {
        self.fetch(room)
            .await?
            .ok_or_else(|| SessionError::RoomNotFound(room.to_string()))
    }

    pub async fn view(&self, room: &str, player: PlayerId) -> Result<PlayerView, SessionError> {
        let game = self.snapshot(room).await?;
        player_view(&game, player).ok_or(SessionError::UnknownPlayer(player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::notify::{RoomChannels, Silent};
    use crate::simulate::drive_room;
    use crate::store::{MemoryStore, SqliteStore};
    use nightfall_agents::{Agent, RandomAgent};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const ROLES: [Role; 6] = [
        Role::Werewolf,
        Role::Werewolf,
        Role::Seer,
        Role::Robber,
        Role::Troublemaker,
        Role::Villager,
    ];

    fn seats(count: u32) -> Vec<Seat> {
        (0..count).map(|i| Seat::new(i, format!("P{}", i))).collect()
    }

    fn silent() -> (Arc<MemoryStore>, Coordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = Coordinator::new(store.clone(), Arc::new(Silent));
        (store, coordinator)
    }

    /// Saves fail while `broken` is set.
    struct FlakyStore {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    impl RoomStore for FlakyStore {
        fn load(&self, room: &str) -> Result<Option<Game>, StoreError> {
            self.inner.load(room)
        }
        fn save(&self, game: &Game) -> Result<(), StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::LockPoisoned);
            }
            self.inner.save(game)
        }
        fn delete(&self, room: &str) -> Result<bool, StoreError> {
            self.inner.delete(room)
        }
        fn rooms(&self) -> Result<Vec<String>, StoreError> {
            self.inner.rooms()
        }
    }

    #[tokio::test]
    async fn test_missing_room() {
        let (_, coordinator) = silent();
        let err = coordinator.start_game("nope", &ROLES, 1).await.unwrap_err();
        assert!(matches!(err, SessionError::RoomNotFound(ref room) if room == "nope"));
        assert!(matches!(coordinator.snapshot("nope").await, Err(SessionError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn test_open_twice() {
        let (_, coordinator) = silent();
        coordinator.open_room("r1", seats(3)).await.unwrap();
        let err = coordinator.open_room("r1", seats(3)).await.unwrap_err();
        assert!(matches!(err, SessionError::RoomExists(_)));
    }

    #[tokio::test]
    async fn test_bot_game_reaches_results() {
        let store = Arc::new(MemoryStore::new());
        let channels = Arc::new(RoomChannels::new(1024));
        let coordinator = Coordinator::new(store, channels.clone());
        let mut rx = channels.subscribe("r1").unwrap();

        coordinator.open_room("r1", seats(3)).await.unwrap();
        coordinator.start_game("r1", &ROLES, 42).await.unwrap();

        let mut agents: Vec<Box<dyn Agent>> = (0..3)
            .map(|i| Box::new(RandomAgent::new(PlayerId(i), 100 + i as u64)) as Box<dyn Agent>)
            .collect();
        let results = drive_room(&coordinator, "r1", &mut agents, None, 500).await.unwrap();

        let game = coordinator.snapshot("r1").await.unwrap();
        assert_eq!(game.phase, Phase::Results);
        assert_eq!(game.results.as_ref(), Some(&results));

        let mut saw_results = false;
        while let Ok(envelope) = rx.try_recv() {
            if let Notice::VoteResults { results: sent } = &envelope.notice {
                assert_eq!(sent, &results);
                saw_results = true;
            }
        }
        assert!(saw_results);
    }

    #[tokio::test]
    async fn test_stale_submission_leaves_store_untouched() {
        let (store, coordinator) = silent();
        coordinator.open_room("r1", seats(3)).await.unwrap();
        coordinator.start_game("r1", &ROLES, 7).await.unwrap();
        let before = store.load("r1").unwrap().unwrap();

        let outsider = match &before.phase {
            Phase::Night(NightStage::AwaitingAction { to_act, .. }) => {
                (0..3).map(PlayerId).find(|id| !to_act.contains(id))
            }
            _ => Some(PlayerId(0)),
        };
        if let Some(outsider) = outsider {
            let err = coordinator
                .submit_night_action("r1", outsider, &[Target::Center(0)])
                .await
                .unwrap_err();
            assert!(matches!(err, SessionError::Night(_)));
        }

        let err = coordinator.cast_vote("r1", PlayerId(0), VoteTarget::Center).await.unwrap_err();
        assert!(matches!(err, SessionError::Vote(_)));
        assert_eq!(store.load("r1").unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_advance_is_single_flight() {
        let (store, coordinator) = silent();
        let mut game = Game::new("r1", seats(3));
        setup::start_game(&mut game, &ROLES, 3).unwrap();
        assert_eq!(game.phase, Phase::Night(NightStage::TurnPending));
        store.save(&game).unwrap();

        let lock = coordinator.room_lock("r1");
        {
            let _held = lock.lock().await;
            assert!(!coordinator.advance_night("r1").await.unwrap());
            assert_eq!(store.load("r1").unwrap().unwrap(), game);
        }
        assert!(coordinator.advance_night("r1").await.unwrap());
        assert_ne!(store.load("r1").unwrap().unwrap().phase, Phase::Night(NightStage::TurnPending));
    }

    #[tokio::test]
    async fn test_advance_on_missing_room_is_ignored() {
        let (_, coordinator) = silent();
        assert!(!coordinator.advance_night("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_save_sends_nothing() {
        let store = Arc::new(FlakyStore { inner: MemoryStore::new(), broken: AtomicBool::new(false) });
        let channels = Arc::new(RoomChannels::new(64));
        let coordinator = Coordinator::new(store.clone(), channels.clone());
        coordinator.open_room("r1", seats(3)).await.unwrap();

        let mut rx = channels.subscribe("r1").unwrap();
        store.broken.store(true, Ordering::SeqCst);
        let err = coordinator.start_game("r1", &ROLES, 5).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(_)));
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.snapshot("r1").await.unwrap().phase, Phase::Lobby);
    }

    #[tokio::test]
    async fn test_restart_and_close() {
        let (store, coordinator) = silent();
        coordinator.open_room("r1", seats(4)).await.unwrap();
        coordinator.start_game("r1", &setup::default_roles(4), 9).await.unwrap();

        coordinator.restart("r1").await.unwrap();
        let game = coordinator.snapshot("r1").await.unwrap();
        assert_eq!(game.phase, Phase::Lobby);
        assert!(game.players.is_empty());
        assert_eq!(game.seats.len(), 4);

        assert!(coordinator.close_room("r1").await.unwrap());
        assert!(!coordinator.close_room("r1").await.unwrap());
        assert!(store.load("r1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_presence_changes() {
        let (_, coordinator) = silent();
        coordinator.open_room("r1", seats(3)).await.unwrap();

        coordinator.set_connected("r1", PlayerId(1), false).await.unwrap();
        let game = coordinator.snapshot("r1").await.unwrap();
        let offline: BTreeSet<PlayerId> = game.roster().iter().filter(|e| !e.connected).map(|e| e.id).collect();
        assert_eq!(offline, BTreeSet::from([PlayerId(1)]));

        let err = coordinator.set_connected("r1", PlayerId(9), true).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownPlayer(PlayerId(9))));
        assert!(matches!(coordinator.view("r1", PlayerId(9)).await, Err(SessionError::UnknownPlayer(_))));
    }

    #[tokio::test]
    async fn test_closed_room_lock_is_retired() {
        let (_, coordinator) = silent();
        coordinator.open_room("r1", seats(3)).await.unwrap();
        let old = coordinator.room_lock("r1");
        assert!(coordinator.close_room("r1").await.unwrap());
        assert!(!coordinator.is_current("r1", &old));

        // Someone still sitting on the retired lock does not share the room
        // with the holder of the current one.
        let _stale = old.clone().lock_owned().await;
        coordinator.open_room("r1", seats(3)).await.unwrap();
        let current = coordinator.acquire("r1").await;
        assert!(!Arc::ptr_eq(&old, &current.lock));
        let second = tokio::time::timeout(Duration::from_millis(50), coordinator.acquire("r1")).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_queued_caller_sees_room_closed_under_it() {
        let (store, coordinator) = silent();
        coordinator.open_room("r1", seats(3)).await.unwrap();

        let held = coordinator.acquire("r1").await;
        let queued = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.restart("r1").await })
        };
        tokio::task::yield_now().await;

        store.delete("r1").unwrap();
        coordinator.retire("r1", &held);
        drop(held);

        let err = queued.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::RoomNotFound(_)));
        assert!(coordinator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_missing_rooms_leave_no_locks_behind() {
        let (_, coordinator) = silent();
        for i in 0..1000 {
            assert!(!coordinator.advance_night(&format!("ghost-{}", i)).await.unwrap());
        }
        assert!(coordinator.start_game("ghost", &ROLES, 1).await.is_err());
        assert!(coordinator.submit_night_action("ghost", PlayerId(0), &[]).await.is_err());
        assert!(coordinator.cast_vote("ghost", PlayerId(0), VoteTarget::Center).await.is_err());
        assert!(coordinator.registry().is_empty());

        coordinator.open_room("r1", seats(3)).await.unwrap();
        assert_eq!(coordinator.registry().len(), 1);
        coordinator.close_room("r1").await.unwrap();
        assert!(coordinator.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sqlite_room_on_worker_threads() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let coordinator = Coordinator::new(store.clone(), Arc::new(Silent));
        coordinator.open_room("r1", seats(4)).await.unwrap();
        coordinator.start_game("r1", &setup::default_roles(4), 21).await.unwrap();

        let mut agents: Vec<Box<dyn Agent>> = (0..4)
            .map(|i| Box::new(RandomAgent::new(PlayerId(i), 300 + i as u64)) as Box<dyn Agent>)
            .collect();
        let results = drive_room(&coordinator, "r1", &mut agents, None, 500).await.unwrap();

        let stored = store.load("r1").unwrap().unwrap();
        assert_eq!(stored.results, Some(results));
        assert_eq!(store.log_rows("r1").unwrap(), stored.night_log.len());
    }
}
