//! Board session: one board's engine, its persistence queue and its relay.
//!
//! DESIGN
//! ======
//! The engine, the orphan id map and the load journal live together behind
//! one `tokio::sync::Mutex`, so a confirmation and the id swap it implies
//! are a single critical section. Network calls never run under that lock.
//!
//! While a snapshot fetch is in flight every relay event, confirmation and
//! local erase is journaled; the snapshot replaces the store and the journal
//! is replayed over it, so nothing merged during the fetch is lost.
//!
//! LIFECYCLE
//! =========
//! 1. `new` → `load` (snapshot fetch; concurrent duplicates are suppressed)
//! 2. `subscribe` → event task merges peer broadcasts in arrival order
//! 3. Gestures commit optimistically; `sync_actions` queues create/delete calls
//! 4. `teardown` → event task aborted; late confirmations leave the store
//!    alone but still resolve queued deletes
//!
//! ERROR HANDLING
//! ==============
//! Queue failures are logged by the queue and abandoned. There is no retry
//! and no rollback: an erased stroke whose delete fails stays erased locally.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use canvas::doc::{BoardId, Confirmation, Stroke, StrokeId, is_provisional};
use canvas::engine::{Action, EngineCore};
use canvas::input::{PointerId, PointerSample};
use frames::BoardEvent;
use futures_util::StreamExt;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::queue::OpQueue;
use crate::error::SyncError;
use crate::net::{BoardChannel, NewStroke, StrokeApi};

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Result of [`BoardSession::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot was applied; `strokes` is the store size afterwards.
    Loaded { strokes: usize },
    /// Another load was already in flight; this call did nothing.
    AlreadyLoading,
}

// =============================================================================
// SHARED STATE
// =============================================================================

struct Replica {
    core: EngineCore,
    /// Provisional id → server id for strokes erased before their create
    /// returned. Each entry is consumed by the delete that resolves it.
    orphans: HashMap<StrokeId, StrokeId>,
    /// Store changes from outside the snapshot, recorded while a fetch is in
    /// flight and replayed on top of it.
    journal: Option<Vec<BoardEvent>>,
}

impl Replica {
    fn apply(&mut self, event: BoardEvent) -> bool {
        match event {
            BoardEvent::Stroke(stroke) => self.core.apply_create(stroke),
            BoardEvent::Erase { id } => self.core.apply_erase(id),
        }
    }

    fn record(&mut self, event: BoardEvent) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(event);
        }
    }

    /// Record local erases of confirmed strokes so a stale snapshot cannot
    /// bring them back before their deletes land.
    fn record_erases(&mut self, actions: &[Action]) {
        for action in actions {
            if let Action::StrokesErased(ids) = action {
                for &id in ids.iter().filter(|&&id| !is_provisional(id)) {
                    self.record(BoardEvent::Erase { id });
                }
            }
        }
    }
}

struct Shared {
    board: BoardId,
    replica: Mutex<Replica>,
    active: AtomicBool,
    loading: AtomicBool,
    loaded: AtomicBool,
    revision: watch::Sender<u64>,
}

/// Clears the in-flight flag when a load finishes or its future is dropped.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Shared {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    async fn begin_load(&self) {
        self.replica.lock().await.journal = Some(Vec::new());
    }

    async fn abandon_load(&self) {
        self.replica.lock().await.journal = None;
    }

    async fn apply_snapshot(&self, strokes: Vec<Stroke>) -> Result<LoadOutcome, SyncError> {
        let mut replica = self.replica.lock().await;
        let journal = replica.journal.take().unwrap_or_default();
        if !self.is_active() {
            return Err(SyncError::TornDown);
        }

        replica.core.load_snapshot(strokes);
        let replayed = journal.len();
        for event in journal {
            replica.apply(event);
        }
        let count = replica.core.doc.len();
        drop(replica);

        self.loaded.store(true, Ordering::SeqCst);
        self.bump();
        info!(board_id = %self.board, strokes = count, replayed, "board loaded");
        Ok(LoadOutcome::Loaded { strokes: count })
    }

    async fn merge(&self, event: BoardEvent) {
        let mut replica = self.replica.lock().await;
        if !self.is_active() {
            return;
        }
        let stroke_id = event.stroke_id();
        let kind = event.kind();
        if self.is_loading() {
            replica.record(event.clone());
        }
        let changed = replica.apply(event);
        drop(replica);

        debug!(board_id = %self.board, kind, stroke_id, changed, "relay event merged");
        if changed {
            self.bump();
        }
    }

    async fn confirm(&self, provisional: StrokeId, confirmed: Stroke) {
        let mut replica = self.replica.lock().await;
        let confirmed_id = confirmed.id;
        // Gone from the store means a delete for it is already queued.
        let orphaned = !replica.core.doc.contains(provisional);
        if orphaned {
            replica.orphans.insert(provisional, confirmed_id);
        }
        if !self.is_active() {
            debug!(board_id = %self.board, provisional, confirmed_id, "confirmation after teardown; store untouched");
            return;
        }

        if self.is_loading() {
            let event = if orphaned {
                BoardEvent::Erase { id: confirmed_id }
            } else {
                BoardEvent::Stroke(confirmed.clone())
            };
            replica.record(event);
        }
        let outcome = replica.core.confirm_stroke(provisional, confirmed);
        if outcome == Confirmation::Orphaned {
            // A broadcast may have inserted the server copy meanwhile.
            replica.core.apply_erase(confirmed_id);
        }
        drop(replica);

        debug!(board_id = %self.board, provisional, confirmed_id, ?outcome, "stroke confirmed");
        self.bump();
    }

    /// Server id for a delete target. Provisional ids are consumed.
    async fn resolve(&self, id: StrokeId) -> Option<StrokeId> {
        if !is_provisional(id) {
            return Some(id);
        }
        self.replica.lock().await.orphans.remove(&id)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A mounted board: engine state plus persistence and relay plumbing.
pub struct BoardSession {
    shared: Arc<Shared>,
    api: Arc<dyn StrokeApi>,
    queue: OpQueue,
    events: Option<JoinHandle<()>>,
}

impl BoardSession {
    /// Mount `board` with a fresh engine. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(board: BoardId, api: Arc<dyn StrokeApi>) -> Self {
        Self::with_core(board, api, EngineCore::new())
    }

    /// Mount `board` around an existing engine (e.g. one already sized for its container).
    #[must_use]
    pub fn with_core(board: BoardId, api: Arc<dyn StrokeApi>, core: EngineCore) -> Self {
        let (revision, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            board,
            replica: Mutex::new(Replica { core, orphans: HashMap::new(), journal: None }),
            active: AtomicBool::new(true),
            loading: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            revision,
        });
        Self { shared, api, queue: OpQueue::spawn(), events: None }
    }

    #[must_use]
    pub fn board(&self) -> &BoardId {
        &self.shared.board
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Store revision counter. Changes whenever a load, confirmation or peer
    /// event alters the store, so the host knows to redraw the base layer.
    #[must_use]
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Exclusive access to the engine, for tool, color and viewport changes.
    pub async fn lock(&self) -> MappedMutexGuard<'_, EngineCore> {
        MutexGuard::map(self.shared.replica.lock().await, |replica| &mut replica.core)
    }

    /// Copy of the store contents in display order.
    pub async fn strokes(&self) -> Vec<Stroke> {
        self.lock().await.doc.strokes().to_vec()
    }

    /// The persistence queue backing this session.
    #[must_use]
    pub fn queue(&self) -> &OpQueue {
        &self.queue
    }

    /// Wait for every queued create and delete issued so far to finish.
    pub async fn flush(&self) {
        self.queue.drained().await;
    }

    // --- Loading / relay ---

    /// Fetch the board's strokes and populate the store.
    ///
    /// Provisional strokes drawn while the fetch is in flight are kept after
    /// the snapshot, and peer events, confirmations and erases applied in the
    /// meantime are replayed on top of it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TornDown`] after teardown, or the fetch error.
    pub async fn load(&self) -> Result<LoadOutcome, SyncError> {
        if !self.is_active() {
            return Err(SyncError::TornDown);
        }
        if self.shared.loading.swap(true, Ordering::SeqCst) {
            debug!(board_id = %self.shared.board, "load already in flight");
            return Ok(LoadOutcome::AlreadyLoading);
        }
        let _loading = LoadingGuard(&self.shared.loading);
        self.shared.begin_load().await;

        match self.api.fetch_strokes(&self.shared.board).await {
            Ok(strokes) => self.shared.apply_snapshot(strokes).await,
            Err(e) => {
                warn!(board_id = %self.shared.board, error = %e, "stroke fetch failed");
                self.shared.abandon_load().await;
                Err(e)
            }
        }
    }

    /// Start merging peer broadcasts from `channel`. Replaces any earlier subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TornDown`] after teardown, or the subscription error.
    pub async fn subscribe(&mut self, channel: &dyn BoardChannel) -> Result<(), SyncError> {
        if !self.is_active() {
            return Err(SyncError::TornDown);
        }
        let mut events = channel.subscribe(&self.shared.board).await?;
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => shared.merge(event).await,
                    Err(e) => warn!(board_id = %shared.board, error = %e, "relay event dropped"),
                }
            }
            debug!(board_id = %shared.board, "relay stream ended");
        });
        if let Some(previous) = self.events.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Unmount: stop applying peer events and confirmations to the store.
    ///
    /// Queued network calls still run, and a delete queued behind a late
    /// create still reaches the server.
    pub fn teardown(&mut self) {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.events.take() {
            task.abort();
        }
        info!(board_id = %self.shared.board, "board session torn down");
    }

    // --- Input ---

    pub async fn pointer_down(&self, sample: PointerSample) -> Vec<Action> {
        if !self.is_active() {
            return Vec::new();
        }
        self.lock().await.on_pointer_down(sample)
    }

    pub async fn pointer_move(&self, sample: PointerSample) -> Vec<Action> {
        if !self.is_active() {
            return Vec::new();
        }
        self.lock().await.on_pointer_move(sample)
    }

    /// End the active gesture and queue its persistence calls.
    pub async fn pointer_up(&self, pointer_id: PointerId) -> Vec<Action> {
        if !self.is_active() {
            return Vec::new();
        }
        let actions = {
            let mut replica = self.shared.replica.lock().await;
            let actions = replica.core.on_pointer_up(pointer_id);
            if self.shared.is_loading() {
                replica.record_erases(&actions);
            }
            actions
        };
        self.sync_actions(&actions);
        actions
    }

    /// Queue the network side of committed gestures.
    ///
    /// `StrokeCommitted` becomes one create; `StrokesErased` becomes one
    /// delete per id. Other actions are ignored. Hosts driving their own
    /// [`canvas::engine::Engine`] feed its actions through here.
    pub fn sync_actions(&self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::StrokeCommitted(stroke) => self.queue_create(stroke),
                Action::StrokesErased(ids) => {
                    for &id in ids {
                        self.queue_delete(id);
                    }
                }
                _ => {}
            }
        }
    }

    fn queue_create(&self, stroke: &Stroke) {
        let provisional = stroke.id;
        let body = NewStroke {
            board_id: self.shared.board.clone(),
            path: stroke.path.clone(),
            color: stroke.color.clone(),
        };
        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        self.queue.enqueue(format!("create stroke {provisional}"), async move {
            let confirmed = api.create_stroke(&body).await?;
            shared.confirm(provisional, confirmed).await;
            Ok(())
        });
    }

    fn queue_delete(&self, id: StrokeId) {
        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        self.queue.enqueue(format!("delete stroke {id}"), async move {
            let Some(target) = shared.resolve(id).await else {
                debug!(board_id = %shared.board, stroke_id = id, "create never confirmed; skipping delete");
                return Ok(());
            };
            api.delete_stroke(&shared.board, target).await
        });
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        if let Some(task) = self.events.take() {
            task.abort();
        }
    }
}
