use super::*;
use crate::net::EventStream;
use canvas::camera::Point;
use canvas::input::Tool;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicI64;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// =========================================================================
// Fakes
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Fetch,
    Create(NewStroke),
    Delete(StrokeId),
}

#[derive(Default)]
struct FakeApi {
    snapshot: StdMutex<Vec<Stroke>>,
    calls: StdMutex<Vec<Call>>,
    next_id: AtomicI64,
    fail_creates: AtomicBool,
    fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    create_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
    fn with_snapshot(strokes: Vec<Stroke>) -> Self {
        Self { snapshot: StdMutex::new(strokes), ..Self::default() }
    }

    async fn gate_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.fetch_gate.lock().await = Some(rx);
        tx
    }

    async fn gate_create(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.create_gate.lock().await = Some(rx);
        tx
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn deletes(&self) -> Vec<StrokeId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl StrokeApi for FakeApi {
    async fn fetch_strokes(&self, _board: &BoardId) -> Result<Vec<Stroke>, SyncError> {
        self.calls.lock().unwrap().push(Call::Fetch);
        let gate = self.fetch_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn create_stroke(&self, stroke: &NewStroke) -> Result<Stroke, SyncError> {
        self.calls.lock().unwrap().push(Call::Create(stroke.clone()));
        let gate = self.create_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(SyncError::Status { status: 500, body: "create failed".to_owned() });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Stroke { id, path: stroke.path.clone(), color: stroke.color.clone() })
    }

    async fn delete_stroke(&self, _board: &BoardId, id: StrokeId) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(Call::Delete(id));
        Ok(())
    }

    async fn generate_board_id(&self) -> Result<BoardId, SyncError> {
        Ok(board())
    }
}

type EventTx = mpsc::UnboundedSender<Result<BoardEvent, SyncError>>;

struct FakeChannel {
    rx: StdMutex<Option<mpsc::UnboundedReceiver<Result<BoardEvent, SyncError>>>>,
}

impl FakeChannel {
    fn new() -> (Self, EventTx) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx: StdMutex::new(Some(rx)) }, tx)
    }
}

#[async_trait::async_trait]
impl BoardChannel for FakeChannel {
    async fn subscribe(&self, _board: &BoardId) -> Result<EventStream, SyncError> {
        let rx = self.rx.lock().unwrap().take();
        let Some(rx) = rx else {
            return Err(SyncError::Status { status: 409, body: "already subscribed".to_owned() });
        };
        let stream = futures_util::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
        Ok(stream.boxed())
    }
}

// =========================================================================
// Helpers
// =========================================================================

const MOUSE: PointerId = 1;

fn board() -> BoardId {
    BoardId::parse("abcd1234").unwrap()
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn make_stroke(id: StrokeId, points: &[(f64, f64)], color: &str) -> Stroke {
    Stroke { id, path: points.iter().map(|&(x, y)| pt(x, y)).collect(), color: color.to_owned() }
}

fn session_with(api: &Arc<FakeApi>) -> BoardSession {
    BoardSession::new(board(), Arc::clone(api) as Arc<dyn StrokeApi>)
}

async fn gesture(session: &BoardSession, points: &[(f64, f64)]) -> Vec<Action> {
    let Some((&(x0, y0), rest)) = points.split_first() else {
        return Vec::new();
    };
    session.pointer_down(PointerSample::new(MOUSE, x0, y0)).await;
    for &(x, y) in rest {
        session.pointer_move(PointerSample::new(MOUSE, x, y)).await;
    }
    session.pointer_up(MOUSE).await
}

async fn ids(session: &BoardSession) -> Vec<StrokeId> {
    session.strokes().await.iter().map(|s| s.id).collect()
}

async fn wait_for_ids(session: &BoardSession, expected: &[StrokeId]) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if ids(session).await == expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(waited.is_ok(), "store never reached {expected:?}; has {:?}", ids(session).await);
}

async fn flush(session: &BoardSession) {
    tokio::time::timeout(Duration::from_secs(2), session.flush()).await.unwrap();
}

// =========================================================================
// Load
// =========================================================================

#[tokio::test]
async fn load_populates_store_in_server_order() {
    let api = Arc::new(FakeApi::with_snapshot(vec![
        make_stroke(2, &[(0.0, 0.0), (1.0, 1.0)], "#000"),
        make_stroke(5, &[(2.0, 2.0), (3.0, 3.0)], "#000"),
    ]));
    let session = session_with(&api);

    let outcome = session.load().await.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded { strokes: 2 });
    assert!(session.is_loaded());
    assert_eq!(ids(&session).await, vec![2, 5]);
    assert_eq!(api.calls(), vec![Call::Fetch]);
}

#[tokio::test]
async fn concurrent_load_is_suppressed() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_fetch().await;
    let session = session_with(&api);

    let (first, second) = tokio::join!(session.load(), async {
        let second = session.load().await;
        let _ = release.send(());
        second
    });

    assert_eq!(first.unwrap(), LoadOutcome::Loaded { strokes: 0 });
    assert_eq!(second.unwrap(), LoadOutcome::AlreadyLoading);
    assert_eq!(api.calls(), vec![Call::Fetch]);
}

#[tokio::test]
async fn reload_is_allowed_once_first_load_finished() {
    let api = Arc::new(FakeApi::default());
    let session = session_with(&api);
    session.load().await.unwrap();
    assert_eq!(session.load().await.unwrap(), LoadOutcome::Loaded { strokes: 0 });
}

#[tokio::test]
async fn strokes_drawn_during_load_are_kept_after_snapshot() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(1, &[(0.0, 0.0), (1.0, 0.0)], "#000")]));
    let release_fetch = api.gate_fetch().await;
    let _hold_create = api.gate_create().await;
    let session = session_with(&api);

    let (loaded, provisional) = tokio::join!(session.load(), async {
        let actions = gesture(&session, &[(5.0, 5.0), (6.0, 6.0)]).await;
        let _ = release_fetch.send(());
        actions
    });

    loaded.unwrap();
    let provisional_id = provisional
        .iter()
        .find_map(|a| match a {
            Action::StrokeCommitted(s) => Some(s.id),
            _ => None,
        })
        .unwrap();
    assert_eq!(ids(&session).await, vec![1, provisional_id]);
}

#[tokio::test]
async fn relay_events_during_load_survive_the_snapshot() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(3, &[(0.0, 0.0), (1.0, 0.0)], "#000")]));
    let release = api.gate_fetch().await;
    let mut session = session_with(&api);
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();

    let (loaded, ()) = tokio::join!(session.load(), async {
        tx.send(Ok(BoardEvent::Erase { id: 3 })).unwrap();
        tx.send(Ok(BoardEvent::Stroke(make_stroke(7, &[(5.0, 5.0)], "#00f")))).unwrap();
        wait_for_ids(&session, &[7]).await;
        release.send(()).unwrap();
    });

    assert_eq!(loaded.unwrap(), LoadOutcome::Loaded { strokes: 1 });
    assert_eq!(ids(&session).await, vec![7]);
}

#[tokio::test]
async fn local_erase_during_reload_is_not_undone_by_snapshot() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(1, &[(0.0, 0.0), (100.0, 0.0)], "#000")]));
    let session = session_with(&api);
    session.load().await.unwrap();
    session.lock().await.set_tool(Tool::Erase);
    let release = api.gate_fetch().await;

    let (loaded, ()) = tokio::join!(session.load(), async {
        gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;
        release.send(()).unwrap();
    });

    loaded.unwrap();
    assert!(session.strokes().await.is_empty());
    flush(&session).await;
    assert_eq!(api.deletes(), vec![1]);
}

#[tokio::test]
async fn dropped_load_does_not_block_the_next_one() {
    let api = Arc::new(FakeApi::default());
    let _never = api.gate_fetch().await;
    let session = session_with(&api);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.load()).await;
    assert!(abandoned.is_err());

    assert_eq!(session.load().await.unwrap(), LoadOutcome::Loaded { strokes: 0 });
    assert_eq!(api.calls(), vec![Call::Fetch, Call::Fetch]);
}

#[tokio::test]
async fn failed_load_can_be_retried() {
    struct FailingApi;

    #[async_trait::async_trait]
    impl StrokeApi for FailingApi {
        async fn fetch_strokes(&self, _board: &BoardId) -> Result<Vec<Stroke>, SyncError> {
            Err(SyncError::Status { status: 503, body: "down".to_owned() })
        }
        async fn create_stroke(&self, _stroke: &NewStroke) -> Result<Stroke, SyncError> {
            Err(SyncError::TornDown)
        }
        async fn delete_stroke(&self, _board: &BoardId, _id: StrokeId) -> Result<(), SyncError> {
            Ok(())
        }
        async fn generate_board_id(&self) -> Result<BoardId, SyncError> {
            Ok(board())
        }
    }

    let session = BoardSession::new(board(), Arc::new(FailingApi));
    assert!(matches!(session.load().await, Err(SyncError::Status { status: 503, .. })));
    assert!(!session.is_loaded());
    // The in-flight guard was released, so a second attempt fetches again.
    assert!(matches!(session.load().await, Err(SyncError::Status { .. })));
}

// =========================================================================
// Draw / erase commits
// =========================================================================

#[tokio::test]
async fn draw_commit_is_optimistic_then_confirmed_in_place() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_create().await;
    let session = session_with(&api);
    session.load().await.unwrap();
    session.lock().await.set_color("#ff0000");

    gesture(&session, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]).await;

    let strokes = session.strokes().await;
    assert_eq!(strokes.len(), 1);
    assert!(is_provisional(strokes[0].id));
    assert_eq!(strokes[0].color, "#ff0000");

    release.send(()).unwrap();
    flush(&session).await;

    assert_eq!(
        api.calls(),
        vec![
            Call::Fetch,
            Call::Create(NewStroke {
                board_id: board(),
                path: vec![pt(0.0, 0.0), pt(10.0, 0.0), pt(10.0, 10.0)],
                color: "#ff0000".to_owned(),
            }),
        ]
    );
    let strokes = session.strokes().await;
    assert_eq!(strokes, vec![make_stroke(1, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], "#ff0000")]);
}

#[tokio::test]
async fn erase_commit_removes_hits_and_queues_deletes() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(1, &[(0.0, 0.0), (100.0, 0.0)], "#000")]));
    let session = session_with(&api);
    session.load().await.unwrap();
    session.lock().await.set_tool(Tool::Erase);

    let actions = gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;

    assert!(actions.contains(&Action::StrokesErased(vec![1])));
    assert!(session.strokes().await.is_empty());
    flush(&session).await;
    assert_eq!(api.deletes(), vec![1]);
}

#[tokio::test]
async fn erase_without_hits_queues_nothing() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(1, &[(0.0, 0.0), (100.0, 0.0)], "#000")]));
    let session = session_with(&api);
    session.load().await.unwrap();
    session.lock().await.set_tool(Tool::Erase);

    gesture(&session, &[(0.0, 50.0), (100.0, 50.0)]).await;
    flush(&session).await;

    assert_eq!(api.calls(), vec![Call::Fetch]);
    assert_eq!(ids(&session).await, vec![1]);
}

#[tokio::test]
async fn pan_gesture_queues_nothing() {
    let api = Arc::new(FakeApi::default());
    let session = session_with(&api);
    session.lock().await.set_tool(Tool::Move);

    gesture(&session, &[(10.0, 10.0), (0.0, 0.0)]).await;
    flush(&session).await;

    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn delete_of_provisional_stroke_targets_confirmed_id() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_create().await;
    let session = session_with(&api);

    gesture(&session, &[(0.0, 0.0), (100.0, 0.0)]).await;
    session.lock().await.set_tool(Tool::Erase);
    gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;
    assert!(session.strokes().await.is_empty());

    release.send(()).unwrap();
    flush(&session).await;

    assert_eq!(api.deletes(), vec![1]);
    assert!(session.strokes().await.is_empty(), "confirmed copy must not resurrect the erased stroke");
    assert!(session.shared.replica.lock().await.orphans.is_empty());
}

#[tokio::test]
async fn confirmed_strokes_leave_no_id_mapping_behind() {
    let api = Arc::new(FakeApi::default());
    let session = session_with(&api);

    for y in [0.0, 20.0, 40.0] {
        gesture(&session, &[(0.0, y), (100.0, y)]).await;
    }
    flush(&session).await;
    session.lock().await.set_tool(Tool::Erase);
    gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;
    flush(&session).await;

    assert_eq!(ids(&session).await, vec![2, 3]);
    assert_eq!(api.deletes(), vec![1]);
    assert!(session.shared.replica.lock().await.orphans.is_empty());
}

#[tokio::test]
async fn delete_is_skipped_when_create_failed() {
    let api = Arc::new(FakeApi::default());
    api.fail_creates.store(true, Ordering::SeqCst);
    let session = session_with(&api);

    gesture(&session, &[(0.0, 0.0), (100.0, 0.0)]).await;
    session.lock().await.set_tool(Tool::Erase);
    gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;
    flush(&session).await;

    assert!(api.deletes().is_empty());
    assert!(matches!(api.calls().as_slice(), [Call::Create(_)]));
}

#[tokio::test]
async fn failed_create_keeps_provisional_stroke_and_later_ops_run() {
    let api = Arc::new(FakeApi::with_snapshot(vec![make_stroke(7, &[(0.0, 50.0), (100.0, 50.0)], "#000")]));
    let session = session_with(&api);
    session.load().await.unwrap();
    api.fail_creates.store(true, Ordering::SeqCst);

    gesture(&session, &[(0.0, 0.0), (10.0, 10.0)]).await;
    session.lock().await.set_tool(Tool::Erase);
    gesture(&session, &[(50.0, 40.0), (50.0, 60.0)]).await;
    flush(&session).await;

    assert_eq!(api.deletes(), vec![7]);
    let remaining = ids(&session).await;
    assert_eq!(remaining.len(), 1);
    assert!(is_provisional(remaining[0]));
}

#[tokio::test]
async fn sync_actions_ignores_rendering_actions() {
    let api = Arc::new(FakeApi::default());
    let session = session_with(&api);
    session.sync_actions(&[
        Action::ClearOverlay,
        Action::RedrawBase,
        Action::ViewportChanged { offset_x: 0.0, offset_y: 0.0 },
    ]);
    flush(&session).await;
    assert!(api.calls().is_empty());
}

// =========================================================================
// Remote merge
// =========================================================================

#[tokio::test]
async fn duplicate_stroke_broadcasts_merge_once() {
    let api = Arc::new(FakeApi::default());
    let mut session = session_with(&api);
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();

    let stroke = make_stroke(5, &[(0.0, 0.0), (1.0, 1.0)], "#00f");
    tx.send(Ok(BoardEvent::Stroke(stroke.clone()))).unwrap();
    tx.send(Ok(BoardEvent::Stroke(stroke))).unwrap();
    tx.send(Ok(BoardEvent::Stroke(make_stroke(6, &[(2.0, 2.0)], "#00f")))).unwrap();

    wait_for_ids(&session, &[5, 6]).await;
}

#[tokio::test]
async fn erase_broadcast_is_idempotent() {
    let api = Arc::new(FakeApi::with_snapshot(vec![
        make_stroke(5, &[(0.0, 0.0), (1.0, 1.0)], "#000"),
        make_stroke(6, &[(2.0, 2.0), (3.0, 3.0)], "#000"),
    ]));
    let mut session = session_with(&api);
    session.load().await.unwrap();
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();

    tx.send(Ok(BoardEvent::Erase { id: 5 })).unwrap();
    tx.send(Ok(BoardEvent::Erase { id: 5 })).unwrap();
    tx.send(Ok(BoardEvent::Erase { id: 404 })).unwrap();
    tx.send(Ok(BoardEvent::Stroke(make_stroke(8, &[(0.0, 0.0)], "#000")))).unwrap();

    wait_for_ids(&session, &[6, 8]).await;
}

#[tokio::test]
async fn relay_errors_are_skipped() {
    let api = Arc::new(FakeApi::default());
    let mut session = session_with(&api);
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();

    tx.send(Err(SyncError::Codec(frames::CodecError::InvalidKind(9)))).unwrap();
    tx.send(Ok(BoardEvent::Stroke(make_stroke(3, &[(0.0, 0.0)], "#000")))).unwrap();

    wait_for_ids(&session, &[3]).await;
}

#[tokio::test]
async fn broadcast_before_confirmation_deduplicates_provisional() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_create().await;
    let mut session = session_with(&api);
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();

    let actions = gesture(&session, &[(0.0, 0.0), (10.0, 0.0)]).await;
    let provisional = actions
        .iter()
        .find_map(|a| match a {
            Action::StrokeCommitted(s) => Some(s.id),
            _ => None,
        })
        .unwrap();

    // The server persisted it as id 1 and broadcast before answering us.
    tx.send(Ok(BoardEvent::Stroke(make_stroke(1, &[(0.0, 0.0), (10.0, 0.0)], "#000000")))).unwrap();
    wait_for_ids(&session, &[provisional, 1]).await;

    release.send(()).unwrap();
    flush(&session).await;
    assert_eq!(ids(&session).await, vec![1]);
}

#[tokio::test]
async fn revisions_advance_on_load_and_merge() {
    let api = Arc::new(FakeApi::default());
    let mut session = session_with(&api);
    let mut revisions = session.revisions();
    assert_eq!(*revisions.borrow_and_update(), 0);

    session.load().await.unwrap();
    assert!(revisions.has_changed().unwrap());
    let after_load = *revisions.borrow_and_update();

    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();
    tx.send(Ok(BoardEvent::Stroke(make_stroke(4, &[(0.0, 0.0)], "#000")))).unwrap();

    tokio::time::timeout(Duration::from_secs(2), revisions.changed()).await.unwrap().unwrap();
    assert!(*revisions.borrow() > after_load);
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test]
async fn teardown_stops_remote_merges() {
    let api = Arc::new(FakeApi::default());
    let mut session = session_with(&api);
    let (channel, tx) = FakeChannel::new();
    session.subscribe(&channel).await.unwrap();
    tx.send(Ok(BoardEvent::Stroke(make_stroke(1, &[(0.0, 0.0)], "#000")))).unwrap();
    wait_for_ids(&session, &[1]).await;

    session.teardown();
    let _ = tx.send(Ok(BoardEvent::Stroke(make_stroke(2, &[(0.0, 0.0)], "#000"))));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert!(!session.is_active());
    assert_eq!(ids(&session).await, vec![1]);
}

#[tokio::test]
async fn late_confirmation_after_teardown_is_ignored() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_create().await;
    let mut session = session_with(&api);

    let actions = gesture(&session, &[(0.0, 0.0), (10.0, 0.0)]).await;
    let provisional = actions
        .iter()
        .find_map(|a| match a {
            Action::StrokeCommitted(s) => Some(s.id),
            _ => None,
        })
        .unwrap();

    session.teardown();
    release.send(()).unwrap();
    flush(&session).await;

    assert!(matches!(api.calls().as_slice(), [Call::Create(_)]));
    assert_eq!(ids(&session).await, vec![provisional]);
}

#[tokio::test]
async fn delete_queued_before_teardown_reaches_server_after_late_confirmation() {
    let api = Arc::new(FakeApi::default());
    let release = api.gate_create().await;
    let mut session = session_with(&api);

    gesture(&session, &[(0.0, 0.0), (100.0, 0.0)]).await;
    session.lock().await.set_tool(Tool::Erase);
    gesture(&session, &[(50.0, -10.0), (50.0, 10.0)]).await;
    session.teardown();

    release.send(()).unwrap();
    flush(&session).await;

    assert_eq!(api.deletes(), vec![1]);
    assert!(session.strokes().await.is_empty());
}

#[tokio::test]
async fn torn_down_session_rejects_load_subscribe_and_input() {
    let api = Arc::new(FakeApi::default());
    let mut session = session_with(&api);
    session.teardown();
    session.teardown();

    assert!(matches!(session.load().await, Err(SyncError::TornDown)));
    let (channel, _tx) = FakeChannel::new();
    assert!(matches!(session.subscribe(&channel).await, Err(SyncError::TornDown)));
    assert!(gesture(&session, &[(0.0, 0.0), (1.0, 1.0)]).await.is_empty());
    flush(&session).await;
    assert!(api.calls().is_empty());
}
