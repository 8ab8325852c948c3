//! Persistence Integration Tests
//!
//! Exercises the debounced persistence worker:
//! - Last value wins within the debounce window
//! - Imported items are written immediately
//! - Pending writes are flushed on shutdown and on channel close
//! - Store failures are counted, not fatal
//! - A full canvas session survives a reopen from disk

use std::sync::{Arc, Mutex};
use std::time::Duration;

use moodboard_core::schema::{ItemPatch, ViewportRecord};
use moodboard_core::{
    spawn_persister, BoardEvent, BoardStore, CanvasState, GestureConfig, InputEvent, Item,
    ItemId, ItemStore, PersistConfig, StoreError, TouchEvent, TouchPhase, Transform,
    ViewportCache,
};
use tokio::sync::mpsc;

const BOARD: &str = "board_test";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(ItemId),
    Patch(ItemId, ItemPatch),
    Viewport(ViewportRecord),
}

/// Records every write; optionally rejects item updates.
#[derive(Debug, Default)]
struct RecordingStore {
    calls: Mutex<Vec<Call>>,
    reject_updates: bool,
}

impl RecordingStore {
    fn failing() -> Self {
        Self {
            reject_updates: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }
}

impl ItemStore for RecordingStore {
    fn items_for_board(&self, _board_id: &str) -> Result<Vec<Item>, StoreError> {
        Ok(Vec::new())
    }

    fn create_item(&self, item: &Item, _board_id: &str) -> Result<ItemId, StoreError> {
        self.record(Call::Create(item.id));
        Ok(item.id)
    }

    fn update_transform(&self, id: ItemId, patch: &ItemPatch) -> Result<(), StoreError> {
        if self.reject_updates {
            return Err(StoreError::ItemNotFound(id));
        }
        self.record(Call::Patch(id, patch.clone()));
        Ok(())
    }

    fn delete_item(&self, _id: ItemId) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ViewportCache for RecordingStore {
    fn viewport(&self, _board_id: &str) -> Option<ViewportRecord> {
        None
    }

    fn set_viewport(&self, _board_id: &str, viewport: ViewportRecord) -> Result<(), StoreError> {
        self.record(Call::Viewport(viewport));
        Ok(())
    }
}

fn moved(id: ItemId, x: f64, y: f64) -> BoardEvent {
    BoardEvent::ItemMoved { id, x, y }
}

fn camera(pan_x: f64) -> BoardEvent {
    BoardEvent::ViewportChanged {
        transform: Transform::new(pan_x, 0.0, 1.0),
    }
}

#[tokio::test(start_paused = true)]
async fn test_debounce_keeps_last_position() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    let id = ItemId::new();
    for step in 1..=3 {
        let v = f64::from(step);
        tx.send(moved(id, v, v)).expect("send");
    }

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert!(store.calls().is_empty(), "written before the debounce elapsed");

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(
        store.calls(),
        vec![Call::Patch(id, ItemPatch::position(3.0, 3.0))]
    );

    let stats = handle.shutdown().await;
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_change_restarts_timer() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    tx.send(camera(10.0)).expect("send");
    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(camera(20.0)).expect("send");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(store.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(
        store.calls(),
        vec![Call::Viewport(ViewportRecord {
            x: 20.0,
            y: 0.0,
            scale: Some(1.0),
        })]
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_keys_debounce_independently() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    let a = ItemId::new();
    let b = ItemId::new();
    tx.send(moved(a, 1.0, 1.0)).expect("send");
    tx.send(moved(b, 2.0, 2.0)).expect("send");
    tx.send(BoardEvent::ItemPromoted { id: a, z_index: 4 })
        .expect("send");

    tokio::time::sleep(Duration::from_millis(600)).await;
    let calls = store.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.contains(&Call::Patch(a, ItemPatch::position(1.0, 1.0))));
    assert!(calls.contains(&Call::Patch(b, ItemPatch::position(2.0, 2.0))));
    assert!(calls.contains(&Call::Patch(a, ItemPatch::z_index(4))));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_imported_items_are_written_immediately() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    let item = Item::new("a.png", 0.0, 0.0, 10.0, 10.0);
    let id = item.id;
    tx.send(BoardEvent::ItemsAdded { items: vec![item] })
        .expect("send");
    tx.send(BoardEvent::SelectionChanged { selected: Some(id) })
        .expect("send");

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.calls(), vec![Call::Create(id)]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_pending_writes() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    let id = ItemId::new();
    tx.send(moved(id, 7.0, 8.0)).expect("send");
    tx.send(camera(5.0)).expect("send");
    tokio::task::yield_now().await;

    let stats = handle.shutdown().await;
    assert_eq!(stats.writes, 2);
    let calls = store.calls();
    assert!(calls.contains(&Call::Patch(id, ItemPatch::position(7.0, 8.0))));
    assert!(calls.iter().any(|call| matches!(call, Call::Viewport(_))));
}

#[tokio::test(start_paused = true)]
async fn test_closed_channel_flushes_and_stops() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    let id = ItemId::new();
    tx.send(moved(id, 1.0, 2.0)).expect("send");
    drop(tx);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(
        store.calls(),
        vec![Call::Patch(id, ItemPatch::position(1.0, 2.0))]
    );
    assert_eq!(handle.shutdown().await.writes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_failures_are_counted() {
    let store = Arc::new(RecordingStore::failing());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, PersistConfig::default());

    tx.send(moved(ItemId::new(), 1.0, 1.0)).expect("send");
    tokio::time::sleep(Duration::from_millis(600)).await;

    // The worker survives and keeps writing other keys.
    tx.send(camera(3.0)).expect("send");
    let stats = handle.shutdown().await;
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce() {
    let store = Arc::new(RecordingStore::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let config = PersistConfig {
        debounce: Duration::from_millis(50),
    };
    let handle = spawn_persister(Arc::clone(&store), BOARD, rx, config);

    tx.send(camera(1.0)).expect("send");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(store.calls().len(), 1);
    handle.shutdown().await;
}

fn touch(phase: TouchPhase, x: f64, y: f64, ts: u64) -> InputEvent {
    InputEvent::Touch(TouchEvent::single(phase, 1, x, y, ts))
}

#[tokio::test(start_paused = true)]
async fn test_session_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(BoardStore::open(dir.path()).expect("open"));
    let board = store.create_board("Inspiration").expect("board");

    let mut state = CanvasState::load(&*store, &board, 800.0, 600.0, GestureConfig::default())
        .expect("load");
    let rx = state.event_channel();
    let handle = spawn_persister(Arc::clone(&store), board.clone(), rx, PersistConfig::default());

    let ids = state.import_items(vec![Item::new("a.png", 100.0, 100.0, 200.0, 200.0)]);
    let id = ids[0];
    tokio::time::sleep(Duration::from_millis(1)).await;

    // Tap to select, then drag by (40, 20).
    for event in [
        touch(TouchPhase::Start, 150.0, 150.0, 0),
        touch(TouchPhase::End, 150.0, 150.0, 50),
        touch(TouchPhase::Start, 150.0, 150.0, 1_000),
        touch(TouchPhase::Move, 190.0, 170.0, 1_016),
        touch(TouchPhase::End, 190.0, 170.0, 1_032),
        // Slow pan on empty canvas.
        touch(TouchPhase::Start, 600.0, 500.0, 2_000),
        touch(TouchPhase::Move, 630.0, 500.0, 2_500),
        touch(TouchPhase::End, 630.0, 500.0, 3_000),
    ] {
        state.process_event(&event);
    }

    let stats = handle.shutdown().await;
    assert_eq!(stats.failures, 0);
    drop(state);

    let reopened = BoardStore::open(dir.path()).expect("reopen");
    let items = reopened.items_for_board(&board).expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);
    assert!((items[0].x - 140.0).abs() < 1e-9);
    assert!((items[0].y - 120.0).abs() < 1e-9);

    let viewport = reopened.viewport(&board).expect("viewport");
    assert!((viewport.x - 30.0).abs() < 1e-9);
    assert!(viewport.y.abs() < 1e-9);
}

#[tokio::test]
async fn test_deleted_board_rejects_late_writes() {
    let store = Arc::new(BoardStore::new());
    let board = store.create_board("Temp").expect("board");
    let item = Item::new("a.png", 0.0, 0.0, 10.0, 10.0);
    store.create_item(&item, &board).expect("item");
    store.delete_board(&board).expect("delete");

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = spawn_persister(Arc::clone(&store), board.clone(), rx, PersistConfig::default());
    tx.send(moved(item.id, 5.0, 5.0)).expect("send");
    tx.send(camera(1.0)).expect("send");

    let stats = handle.shutdown().await;
    assert_eq!(stats.failures, 2);
    assert!(store.items_for_board(&board).is_err());
}
