//! Canvas state management.
//!
//! [`CanvasState`] is the single owner of the scene on the fast side. It
//! feeds input through the gesture arbiter, hands terminal results to the
//! slow side over an unbounded channel and publishes a read-only snapshot
//! through a `watch` channel. Nothing here blocks or awaits.

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::gesture::{GestureArbiter, GestureConfig, GesturePhase};
use crate::projector::{self, DrawList, GridStyle};
use crate::store::{ItemStore, StoreError, ViewportCache};
use crate::{BoardEvent, InputEvent, Item, ItemId, Scene, Transform};

/// Current-value view of the canvas for the slow side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Camera transform.
    pub transform: Transform,
    /// Selected item.
    pub selected: Option<ItemId>,
    /// Single-finger gesture state.
    pub phase: GesturePhase,
    /// Whether a pinch is in progress.
    pub zooming: bool,
    /// Whether momentum is running.
    pub gliding: bool,
    /// Number of items on the board.
    pub item_count: usize,
}

/// The complete canvas state for one open board.
#[derive(Debug)]
pub struct CanvasState {
    scene: Scene,
    arbiter: GestureArbiter,
    events_tx: Option<mpsc::UnboundedSender<BoardEvent>>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl CanvasState {
    /// Create a canvas over `scene`.
    #[must_use]
    pub fn new(scene: Scene, config: GestureConfig) -> Self {
        let arbiter = GestureArbiter::new(config);
        let (snapshot_tx, _) = watch::channel(snapshot_of(&scene, &arbiter));
        Self {
            scene,
            arbiter,
            events_tx: None,
            snapshot_tx,
        }
    }

    /// Load a board's items and cached camera into a new canvas.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BoardNotFound`] for an unknown board.
    pub fn load<S>(
        store: &S,
        board_id: &str,
        width: f64,
        height: f64,
        config: GestureConfig,
    ) -> Result<Self, StoreError>
    where
        S: ItemStore + ViewportCache + ?Sized,
    {
        let items = store.items_for_board(board_id)?;
        let transform = store
            .viewport(board_id)
            .map_or(Transform::IDENTITY, |record| record.to_transform());
        tracing::info!(board_id, items = items.len(), "Loaded board");
        let scene = Scene::new(width, height)
            .with_items(items)
            .with_transform(transform);
        Ok(Self::new(scene, config))
    }

    /// Open the channel that carries [`BoardEvent`]s to the slow side.
    ///
    /// Replaces any earlier channel.
    pub fn event_channel(&mut self) -> mpsc::UnboundedReceiver<BoardEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        rx
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The gesture arbiter.
    #[must_use]
    pub fn arbiter(&self) -> &GestureArbiter {
        &self.arbiter
    }

    /// Process an input event.
    ///
    /// Returns the notifications it produced; they are also forwarded to
    /// the event channel, if one is open.
    pub fn process_event(&mut self, event: &InputEvent) -> Vec<BoardEvent> {
        let mut out = Vec::new();
        match event {
            InputEvent::Touch(touch) => {
                self.arbiter.handle_touch(&mut self.scene, touch, &mut out);
            }
            InputEvent::Frame { timestamp_ms } => {
                self.arbiter.tick(&mut self.scene, *timestamp_ms, &mut out);
            }
            InputEvent::Resize { width, height } => {
                if width.is_finite() && height.is_finite() && *width > 0.0 && *height > 0.0 {
                    self.scene.set_viewport(*width, *height);
                } else {
                    tracing::debug!("Ignoring resize to {width}x{height}");
                }
            }
        }
        self.dispatch(&out);
        out
    }

    /// Add imported items on top of the board.
    ///
    /// They get z-indices `max + 1`, `max + 2`, ... in the order given.
    pub fn import_items(&mut self, items: Vec<Item>) -> Vec<ItemId> {
        if items.is_empty() {
            return Vec::new();
        }
        let ids = self.scene.add_imported(items);
        let added: Vec<Item> = ids
            .iter()
            .filter_map(|id| self.scene.get_item(*id).cloned())
            .collect();
        tracing::info!(count = added.len(), "Added imported items");
        let out = vec![BoardEvent::ItemsAdded { items: added }];
        self.dispatch(&out);
        ids
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        snapshot_of(&self.scene, &self.arbiter)
    }

    /// Project the scene for drawing.
    #[must_use]
    pub fn draw_list(&self, grid: GridStyle) -> DrawList {
        projector::project(&self.scene, grid)
    }

    fn dispatch(&mut self, out: &[BoardEvent]) {
        if let Some(tx) = &self.events_tx {
            for event in out {
                if tx.send(event.clone()).is_err() {
                    tracing::debug!("Board event receiver dropped; detaching");
                    self.events_tx = None;
                    break;
                }
            }
        }
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(Scene::default(), GestureConfig::default())
    }
}

fn snapshot_of(scene: &Scene, arbiter: &GestureArbiter) -> Snapshot {
    Snapshot {
        transform: scene.transform,
        selected: scene.selected(),
        phase: arbiter.phase(),
        zooming: arbiter.is_zooming(),
        gliding: arbiter.has_momentum(),
        item_count: scene.item_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BoardStore;
    use crate::{TouchEvent, TouchPhase};

    fn touch(phase: TouchPhase, x: f64, y: f64, ts: u64) -> InputEvent {
        InputEvent::Touch(TouchEvent::single(phase, 1, x, y, ts))
    }

    #[test]
    fn test_events_reach_channel_and_snapshot() {
        let mut state = CanvasState::new(Scene::new(800.0, 600.0), GestureConfig::default());
        let mut rx = state.event_channel();
        let snapshots = state.subscribe();

        state.process_event(&touch(TouchPhase::Start, 100.0, 100.0, 0));
        state.process_event(&touch(TouchPhase::Move, 150.0, 100.0, 16));

        match rx.try_recv() {
            Ok(BoardEvent::ViewportChanged { transform }) => {
                assert!((transform.pan_x - 50.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected {other:?}"),
        }
        let snapshot = snapshots.borrow().clone();
        assert_eq!(snapshot.phase, GesturePhase::PanActive);
        assert!((snapshot.transform.pan_x - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dropped_receiver_does_not_block() {
        let mut state = CanvasState::default();
        drop(state.event_channel());
        state.process_event(&touch(TouchPhase::Start, 100.0, 100.0, 0));
        let out = state.process_event(&touch(TouchPhase::Move, 150.0, 100.0, 16));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_import_items_emits_added() {
        let mut state = CanvasState::default();
        let mut rx = state.event_channel();
        let ids = state.import_items(vec![
            Item::new("a.png", 0.0, 0.0, 10.0, 10.0),
            Item::new("b.png", 0.0, 0.0, 10.0, 10.0),
        ]);
        assert_eq!(ids.len(), 2);
        match rx.try_recv() {
            Ok(BoardEvent::ItemsAdded { items }) => {
                let z: Vec<_> = items.iter().map(|i| i.z_index).collect();
                assert_eq!(z, vec![0, 1]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(state.snapshot().item_count, 2);
    }

    #[test]
    fn test_resize_ignores_invalid_sizes() {
        let mut state = CanvasState::default();
        state.process_event(&InputEvent::Resize {
            width: 1024.0,
            height: 768.0,
        });
        assert!((state.scene().viewport.width - 1024.0).abs() < f64::EPSILON);
        state.process_event(&InputEvent::Resize {
            width: 0.0,
            height: f64::NAN,
        });
        assert!((state.scene().viewport.width - 1024.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_restores_items_and_camera() {
        let store = BoardStore::new();
        let board = store.create_board("Board").expect("create");
        store
            .create_item(&Item::new("a.png", 5.0, 5.0, 10.0, 10.0), &board)
            .expect("item");
        store
            .set_viewport(
                &board,
                crate::schema::ViewportRecord {
                    x: 30.0,
                    y: 40.0,
                    scale: Some(2.0),
                },
            )
            .expect("viewport");

        let state =
            CanvasState::load(&store, &board, 800.0, 600.0, GestureConfig::default()).expect("load");
        assert_eq!(state.scene().item_count(), 1);
        assert_eq!(state.scene().transform, Transform::new(30.0, 40.0, 2.0));
        assert!(CanvasState::load(&store, "missing", 800.0, 600.0, GestureConfig::default()).is_err());
    }
}
