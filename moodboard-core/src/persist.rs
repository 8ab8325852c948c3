//! Debounced persistence worker.
//!
//! Runs on the slow side. Receives [`BoardEvent`]s from the gesture loop
//! and turns them into store writes:
//!
//! - imported items are created right away;
//! - moves, z-index changes and the camera are debounced per key, so only
//!   the last value written within the quiet period reaches the store.
//!
//! Write failures are logged and counted, never retried in-band.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::schema::ViewportRecord;
use crate::store::{ItemStore, StoreError, ViewportCache};
use crate::{BoardEvent, CanvasError, Item, ItemId};

/// Debounce interval for item and viewport writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Persistence worker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistConfig {
    /// Quiet period after the last change before a key is written.
    pub debounce: Duration,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Writes that reached the store.
    pub writes: u64,
    /// Writes the store rejected.
    pub failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WriteKey {
    Position(ItemId),
    ZIndex(ItemId),
    Viewport,
}

#[derive(Debug, Clone)]
enum Write {
    Create(Vec<Item>),
    Position { id: ItemId, x: f64, y: f64 },
    ZIndex { id: ItemId, z_index: i32 },
    Viewport(ViewportRecord),
}

/// Handle to a running persistence worker.
#[derive(Debug)]
pub struct PersistHandle {
    task: JoinHandle<PersistStats>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl PersistHandle {
    /// Stop the worker after flushing every pending write.
    pub async fn shutdown(mut self) -> PersistStats {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("Persistence worker ended abnormally: {e}");
                PersistStats::default()
            }
        }
    }

    /// Stop the worker immediately, dropping pending writes.
    pub fn abort(self) {
        self.task.abort();
    }
}

/// Spawn the persistence worker for one board.
///
/// The worker ends when shut down through the handle, when the handle is
/// dropped, or when every sender for `rx` is dropped; each path flushes
/// pending writes first.
pub fn spawn_persister<S>(
    store: Arc<S>,
    board_id: impl Into<String>,
    mut rx: mpsc::UnboundedReceiver<BoardEvent>,
    config: PersistConfig,
) -> PersistHandle
where
    S: ItemStore + ViewportCache + 'static,
{
    let board_id = board_id.into();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut worker = Worker {
            store,
            board_id,
            pending: HashMap::new(),
            stats: PersistStats::default(),
        };

        loop {
            let next_deadline = worker.next_deadline();
            let sleep_until = next_deadline.unwrap_or_else(|| Instant::now() + config.debounce);

            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::debug!(board_id = %worker.board_id, "Persistence worker received shutdown signal");
                    break;
                }

                event = rx.recv() => {
                    let Some(event) = event else {
                        tracing::debug!(board_id = %worker.board_id, "Board event channel closed");
                        break;
                    };
                    worker.accept(event, config.debounce);
                }

                () = tokio::time::sleep_until(sleep_until), if next_deadline.is_some() => {
                    worker.flush_due(Instant::now());
                }
            }
        }

        // Take whatever is still queued, then write everything.
        while let Ok(event) = rx.try_recv() {
            worker.accept(event, config.debounce);
        }
        worker.flush_all();
        tracing::debug!(
            board_id = %worker.board_id,
            writes = worker.stats.writes,
            failures = worker.stats.failures,
            "Persistence worker stopped"
        );
        worker.stats
    });

    PersistHandle {
        task,
        shutdown_tx: Some(shutdown_tx),
    }
}

struct Worker<S> {
    store: Arc<S>,
    board_id: String,
    pending: HashMap<WriteKey, (Write, Instant)>,
    stats: PersistStats,
}

impl<S> Worker<S>
where
    S: ItemStore + ViewportCache + 'static,
{
    fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }

    fn accept(&mut self, event: BoardEvent, debounce: Duration) {
        let deadline = Instant::now() + debounce;
        let (key, write) = match event {
            BoardEvent::ItemsAdded { items } => {
                self.apply(Write::Create(items));
                return;
            }
            BoardEvent::ItemMoved { id, x, y } => (WriteKey::Position(id), Write::Position { id, x, y }),
            BoardEvent::ItemPromoted { id, z_index } => {
                (WriteKey::ZIndex(id), Write::ZIndex { id, z_index })
            }
            BoardEvent::ViewportChanged { transform } => (
                WriteKey::Viewport,
                Write::Viewport(ViewportRecord::from(&transform)),
            ),
            BoardEvent::SelectionChanged { .. } => return,
        };
        // Replaces any pending value for the key and restarts its timer.
        self.pending.insert(key, (write, deadline));
    }

    fn flush_due(&mut self, now: Instant) {
        let due: Vec<WriteKey> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in due {
            if let Some((write, _)) = self.pending.remove(&key) {
                self.apply(write);
            }
        }
    }

    fn flush_all(&mut self) {
        let pending: Vec<_> = self.pending.drain().map(|(_, (write, _))| write).collect();
        for write in pending {
            self.apply(write);
        }
    }

    /// Write through to the store, inline.
    fn apply(&mut self, write: Write) {
        for result in write_through(&*self.store, &self.board_id, write) {
            match result {
                Ok(()) => self.stats.writes += 1,
                Err(e) => {
                    self.stats.failures += 1;
                    tracing::warn!(board_id = %self.board_id, "{e}");
                }
            }
        }
    }
}

fn write_through<S>(store: &S, board_id: &str, write: Write) -> Vec<Result<(), CanvasError>>
where
    S: ItemStore + ViewportCache + ?Sized,
{
    let wrap = |result: Result<(), StoreError>| {
        result.map_err(|e| CanvasError::PersistenceWriteFailure(e.to_string()))
    };
    match write {
        Write::Create(items) => items
            .iter()
            .map(|item| wrap(store.create_item(item, board_id).map(|_| ())))
            .collect(),
        Write::Position { id, x, y } => vec![wrap(store.update_position(id, x, y))],
        Write::ZIndex { id, z_index } => vec![wrap(store.update_z_index(id, z_index))],
        Write::Viewport(record) => vec![wrap(store.set_viewport(board_id, record))],
    }
}
