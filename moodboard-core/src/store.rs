//! Board storage: boards, their items and their cached viewports.
//!
//! [`ItemStore`] and [`ViewportCache`] are the seams the persistence worker
//! writes through. [`BoardStore`] implements both, in memory with an
//! optional JSON file per board.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::schema::{BoardDocument, BoardRecord, ItemPatch, ItemRecord, ViewportRecord};
use crate::{Item, ItemId};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested board does not exist.
    #[error("Board not found: {0}")]
    BoardNotFound(String),
    /// The requested item does not exist on any board.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// An item with this ID is already stored.
    #[error("Duplicate item: {0}")]
    DuplicateItem(ItemId),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable item rows.
pub trait ItemStore: Send + Sync {
    /// Items of a board, ascending z-index then creation time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BoardNotFound`] for an unknown board.
    fn items_for_board(&self, board_id: &str) -> Result<Vec<Item>, StoreError>;

    /// Store a new item on a board and return its ID.
    ///
    /// # Errors
    ///
    /// Fails for an unknown board, a duplicate ID, or a failed write.
    fn create_item(&self, item: &Item, board_id: &str) -> Result<ItemId, StoreError>;

    /// Move an item.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a failed write.
    fn update_position(&self, id: ItemId, x: f64, y: f64) -> Result<(), StoreError> {
        self.update_transform(id, &ItemPatch::position(x, y))
    }

    /// Change an item's z-index.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a failed write.
    fn update_z_index(&self, id: ItemId, z_index: i32) -> Result<(), StoreError> {
        self.update_transform(id, &ItemPatch::z_index(z_index))
    }

    /// Update any subset of an item's geometry.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a failed write.
    fn update_transform(&self, id: ItemId, patch: &ItemPatch) -> Result<(), StoreError>;

    /// Remove an item.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a failed write.
    fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;
}

/// Last-write-wins camera position per board.
pub trait ViewportCache: Send + Sync {
    /// Cached camera position, if any.
    fn viewport(&self, board_id: &str) -> Option<ViewportRecord>;

    /// Replace the cached camera position.
    ///
    /// # Errors
    ///
    /// Fails for an unknown board or a failed write.
    fn set_viewport(&self, board_id: &str, viewport: ViewportRecord) -> Result<(), StoreError>;
}

/// Thread-safe board storage.
///
/// Construct it explicitly and share it behind an [`Arc`]; there is no
/// process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    boards: Arc<RwLock<HashMap<String, BoardDocument>>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
    /// Last timestamp handed out, so `updatedAt` strictly increases.
    clock: Arc<AtomicU64>,
}

impl BoardStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `data_dir`, loading every board file in it.
    ///
    /// The directory is created if needed. Unreadable board files are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or listed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut boards = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match load_document(&path) {
                Ok(doc) => {
                    boards.insert(doc.board.id.clone(), doc);
                }
                Err(e) => tracing::warn!("Skipping board file {}: {e}", path.display()),
            }
        }
        tracing::debug!(count = boards.len(), dir = %data_dir.display(), "Opened board store");

        Ok(Self {
            boards: Arc::new(RwLock::new(boards)),
            data_dir: Some(data_dir),
            clock: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The backing directory, if any.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Create a board and return its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the board file cannot be written.
    pub fn create_board(&self, name: &str) -> Result<String, StoreError> {
        let now = self.now();
        let id = format!("board_{}", uuid::Uuid::new_v4().simple());
        let doc = BoardDocument::new(BoardRecord {
            id: id.clone(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        });
        {
            let mut boards = self.write();
            boards.insert(id.clone(), doc);
        }
        self.persist_board(&id)?;
        tracing::info!(board_id = %id, name, "Created board");
        Ok(id)
    }

    /// A board by ID.
    #[must_use]
    pub fn board(&self, board_id: &str) -> Option<BoardRecord> {
        self.read().get(board_id).map(|doc| doc.board.clone())
    }

    /// All boards, most recently updated first.
    #[must_use]
    pub fn list_boards(&self) -> Vec<BoardRecord> {
        let mut boards: Vec<_> = self.read().values().map(|doc| doc.board.clone()).collect();
        boards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.name.cmp(&b.name)));
        boards
    }

    /// Rename a board.
    ///
    /// # Errors
    ///
    /// Fails for an unknown board or a failed write.
    pub fn rename_board(&self, board_id: &str, name: &str) -> Result<(), StoreError> {
        let now = self.now();
        self.update_board(board_id, |doc| {
            doc.board.name = name.to_string();
            doc.board.updated_at = now;
        })
    }

    /// Delete a board together with its items and cached viewport.
    ///
    /// # Errors
    ///
    /// Fails for an unknown board or if its file cannot be removed.
    pub fn delete_board(&self, board_id: &str) -> Result<(), StoreError> {
        let removed = self.write().remove(board_id);
        let doc = removed.ok_or_else(|| StoreError::BoardNotFound(board_id.to_string()))?;
        if let Some(path) = self.board_path(board_id) {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        tracing::info!(board_id, items = doc.items.len(), "Deleted board");
        Ok(())
    }

    /// Run `f` on a board's document, then persist it.
    fn update_board<F>(&self, board_id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BoardDocument),
    {
        {
            let mut boards = self.write();
            let doc = boards
                .get_mut(board_id)
                .ok_or_else(|| StoreError::BoardNotFound(board_id.to_string()))?;
            f(doc);
        }
        self.persist_board(board_id)
    }

    /// Run `f` on the record of item `id`, wherever it lives, then persist.
    fn update_item<F>(&self, id: ItemId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BoardDocument, usize),
    {
        let board_id = {
            let mut boards = self.write();
            let (board_id, doc, index) = boards
                .iter_mut()
                .find_map(|(board_id, doc)| {
                    doc.items
                        .iter()
                        .position(|record| record.id == id)
                        .map(|index| (board_id.clone(), doc, index))
                })
                .ok_or(StoreError::ItemNotFound(id))?;
            f(doc, index);
            board_id
        };
        self.persist_board(&board_id)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Save a board to disk as JSON. No-op without a data directory.
    fn persist_board(&self, board_id: &str) -> Result<(), StoreError> {
        let Some(path) = self.board_path(board_id) else {
            return Ok(());
        };
        let json = {
            let boards = self.read();
            let Some(doc) = boards.get(board_id) else {
                return Ok(());
            };
            serde_json::to_string_pretty(doc)?
        };
        std::fs::write(&path, json)?;
        tracing::trace!(board_id, path = %path.display(), "Persisted board");
        Ok(())
    }

    fn board_path(&self, board_id: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_filename(board_id))))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, BoardDocument>> {
        self.boards
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, BoardDocument>> {
        self.boards
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Wall-clock milliseconds, strictly increasing across calls.
    fn now(&self) -> u64 {
        let wall = current_timestamp_ms();
        let mut last = self.clock.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last + 1);
            match self
                .clock
                .compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl ItemStore for BoardStore {
    fn items_for_board(&self, board_id: &str) -> Result<Vec<Item>, StoreError> {
        self.read()
            .get(board_id)
            .map(BoardDocument::ordered_items)
            .ok_or_else(|| StoreError::BoardNotFound(board_id.to_string()))
    }

    fn create_item(&self, item: &Item, board_id: &str) -> Result<ItemId, StoreError> {
        if self
            .read()
            .values()
            .any(|doc| doc.items.iter().any(|record| record.id == item.id))
        {
            return Err(StoreError::DuplicateItem(item.id));
        }
        let now = self.now();
        let mut record = ItemRecord::from_item(item, board_id);
        if record.created_at == 0 {
            record.created_at = now;
        }
        self.update_board(board_id, |doc| {
            doc.items.push(record);
            doc.board.updated_at = now;
        })?;
        tracing::debug!(board_id, item = %item.id, "Created item");
        Ok(item.id)
    }

    fn update_transform(&self, id: ItemId, patch: &ItemPatch) -> Result<(), StoreError> {
        self.update_item(id, |doc, index| patch.apply(&mut doc.items[index]))
    }

    fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.update_item(id, |doc, index| {
            doc.items.remove(index);
        })
    }
}

impl ViewportCache for BoardStore {
    fn viewport(&self, board_id: &str) -> Option<ViewportRecord> {
        self.read().get(board_id).and_then(|doc| doc.viewport)
    }

    fn set_viewport(&self, board_id: &str, viewport: ViewportRecord) -> Result<(), StoreError> {
        self.update_board(board_id, |doc| doc.viewport = Some(viewport))
    }
}

fn load_document(path: &Path) -> Result<BoardDocument, StoreError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Sanitize a board ID for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(board_id: &str) -> String {
    board_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Get the current Unix timestamp in milliseconds.
pub(crate) fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
