//! Cart selection and delete-mode state
//!
//! Owns the cart line items together with the set of selected ids, so any
//! mutation that drops an item also drops its selection inside the same
//! critical section, so totals computed immediately afterwards can never see
//! a dangling id. Checkout-sheet visibility is derived state: a non-empty
//! selection in normal mode.

use parking_lot::Mutex;
use shop_client::CartItem;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::watch;

/// Errors from selection operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The id is not present in the current cart list
    #[error("Unknown cart item: {0}")]
    UnknownItem(u64),
}

/// Result type for selection operations
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Interaction mode of the cart screen
///
/// The modes are mutually exclusive; entering or leaving delete mode clears
/// the selection so checkout picks and delete marks never mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Items are selected for checkout
    #[default]
    Normal,
    /// Items are marked for bulk deletion
    DeleteMode,
}

/// Immutable view of the store, published after every mutation
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    /// Current cart items
    pub items: Vec<CartItem>,
    /// Currently selected/marked ids
    pub selected: HashSet<u64>,
    /// Current interaction mode
    pub mode: SelectionMode,
    /// Monotonic revision, bumped on every mutation
    pub revision: u64,
}

impl SelectionSnapshot {
    /// Whether the checkout sheet should be visible for this state
    pub fn visible(&self) -> bool {
        !self.selected.is_empty() && self.mode == SelectionMode::Normal
    }
}

struct SelectionInner {
    items: Vec<CartItem>,
    selected: HashSet<u64>,
    mode: SelectionMode,
    revision: u64,
}

/// Store for the cart screen's selection state
pub struct SelectionStore {
    inner: Mutex<SelectionInner>,
    snapshot_tx: watch::Sender<SelectionSnapshot>,
    visible_tx: watch::Sender<bool>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore {
    /// Create an empty store
    pub fn new() -> Self {
        let initial = SelectionSnapshot {
            items: Vec::new(),
            selected: HashSet::new(),
            mode: SelectionMode::Normal,
            revision: 0,
        };
        let (snapshot_tx, _) = watch::channel(initial);
        let (visible_tx, _) = watch::channel(false);

        Self {
            inner: Mutex::new(SelectionInner {
                items: Vec::new(),
                selected: HashSet::new(),
                mode: SelectionMode::Normal,
                revision: 0,
            }),
            snapshot_tx,
            visible_tx,
        }
    }

    /// Replace the cart list wholesale (fetch or refresh)
    ///
    /// Selected ids that no longer exist in the new list are pruned in the
    /// same update.
    pub fn set_items(&self, items: Vec<CartItem>) {
        let mut inner = self.inner.lock();
        let ids: HashSet<u64> = items.iter().map(|i| i.id).collect();
        inner.selected.retain(|id| ids.contains(id));
        inner.items = items;
        self.publish(&mut inner);
    }

    /// Toggle an item's checkout selection
    ///
    /// Only meaningful in normal mode; calls made while delete mode is
    /// active are ignored. Returns whether the id is selected afterwards.
    pub fn toggle_select(&self, id: u64) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.mode != SelectionMode::Normal {
            tracing::debug!("toggle_select({}) ignored in delete mode", id);
            return Ok(inner.selected.contains(&id));
        }
        self.toggle(&mut inner, id)
    }

    /// Toggle an item's delete mark
    ///
    /// The delete-mode counterpart of [`toggle_select`](Self::toggle_select);
    /// ignored in normal mode.
    pub fn toggle_delete_mark(&self, id: u64) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.mode != SelectionMode::DeleteMode {
            tracing::debug!("toggle_delete_mark({}) ignored in normal mode", id);
            return Ok(inner.selected.contains(&id));
        }
        self.toggle(&mut inner, id)
    }

    fn toggle(&self, inner: &mut SelectionInner, id: u64) -> Result<bool> {
        if !inner.items.iter().any(|i| i.id == id) {
            return Err(SelectionError::UnknownItem(id));
        }
        let now_selected = if inner.selected.remove(&id) {
            false
        } else {
            inner.selected.insert(id);
            true
        };
        self.publish(inner);
        Ok(now_selected)
    }

    /// Enter delete mode, dropping any checkout selection
    pub fn enter_delete_mode(&self) {
        let mut inner = self.inner.lock();
        if inner.mode == SelectionMode::DeleteMode {
            return;
        }
        inner.mode = SelectionMode::DeleteMode;
        inner.selected.clear();
        self.publish(&mut inner);
    }

    /// Leave delete mode, dropping any delete marks
    pub fn exit_delete_mode(&self) {
        let mut inner = self.inner.lock();
        if inner.mode == SelectionMode::Normal {
            return;
        }
        inner.mode = SelectionMode::Normal;
        inner.selected.clear();
        self.publish(&mut inner);
    }

    /// Remove one item from the cart list
    ///
    /// The item leaves the list and the selection in the same update.
    pub fn remove_item(&self, id: u64) -> Result<CartItem> {
        let mut inner = self.inner.lock();
        let position = inner
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or(SelectionError::UnknownItem(id))?;
        let item = inner.items.remove(position);
        inner.selected.remove(&id);
        self.publish(&mut inner);
        Ok(item)
    }

    /// Delete every marked item, then leave delete mode
    ///
    /// One atomic user-visible operation: observers never see a
    /// half-deleted set. Returns the removed ids so the screen can issue
    /// the corresponding API deletes.
    pub fn bulk_delete(&self) -> Vec<u64> {
        let mut inner = self.inner.lock();
        let mut removed: Vec<u64> = inner.selected.iter().copied().collect();
        removed.sort_unstable();

        let SelectionInner {
            items, selected, ..
        } = &mut *inner;
        items.retain(|i| !selected.contains(&i.id));
        selected.clear();
        inner.mode = SelectionMode::Normal;
        self.publish(&mut inner);
        removed
    }

    /// Clear the selection (checkout navigation)
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        if inner.selected.is_empty() {
            return;
        }
        inner.selected.clear();
        self.publish(&mut inner);
    }

    /// Current cart items
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.lock().items.clone()
    }

    /// Currently selected/marked ids
    pub fn selected_ids(&self) -> HashSet<u64> {
        self.inner.lock().selected.clone()
    }

    /// Current interaction mode
    pub fn mode(&self) -> SelectionMode {
        self.inner.lock().mode
    }

    /// Whether the checkout sheet should be visible
    pub fn is_visible(&self) -> bool {
        let inner = self.inner.lock();
        !inner.selected.is_empty() && inner.mode == SelectionMode::Normal
    }

    /// Subscribe to full-state snapshots
    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to derived checkout-sheet visibility
    pub fn subscribe_visibility(&self) -> watch::Receiver<bool> {
        self.visible_tx.subscribe()
    }

    fn publish(&self, inner: &mut SelectionInner) {
        inner.revision += 1;
        let snapshot = SelectionSnapshot {
            items: inner.items.clone(),
            selected: inner.selected.clone(),
            mode: inner.mode,
            revision: inner.revision,
        };
        let visible = snapshot.visible();
        self.snapshot_tx.send_replace(snapshot);
        self.visible_tx.send_if_modified(|current| {
            if *current != visible {
                *current = visible;
                true
            } else {
                false
            }
        });
    }
}
