//! Checkout totals and selection/sheet synchronization
//!
//! [`compute_totals`] is the pure pricing function. [`CheckoutCoordinator`]
//! is the cart screen's glue object: every selection mutation flows through
//! it, and after each one it recomputes totals and reconciles the checkout
//! sheet: opening it when the first item is selected, closing it when the
//! selection empties, and clearing the selection when the user dismisses
//! the sheet with a gesture.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use app_state::selection::{self, SelectionMode, SelectionSnapshot, SelectionStore};
use app_state::sheet::{SheetController, SheetEvent};
use shop_client::CartItem;

/// Tax rate applied at checkout. Business constant set by merchandising.
pub const DEFAULT_TAX_RATE: f64 = 0.12;

/// Price summary for the current selection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of `unit_price * quantity` over the selected items
    pub subtotal: f64,
    /// `subtotal * tax_rate`
    pub tax: f64,
    /// `subtotal + tax`
    pub total: f64,
}

/// Compute subtotal, tax, and total over the selected line items
///
/// Pure. Call it again after every cart or selection change; totals are
/// never cached across a mutation. A stale total is a correctness bug, not
/// a performance issue.
pub fn compute_totals(items: &[CartItem], selected: &HashSet<u64>, tax_rate: f64) -> Totals {
    let subtotal: f64 = items
        .iter()
        .filter(|item| selected.contains(&item.id))
        .map(CartItem::line_total)
        .sum();
    let tax = subtotal * tax_rate;

    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Cart-screen coordinator binding selection state to the checkout sheet
///
/// Create it inside a tokio runtime: it spawns a listener that clears the
/// checkout selection when the sheet is dismissed by gesture.
pub struct CheckoutCoordinator {
    store: Arc<SelectionStore>,
    sheet: Arc<SheetController>,
    tax_rate: f64,
    totals_tx: watch::Sender<Totals>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl CheckoutCoordinator {
    /// Create a coordinator with the default tax rate
    pub fn new(store: Arc<SelectionStore>, sheet: Arc<SheetController>) -> Arc<Self> {
        Self::with_tax_rate(store, sheet, DEFAULT_TAX_RATE)
    }

    /// Create a coordinator with an explicit tax rate
    pub fn with_tax_rate(
        store: Arc<SelectionStore>,
        sheet: Arc<SheetController>,
        tax_rate: f64,
    ) -> Arc<Self> {
        let (totals_tx, _) = watch::channel(Totals::default());
        let coordinator = Arc::new(Self {
            store,
            sheet,
            tax_rate,
            totals_tx,
            listener: Mutex::new(None),
        });

        let mut events = coordinator.sheet.subscribe_events();
        let weak = Arc::downgrade(&coordinator);
        let handle = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if event != SheetEvent::Closed {
                    continue;
                }
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                coordinator.on_sheet_closed();
            }
        });
        *coordinator.listener.lock() = Some(handle);

        coordinator
    }

    /// Replace the cart list (fetch or refresh)
    pub fn set_items(&self, items: Vec<CartItem>) {
        self.store.set_items(items);
        self.sync();
    }

    /// Toggle an item's checkout selection
    pub fn toggle_select(&self, id: u64) -> selection::Result<bool> {
        let result = self.store.toggle_select(id);
        self.sync();
        result
    }

    /// Toggle an item's delete mark
    pub fn toggle_delete_mark(&self, id: u64) -> selection::Result<bool> {
        let result = self.store.toggle_delete_mark(id);
        self.sync();
        result
    }

    /// Enter delete mode (closes the checkout sheet)
    pub fn enter_delete_mode(&self) {
        self.store.enter_delete_mode();
        self.sync();
    }

    /// Leave delete mode
    pub fn exit_delete_mode(&self) {
        self.store.exit_delete_mode();
        self.sync();
    }

    /// Remove one item (swipe delete); list and selection update together
    pub fn remove_item(&self, id: u64) -> selection::Result<CartItem> {
        let result = self.store.remove_item(id);
        self.sync();
        result
    }

    /// Delete every marked item, returning their ids for the API calls
    pub fn bulk_delete(&self) -> Vec<u64> {
        let removed = self.store.bulk_delete();
        self.sync();
        removed
    }

    /// Clear the selection (checkout navigation)
    pub fn clear_selection(&self) {
        self.store.clear();
        self.sync();
    }

    /// Current totals
    pub fn totals(&self) -> Totals {
        *self.totals_tx.borrow()
    }

    /// Subscribe to totals changes
    pub fn subscribe_totals(&self) -> watch::Receiver<Totals> {
        self.totals_tx.subscribe()
    }

    /// Current selection snapshot
    pub fn snapshot(&self) -> SelectionSnapshot {
        self.store.subscribe().borrow().clone()
    }

    /// The checkout sheet this coordinator drives
    pub fn sheet(&self) -> &Arc<SheetController> {
        &self.sheet
    }

    /// The underlying selection store
    pub fn store(&self) -> &Arc<SelectionStore> {
        &self.store
    }

    fn on_sheet_closed(&self) {
        // Gesture dismiss drops the checkout selection. Clearing an empty
        // selection is a no-op, which is what terminates the loop when the
        // close originated from deselection.
        if self.store.mode() == SelectionMode::Normal && !self.store.selected_ids().is_empty() {
            tracing::debug!("checkout sheet dismissed, clearing selection");
            self.store.clear();
            self.sync();
        }
    }

    fn sync(&self) {
        let items = self.store.items();
        let selected = self.store.selected_ids();
        let totals = compute_totals(&items, &selected, self.tax_rate);

        self.totals_tx.send_if_modified(|current| {
            if *current != totals {
                *current = totals;
                true
            } else {
                false
            }
        });

        if self.store.is_visible() {
            self.sheet.open(0);
        } else {
            self.sheet.close();
        }
    }
}

impl Drop for CheckoutCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_state::sheet::{ImmediateDriver, SheetConfig, SheetPhase};
    use shop_client::DisplayMeta;
    use std::time::Duration;

    fn item(id: u64, unit_price: f64, quantity: u32) -> CartItem {
        CartItem {
            id,
            product_id: id * 10,
            unit_price,
            quantity,
            display: DisplayMeta {
                name: format!("item {id}"),
                image_url: None,
            },
        }
    }

    fn sample_cart() -> Vec<CartItem> {
        vec![item(1, 100_000.0, 2), item(2, 50_000.0, 1)]
    }

    #[test]
    fn test_totals_for_selection() {
        let items = sample_cart();
        let totals = compute_totals(&items, &HashSet::from([1]), DEFAULT_TAX_RATE);
        assert_eq!(totals.subtotal, 200_000.0);
        assert_eq!(totals.tax, 24_000.0);
        assert_eq!(totals.total, 224_000.0);

        let totals = compute_totals(&items, &HashSet::from([1, 2]), DEFAULT_TAX_RATE);
        assert_eq!(totals.subtotal, 250_000.0);
        assert_eq!(totals.tax, 30_000.0);
        assert_eq!(totals.total, 280_000.0);
    }

    #[test]
    fn test_totals_empty_selection_is_zero() {
        let totals = compute_totals(&sample_cart(), &HashSet::new(), DEFAULT_TAX_RATE);
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_totals_identity_holds() {
        let items = vec![item(1, 33_333.0, 3), item(2, 19_999.0, 7)];
        let totals = compute_totals(&items, &HashSet::from([1, 2]), DEFAULT_TAX_RATE);
        assert!((totals.total - totals.subtotal * 1.12).abs() < 1e-6);
        assert!((totals.total - (totals.subtotal + totals.tax)).abs() < 1e-9);
    }

    #[test]
    fn test_totals_custom_rate() {
        let items = sample_cart();
        let totals = compute_totals(&items, &HashSet::from([2]), 0.1);
        assert_eq!(totals.subtotal, 50_000.0);
        assert_eq!(totals.tax, 5_000.0);
        assert_eq!(totals.total, 55_000.0);
    }

    #[test]
    fn test_totals_ignores_unselected_and_unknown_ids() {
        let items = sample_cart();
        let totals = compute_totals(&items, &HashSet::from([2, 999]), DEFAULT_TAX_RATE);
        assert_eq!(totals.subtotal, 50_000.0);
    }

    fn coordinator() -> Arc<CheckoutCoordinator> {
        let store = Arc::new(SelectionStore::new());
        let sheet = Arc::new(SheetController::new(
            SheetConfig::single(420.0),
            Arc::new(ImmediateDriver),
        ));
        let coordinator = CheckoutCoordinator::new(store, sheet);
        coordinator.set_items(sample_cart());
        coordinator
    }

    #[tokio::test]
    async fn test_selection_opens_sheet_and_updates_totals() {
        let coordinator = coordinator();
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);

        coordinator.toggle_select(1).unwrap();
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Open);
        assert_eq!(coordinator.totals().total, 224_000.0);

        coordinator.toggle_select(2).unwrap();
        assert_eq!(coordinator.totals().total, 280_000.0);
    }

    #[tokio::test]
    async fn test_deselection_closes_sheet_and_zeroes_totals() {
        let coordinator = coordinator();
        coordinator.toggle_select(1).unwrap();
        coordinator.toggle_select(1).unwrap();

        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);
        assert_eq!(coordinator.totals(), Totals::default());
    }

    #[tokio::test]
    async fn test_remove_selected_item_updates_totals_in_same_step() {
        let coordinator = coordinator();
        coordinator.toggle_select(1).unwrap();
        coordinator.toggle_select(2).unwrap();

        coordinator.remove_item(1).unwrap();
        assert_eq!(coordinator.totals().subtotal, 50_000.0);
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Open);

        coordinator.remove_item(2).unwrap();
        assert_eq!(coordinator.totals(), Totals::default());
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);
    }

    #[tokio::test]
    async fn test_delete_mode_closes_sheet() {
        let coordinator = coordinator();
        coordinator.toggle_select(1).unwrap();
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Open);

        coordinator.enter_delete_mode();
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);
        assert_eq!(coordinator.totals(), Totals::default());
    }

    #[tokio::test]
    async fn test_bulk_delete_flow() {
        let coordinator = coordinator();
        coordinator.enter_delete_mode();
        coordinator.toggle_delete_mark(1).unwrap();
        coordinator.toggle_delete_mark(2).unwrap();

        let removed = coordinator.bulk_delete();
        assert_eq!(removed, vec![1, 2]);
        assert!(coordinator.store().items().is_empty());
        assert_eq!(coordinator.store().mode(), SelectionMode::Normal);
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gesture_dismiss_clears_selection() {
        let coordinator = coordinator();
        coordinator.toggle_select(1).unwrap();
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Open);

        // User flings the sheet away.
        coordinator.sheet().on_drag_start();
        coordinator.sheet().on_drag_move(300.0);
        coordinator.sheet().on_drag_end(300.0, 1200.0);
        assert_eq!(coordinator.sheet().phase(), SheetPhase::Closed);

        // Let the close-event listener run.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(coordinator.store().selected_ids().is_empty());
        assert_eq!(coordinator.totals(), Totals::default());
    }

    #[tokio::test]
    async fn test_totals_watch_updates() {
        let coordinator = coordinator();
        let mut totals = coordinator.subscribe_totals();
        assert_eq!(*totals.borrow_and_update(), Totals::default());

        coordinator.toggle_select(2).unwrap();
        assert!(totals.has_changed().unwrap());
        assert_eq!(totals.borrow_and_update().subtotal, 50_000.0);
    }
}
