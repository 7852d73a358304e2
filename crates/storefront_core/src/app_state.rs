//! The single owner of the lot catalog and the order being assembled.
//!
//! Every mutator releases its borrows before emitting, so subscribers can
//! read the state back (or mutate it again) from inside a handler.

use std::{
    cell::{Cell, Ref, RefCell},
    rc::Rc,
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{Amount, LotId, LotStatus, OrderField},
    protocol::{LotDetail, OrderConfirmation, OrderRequest},
};
use tracing::{debug, info};

use crate::{
    clock::Clock,
    error::AuctionError,
    events::{publish, AuctionEvent, NetworkOperation, StoreBus},
    lot::LotItem,
    order::{ContactForm, FieldErrors, OrderAssembler, SelectionPolicy},
};

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Recorded on every bid placed from this client.
    pub bidder_tag: String,
    pub selection_policy: SelectionPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            bidder_tag: "me".to_string(),
            selection_policy: SelectionPolicy::default(),
        }
    }
}

/// Identifies one preview request; results carrying an outdated ticket are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    pub id: LotId,
    generation: u64,
}

pub struct AppState {
    bus: StoreBus,
    clock: Rc<dyn Clock>,
    options: StoreOptions,
    catalog: RefCell<Vec<LotItem>>,
    order: RefCell<OrderAssembler>,
    preview: RefCell<Option<LotId>>,
    preview_generation: Cell<u64>,
}

impl AppState {
    pub fn new(bus: StoreBus, clock: Rc<dyn Clock>, options: StoreOptions) -> Rc<Self> {
        Rc::new(Self {
            bus,
            clock,
            options,
            catalog: RefCell::new(Vec::new()),
            order: RefCell::new(OrderAssembler::default()),
            preview: RefCell::new(None),
            preview_generation: Cell::new(0),
        })
    }

    pub fn bus(&self) -> &StoreBus {
        &self.bus
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn set_catalog(&self, items: Vec<LotItem>) {
        let now = self.now();
        let policy = self.options.selection_policy;
        let dropped = {
            let mut catalog = self.catalog.borrow_mut();
            let mut order = self.order.borrow_mut();
            *catalog = items;
            for lot in catalog.iter_mut() {
                lot.refresh_status(now);
            }
            let dropped = order.retain_selected(|id| {
                catalog
                    .iter()
                    .any(|lot| &lot.id == id && policy.admits(lot, now))
            });
            for lot in catalog.iter_mut() {
                let selected = order.is_selected(&lot.id);
                lot.set_selected_for_order(selected);
            }
            info!(lots = catalog.len(), dropped_selections = dropped, "catalog replaced");
            dropped
        };

        publish(&self.bus, AuctionEvent::ItemsChanged);
        if dropped > 0 {
            publish(&self.bus, AuctionEvent::AuctionChanged);
        }
    }

    pub fn catalog(&self) -> Vec<LotItem> {
        self.refreshed_catalog().clone()
    }

    pub fn lot(&self, id: &LotId) -> Option<LotItem> {
        self.refreshed_catalog()
            .iter()
            .find(|lot| &lot.id == id)
            .cloned()
    }

    pub fn get_active_lots(&self) -> Vec<LotItem> {
        self.lots_with_status(LotStatus::Active)
    }

    pub fn get_closed_lots(&self) -> Vec<LotItem> {
        self.lots_with_status(LotStatus::Closed)
    }

    /// Header counter: number of closed lots.
    pub fn closed_count(&self) -> usize {
        self.refreshed_catalog()
            .iter()
            .filter(|lot| lot.status() == LotStatus::Closed)
            .count()
    }

    /// Samples the clock for every lot; emits `auction:changed` if any moved.
    pub fn refresh_statuses(&self) -> usize {
        let now = self.now();
        let moved = self
            .catalog
            .borrow_mut()
            .iter_mut()
            .map(|lot| lot.refresh_status(now))
            .filter(|moved| *moved)
            .count();
        if moved > 0 {
            debug!(moved, "lot statuses advanced");
            publish(&self.bus, AuctionEvent::AuctionChanged);
        }
        moved
    }

    pub fn set_preview(&self, id: Option<LotId>) {
        self.bump_preview_generation();
        let snapshot = id.as_ref().and_then(|id| self.lot(id));
        *self.preview.borrow_mut() = snapshot.as_ref().map(|lot| lot.id.clone());
        publish(&self.bus, AuctionEvent::PreviewChanged(snapshot));
    }

    pub fn preview(&self) -> Option<LotItem> {
        let id = self.preview.borrow().clone()?;
        self.lot(&id)
    }

    /// Starts a preview request. Any earlier ticket becomes stale.
    pub fn begin_preview(&self, id: LotId) -> PreviewTicket {
        PreviewTicket {
            id,
            generation: self.bump_preview_generation(),
        }
    }

    /// Applies fetched lot detail and opens the preview, unless a newer
    /// preview request or a close happened since `ticket` was issued.
    pub fn attach_lot_detail(&self, ticket: &PreviewTicket, detail: LotDetail) -> bool {
        if ticket.generation != self.preview_generation.get() {
            debug!(lot = %ticket.id, "discarding stale lot detail");
            return false;
        }

        let snapshot = {
            let mut catalog = self.catalog.borrow_mut();
            let Some(lot) = catalog.iter_mut().find(|lot| lot.id == ticket.id) else {
                debug!(lot = %ticket.id, "lot detail for a lot no longer in the catalog");
                return false;
            };
            lot.apply_detail(detail, &self.options.bidder_tag);
            lot.refresh_status(self.clock.now());
            lot.clone()
        };
        *self.preview.borrow_mut() = Some(ticket.id.clone());
        publish(&self.bus, AuctionEvent::PreviewChanged(Some(snapshot)));
        true
    }

    pub fn next_bid(&self, id: &LotId) -> Result<Amount, AuctionError> {
        let now = self.now();
        self.catalog
            .borrow()
            .iter()
            .find(|lot| &lot.id == id)
            .ok_or_else(|| AuctionError::LotNotFound(id.clone()))?
            .next_bid(now)
    }

    pub fn place_bid(&self, id: &LotId, amount: Amount) -> Result<(), AuctionError> {
        let now = self.now();
        let snapshot = {
            let mut catalog = self.catalog.borrow_mut();
            let lot = catalog
                .iter_mut()
                .find(|lot| &lot.id == id)
                .ok_or_else(|| AuctionError::LotNotFound(id.clone()))?;
            lot.place_bid(&self.options.bidder_tag, amount, now)?;
            lot.clone()
        };
        info!(lot = %id, amount, "bid placed");

        publish(&self.bus, AuctionEvent::AuctionChanged);
        if self.preview.borrow().as_ref() == Some(id) {
            publish(&self.bus, AuctionEvent::PreviewChanged(Some(snapshot)));
        }
        Ok(())
    }

    /// Adds or removes a lot from the basket. Lots that are missing, still
    /// open, or not admitted by the selection policy are ignored.
    pub fn toggle_ordered_lot(&self, id: &LotId, included: bool) -> bool {
        let now = self.now();
        let changed = {
            let mut catalog = self.catalog.borrow_mut();
            let Some(lot) = catalog.iter_mut().find(|lot| &lot.id == id) else {
                debug!(lot = %id, "ignoring basket toggle for unknown lot");
                return false;
            };
            lot.refresh_status(now);
            if !self.options.selection_policy.admits(lot, now) {
                debug!(lot = %id, status = %lot.status(), "ignoring basket toggle for lot not orderable");
                return false;
            }
            let mut order = self.order.borrow_mut();
            let changed = if included {
                order.select(id.clone())
            } else {
                order.deselect(id)
            };
            lot.set_selected_for_order(included);
            changed
        };

        if changed {
            publish(&self.bus, AuctionEvent::AuctionChanged);
        }
        changed
    }

    pub fn selected_lots(&self) -> Vec<LotId> {
        self.order.borrow().selected().to_vec()
    }

    pub fn get_total(&self) -> Amount {
        let now = self.now();
        self.order.borrow().total(&self.catalog.borrow(), now)
    }

    /// Updates one contact field and re-validates the whole form.
    pub fn set_order_field(&self, field: OrderField, value: impl Into<String>) -> bool {
        self.order.borrow_mut().set_field(field, value);
        self.validate_order()
    }

    /// Emits `formErrors:change`, followed by `order:ready` when the form is valid.
    pub fn validate_order(&self) -> bool {
        let (errors, ready) = {
            let mut order = self.order.borrow_mut();
            let errors = order.validate().clone();
            let ready = order.is_valid().then(|| order.request());
            (errors, ready)
        };

        publish(&self.bus, AuctionEvent::FormErrors(errors));
        match ready {
            Some(request) => {
                publish(&self.bus, AuctionEvent::OrderReady(request));
                true
            }
            None => false,
        }
    }

    pub fn is_form_valid(&self) -> bool {
        self.order.borrow().is_valid()
    }

    pub fn field_errors(&self) -> FieldErrors {
        self.order.borrow().field_errors().clone()
    }

    pub fn contact(&self) -> ContactForm {
        self.order.borrow().contact().clone()
    }

    /// Empties the basket. Contact fields are kept for the next order.
    pub fn clear_basket(&self) {
        {
            let mut order = self.order.borrow_mut();
            order.clear_selection();
            for lot in self.catalog.borrow_mut().iter_mut() {
                lot.set_selected_for_order(false);
            }
        }
        publish(&self.bus, AuctionEvent::AuctionChanged);
    }

    /// Projection handed to the order submission endpoint.
    pub fn order(&self) -> OrderRequest {
        self.order.borrow().request()
    }

    pub fn order_placed(&self, confirmation: OrderConfirmation) {
        info!(order = %confirmation.id, "order accepted");
        self.clear_basket();
        publish(&self.bus, AuctionEvent::OrderPlaced(confirmation));
    }

    pub fn report_network_error(&self, operation: NetworkOperation, message: impl Into<String>) {
        publish(
            &self.bus,
            AuctionEvent::NetworkError {
                operation,
                message: message.into(),
            },
        );
    }

    fn refreshed_catalog(&self) -> Ref<'_, Vec<LotItem>> {
        let now = self.now();
        for lot in self.catalog.borrow_mut().iter_mut() {
            lot.refresh_status(now);
        }
        self.catalog.borrow()
    }

    fn lots_with_status(&self, status: LotStatus) -> Vec<LotItem> {
        self.refreshed_catalog()
            .iter()
            .filter(|lot| lot.status() == status)
            .cloned()
            .collect()
    }

    fn bump_preview_generation(&self) -> u64 {
        let next = self.preview_generation.get() + 1;
        self.preview_generation.set(next);
        next
    }
}

#[cfg(test)]
#[path = "tests/app_state_tests.rs"]
mod tests;
