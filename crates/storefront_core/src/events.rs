//! Domain events published by [`AppState`](crate::app_state::AppState).

use std::{borrow::Cow, fmt};

use event_bus::{DispatchReport, EventBus, Subscription};
use shared::{
    domain::OrderField,
    protocol::{OrderConfirmation, OrderRequest},
};
use tracing::debug;

use crate::{lot::LotItem, order::FieldErrors};

pub const ITEMS_CHANGED: &str = "items:changed";
pub const PREVIEW_CHANGED: &str = "preview:changed";
pub const AUCTION_CHANGED: &str = "auction:changed";
pub const FORM_ERRORS_CHANGED: &str = "formErrors:change";
pub const ORDER_READY: &str = "order:ready";
pub const ORDER_PLACED: &str = "order:placed";
pub const NETWORK_ERROR: &str = "network:error";
/// Matches `order.<field>:change` names emitted by the contact form.
pub const ORDER_FIELD_PATTERN: &str = r"^order\..+:change$";

pub type StoreBus = EventBus<AuctionEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOperation {
    LotList,
    LotDetail,
    OrderLots,
}

impl fmt::Display for NetworkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetworkOperation::LotList => "lot_list",
            NetworkOperation::LotDetail => "lot_detail",
            NetworkOperation::OrderLots => "order_lots",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuctionEvent {
    ItemsChanged,
    PreviewChanged(Option<LotItem>),
    AuctionChanged,
    FormErrors(FieldErrors),
    OrderField { field: OrderField, value: String },
    OrderReady(OrderRequest),
    OrderPlaced(OrderConfirmation),
    NetworkError {
        operation: NetworkOperation,
        message: String,
    },
}

impl AuctionEvent {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            AuctionEvent::ItemsChanged => Cow::Borrowed(ITEMS_CHANGED),
            AuctionEvent::PreviewChanged(_) => Cow::Borrowed(PREVIEW_CHANGED),
            AuctionEvent::AuctionChanged => Cow::Borrowed(AUCTION_CHANGED),
            AuctionEvent::FormErrors(_) => Cow::Borrowed(FORM_ERRORS_CHANGED),
            AuctionEvent::OrderField { field, .. } => Cow::Owned(order_field_event(*field)),
            AuctionEvent::OrderReady(_) => Cow::Borrowed(ORDER_READY),
            AuctionEvent::OrderPlaced(_) => Cow::Borrowed(ORDER_PLACED),
            AuctionEvent::NetworkError { .. } => Cow::Borrowed(NETWORK_ERROR),
        }
    }
}

pub fn order_field_event(field: OrderField) -> String {
    format!("order.{field}:change")
}

/// Emits `event` under its own name.
pub fn publish(bus: &StoreBus, event: AuctionEvent) -> DispatchReport {
    let name = event.name();
    bus.emit(&name, event)
}

/// Catch-all subscriber that traces every event.
pub fn install_event_logger(bus: &StoreBus) -> Subscription {
    bus.subscribe_all(|envelope| {
        debug!(event = envelope.name, payload = ?envelope.payload, "storefront event");
        Ok(())
    })
}
