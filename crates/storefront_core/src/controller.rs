//! Call sites for the network collaborator and the contact-form wiring.
//!
//! Network results are applied to [`AppState`] only when the request
//! succeeds; failures are logged and re-published as `network:error`.

use std::{
    rc::{Rc, Weak},
    sync::Arc,
};

use anyhow::anyhow;
use event_bus::{Matcher, Subscription};
use shared::{domain::LotId, protocol::OrderConfirmation};
use tracing::{error, info, warn};

use crate::{
    api::AuctionApi,
    app_state::AppState,
    events::{AuctionEvent, NetworkOperation, StoreBus, ORDER_FIELD_PATTERN},
};

pub struct StorefrontController {
    api: Arc<dyn AuctionApi>,
    state: Rc<AppState>,
}

impl StorefrontController {
    pub fn new(api: Arc<dyn AuctionApi>, state: Rc<AppState>) -> Self {
        Self { api, state }
    }

    pub fn state(&self) -> &Rc<AppState> {
        &self.state
    }

    /// Replaces the catalog with the server's lot list.
    pub async fn load_catalog(&self) -> bool {
        match self.api.get_lot_list().await {
            Ok(lots) => {
                self.state.set_catalog(lots);
                true
            }
            Err(err) => {
                self.network_failure(NetworkOperation::LotList, err);
                false
            }
        }
    }

    /// Fetches lot detail and opens the preview. Returns `false` when the
    /// request failed or a newer preview superseded this one.
    pub async fn open_preview(&self, id: LotId) -> bool {
        let ticket = self.state.begin_preview(id);
        match self.api.get_lot_item(&ticket.id).await {
            Ok(detail) => self.state.attach_lot_detail(&ticket, detail),
            Err(err) => {
                self.network_failure(NetworkOperation::LotDetail, err);
                false
            }
        }
    }

    pub fn close_preview(&self) {
        self.state.set_preview(None);
    }

    /// Submits the basket. Nothing is sent while the contact form is invalid
    /// or the basket is empty.
    pub async fn submit_order(&self) -> Option<OrderConfirmation> {
        if !self.state.validate_order() {
            warn!(errors = ?self.state.field_errors(), "order form is invalid");
            return None;
        }
        let order = self.state.order();
        if order.items.is_empty() {
            warn!("refusing to submit an empty basket");
            return None;
        }

        match self.api.order_lots(&order).await {
            Ok(confirmation) => {
                info!(order = %confirmation.id, lots = order.items.len(), "order submitted");
                self.state.order_placed(confirmation.clone());
                Some(confirmation)
            }
            Err(err) => {
                self.network_failure(NetworkOperation::OrderLots, err);
                None
            }
        }
    }

    fn network_failure(&self, operation: NetworkOperation, err: anyhow::Error) {
        error!(%operation, "request failed: {err:#}");
        self.state
            .report_network_error(operation, format!("{err:#}"));
    }
}

/// Routes `order.<field>:change` events from the contact form into the state.
pub fn wire_order_form(bus: &StoreBus, state: &Rc<AppState>) -> Result<Subscription, regex::Error> {
    let state: Weak<AppState> = Rc::downgrade(state);
    let matcher = Matcher::pattern(ORDER_FIELD_PATTERN)?;
    Ok(bus.subscribe(matcher, move |event| {
        let AuctionEvent::OrderField { field, value } = event else {
            return Err(anyhow!("order field event carried {event:?}"));
        };
        if let Some(state) = state.upgrade() {
            state.set_order_field(*field, value.clone());
        }
        Ok(())
    }))
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
