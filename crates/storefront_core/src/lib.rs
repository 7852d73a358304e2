//! Auction storefront core: lot catalog, bidding, basket and checkout state.
//!
//! [`AppState`] owns the catalog and the order being assembled and publishes
//! every change on a [`StoreBus`]. [`StorefrontController`] drives the
//! network side through an [`AuctionApi`] and feeds the results back into the
//! state. Everything here runs on one thread; handlers observe state through
//! shared `Rc` handles.

pub mod api;
pub mod app_state;
pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod lot;
pub mod order;

pub use api::{AuctionApi, HttpAuctionApi};
pub use app_state::{AppState, PreviewTicket, StoreOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{wire_order_form, StorefrontController};
pub use error::AuctionError;
pub use events::{install_event_logger, AuctionEvent, NetworkOperation, StoreBus};
pub use lot::LotItem;
pub use order::{ContactForm, FieldErrors, OrderAssembler, SelectionPolicy};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
