use chrono::{DateTime, Duration, Utc};
use shared::{
    domain::{Amount, LotId, LotStatus},
    protocol::LotSummary,
};

use crate::lot::LotItem;

pub(crate) fn t0() -> DateTime<Utc> {
    "2024-01-01T12:00:00Z".parse().expect("timestamp")
}

pub(crate) fn summary(id: &str, status: LotStatus, price: Amount, increment: Amount) -> LotSummary {
    let (starts_at, ends_at) = match status {
        LotStatus::Pending => (t0() + Duration::hours(1), t0() + Duration::hours(2)),
        LotStatus::Active => (t0() - Duration::hours(1), t0() + Duration::hours(1)),
        LotStatus::Closed => (t0() - Duration::hours(2), t0() - Duration::hours(1)),
    };
    LotSummary {
        id: LotId::from(id),
        title: format!("Lot {id}"),
        about: String::new(),
        image: format!("/{id}.png"),
        status,
        starts_at,
        ends_at,
        price,
        min_bid_increment: increment,
        description: None,
        history: None,
    }
}

pub(crate) fn lot(id: &str, status: LotStatus, price: Amount, increment: Amount) -> LotItem {
    LotItem::from_summary(summary(id, status, price, increment))
}

/// Active lot that closes after `open_for`, with the user's bid already placed.
pub(crate) fn won_lot(id: &str, price: Amount, open_for: Duration) -> LotItem {
    let mut summary = summary(id, LotStatus::Active, 0, 1);
    summary.ends_at = t0() + open_for;
    let mut lot = LotItem::from_summary(summary);
    lot.place_bid("me", price, t0()).expect("bid on active lot");
    lot
}
