//! A single auction lot and everything derived from its own fields.

use chrono::{DateTime, Duration, Utc};
use shared::{
    domain::{Amount, Bid, LotId, LotStatus},
    protocol::{LotDetail, LotSummary},
};

use crate::error::AuctionError;

const DATE_FORMAT: &str = "%-d %B %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotItem {
    pub id: LotId,
    pub title: String,
    pub about: String,
    pub image: String,
    pub description: String,
    pub min_bid_increment: Amount,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    history: Vec<Bid>,
    price: Amount,
    status: LotStatus,
    is_my_bid: bool,
    selected_for_order: bool,
}

impl LotItem {
    pub fn from_summary(summary: LotSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            about: summary.about,
            image: summary.image,
            description: summary.description.unwrap_or_default(),
            min_bid_increment: summary.min_bid_increment,
            starts_at: summary.starts_at,
            ends_at: summary.ends_at,
            history: summary.history.unwrap_or_default(),
            price: summary.price,
            status: summary.status,
            is_my_bid: false,
            selected_for_order: false,
        }
    }

    pub fn history(&self) -> &[Bid] {
        &self.history
    }

    pub fn price(&self) -> Amount {
        self.price
    }

    /// Last status recorded on the lot, without consulting the clock.
    pub fn status(&self) -> LotStatus {
        self.status
    }

    pub fn is_my_bid(&self) -> bool {
        self.is_my_bid
    }

    pub fn selected_for_order(&self) -> bool {
        self.selected_for_order
    }

    pub(crate) fn set_selected_for_order(&mut self, selected: bool) {
        self.selected_for_order = selected;
    }

    /// Status at `now`. Never earlier than the recorded status.
    pub fn status_at(&self, now: DateTime<Utc>) -> LotStatus {
        let by_time = if now >= self.ends_at {
            LotStatus::Closed
        } else if now >= self.starts_at {
            LotStatus::Active
        } else {
            LotStatus::Pending
        };
        self.status.max(by_time)
    }

    /// Records the status at `now`. Returns whether it moved.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        let next = self.status_at(now);
        if next == self.status {
            return false;
        }
        self.status = next;
        true
    }

    pub fn next_bid(&self, now: DateTime<Utc>) -> Result<Amount, AuctionError> {
        match self.status_at(now) {
            LotStatus::Active => Ok(self
                .price
                .saturating_add(self.min_bid_increment)
                .max(self.min_bid_increment)),
            status => Err(AuctionError::InvalidState {
                id: self.id.clone(),
                status,
            }),
        }
    }

    pub fn place_bid(
        &mut self,
        bidder_tag: &str,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), AuctionError> {
        let minimum = self.next_bid(now)?;
        if amount < minimum {
            return Err(AuctionError::BidTooLow {
                id: self.id.clone(),
                amount,
                minimum,
            });
        }

        self.status = LotStatus::Active;
        self.history.push(Bid {
            bidder_tag: bidder_tag.to_string(),
            amount,
            timestamp: now,
        });
        self.price = amount;
        self.is_my_bid = true;
        Ok(())
    }

    /// Merges a detail fetch into the lot. Only bids newer than the local
    /// tail are appended, so local history is never rewritten. The lot stays
    /// ours only while the highest bid carries `bidder_tag`.
    pub fn apply_detail(&mut self, detail: LotDetail, bidder_tag: &str) {
        self.description = detail.description;
        let tail = self.history.last().map(|bid| bid.timestamp);
        self.history.extend(
            detail
                .history
                .into_iter()
                .filter(|bid| tail.map_or(true, |tail| bid.timestamp > tail)),
        );
        // Later bids win ties.
        if let Some(highest) = self.history.iter().max_by_key(|bid| bid.amount) {
            self.price = self.price.max(highest.amount);
            self.is_my_bid = highest.bidder_tag == bidder_tag;
        }
    }

    /// Countdown line shown next to the bid form.
    pub fn time_status(&self, now: DateTime<Utc>) -> String {
        match self.status_at(now) {
            LotStatus::Pending => format!("Opens in {}", format_remaining(self.starts_at - now)),
            LotStatus::Active => format!("Closes in {}", format_remaining(self.ends_at - now)),
            LotStatus::Closed => format!("Closed {}", self.ends_at.format(DATE_FORMAT)),
        }
    }

    pub fn auction_status(&self, now: DateTime<Utc>) -> String {
        match self.status_at(now) {
            LotStatus::Pending => "Bidding has not started".to_string(),
            LotStatus::Active if self.is_my_bid => format!("Your bid: {}", self.price),
            LotStatus::Active => "Bidding open".to_string(),
            LotStatus::Closed if self.history.is_empty() => "Closed without bids".to_string(),
            LotStatus::Closed if self.is_my_bid => format!("Won for {}", self.price),
            LotStatus::Closed => format!("Sold for {}", self.price),
        }
    }

    /// Catalog card label.
    pub fn status_label(&self, now: DateTime<Utc>) -> String {
        match self.status_at(now) {
            LotStatus::Pending => format!("Opens {}", self.starts_at.format(DATE_FORMAT)),
            LotStatus::Active => format!("Open until {}", self.ends_at.format(DATE_FORMAT)),
            LotStatus::Closed => format!("Closed {}", self.ends_at.format(DATE_FORMAT)),
        }
    }
}

fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    let (days, hours, minutes) = (minutes / (24 * 60), (minutes / 60) % 24, minutes % 60);
    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
#[path = "tests/lot_tests.rs"]
mod tests;
