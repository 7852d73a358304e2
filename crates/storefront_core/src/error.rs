use shared::domain::{Amount, LotId, LotStatus};
use thiserror::Error;

/// Rejected lot mutations. None of these change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("lot {0} is not in the catalog")]
    LotNotFound(LotId),
    #[error("lot {id} is {status}; bidding requires an active lot")]
    InvalidState { id: LotId, status: LotStatus },
    #[error("bid {amount} on lot {id} is below the next minimum bid {minimum}")]
    BidTooLow {
        id: LotId,
        amount: Amount,
        minimum: Amount,
    },
}
