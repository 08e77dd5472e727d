use thiserror::Error;

/// Errors raised while configuring or clearing auctions
/// Every variant is an invalid-argument condition detected at call time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    #[error("valuation function must be provided")]
    MissingValuation,

    #[error("unknown auction method: {0}")]
    UnknownMethod(String),

    #[error("quality scores length {got} does not match number of bidders {expected}")]
    QualityScoreLength { expected: usize, got: usize },

    #[error("quality score for bidder {bidder} must be finite and non-negative, got {score}")]
    InvalidQualityScore { bidder: String, score: f64 },

    #[error("slot count must be positive")]
    NonPositiveSlotCount,

    #[error("slot weights length {got} must equal slot count {expected}")]
    SlotWeightsLength { expected: usize, got: usize },

    #[error("slot weight {weight} at position {index} must be between 0 and 1")]
    SlotWeightOutOfRange { index: usize, weight: f64 },

    #[error("bid from {bidder} must be a finite non-negative number, got {bid}")]
    InvalidBid { bidder: String, bid: f64 },

    #[error("experiment needs at least one group")]
    NoGroups,
}
