//! Sealed-bid ad auction simulator
//!
//! Clears multi-slot ad opportunities under first price, second price and generalized
//! second price rules, and measures how the resulting allocations split across user groups.

pub mod logger;
pub mod utils;
pub mod errors;
pub mod bidder;
pub mod valuers;
pub mod quality;
pub mod adspot;
pub mod platform;
pub mod records;
pub mod fairness;
pub mod experiment;
pub mod charts;
pub mod scenarios;

pub use adspot::{AdSpot, AuctionMethod, AuctionResult};
pub use bidder::{BidStrategyShaded, BidStrategyTrait, BidStrategyTruthful, Bidder};
pub use errors::AuctionError;
pub use platform::{BidderHandle, Platform};
pub use quality::{QualityGroupRule, QualityModelTrait, QualityRandomUniform, QualityUniform};
pub use valuers::{ValuationExpectedClicks, ValuationTargetingSum, ValuationTrait};
