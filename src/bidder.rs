/// Bidders and their bidding strategies
///
/// A bidder values an opportunity through an externally supplied valuation function
/// and turns that valuation into a bid through its own strategy. Strategies are pure:
/// any randomness lives outside of them.

use std::collections::HashMap;
use std::fmt;

use crate::adspot::AdSpot;
use crate::errors::AuctionError;
use crate::valuers::ValuationTrait;

/// Trait for bidding strategies mapping (bidder, opportunity, valuation) to a bid amount
pub trait BidStrategyTrait {
    fn bid(&self, bidder: &Bidder, spot: &AdSpot, valuation: f64) -> f64;

    /// Short description used in logs
    fn strategy_type(&self) -> String {
        "Custom".to_string()
    }
}

/// Any closure with the right shape is a strategy
impl<F> BidStrategyTrait for F
where
    F: Fn(&Bidder, &AdSpot, f64) -> f64,
{
    fn bid(&self, bidder: &Bidder, spot: &AdSpot, valuation: f64) -> f64 {
        self(bidder, spot, valuation)
    }
}

/// Bid equals valuation
pub struct BidStrategyTruthful;

impl BidStrategyTrait for BidStrategyTruthful {
    fn bid(&self, _bidder: &Bidder, _spot: &AdSpot, valuation: f64) -> f64 {
        valuation
    }

    fn strategy_type(&self) -> String {
        "Truthful".to_string()
    }
}

/// Bid is a fixed fraction (or multiple) of valuation
pub struct BidStrategyShaded {
    pub factor: f64,
}

impl BidStrategyTrait for BidStrategyShaded {
    fn bid(&self, _bidder: &Bidder, _spot: &AdSpot, valuation: f64) -> f64 {
        self.factor * valuation
    }

    fn strategy_type(&self) -> String {
        format!("Shaded x{:.2}", self.factor)
    }
}

/// A participant in the auctions
pub struct Bidder {
    pub name: String,
    /// Expected value per click for each context tag
    pub targeting: HashMap<String, f64>,
    pub bid_strategy: Box<dyn BidStrategyTrait>,
}

impl Bidder {
    /// Create a truthful bidder
    pub fn new(name: &str, targeting: &[(&str, f64)]) -> Self {
        Self::with_strategy(name, targeting, Box::new(BidStrategyTruthful))
    }

    pub fn with_strategy(name: &str, targeting: &[(&str, f64)], bid_strategy: Box<dyn BidStrategyTrait>) -> Self {
        Self {
            name: name.to_string(),
            targeting: targeting.iter().map(|(tag, value)| (tag.to_string(), *value)).collect(),
            bid_strategy,
        }
    }

    /// Value per click for a tag, 0 when the bidder does not target it
    pub fn target_value(&self, tag: &str) -> f64 {
        self.targeting.get(tag).copied().unwrap_or(0.0)
    }

    pub fn set_target(&mut self, tag: &str, value: f64) {
        self.targeting.insert(tag.to_string(), value);
    }

    /// Valuation of the opportunity given this bidder's effective per-slot rates
    pub fn valuation(&self, spot: &AdSpot, valuer: &dyn ValuationTrait, rates: &[f64]) -> f64 {
        valuer.valuation(self, spot, rates)
    }

    /// Submitted bid for the opportunity
    /// Fails when the strategy produces something that cannot be charged (NaN, infinite or negative).
    /// Prices are taken from bids, so the error fails the whole clearing, and with it any
    /// `Platform::assign` batch the opportunity belongs to.
    pub fn bid(&self, spot: &AdSpot, valuation: f64) -> Result<f64, AuctionError> {
        let bid = self.bid_strategy.bid(self, spot, valuation);
        if !bid.is_finite() || bid < 0.0 {
            return Err(AuctionError::InvalidBid {
                bidder: self.name.clone(),
                bid,
            });
        }
        Ok(bid)
    }
}

impl fmt::Debug for Bidder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bidder({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuers::ValuationExpectedClicks;

    #[test]
    fn test_truthful_bid_equals_valuation() {
        let bidder = Bidder::new("A", &[("sports", 1.0)]);
        let spot = AdSpot::new(1, &["sports"], None).unwrap();
        assert_eq!(bidder.name, "A");
        assert_eq!(bidder.target_value("sports"), 1.0);

        let valuation = bidder.valuation(&spot, &ValuationExpectedClicks, &spot.slot_weights);
        assert_eq!(valuation, 1.0);
        assert_eq!(bidder.bid(&spot, valuation), Ok(1.0));
        assert_eq!(bidder.bid_strategy.strategy_type(), "Truthful");
    }

    #[test]
    fn test_closure_strategy() {
        let bidder = Bidder::with_strategy(
            "B",
            &[("sports", 1.0)],
            Box::new(|_: &Bidder, _: &AdSpot, valuation: f64| valuation * 2.0),
        );
        let spot = AdSpot::new(1, &["sports"], None).unwrap();
        assert_eq!(bidder.bid(&spot, 1.0), Ok(2.0));
        assert_eq!(format!("{:?}", bidder), "Bidder(B)");
    }

    #[test]
    fn test_shaded_strategy() {
        let bidder = Bidder::with_strategy("C", &[], Box::new(BidStrategyShaded { factor: 0.5 }));
        let spot = AdSpot::new(1, &["x"], None).unwrap();
        assert_eq!(bidder.bid(&spot, 4.0), Ok(2.0));
    }

    #[test]
    fn test_invalid_bids_are_rejected() {
        let spot = AdSpot::new(1, &["x"], None).unwrap();
        let nan = Bidder::with_strategy("N", &[], Box::new(|_: &Bidder, _: &AdSpot, _: f64| f64::NAN));
        assert!(matches!(nan.bid(&spot, 1.0), Err(AuctionError::InvalidBid { .. })));

        let negative = Bidder::with_strategy("M", &[], Box::new(|_: &Bidder, _: &AdSpot, v: f64| -v));
        assert!(matches!(negative.bid(&spot, 1.0), Err(AuctionError::InvalidBid { .. })));
    }

    #[test]
    fn test_set_target_mutates_targeting() {
        let mut bidder = Bidder::new("A", &[("a", 1.0)]);
        bidder.set_target("a", 3.0);
        bidder.set_target("b", 0.5);
        assert_eq!(bidder.target_value("a"), 3.0);
        assert_eq!(bidder.target_value("b"), 0.5);
        assert_eq!(bidder.target_value("missing"), 0.0);
    }
}
