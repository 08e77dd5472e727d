/// Valuation functions
/// A valuer decides how much an opportunity is worth to a bidder, given the bidder's
/// effective per-slot rates (quality score times slot weight).

use crate::adspot::AdSpot;
use crate::bidder::Bidder;

pub trait ValuationTrait {
    fn valuation(&self, bidder: &Bidder, spot: &AdSpot, rates: &[f64]) -> f64;

    fn valuer_type(&self) -> String {
        "Custom".to_string()
    }
}

impl<F> ValuationTrait for F
where
    F: Fn(&Bidder, &AdSpot, &[f64]) -> f64,
{
    fn valuation(&self, bidder: &Bidder, spot: &AdSpot, rates: &[f64]) -> f64 {
        self(bidder, spot, rates)
    }
}

/// Sum of the bidder's targeting values over the spot's tags, rates are ignored
pub struct ValuationTargetingSum;

impl ValuationTrait for ValuationTargetingSum {
    fn valuation(&self, bidder: &Bidder, spot: &AdSpot, _rates: &[f64]) -> f64 {
        spot.tags.iter().map(|tag| bidder.target_value(tag)).sum()
    }

    fn valuer_type(&self) -> String {
        "Targeting sum".to_string()
    }
}

/// Value per click over all of the spot's tags, times the best effective click rate
/// A bidder wins at most one slot, so only the best rate counts; no rates means no value
pub struct ValuationExpectedClicks;

impl ValuationTrait for ValuationExpectedClicks {
    fn valuation(&self, bidder: &Bidder, spot: &AdSpot, rates: &[f64]) -> f64 {
        let value_per_click = ValuationTargetingSum.valuation(bidder, spot, rates);
        let best_rate = rates.iter().copied().fold(0.0, f64::max);
        value_per_click * best_rate
    }

    fn valuer_type(&self) -> String {
        "Expected clicks".to_string()
    }
}
