/// Per-impression records handed from the simulation driver to the metrics layer
/// One record per slot of every cleared opportunity.

use crate::adspot::{AdSpot, AuctionResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ImpressionRecord {
    pub group: String,
    /// None when the slot went unfilled
    pub winner: Option<String>,
    pub price: f64,
    pub quality_scores: Vec<f64>,
    pub slot_weight: f64,
}

impl ImpressionRecord {
    pub fn from_result(group: &str, spot: &AdSpot, result: &AuctionResult<'_>) -> Vec<ImpressionRecord> {
        result.winners.iter()
            .zip(result.prices.iter())
            .zip(spot.slot_weights.iter())
            .map(|((winner, &price), &slot_weight)| ImpressionRecord {
                group: group.to_string(),
                winner: winner.map(|bidder| bidder.name.clone()),
                price,
                quality_scores: result.quality_scores.clone(),
                slot_weight,
            })
            .collect()
    }
}

/// Append-only collection of impression records
#[derive(Debug, Clone, Default)]
pub struct ImpressionLog {
    pub records: Vec<ImpressionRecord>,
}

impl ImpressionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, group: &str, spot: &AdSpot, result: &AuctionResult<'_>) {
        self.records.extend(ImpressionRecord::from_result(group, spot, result));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
