/// Ad opportunities and the auction clearing engine
///
/// An AdSpot is one or more simultaneously auctioned slots sharing context tags. Clearing
/// ranks every eligible bidder by expected value (bid times quality score), hands out the
/// slots in rank order and prices them under one of three rules:
///
/// - first_price: every winner pays its own bid
/// - second_price: the winner of slot i pays the bid of ranked[i + 1], or 0 at the end of the ranking
/// - gsp: same allocation and the same next-bidder-down price as second_price
///
/// The second_price and gsp rules charge the bid of the next bidder in the overall ranking,
/// not a per-slot externality price. Downstream experiments depend on that exact rule.
///
/// Ties in expected value are broken by one uniform draw per eligible bidder from the rng
/// passed in. Tie outcomes are reproducible only when the rng is seeded identically and
/// the bidder list is in the same order.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use rand::{rngs::StdRng, Rng};

use crate::bidder::Bidder;
use crate::errors::AuctionError;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::utils::{TOTAL_AUCTION_RUNS, VERBOSE_AUCTION};
use crate::valuers::ValuationTrait;

/// Pricing rule used to clear an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuctionMethod {
    FirstPrice,
    SecondPrice,
    Gsp,
}

impl AuctionMethod {
    pub const ALL: [AuctionMethod; 3] = [AuctionMethod::FirstPrice, AuctionMethod::SecondPrice, AuctionMethod::Gsp];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionMethod::FirstPrice => "first_price",
            AuctionMethod::SecondPrice => "second_price",
            AuctionMethod::Gsp => "gsp",
        }
    }
}

impl fmt::Display for AuctionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive
impl FromStr for AuctionMethod {
    type Err = AuctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = s.to_lowercase();
        match method.as_str() {
            "first_price" => Ok(AuctionMethod::FirstPrice),
            "second_price" => Ok(AuctionMethod::SecondPrice),
            "gsp" => Ok(AuctionMethod::Gsp),
            _ => Err(AuctionError::UnknownMethod(method)),
        }
    }
}

/// Outcome of clearing one opportunity
/// `winners[i]` and `prices[i]` describe slot i; unfilled slots have no winner and price 0
#[derive(Debug, Clone)]
pub struct AuctionResult<'a> {
    pub winners: Vec<Option<&'a Bidder>>,
    pub prices: Vec<f64>,
    /// Quality scores the auction was cleared with, one per bidder in the input order
    pub quality_scores: Vec<f64>,
}

impl<'a> AuctionResult<'a> {
    fn empty(slot_count: usize, quality_scores: Vec<f64>) -> Self {
        Self {
            winners: vec![None; slot_count],
            prices: vec![0.0; slot_count],
            quality_scores,
        }
    }

    pub fn winner_names(&self) -> Vec<Option<&'a str>> {
        self.winners.iter()
            .map(|winner| winner.map(|bidder| bidder.name.as_str()))
            .collect()
    }

    pub fn revenue(&self) -> f64 {
        self.prices.iter().sum()
    }

    pub fn filled_slots(&self) -> usize {
        self.winners.iter().filter(|winner| winner.is_some()).count()
    }
}

/// Winners compare by identity, not by name
impl PartialEq for AuctionResult<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.winners.len() == other.winners.len()
            && self.winners.iter().zip(other.winners.iter()).all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => std::ptr::eq(*a, *b),
                (None, None) => true,
                _ => false,
            })
            && self.prices == other.prices
            && self.quality_scores == other.quality_scores
    }
}

/// An eligible bidder on its way through ranking
struct RankedBid<'a> {
    bidder: &'a Bidder,
    bid: f64,
    expected_value: f64,
    tie_break: f64,
}

/// An opportunity: slots sharing context tags, each with an exposure weight
#[derive(Debug, Clone, PartialEq)]
pub struct AdSpot {
    pub slot_count: usize,
    pub tags: Vec<String>,
    /// Exposure or click probability per slot position, each in [0, 1]
    pub slot_weights: Vec<f64>,
}

impl AdSpot {
    /// Slot weights default to 1.0 for every slot
    pub fn new(slot_count: usize, tags: &[&str], slot_weights: Option<Vec<f64>>) -> Result<Self, AuctionError> {
        let slot_weights = slot_weights.unwrap_or_else(|| vec![1.0; slot_count]);
        let spot = Self {
            slot_count,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            slot_weights,
        };
        spot.validate()?;
        Ok(spot)
    }

    fn validate(&self) -> Result<(), AuctionError> {
        if self.slot_count == 0 {
            return Err(AuctionError::NonPositiveSlotCount);
        }
        if self.slot_weights.len() != self.slot_count {
            return Err(AuctionError::SlotWeightsLength {
                expected: self.slot_count,
                got: self.slot_weights.len(),
            });
        }
        // Written so that NaN is rejected too
        if let Some((index, &weight)) = self.slot_weights.iter().enumerate().find(|(_, w)| !(0.0..=1.0).contains(*w)) {
            return Err(AuctionError::SlotWeightOutOfRange { index, weight });
        }
        Ok(())
    }

    /// Clear this opportunity among `bidders`
    ///
    /// `quality_scores` defaults to 1.0 per bidder. A bidder is eligible only when its
    /// valuation is strictly positive; ineligible bidders take no part in ranking or pricing.
    /// The only side effect is consuming `rng` for tie breaking.
    pub fn clear<'a>(
        &self,
        bidders: &'a [Bidder],
        method: AuctionMethod,
        valuer: Option<&dyn ValuationTrait>,
        quality_scores: Option<&[f64]>,
        rng: &mut StdRng,
        logger: &mut Logger,
    ) -> Result<AuctionResult<'a>, AuctionError> {
        let valuer = valuer.ok_or(AuctionError::MissingValuation)?;
        self.validate()?;

        let quality_scores = match quality_scores {
            Some(scores) if scores.len() != bidders.len() => {
                return Err(AuctionError::QualityScoreLength {
                    expected: bidders.len(),
                    got: scores.len(),
                });
            }
            Some(scores) => scores.to_vec(),
            None => vec![1.0; bidders.len()],
        };
        for (bidder, &score) in bidders.iter().zip(quality_scores.iter()) {
            if !score.is_finite() || score < 0.0 {
                return Err(AuctionError::InvalidQualityScore {
                    bidder: bidder.name.clone(),
                    score,
                });
            }
        }

        TOTAL_AUCTION_RUNS.fetch_add(1, Ordering::Relaxed);
        let verbose = VERBOSE_AUCTION.load(Ordering::Relaxed);
        let mut valuations = Vec::with_capacity(if verbose { bidders.len() } else { 0 });

        // Eligibility
        let mut eligible: Vec<RankedBid<'a>> = Vec::with_capacity(bidders.len());
        for (bidder, &quality) in bidders.iter().zip(quality_scores.iter()) {
            let rates: Vec<f64> = self.slot_weights.iter().map(|weight| quality * weight).collect();
            let valuation = bidder.valuation(self, valuer, &rates);
            if verbose {
                valuations.push(valuation);
            }
            // Also rejects NaN valuations
            if valuation > 0.0 {
                let bid = bidder.bid(self, valuation)?;
                eligible.push(RankedBid {
                    bidder,
                    bid,
                    expected_value: bid * quality,
                    tie_break: 0.0,
                });
            }
        }

        if eligible.is_empty() {
            let result = AuctionResult::empty(self.slot_count, quality_scores);
            if verbose {
                self.log_auction(method, bidders, &valuations, &result, logger);
            }
            return Ok(result);
        }

        // Ranking by expected value, ties go to the larger random draw
        for entry in eligible.iter_mut() {
            entry.tie_break = rng.gen::<f64>();
        }
        eligible.sort_by(|a, b| {
            b.expected_value.partial_cmp(&a.expected_value)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| b.tie_break.total_cmp(&a.tie_break))
        });

        // Allocation and pricing
        let mut result = AuctionResult::empty(self.slot_count, quality_scores);
        for (slot, entry) in eligible.iter().take(self.slot_count).enumerate() {
            result.winners[slot] = Some(entry.bidder);
            result.prices[slot] = Self::slot_price(method, &eligible, slot);
        }

        if verbose {
            self.log_auction(method, bidders, &valuations, &result, logger);
        }
        Ok(result)
    }

    /// Price charged to the winner of `slot`, given the full eligible ranking
    fn slot_price(method: AuctionMethod, ranked: &[RankedBid<'_>], slot: usize) -> f64 {
        match method {
            AuctionMethod::FirstPrice => ranked[slot].bid,
            AuctionMethod::SecondPrice | AuctionMethod::Gsp => {
                ranked.get(slot + 1).map(|next| next.bid).unwrap_or(0.0)
            }
        }
    }

    /// CSV line: method, slot count, tags, valuation per bidder, then winner and price per slot
    fn log_auction(&self, method: AuctionMethod, bidders: &[Bidder], valuations: &[f64], result: &AuctionResult<'_>, logger: &mut Logger) {
        let mut csv_fields = Vec::new();
        csv_fields.push(method.to_string());
        csv_fields.push(format!("{}", self.slot_count));
        csv_fields.push(self.tags.join("|"));
        for (bidder, valuation) in bidders.iter().zip(valuations.iter()) {
            csv_fields.push(format!("{}={:.4}", bidder.name, valuation));
        }
        for (winner, price) in result.winners.iter().zip(result.prices.iter()) {
            let demand_id = match winner {
                Some(bidder) => bidder.name.clone(),
                None => "NO_DEMAND".to_string(),
            };
            csv_fields.push(demand_id);
            csv_fields.push(format!("{:.4}", price));
        }
        logln!(logger, LogEvent::Auction, "{}", csv_fields.join(","));
    }
}
