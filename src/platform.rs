use std::fmt;
use rand::rngs::StdRng;

use crate::adspot::{AdSpot, AuctionMethod, AuctionResult};
use crate::bidder::Bidder;
use crate::errors::AuctionError;
use crate::logger::{LogEvent, Logger};
use crate::quality::{QualityModelTrait, QualityUniform};
use crate::valuers::ValuationTrait;
use crate::{logln, warnln};

/// Stable handle to a registered bidder, returned by `Platform::register`
/// Handles are never reused, so a stale handle can not remove somebody else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BidderHandle(u64);

/// Registry of bidders that runs one auction per opportunity
///
/// Bidders are kept in registration order; names are not required to be unique.
/// `bidders` and `handles` are parallel vectors.
pub struct Platform {
    bidders: Vec<Bidder>,
    handles: Vec<BidderHandle>,
    next_handle: u64,
}

impl Platform {
    pub fn new() -> Self {
        Self {
            bidders: Vec::new(),
            handles: Vec::new(),
            next_handle: 0,
        }
    }

    /// Create a platform with the given bidders already registered
    pub fn with_bidders(bidders: Vec<Bidder>) -> Self {
        let mut platform = Self::new();
        for bidder in bidders {
            platform.push(bidder);
        }
        platform
    }

    fn push(&mut self, bidder: Bidder) -> BidderHandle {
        let handle = BidderHandle(self.next_handle);
        self.next_handle += 1;
        self.bidders.push(bidder);
        self.handles.push(handle);
        handle
    }

    /// Append a bidder, no uniqueness check
    pub fn register(&mut self, bidder: Bidder, logger: &mut Logger) -> BidderHandle {
        logln!(logger, LogEvent::Platform, "Registered bidder {}", bidder.name);
        self.push(bidder)
    }

    /// Remove a bidder and give it back
    /// Removing a bidder that is not registered is a no-op and only logs a warning
    pub fn unregister(&mut self, handle: BidderHandle, logger: &mut Logger) -> Option<Bidder> {
        match self.handles.iter().position(|h| *h == handle) {
            Some(index) => {
                self.handles.remove(index);
                let bidder = self.bidders.remove(index);
                logln!(logger, LogEvent::Platform, "Unregistered bidder {}", bidder.name);
                Some(bidder)
            }
            None => {
                warnln!(logger, LogEvent::Platform, "Bidder {:?} not found on platform", handle);
                None
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.bidders.clear();
        self.handles.clear();
    }

    /// Names in registration order
    pub fn list_names(&self) -> Vec<&str> {
        self.bidders.iter().map(|bidder| bidder.name.as_str()).collect()
    }

    /// First bidder registered under `name`
    pub fn find(&self, name: &str) -> Option<&Bidder> {
        self.bidders.iter().find(|bidder| bidder.name == name)
    }

    /// Mutable access for adjusting a bidder's targeting between batches
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Bidder> {
        self.bidders.iter_mut().find(|bidder| bidder.name == name)
    }

    pub fn handle_of(&self, name: &str) -> Option<BidderHandle> {
        self.bidders.iter()
            .position(|bidder| bidder.name == name)
            .map(|index| self.handles[index])
    }

    pub fn bidders(&self) -> &[Bidder] {
        &self.bidders
    }

    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }

    /// Run one independent auction per opportunity, results in input order
    ///
    /// Quality scores for each opportunity come from `quality` (1.0 per bidder when omitted).
    /// The registry is only read during the batch. The first failing opportunity fails the
    /// whole batch, including an invalid bid from a single bidder's strategy.
    pub fn assign(
        &self,
        spots: &[AdSpot],
        method: AuctionMethod,
        valuer: Option<&dyn ValuationTrait>,
        quality: Option<&dyn QualityModelTrait>,
        rng: &mut StdRng,
        logger: &mut Logger,
    ) -> Result<Vec<AuctionResult<'_>>, AuctionError> {
        let valuer = valuer.ok_or(AuctionError::MissingValuation)?;
        let default_quality = QualityUniform::default();
        let quality: &dyn QualityModelTrait = match quality {
            Some(model) => model,
            None => &default_quality,
        };

        let mut results = Vec::with_capacity(spots.len());
        for spot in spots {
            let quality_scores = quality.quality_scores(spot, &self.bidders, rng);
            let result = spot.clear(&self.bidders, method, Some(valuer), Some(quality_scores.as_slice()), rng, logger)?;
            results.push(result);
        }
        Ok(results)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Platform({} bidders)", self.bidders.len())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Platform with {} bidders: [{}]", self.bidders.len(), self.list_names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use crate::logger::MemoryReceiver;
    use crate::quality::QualityGroupRule;
    use crate::valuers::{ValuationExpectedClicks, ValuationTargetingSum};

    #[test]
    fn test_assign_runs_one_auction_per_spot() {
        let spots = vec![
            AdSpot::new(1, &["a"], None).unwrap(),
            AdSpot::new(2, &["b"], Some(vec![1.0, 0.5])).unwrap(),
        ];
        let platform = Platform::with_bidders(vec![
            Bidder::new("B1", &[("a", 2.0), ("b", 1.0)]),
            Bidder::new("B2", &[("b", 2.0)]),
        ]);
        let mut rng = StdRng::seed_from_u64(0);
        let mut logger = Logger::new();
        let results = platform.assign(&spots, AuctionMethod::FirstPrice, Some(&ValuationExpectedClicks), None, &mut rng, &mut logger).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].winner_names(), vec![Some("B1")]);
        assert_eq!(results[0].prices, vec![2.0]);
        assert_eq!(results[1].winner_names(), vec![Some("B2"), Some("B1")]);
        assert_eq!(results[1].prices, vec![2.0, 1.0]);
    }

    #[test]
    fn test_assign_requires_valuation() {
        let platform = Platform::with_bidders(vec![Bidder::new("A", &[("a", 1.0)])]);
        let spots = vec![AdSpot::new(1, &["a"], None).unwrap()];
        let mut rng = StdRng::seed_from_u64(0);
        let mut logger = Logger::new();
        let result = platform.assign(&spots, AuctionMethod::SecondPrice, None, None, &mut rng, &mut logger);
        assert_eq!(result, Err(AuctionError::MissingValuation));
    }

    #[test]
    fn test_assign_uses_quality_model() {
        let platform = Platform::with_bidders(vec![
            Bidder::new("Makeup", &[("female", 10.0), ("male", 2.0)]),
            Bidder::new("STEM", &[("female", 5.0), ("male", 1.0)]),
        ]);
        let spots = vec![AdSpot::new(1, &["male"], None).unwrap()];
        let mut rng = StdRng::seed_from_u64(0);
        let mut logger = Logger::new();
        let rule = QualityGroupRule::reference();
        let results = platform.assign(&spots, AuctionMethod::SecondPrice, Some(&ValuationTargetingSum), Some(&rule), &mut rng, &mut logger).unwrap();
        // Makeup scores 2.0 * 0.1, STEM 1.0 * 1.0
        assert_eq!(results[0].winner_names(), vec![Some("STEM")]);
        assert_eq!(results[0].prices, vec![2.0]);
        assert_eq!(results[0].quality_scores, vec![0.1, 1.0]);
    }

    /// Always scores a single bidder, whatever the registry holds
    struct QualitySingleScore;

    impl QualityModelTrait for QualitySingleScore {
        fn quality_scores(&self, _spot: &AdSpot, _bidders: &[Bidder], _rng: &mut StdRng) -> Vec<f64> {
            vec![1.0]
        }

        fn model_type(&self) -> String {
            "Single score".to_string()
        }
    }

    #[test]
    fn test_assign_rejects_quality_model_with_wrong_length() {
        let mut logger = Logger::new();
        let mut platform = Platform::new();
        platform.register(Bidder::new("A", &[("a", 1.0)]), &mut logger);
        platform.register(Bidder::new("B", &[("a", 2.0)]), &mut logger);
        let spots = vec![AdSpot::new(1, &["a"], None).unwrap()];
        let mut rng = StdRng::seed_from_u64(0);
        let result = platform.assign(&spots, AuctionMethod::SecondPrice, Some(&ValuationTargetingSum), Some(&QualitySingleScore), &mut rng, &mut logger);
        assert_eq!(result, Err(AuctionError::QualityScoreLength { expected: 2, got: 1 }));
    }

    #[test]
    fn test_one_invalid_bid_fails_the_whole_batch() {
        let platform = Platform::with_bidders(vec![
            Bidder::new("Honest", &[("a", 2.0)]),
            Bidder::with_strategy("Shader", &[("a", 0.5)], Box::new(|_: &Bidder, _: &AdSpot, v: f64| v - 1.0)),
        ]);
        let spots = vec![
            AdSpot::new(1, &["b"], None).unwrap(),
            AdSpot::new(1, &["a"], None).unwrap(),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let mut logger = Logger::new();
        let result = platform.assign(&spots, AuctionMethod::FirstPrice, Some(&ValuationTargetingSum), None, &mut rng, &mut logger);
        assert_eq!(result, Err(AuctionError::InvalidBid { bidder: "Shader".to_string(), bid: -0.5 }));
    }

    #[test]
    fn test_register_unregister_clear_list_find() {
        let mut logger = Logger::new();
        let mut platform = Platform::with_bidders(vec![Bidder::new("B1", &[("a", 1.0)])]);
        assert_eq!(platform.list_names(), vec!["B1"]);

        let b2 = platform.register(Bidder::new("B2", &[("a", 2.0)]), &mut logger);
        assert_eq!(platform.list_names(), vec!["B1", "B2"]);
        assert_eq!(platform.find("B2").map(|b| b.target_value("a")), Some(2.0));
        assert!(platform.find("nope").is_none());

        let b1 = platform.handle_of("B1").unwrap();
        let removed = platform.unregister(b1, &mut logger);
        assert_eq!(removed.map(|b| b.name), Some("B1".to_string()));
        assert_eq!(platform.list_names(), vec!["B2"]);
        assert_eq!(platform.handle_of("B2"), Some(b2));

        platform.clear_all();
        assert!(platform.list_names().is_empty());
        assert!(platform.is_empty());
    }

    #[test]
    fn test_unregister_absent_bidder_is_noop_with_warning() {
        let mut logger = Logger::new();
        let (receiver, buffer) = MemoryReceiver::new(vec![LogEvent::Validation]);
        logger.add_receiver(receiver);

        let mut platform = Platform::with_bidders(vec![Bidder::new("B1", &[("a", 1.0)])]);
        let b2 = platform.register(Bidder::new("B2", &[("a", 2.0)]), &mut logger);
        assert!(platform.unregister(b2, &mut logger).is_some());
        assert!(platform.unregister(b2, &mut logger).is_none());
        assert_eq!(platform.list_names(), vec!["B1"]);
        assert!(buffer.borrow().starts_with("WARNING"));
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut logger = Logger::new();
        let mut platform = Platform::new();
        platform.register(Bidder::new("A", &[("x", 1.0)]), &mut logger);
        platform.register(Bidder::new("A", &[("x", 2.0)]), &mut logger);
        assert_eq!(platform.len(), 2);
        // find returns the first registration
        assert_eq!(platform.find("A").map(|b| b.target_value("x")), Some(1.0));

        platform.find_mut("A").unwrap().set_target("x", 5.0);
        assert_eq!(platform.bidders()[0].target_value("x"), 5.0);
    }

    #[test]
    fn test_debug_and_display() {
        let platform = Platform::with_bidders(vec![Bidder::new("X", &[]), Bidder::new("Y", &[])]);
        assert_eq!(format!("{:?}", platform), "Platform(2 bidders)");
        let shown = platform.to_string();
        assert!(shown.contains("Platform with 2 bidders"));
        assert!(shown.contains('X') && shown.contains('Y'));
    }
}
