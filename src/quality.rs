/// Quality score models
///
/// In production a machine-learned relevance model assigns every ad a quality score for
/// the opportunity at hand. Here the models are simple stand-ins that the platform asks
/// for one score per registered bidder before each auction.

use std::collections::HashMap;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use crate::adspot::AdSpot;
use crate::bidder::Bidder;
use crate::utils::uniform_dist;

pub trait QualityModelTrait {
    /// One non-negative score per bidder, in bidder order
    fn quality_scores(&self, spot: &AdSpot, bidders: &[Bidder], rng: &mut StdRng) -> Vec<f64>;

    fn model_type(&self) -> String;
}

/// Every bidder gets the same score
pub struct QualityUniform {
    pub score: f64,
}

impl Default for QualityUniform {
    fn default() -> Self {
        Self { score: 1.0 }
    }
}

impl QualityModelTrait for QualityUniform {
    fn quality_scores(&self, _spot: &AdSpot, bidders: &[Bidder], _rng: &mut StdRng) -> Vec<f64> {
        vec![self.score; bidders.len()]
    }

    fn model_type(&self) -> String {
        format!("Uniform {:.2}", self.score)
    }
}

/// Group-dependent rule keyed on the spot's first tag
///
/// The favored bidder always scores `favored_score`; everybody else scores the multiplier
/// registered for the group, or `fallback` when the group is unknown or the spot has no tags.
pub struct QualityGroupRule {
    pub favored: String,
    pub favored_score: f64,
    pub group_multipliers: HashMap<String, f64>,
    pub fallback: f64,
}

impl QualityGroupRule {
    /// The rule used by the group allocation experiment:
    /// STEM is always fully relevant, other ads score 0.5 for female users and 0.1 otherwise
    pub fn reference() -> Self {
        Self {
            favored: "STEM".to_string(),
            favored_score: 1.0,
            group_multipliers: HashMap::from([("female".to_string(), 0.5)]),
            fallback: 0.1,
        }
    }

    fn group_multiplier(&self, spot: &AdSpot) -> f64 {
        spot.tags.first()
            .and_then(|group| self.group_multipliers.get(group))
            .copied()
            .unwrap_or(self.fallback)
    }
}

impl QualityModelTrait for QualityGroupRule {
    fn quality_scores(&self, spot: &AdSpot, bidders: &[Bidder], _rng: &mut StdRng) -> Vec<f64> {
        let multiplier = self.group_multiplier(spot);
        bidders.iter()
            .map(|bidder| if bidder.name == self.favored { self.favored_score } else { multiplier })
            .collect()
    }

    fn model_type(&self) -> String {
        format!("Group rule (favored {})", self.favored)
    }
}

/// Independent uniform draw per bidder and opportunity
pub struct QualityRandomUniform {
    pub low: f64,
    pub high: f64,
    dist: Uniform<f64>,
}

impl QualityRandomUniform {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            dist: uniform_dist(low, high),
        }
    }
}

impl QualityModelTrait for QualityRandomUniform {
    fn quality_scores(&self, _spot: &AdSpot, bidders: &[Bidder], rng: &mut StdRng) -> Vec<f64> {
        bidders.iter().map(|_| self.dist.sample(rng)).collect()
    }

    fn model_type(&self) -> String {
        format!("Random uniform [{:.2}, {:.2})", self.low, self.high)
    }
}
