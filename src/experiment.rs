/// Group allocation experiment
///
/// Two advertisers compete for single-slot impressions shown to users from different
/// groups. Makeup values female users highly, STEM values both groups but male users far
/// less, and the quality model favors STEM. For every auction method the same stream of
/// impressions is replayed, so differences between methods come from pricing alone.

use std::collections::BTreeMap;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::adspot::{AdSpot, AuctionMethod};
use crate::bidder::Bidder;
use crate::errors::AuctionError;
use crate::fairness::{GroupAllocationStats, NO_WINNER};
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::platform::Platform;
use crate::quality::{QualityGroupRule, QualityModelTrait};
use crate::records::ImpressionLog;
use crate::valuers::ValuationTrait;

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub n_impressions: usize,
    pub methods: Vec<AuctionMethod>,
    pub seed: u64,
    /// Each impression's group is drawn uniformly from this list
    pub groups: Vec<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_impressions: 2000,
            methods: AuctionMethod::ALL.to_vec(),
            seed: 1,
            groups: vec!["male".to_string(), "female".to_string()],
        }
    }
}

/// Results for one auction method
#[derive(Debug, Clone)]
pub struct ExperimentStats {
    pub method: AuctionMethod,
    pub n_impressions: usize,
    pub allocation: GroupAllocationStats,
    pub log: ImpressionLog,
}

/// Makeup and STEM with the gender-specific values used throughout the experiment
pub fn reference_bidders() -> Vec<Bidder> {
    vec![
        Bidder::new("Makeup", &[("female", 10.0), ("male", 2.0)]),
        Bidder::new("STEM", &[("female", 5.0), ("male", 0.2)]),
    ]
}

/// Run the experiment with the reference bidders and reference quality rule
pub fn run_simulations(config: &ExperimentConfig, valuer: &dyn ValuationTrait, logger: &mut Logger) -> Result<BTreeMap<AuctionMethod, ExperimentStats>, AuctionError> {
    let platform = Platform::with_bidders(reference_bidders());
    run_simulations_on(&platform, &QualityGroupRule::reference(), config, valuer, logger)
}

/// Run the experiment against any registry and quality model
pub fn run_simulations_on(
    platform: &Platform,
    quality: &dyn QualityModelTrait,
    config: &ExperimentConfig,
    valuer: &dyn ValuationTrait,
    logger: &mut Logger,
) -> Result<BTreeMap<AuctionMethod, ExperimentStats>, AuctionError> {
    if config.groups.is_empty() {
        return Err(AuctionError::NoGroups);
    }
    let spots = config.groups.iter()
        .map(|group| AdSpot::new(1, &[group.as_str()], None))
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = BTreeMap::new();
    for &method in &config.methods {
        // Same impression stream and tie-break stream for every method
        let mut rng_groups = StdRng::seed_from_u64(config.seed.wrapping_add(1991));
        let mut rng_auction = StdRng::seed_from_u64(config.seed.wrapping_add(2992));

        let mut log = ImpressionLog::new();
        for _ in 0..config.n_impressions {
            let group_index = rng_groups.gen_range(0..config.groups.len());
            let spot = &spots[group_index];
            let result = platform
                .assign(std::slice::from_ref(spot), method, Some(valuer), Some(quality), &mut rng_auction, logger)?
                .remove(0);
            log.record(&config.groups[group_index], spot, &result);
        }

        let allocation = GroupAllocationStats::from_records(&log.records, &config.groups);
        results.insert(method, ExperimentStats {
            method,
            n_impressions: config.n_impressions,
            allocation,
            log,
        });
    }
    Ok(results)
}

/// Write the per-method summary to the logger at LogEvent::Experiment
pub fn print_summary(results: &BTreeMap<AuctionMethod, ExperimentStats>, logger: &mut Logger) {
    for stats in results.values() {
        let allocation = &stats.allocation;
        logln!(logger, LogEvent::Experiment, "\nMethod: {}", stats.method);
        logln!(logger, LogEvent::Experiment, "Total impressions: {}", stats.n_impressions);
        logln!(logger, LogEvent::Experiment, "Average price per impression: {:.3}", allocation.avg_price);
        logln!(logger, LogEvent::Experiment, "Total spend by bidder:");
        for (bidder, spend) in &allocation.total_spend {
            logln!(logger, LogEvent::Experiment, "  {}: {:.2}", bidder, spend);
        }
        for (group, counts) in &allocation.counts {
            logln!(logger, LogEvent::Experiment, "Impressions for {}: {}", group, allocation.group_total(group));
            let mut ordered: Vec<(&String, &usize)> = counts.iter().collect();
            ordered.sort_by(|a, b| b.1.cmp(a.1));
            for (name, count) in ordered {
                logln!(logger, LogEvent::Experiment, "  {}: {} ({:.2}%)", name, count, allocation.share(group, name) * 100.0);
            }
        }
        for name in allocation.bidder_names() {
            if name == NO_WINNER {
                continue;
            }
            logln!(logger, LogEvent::Experiment, "Statistical parity gap for {}: {:.4}", name, allocation.statistical_parity_gap(&name));
        }
    }
}
