/// Allocation of Makeup and STEM ads across female and male users.
///
/// The quality model favors STEM strongly enough that both advertisers tie on expected
/// value in both groups, so every impression is decided by the random tie break.
///
/// Expected behavior:
/// - every impression is filled, both advertisers value both groups
/// - second price and GSP produce identical allocations for single-slot impressions
/// - STEM's share barely differs between groups (statistical parity gap below 0.1)

use crate::adspot::AuctionMethod;
use crate::experiment::{print_summary, run_simulations, ExperimentConfig};
use crate::fairness::NO_WINNER;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::scenarios::ScenarioChecks;
use crate::utils::get_seed;
use crate::valuers::ValuationTargetingSum;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "gender_allocation",
    run,
});

const MAX_PARITY_GAP: f64 = 0.1;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExperimentConfig {
        seed: get_seed(1),
        ..ExperimentConfig::default()
    };
    let results = run_simulations(&config, &ValuationTargetingSum, logger)?;
    print_summary(&results, logger);

    logln!(logger, LogEvent::Scenario, "");
    let mut checks = ScenarioChecks::new();

    for stats in results.values() {
        let unfilled: usize = config.groups.iter()
            .map(|group| stats.allocation.count(group, NO_WINNER))
            .sum();
        checks.check(
            unfilled == 0,
            format!("{}: every impression is filled ({} unfilled of {})", stats.method, unfilled, stats.n_impressions),
            logger,
        );

        let gap = stats.allocation.statistical_parity_gap("STEM");
        checks.check(
            gap < MAX_PARITY_GAP,
            format!("{}: STEM statistical parity gap is below {:.2}: {:.4}", stats.method, MAX_PARITY_GAP, gap),
            logger,
        );
    }

    if let (Some(second), Some(gsp)) = (results.get(&AuctionMethod::SecondPrice), results.get(&AuctionMethod::Gsp)) {
        checks.check(
            second.log.records == gsp.log.records,
            format!(
                "Second price and GSP clear single slots identically: revenue {:.2} vs {:.2}",
                second.allocation.avg_price * second.n_impressions as f64,
                gsp.allocation.avg_price * gsp.n_impressions as f64
            ),
            logger,
        );
    }

    checks.finish(scenario_name)
}
