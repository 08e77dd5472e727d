/// Three advertisers, two opportunities, all three pricing rules.
///
/// - Spot 0: two sports slots shown to a male user (slot weights 0.9 and 0.5)
/// - Spot 1: one slot shown to a female user
///
/// Alpha values spot 0 at 5, Beta at 3 and Gamma not at all; only Gamma values spot 1.
///
/// Expected behavior:
/// - first price: spot 0 goes to Alpha, Beta paying 5 and 3; Gamma pays 2 for spot 1
/// - second price and GSP: same winners, Alpha pays Beta's 3, Beta and Gamma pay 0

use rand::{rngs::StdRng, SeedableRng};

use crate::adspot::{AdSpot, AuctionMethod};
use crate::bidder::Bidder;
use crate::logger::{Logger, LogEvent};
use crate::logln;
use crate::platform::Platform;
use crate::scenarios::ScenarioChecks;
use crate::utils::get_seed;
use crate::valuers::ValuationTargetingSum;

inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "demo",
    run,
});

fn expected_prices(method: AuctionMethod) -> [Vec<f64>; 2] {
    match method {
        AuctionMethod::FirstPrice => [vec![5.0, 3.0], vec![2.0]],
        AuctionMethod::SecondPrice | AuctionMethod::Gsp => [vec![3.0, 0.0], vec![0.0]],
    }
}

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let mut platform = Platform::new();
    platform.register(Bidder::new("Alpha", &[("sports", 4.0), ("male", 1.0)]), logger);
    platform.register(Bidder::new("Beta", &[("sports", 3.0)]), logger);
    platform.register(Bidder::new("Gamma", &[("female", 2.0)]), logger);

    let spots = vec![
        AdSpot::new(2, &["sports", "male"], Some(vec![0.9, 0.5]))?,
        AdSpot::new(1, &["female"], Some(vec![1.0]))?,
    ];
    let expected_winners = [vec![Some("Alpha"), Some("Beta")], vec![Some("Gamma")]];

    let mut rng = StdRng::seed_from_u64(get_seed(5995));
    let mut checks = ScenarioChecks::new();

    for method in AuctionMethod::ALL {
        logln!(logger, LogEvent::Scenario, "\nMethod: {}", method);
        let results = platform.assign(&spots, method, Some(&ValuationTargetingSum), None, &mut rng, logger)?;
        let prices = expected_prices(method);
        for (index, result) in results.iter().enumerate() {
            let winners = result.winner_names();
            logln!(logger, LogEvent::Scenario, "AdSpot {}: winners={:?}, prices={:?}", index, winners, result.prices);
            checks.check(
                winners == expected_winners[index] && result.prices == prices[index],
                format!("{} spot {}: winners {:?} pay {:?}", method, index, expected_winners[index], prices[index]),
                logger,
            );
        }
    }

    checks.finish(scenario_name)
}
