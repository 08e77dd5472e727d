use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use adfair::charts;
use adfair::logger::{sanitize_filename, ConsoleReceiver, FileReceiver, LogEvent, Logger};
use adfair::scenarios::{self, get_scenario_catalog};
use adfair::utils::{RAND_SEED, TOTAL_AUCTION_RUNS, VERBOSE_AUCTION};
use adfair::{log, logln};

fn parse_count(args: &[String], index: usize, what: &str, default: u64) -> u64 {
    match args.get(index) {
        None => default,
        Some(arg) => match arg.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Error: Invalid {} parameter '{}'. Expected a number.", what, arg);
                std::process::exit(1);
            }
        },
    }
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Strip --verbose auction and --fastbreak, keep positional arguments
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if raw_args.get(i + 1).map(String::as_str) == Some("auction") {
                VERBOSE_AUCTION.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        args.push(arg.clone());
    }

    if args.len() > 1 && args[1] == "charts" {
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        match charts::generate_all_charts(Path::new("charts"), &mut logger) {
            Ok(()) => println!("All charts generated successfully."),
            Err(e) => {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];
        let iterations = parse_count(&args, 2, "iterations", 1);
        let start_iteration = parse_count(&args, 3, "start iteration", 0);

        let all_scenarios = get_scenario_catalog();
        let selected: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            match all_scenarios.iter().find(|s| s.short_name == scenario_arg) {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}", s.short_name);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Scenario details only make sense on the console for a single named run
        let mut logger = Logger::new();
        if scenario_arg != "all" && iterations == 1 {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation, LogEvent::Scenario]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        }
        if VERBOSE_AUCTION.load(Ordering::Relaxed) {
            match FileReceiver::new(&PathBuf::from("log/auctions.csv"), vec![LogEvent::Auction]) {
                Ok(receiver) => { logger.add_receiver(receiver); }
                Err(e) => eprintln!("Warning: could not open auction log: {}", e),
            }
        }
        let summary_receiver_id = match FileReceiver::new(&PathBuf::from("log/summary.log"), vec![LogEvent::Validation]) {
            Ok(receiver) => Some(logger.add_receiver(receiver)),
            Err(e) => {
                eprintln!("Warning: could not open summary log: {}", e);
                None
            }
        };

        TOTAL_AUCTION_RUNS.store(0, Ordering::Relaxed);
        if iterations > 1 {
            logln!(logger, LogEvent::Validation, "Running '{}' {} times...\n", scenario_arg, iterations);
        } else {
            logln!(logger, LogEvent::Validation, "Running '{}'...\n", scenario_arg);
        }

        'scenarios: for scenario in &selected {
            log!(logger, LogEvent::Validation, "{}: ", scenario.short_name);

            let scenario_path = PathBuf::from(format!("log/{}/scenario.log", sanitize_filename(scenario.short_name)));
            let scenario_receiver_id = FileReceiver::new(&scenario_path, vec![LogEvent::Scenario, LogEvent::Experiment])
                .ok()
                .map(|receiver| logger.add_receiver(receiver));

            for i in start_iteration..(start_iteration + iterations) {
                if iterations > 1 {
                    log!(logger, LogEvent::Validation, "[{}/{}] ", i - start_iteration + 1, iterations);
                }
                RAND_SEED.store(i, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(logger, LogEvent::Validation, "✓ PASSED");
                        }
                    }
                    Err(e) => {
                        if iterations > 1 {
                            logln!(logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }
                        if fastbreak {
                            if let Some(id) = scenario_receiver_id {
                                logger.remove_receiver(id);
                            }
                            logln!(logger, LogEvent::Validation, "\nStopping scenario execution due to failure (--fastbreak enabled)");
                            logln!(logger, LogEvent::Validation, "Error at seed {}: {}", i, e);
                            break 'scenarios;
                        }
                    }
                }
                let _ = logger.flush();
            }

            if let Some(id) = scenario_receiver_id {
                logger.remove_receiver(id);
            }
        }

        logln!(logger, LogEvent::Validation, "\nTotal auctions cleared: {}", TOTAL_AUCTION_RUNS.load(Ordering::Relaxed));
        if let Some(id) = summary_receiver_id {
            logger.remove_receiver(id);
        }
    } else {
        // Default: the group allocation experiment with its summary on the console
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Experiment, LogEvent::Scenario]));
        if let Err(e) = scenarios::gender_allocation::run("gender_allocation", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}
