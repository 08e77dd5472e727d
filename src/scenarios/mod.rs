use std::error::Error;
use crate::logger::{Logger, LogEvent};
use crate::{errln, logln};

/// Function type for scenario entry functions
pub type ScenarioFn = fn(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn Error>>;

/// Entry in the scenario catalog
#[derive(Clone)]
pub struct ScenarioEntry {
    pub short_name: &'static str,
    pub run: ScenarioFn,
}

inventory::collect!(ScenarioEntry);

/// All registered scenarios, sorted by name so "all" runs in a stable order
pub fn get_scenario_catalog() -> Vec<ScenarioEntry> {
    let mut entries: Vec<ScenarioEntry> = inventory::iter::<ScenarioEntry>
        .into_iter()
        .cloned()
        .collect();
    entries.sort_by_key(|entry| entry.short_name);
    entries
}

/// Collects the outcome of scenario checks, logging each as it is made
pub struct ScenarioChecks {
    errors: Vec<String>,
}

impl ScenarioChecks {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn check(&mut self, passed: bool, msg: String, logger: &mut Logger) {
        if passed {
            logln!(logger, LogEvent::Scenario, "✓ {}", msg);
        } else {
            errln!(logger, LogEvent::Scenario, "✗ {}", msg);
            self.errors.push(msg);
        }
    }

    pub fn finish(self, scenario_name: &str) -> Result<(), Box<dyn Error>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Scenario '{}' validation failed:\n{}", scenario_name, self.errors.join("\n")).into())
        }
    }
}

impl Default for ScenarioChecks {
    fn default() -> Self {
        Self::new()
    }
}

pub mod gender_allocation;
pub mod demo;
