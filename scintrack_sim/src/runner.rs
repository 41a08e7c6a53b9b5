//! Scenario runner - executes tracking scenarios and checks the books.

use crate::error::SimError;
use crate::scenarios::ScenarioId;
use crate::transport::OpticsConfig;
use crate::world::{RunOutcome, SimConfig, SimWorld};

use scintrack_core::{RunSummary, ScintrackConfig};
use std::time::Instant;
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Events simulated
    pub events: u64,

    /// Wall-clock duration of the run
    pub elapsed_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Merged run statistics
    pub summary: RunSummary,
}

/// Runs tracking scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Events per scenario
    events: u64,

    /// Scintillation photons per event
    photons_per_event: u32,

    /// Worker threads
    workers: usize,

    /// Bounce limit override applied before the scenario
    bounce_limit: Option<u32>,

    /// Detector and tracking configuration the scenarios start from
    base: ScintrackConfig,

    /// Optics the scenarios start from
    optics: OpticsConfig,

    /// Keep per-event records
    keep_events: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            events: 5,
            photons_per_event: 1000,
            workers: 1,
            bounce_limit: None,
            base: ScintrackConfig::default(),
            optics: OpticsConfig::default(),
            keep_events: false,
        }
    }

    pub fn with_events(mut self, events: u64) -> Self {
        self.events = events;
        self
    }

    pub fn with_photons(mut self, photons_per_event: u32) -> Self {
        self.photons_per_event = photons_per_event;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Overrides the configured bounce limit (scenarios that set their own win).
    pub fn with_bounce_limit(mut self, limit: Option<u32>) -> Self {
        self.bounce_limit = limit;
        self
    }

    /// Sets the base detector and tracking configuration.
    pub fn with_config(mut self, config: ScintrackConfig) -> Self {
        self.base = config;
        self
    }

    pub fn with_optics(mut self, optics: OpticsConfig) -> Self {
        self.optics = optics;
        self
    }

    /// Keeps per-event records (needed for export).
    pub fn with_event_records(mut self, keep: bool) -> Self {
        self.keep_events = keep;
        self
    }

    /// Simulation configuration for a scenario.
    pub fn sim_config(&self, scenario: ScenarioId) -> SimConfig {
        let mut scintrack = self.base.clone();
        let mut optics = self.optics.clone();
        if let Some(limit) = self.bounce_limit {
            scintrack.tracking.bounce_limit = limit;
        }
        scenario.configure(&mut scintrack, &mut optics);

        SimConfig {
            seed: self.seed,
            run_id: 0,
            events: self.events,
            photons_per_event: self.photons_per_event,
            workers: self.workers,
            keep_events: self.keep_events,
            scintrack,
            optics,
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_detailed(scenario).0
    }

    /// Runs a scenario and also returns the raw run outcome.
    pub fn run_detailed(&self, scenario: ScenarioId) -> (ScenarioResult, RunOutcome) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let config = self.sim_config(scenario);
        let start = Instant::now();
        let outcome = SimWorld::new(config.clone()).and_then(|world| world.run());
        let elapsed_secs = start.elapsed().as_secs_f64();

        match outcome {
            Ok(outcome) => {
                let failure_reason = Self::check_accounting(&outcome)
                    .or_else(|| Self::check_expectations(scenario, &config, &outcome.summary));
                if failure_reason.is_none() {
                    outcome.summary.log_summary(config.run_id);
                }
                let result = ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: failure_reason.is_none(),
                    events: outcome.summary.events,
                    elapsed_secs,
                    failure_reason,
                    summary: outcome.summary,
                };
                (result, outcome)
            }
            Err(e) => (self.failed(scenario, &e, elapsed_secs), RunOutcome::default()),
        }
    }

    fn failed(&self, scenario: ScenarioId, error: &SimError, elapsed_secs: f64) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            events: 0,
            elapsed_secs,
            failure_reason: Some(format!("setup failed: {}", error)),
            summary: RunSummary::default(),
        }
    }

    /// Invariants every scenario must satisfy.
    fn check_accounting(outcome: &RunOutcome) -> Option<String> {
        let totals = &outcome.summary.totals;
        if totals.terminated_tracks() != totals.scintillation_photons {
            return Some(format!(
                "{} tracks terminated for {} scintillation photons",
                totals.terminated_tracks(),
                totals.scintillation_photons
            ));
        }
        if totals.hits != outcome.recorded_hits {
            return Some(format!(
                "{} detections but {} hits in the collections",
                totals.hits, outcome.recorded_hits
            ));
        }
        if outcome.status_violations > 0 {
            return Some(format!(
                "{} tracks ended with a status contradicting their fate",
                outcome.status_violations
            ));
        }
        None
    }

    /// Scenario-specific expectations.
    fn check_expectations(scenario: ScenarioId, config: &SimConfig, summary: &RunSummary) -> Option<String> {
        let totals = &summary.totals;
        match scenario {
            ScenarioId::Baseline => None,
            ScenarioId::BounceLimited if totals.bounce_kills == 0 => Some(format!(
                "no photon killed with bounce limit {}",
                config.scintrack.tracking.bounce_limit
            )),
            ScenarioId::UnlimitedBounces if totals.bounce_kills > 0 => Some(format!(
                "{} photons bounce-killed without a limit",
                totals.bounce_kills
            )),
            ScenarioId::Unwrapped if totals.escaped_side == 0 => {
                Some("no photon escaped through a bare side face".to_string())
            }
            ScenarioId::PerfectPde if totals.boundary_absorptions > 0 => Some(format!(
                "{} boundary absorptions with ideal SiPMs and wrapping",
                totals.boundary_absorptions
            )),
            ScenarioId::DarkReadout if totals.hits > 0 => {
                Some(format!("{} hits recorded with blind SiPMs", totals.hits))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(42).with_events(2).with_photons(500)
    }

    #[test]
    fn test_baseline_scenario() {
        let result = runner().run(ScenarioId::Baseline);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.events, 2);
        assert_eq!(result.summary.totals.scintillation_photons, 1000);
        assert_eq!(result.summary.totals.bounce_kills, 0);
    }

    #[test]
    fn test_bounce_limited_scenario() {
        let result = runner().run(ScenarioId::BounceLimited);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.summary.totals.bounce_kills > 0);
    }

    #[test]
    fn test_unlimited_scenario_ignores_override() {
        let result = runner().with_bounce_limit(Some(1)).run(ScenarioId::UnlimitedBounces);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.summary.totals.bounce_kills, 0);
    }

    #[test]
    fn test_unwrapped_scenario() {
        let result = runner().run(ScenarioId::Unwrapped);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.summary.totals.escaped_side > 0);
    }

    #[test]
    fn test_perfect_pde_and_dark_readout() {
        let perfect = runner().run(ScenarioId::PerfectPde);
        assert!(perfect.passed, "{:?}", perfect.failure_reason);
        assert_eq!(perfect.summary.totals.boundary_absorptions, 0);

        let dark = runner().run(ScenarioId::DarkReadout);
        assert!(dark.passed, "{:?}", dark.failure_reason);
        assert_eq!(dark.summary.totals.hits, 0);
    }

    #[test]
    fn test_bounce_override_reaches_baseline() {
        let config = runner().with_bounce_limit(Some(7)).sim_config(ScenarioId::Baseline);
        assert_eq!(config.scintrack.tracking.bounce_limit, 7);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = runner().run(ScenarioId::Baseline);
        let b = runner().with_workers(2).run(ScenarioId::Baseline);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_invalid_config_fails_scenario() {
        let mut config = ScintrackConfig::default();
        config.detector.n_crystals = 0;
        let result = runner().with_config(config).run(ScenarioId::Baseline);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("n_crystals"));
    }

    #[test]
    fn test_event_records_kept_on_request() {
        let (_, outcome) = runner().with_event_records(true).run_detailed(ScenarioId::Baseline);
        assert_eq!(outcome.events.len(), 2);
    }
}
