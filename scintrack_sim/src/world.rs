//! SimWorld - event loop of the simulation harness.
//!
//! Every event picks a crystal, deposits energy at a random point and emits
//! `photons_per_event` scintillation photons from it. Each photon is stepped
//! by the toy kernel and classified by the tracking core until the core
//! terminates it.
//!
//! Events are spread over worker threads. Each worker owns its own kernel,
//! boundary status cell and classifier; the per-event RNG is derived from
//! `(seed, event_id)` only, so results do not depend on the worker count.

use crate::error::SimError;
use crate::geometry::CrystalArray;
use crate::transport::{OpticalTransport, OpticsConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scintrack_core::{
    BounceCounter, BoundaryClassifier, EventTally, HitCollection, PhotonDetector, RunSummary,
    ScintrackConfig, StatusFlag, StepVerdict, TrackFate, TrackStatus,
};
use scintrack_env::{SharedBoundaryStatus, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Run number written into event records
    pub run_id: u32,

    /// Number of events to simulate
    pub events: u64,

    /// Scintillation photons emitted per event
    pub photons_per_event: u32,

    /// Worker threads
    pub workers: usize,

    /// Keep a full record of every event (needed for export)
    pub keep_events: bool,

    /// Detector geometry and tracking policy
    pub scintrack: ScintrackConfig,

    /// Optical properties used by the toy kernel
    pub optics: OpticsConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            run_id: 0,
            events: 10,
            photons_per_event: 1000,
            workers: 1,
            keep_events: false,
            scintrack: ScintrackConfig::default(),
            optics: OpticsConfig::default(),
        }
    }
}

/// Everything recorded for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "RunId")]
    pub run_id: u32,

    #[serde(rename = "EventId")]
    pub event_id: u64,

    /// Scintillation photons produced
    #[serde(rename = "NScint")]
    pub n_scint: u64,

    /// Hits per sensitive detector
    #[serde(rename = "Detectors")]
    pub detectors: HitCollection,

    #[serde(rename = "Tally")]
    pub tally: EventTally,
}

/// Result of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Merged statistics of all workers
    pub summary: RunSummary,

    /// Event records sorted by event id (empty unless `keep_events`)
    pub events: Vec<EventRecord>,

    /// Hits found in the detector collections
    pub recorded_hits: u64,

    /// Tracks whose final status contradicts their fate
    pub status_violations: u64,
}

impl RunOutcome {
    fn merge(&mut self, other: RunOutcome) {
        self.summary.merge(&other.summary);
        self.events.extend(other.events);
        self.recorded_hits += other.recorded_hits;
        self.status_violations += other.status_violations;
    }
}

/// Per-event RNG stream.
pub fn event_seed(seed: u64, event_id: u64) -> u64 {
    seed ^ event_id.wrapping_add(1).wrapping_mul(0x9e3779b97f4a7c15)
}

/// Returns true if the final status of a track agrees with its fate.
pub fn status_matches_fate(status: &TrackStatus, fate: TrackFate) -> bool {
    let side = status.is_status(StatusFlag::EscapedFromSide);
    let readout = status.is_status(StatusFlag::EscapedFromReadOut);
    let coherent = !(status.is_status(StatusFlag::InsideOfCrystal)
        && status.is_status(StatusFlag::OutsideOfCrystal))
        && !(side && readout);

    coherent
        && match fate {
            TrackFate::Detected => status.is_status(StatusFlag::HitDetector),
            TrackFate::DetectedOutside => !status.is_status(StatusFlag::HitDetector),
            TrackFate::VolumeAbsorbed => status.is_status(StatusFlag::Absorbed),
            TrackFate::BoundaryAbsorbed => status.is_status(StatusFlag::BoundaryAbsorbed),
            TrackFate::EscapedFromSide => side && status.is_killed() && status.exit_position().is_some(),
            TrackFate::EscapedFromReadOut => readout && status.is_killed() && status.exit_position().is_some(),
            TrackFate::BounceLimit => status.is_killed() && status.exit_position().is_some(),
            TrackFate::LeftWorld => true,
        }
}

/// Tracking state owned by one worker thread.
struct EventWorker {
    config: SimConfig,
    transport: OpticalTransport,
    classifier: BoundaryClassifier<PhotonDetector>,
}

impl EventWorker {
    fn new(config: &SimConfig, array: Arc<CrystalArray>) -> Result<Self, SimError> {
        let tracking = &config.scintrack.tracking;
        let boundary = SharedBoundaryStatus::new();
        let transport = OpticalTransport::new(array, config.optics.clone(), tracking, boundary.clone())?;
        let detector = PhotonDetector::new(&tracking.detector_name, tracking.detector_verbose);
        let classifier = BoundaryClassifier::new(tracking.clone(), Arc::new(boundary), detector);

        Ok(Self {
            config: config.clone(),
            transport,
            classifier,
        })
    }

    fn run_events(mut self, event_ids: impl Iterator<Item = u64>) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for event_id in event_ids {
            let (record, violations) = self.run_event(event_id);
            outcome.summary.add_event(&record.tally);
            outcome.recorded_hits += record.detectors.total_hits() as u64;
            outcome.status_violations += violations;
            if self.config.keep_events {
                outcome.events.push(record);
            }
        }
        outcome
    }

    fn run_event(&mut self, event_id: u64) -> (EventRecord, u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(event_seed(self.config.seed, event_id));
        self.classifier.recorder_mut().initialize();

        let crystals = self.transport.array().crystals();
        let crystal = rng.gen_range(0..crystals.len());
        let origin = self.transport.sample_deposit(&crystals[crystal], &mut rng);
        let crystal_volume = self.config.scintrack.tracking.crystal_volume.clone();

        let mut violations = 0;
        for i in 0..self.config.photons_per_event {
            let Some(mut photon) = self.transport.emit(TrackId(i as u64 + 1), crystal, origin, &mut rng) else {
                break;
            };
            self.classifier.count_scintillation();

            let mut status = self.classifier.begin_track(Some(&crystal_volume));
            let mut bounces = BounceCounter::new();

            let fate = loop {
                let step = self.transport.step(&mut photon, &mut rng);
                if let StepVerdict::Terminate(fate) =
                    self.classifier.classify_step(&step, &mut bounces, &mut status)
                {
                    break fate;
                }
            };

            if !status_matches_fate(&status, fate) {
                warn!("{} ended as {} with status {}", photon.track_id, fate, status);
                violations += 1;
            }
        }

        let detectors = self.classifier.recorder_mut().end_of_event();
        let tally = self.classifier.take_tally();
        debug!(
            "Event {}: {} photons, {} hits, {} absorbed, {} escaped",
            event_id,
            tally.scintillation_photons,
            tally.hits,
            tally.absorptions + tally.boundary_absorptions,
            tally.escaped()
        );

        let record = EventRecord {
            run_id: self.config.run_id,
            event_id,
            n_scint: tally.scintillation_photons,
            detectors,
            tally,
        };
        (record, violations)
    }
}

/// The SimWorld - container for a whole run.
pub struct SimWorld {
    config: SimConfig,
    array: Arc<CrystalArray>,
}

impl SimWorld {
    /// Validates the configuration and builds the detector.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.scintrack.validate()?;
        config.optics.validate()?;

        let detector = &config.scintrack.detector;
        let tracking = &config.scintrack.tracking;
        let array = Arc::new(CrystalArray::new(detector, &tracking.photodetector_volume)?);
        Ok(Self { config, array })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn array(&self) -> &CrystalArray {
        &self.array
    }

    /// Runs every event and merges the worker results.
    pub fn run(&self) -> Result<RunOutcome, SimError> {
        let workers = self.config.workers.max(1);
        let events = self.config.events;
        info!(
            "Run {}: {} events x {} photons on {} worker(s), bounce limit {}",
            self.config.run_id,
            events,
            self.config.photons_per_event,
            workers,
            self.config.scintrack.tracking.bounce_limit
        );

        let pool = (0..workers)
            .map(|_| EventWorker::new(&self.config, self.array.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let results: Vec<Result<RunOutcome, SimError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = pool
                .into_iter()
                .enumerate()
                .map(|(w, worker)| {
                    let ids = (w as u64..events).step_by(workers);
                    scope.spawn(move || worker.run_events(ids))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(w, handle)| handle.join().map_err(|_| SimError::WorkerPanicked(w)))
                .collect()
        });

        let mut outcome = RunOutcome::default();
        for result in results {
            outcome.merge(result?);
        }
        outcome.events.sort_by_key(|e| e.event_id);

        Ok(outcome)
    }
}
