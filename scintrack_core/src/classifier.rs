//! Boundary event classifier.
//!
//! Called once per step of every optical photon. Looks at the pre/post
//! volumes, the limiting process and the boundary outcome of the step, then
//! updates the track status, the bounce counter and the event tally, records
//! hits, and tells the kernel whether the track must stop.
//!
//! # Decision table
//!
//! ```text
//! bulk absorption                      -> absorbed, terminate
//! Absorption                           -> boundaryAbsorbed, terminate
//! Detection, post == photodetector     -> hit + hitDetector, reset, terminate
//! Detection, elsewhere                 -> reset, terminate
//! SameMaterial/FresnelRefraction
//!     crystal -> world                 -> escape flag, outside, killed, reset, terminate
//!     other   -> crystal               -> insideOfCrystal (re-entry)
//! any reflection                       -> count bounce, kill at the limit
//! left the world                       -> reset, terminate
//! ```

use crate::bounce::{BounceCounter, BounceLimit};
use crate::config::TrackingConfig;
use crate::hit::{HitRecorder, PhotonDetHit};
use crate::tally::{EventTally, TrackFate};
use crate::track_status::{StatusFlag, TrackStatus};
use nalgebra::Point3;
use scintrack_env::{BoundaryOutcome, BoundaryOutcomeProvider, OpticalStep, StepProcess};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the kernel must do with the track after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepVerdict {
    /// Keep stepping
    Continue,
    /// Stop and kill the track
    Terminate(TrackFate),
}

impl StepVerdict {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepVerdict::Terminate(_))
    }

    /// The fate carried by a terminal verdict.
    pub fn fate(&self) -> Option<TrackFate> {
        match self {
            StepVerdict::Continue => None,
            StepVerdict::Terminate(fate) => Some(*fate),
        }
    }
}

/// Per-worker optical-photon classifier.
///
/// Owns the hit recorder and the event tally of its worker; the boundary
/// outcome provider is shared with the kernel that writes it.
pub struct BoundaryClassifier<R: HitRecorder> {
    config: TrackingConfig,
    bounce_limit: BounceLimit,
    provider: Arc<dyn BoundaryOutcomeProvider>,
    recorder: R,
    tally: EventTally,
}

impl<R: HitRecorder> BoundaryClassifier<R> {
    /// Creates a classifier for the given policy, outcome source and hit sink.
    pub fn new(
        config: TrackingConfig,
        provider: Arc<dyn BoundaryOutcomeProvider>,
        recorder: R,
    ) -> Self {
        Self {
            bounce_limit: BounceLimit::new(config.bounce_limit),
            config,
            provider,
            recorder,
            tally: EventTally::new(),
        }
    }

    /// Current bounce limit.
    pub fn bounce_limit(&self) -> BounceLimit {
        self.bounce_limit
    }

    /// Changes the bounce limit (0 = unlimited).
    pub fn set_bounce_limit(&mut self, limit: u32) {
        self.bounce_limit = BounceLimit::new(limit);
        self.config.bounce_limit = limit;
        info!("Bounce limit set to {}", self.bounce_limit);
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Status of a track starting in `start_volume`.
    pub fn begin_track(&self, start_volume: Option<&str>) -> TrackStatus {
        let mut status = TrackStatus::new();
        if start_volume == Some(self.config.crystal_volume.as_str()) {
            status.add_flag(StatusFlag::InsideOfCrystal);
        }
        status
    }

    /// Counts a scintillation photon produced in the current event.
    pub fn count_scintillation(&mut self) {
        self.tally.inc_scintillation();
    }

    /// Classifies a step using the injected boundary outcome.
    pub fn classify_step(
        &mut self,
        step: &OpticalStep,
        bounces: &mut BounceCounter,
        status: &mut TrackStatus,
    ) -> StepVerdict {
        let outcome = self.provider.current_outcome();
        self.classify(step, outcome, bounces, status)
    }

    /// Classifies a step with an explicit boundary outcome.
    pub fn classify(
        &mut self,
        step: &OpticalStep,
        outcome: BoundaryOutcome,
        bounces: &mut BounceCounter,
        status: &mut TrackStatus,
    ) -> StepVerdict {
        if !step.is_optical_photon() {
            return StepVerdict::Continue;
        }

        if step.left_world() {
            bounces.reset();
            if !status.is_killed() {
                self.tally.record_fate(TrackFate::LeftWorld);
            }
            return StepVerdict::Terminate(TrackFate::LeftWorld);
        }

        if step.process == StepProcess::OpAbsorption {
            status.add_flag(StatusFlag::Absorbed);
            return self.terminate(TrackFate::VolumeAbsorbed);
        }

        match outcome {
            BoundaryOutcome::Absorption => {
                status.add_flag(StatusFlag::BoundaryAbsorbed);
                return self.terminate(TrackFate::BoundaryAbsorbed);
            }
            BoundaryOutcome::Detection => {
                bounces.reset();
                if step.post_volume() == Some(self.config.photodetector_volume.as_str()) {
                    self.record_detection(step, status);
                    return self.terminate(TrackFate::Detected);
                }
                return self.terminate(TrackFate::DetectedOutside);
            }
            crossing if crossing.is_crossing() => {
                let pre_in_crystal = step.pre_volume() == Some(self.config.crystal_volume.as_str());
                let post_in_crystal = step.post_volume() == Some(self.config.crystal_volume.as_str());

                if pre_in_crystal && step.post_volume() == Some(self.config.world_volume.as_str()) {
                    let fate = self.record_escape(step, status);
                    bounces.reset();
                    return self.terminate(fate);
                }
                if post_in_crystal && !pre_in_crystal {
                    status.add_flag(StatusFlag::InsideOfCrystal);
                }
            }
            reflection if reflection.is_reflection() => {
                let count = bounces.increment();

                if reflection == BoundaryOutcome::FresnelReflection
                    && self.at_readout_plane(&step.post.position)
                    && status.is_status(StatusFlag::InsideOfCrystal)
                    && !status.is_status(StatusFlag::ReflectedAtReadOut)
                    && status.add_flag(StatusFlag::ReflectedAtReadOut)
                {
                    self.tally.reflected_at_readout += 1;
                }

                if self.bounce_limit.is_reached(count) {
                    status.set_exit_position(step.post.position);
                    status.add_flag(StatusFlag::Killed);
                    bounces.reset();
                    debug!(
                        "{} killed after {} bounces at ({:.3}, {:.3}, {:.3})",
                        step.track_id,
                        count,
                        step.post.position.x,
                        step.post.position.y,
                        step.post.position.z
                    );
                    return self.terminate(TrackFate::BounceLimit);
                }
            }
            _ => {}
        }

        StepVerdict::Continue
    }

    /// Returns true if `position` lies on the read-out plane.
    pub fn at_readout_plane(&self, position: &Point3<f64>) -> bool {
        (position.z - self.config.readout_plane_z).abs() <= self.config.plane_tolerance
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    pub fn tally(&self) -> &EventTally {
        &self.tally
    }

    pub fn tally_mut(&mut self) -> &mut EventTally {
        &mut self.tally
    }

    /// Hands over the event tally and starts a new one.
    pub fn take_tally(&mut self) -> EventTally {
        std::mem::take(&mut self.tally)
    }

    fn terminate(&mut self, fate: TrackFate) -> StepVerdict {
        self.tally.record_fate(fate);
        StepVerdict::Terminate(fate)
    }

    fn record_escape(&mut self, step: &OpticalStep, status: &mut TrackStatus) -> TrackFate {
        let exit = step.post.position;
        let (flag, fate) = if self.at_readout_plane(&exit) {
            (StatusFlag::EscapedFromReadOut, TrackFate::EscapedFromReadOut)
        } else {
            (StatusFlag::EscapedFromSide, TrackFate::EscapedFromSide)
        };

        // The escape flag is refused once outside, so it goes first.
        status.add_flag(flag);
        status.add_flag(StatusFlag::OutsideOfCrystal);
        status.set_exit_position(exit);
        status.add_flag(StatusFlag::Killed);
        fate
    }

    fn record_detection(&mut self, step: &OpticalStep, status: &mut TrackStatus) {
        let arrive = step.post.position;
        if status.exit_position().is_none() {
            status.set_exit_position(arrive);
        }
        let exit = status.exit_position().unwrap_or(arrive);

        let hit = match &step.post.touchable {
            Some(touchable) => PhotonDetHit::new(
                exit,
                arrive,
                touchable.to_local(&arrive),
                step.post.global_time,
                &touchable.logical_volume,
                touchable.crystal_copy + 1,
                touchable.sipm_copy + 1,
            ),
            None => {
                warn!(
                    "{} detected by {} without a touchable, recording global position",
                    step.track_id,
                    self.recorder.detector_name()
                );
                PhotonDetHit::new(
                    exit,
                    arrive,
                    arrive,
                    step.post.global_time,
                    &self.config.photodetector_volume,
                    0,
                    0,
                )
            }
        };

        self.recorder.record_hit(hit);
        status.add_flag(StatusFlag::HitDetector);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::hit::PhotonDetector;
    use proptest::prelude::*;
    use scintrack_env::{SharedBoundaryStatus, StepPoint, TrackId};

    fn reflection() -> impl Strategy<Value = BoundaryOutcome> {
        prop_oneof![
            Just(BoundaryOutcome::TotalInternalReflection),
            Just(BoundaryOutcome::FresnelReflection),
            Just(BoundaryOutcome::LambertianReflection),
            Just(BoundaryOutcome::LobeReflection),
            Just(BoundaryOutcome::SpikeReflection),
            Just(BoundaryOutcome::BackScattering),
        ]
    }

    fn inside_step() -> OpticalStep {
        OpticalStep::photon(
            TrackId(1),
            StepPoint::new(Point3::new(0.0, 0.0, 10.0), 0.0, "Crystal"),
            StepPoint::new(Point3::new(0.0, 20.0, 40.0), 0.1, "Crystal"),
        )
    }

    proptest! {
        #[test]
        fn killed_exactly_at_limit(
            limit in 0u32..40,
            outcomes in prop::collection::vec(reflection(), 0..80),
        ) {
            let config = TrackingConfig::default().with_bounce_limit(limit);
            let mut classifier = BoundaryClassifier::new(
                config,
                Arc::new(SharedBoundaryStatus::new()),
                PhotonDetector::new("d2tb/PhotonDet", 0),
            );
            let mut bounces = BounceCounter::new();
            let mut status = classifier.begin_track(Some("Crystal"));

            let mut killed_at = None;
            for (i, outcome) in outcomes.iter().enumerate() {
                let before = bounces.count();
                let verdict = classifier.classify(&inside_step(), *outcome, &mut bounces, &mut status);
                if verdict.is_terminal() {
                    prop_assert_eq!(bounces.count(), 0);
                    killed_at = Some(i + 1);
                    break;
                }
                prop_assert_eq!(bounces.count(), before + 1);
            }

            let n = outcomes.len();
            if limit > 0 && n >= limit as usize {
                prop_assert_eq!(killed_at, Some(limit as usize));
                prop_assert!(status.is_killed());
            } else {
                prop_assert_eq!(killed_at, None);
                prop_assert!(!status.is_killed());
            }
        }

        #[test]
        fn escape_is_exactly_one_route(
            x in -50.0f64..50.0,
            y in -50.0f64..50.0,
            z in prop_oneof![Just(300.0f64), 0.0f64..299.0],
        ) {
            let mut classifier = BoundaryClassifier::new(
                TrackingConfig::default(),
                Arc::new(SharedBoundaryStatus::new()),
                PhotonDetector::new("d2tb/PhotonDet", 0),
            );
            let mut bounces = BounceCounter::new();
            let mut status = classifier.begin_track(Some("Crystal"));

            let exit = OpticalStep::photon(
                TrackId(3),
                StepPoint::new(Point3::new(0.0, 0.0, 150.0), 0.0, "Crystal"),
                StepPoint::new(Point3::new(x, y, z), 1.0, "WorldBox"),
            );
            let verdict = classifier.classify(&exit, BoundaryOutcome::FresnelRefraction, &mut bounces, &mut status);

            prop_assert!(verdict.is_terminal());
            let side = status.is_status(StatusFlag::EscapedFromSide);
            let readout = status.is_status(StatusFlag::EscapedFromReadOut);
            prop_assert!(side ^ readout);
            prop_assert_eq!(readout, z == 300.0);
        }
    }
}
