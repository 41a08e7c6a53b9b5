//! scintrack Core - Optical-Photon Tracking State Machine
//!
//! Tracks scintillation photons through the crystals of a SiPM-read
//! calorimeter and turns every step into bookkeeping:
//! 1. **Track status**: per-track flag set with invariant-enforcing mutators
//! 2. **Boundary classifier**: per-step decision on reflection, escape,
//!    absorption and detection, with bounce-limit enforcement
//! 3. **Hit recording**: immutable SiPM hits grouped per event and detector
//!
//! # Architecture
//!
//! ```text
//! kernel step ──► BoundaryClassifier ──► TrackStatus / BounceCounter
//!                      │      ▲
//!                      │      └── BoundaryOutcomeProvider (injected)
//!                      ├──► HitRecorder (injected) ──► HitCollection
//!                      └──► EventTally ──► RunSummary
//! ```
//!
//! # Example
//!
//! ```ignore
//! let boundary = SharedBoundaryStatus::new();
//! let mut classifier = BoundaryClassifier::new(
//!     TrackingConfig::default(),
//!     Arc::new(boundary.clone()),
//!     PhotonDetector::new("d2tb/PhotonDet", 0),
//! );
//!
//! let mut status = classifier.begin_track(Some("Crystal"));
//! let mut bounces = BounceCounter::new();
//! // kernel: boundary.set(outcome) then
//! let verdict = classifier.classify_step(&step, &mut bounces, &mut status);
//! ```

pub mod bounce;
pub mod classifier;
pub mod config;
pub mod error;
pub mod hit;
pub mod tally;
pub mod track_status;

// Re-export key types for convenience
pub use bounce::{BounceCounter, BounceLimit};
pub use classifier::{BoundaryClassifier, StepVerdict};
pub use config::{load_json, DetectorConfig, ScintrackConfig, TrackingConfig};
pub use error::ConfigError;
pub use hit::{HitCollection, HitRecorder, PhotonDetHit, PhotonDetector};
pub use tally::{EventTally, PerEventAverages, RunSummary, TrackFate};
pub use track_status::{StatusFlag, TrackStatus};
