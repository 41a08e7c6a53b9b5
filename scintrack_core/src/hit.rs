//! Photon detector hits and the sensitive detector that collects them.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// HIT RECORD
// ============================================================================

/// A photon detected on a SiPM. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotonDetHit {
    /// Arrival time on the SiPM (ns)
    arrival_time: f64,

    /// Crystal number (copy number + 1)
    crystal_no: u32,

    /// SiPM number inside the crystal (copy number + 1)
    sipm_no: u32,

    /// Where the photon left the crystal (global)
    exit_position: Point3<f64>,

    /// Where the photon hit the SiPM (global)
    arrive_position: Point3<f64>,

    /// Where the photon hit the SiPM (SiPM frame)
    arrive_local_position: Point3<f64>,

    /// Logical volume of the detecting surface
    logical_volume: String,
}

impl PhotonDetHit {
    /// Creates a hit. Negative arrival times are clamped to zero.
    pub fn new(
        exit_position: Point3<f64>,
        arrive_position: Point3<f64>,
        arrive_local_position: Point3<f64>,
        arrival_time: f64,
        logical_volume: &str,
        crystal_no: u32,
        sipm_no: u32,
    ) -> Self {
        Self {
            arrival_time: arrival_time.max(0.0),
            crystal_no,
            sipm_no,
            exit_position,
            arrive_position,
            arrive_local_position,
            logical_volume: logical_volume.to_string(),
        }
    }

    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    pub fn crystal_no(&self) -> u32 {
        self.crystal_no
    }

    pub fn sipm_no(&self) -> u32 {
        self.sipm_no
    }

    pub fn exit_position(&self) -> Point3<f64> {
        self.exit_position
    }

    pub fn arrive_position(&self) -> Point3<f64> {
        self.arrive_position
    }

    pub fn arrive_local_position(&self) -> Point3<f64> {
        self.arrive_local_position
    }

    pub fn logical_volume(&self) -> &str {
        &self.logical_volume
    }
}

/// Two hits are the same hit channel when they landed on the same SiPM of
/// the same crystal.
impl PartialEq for PhotonDetHit {
    fn eq(&self, other: &Self) -> bool {
        self.crystal_no == other.crystal_no && self.sipm_no == other.sipm_no
    }
}

impl std::fmt::Display for PhotonDetHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = |v: &Point3<f64>| format!("({:.3}, {:.3}, {:.3}) mm", v.x, v.y, v.z);
        write!(
            f,
            "exit {} | arrive {} (local {}) | t={:.3} ns | crystal {} sipm {} [{}]",
            p(&self.exit_position),
            p(&self.arrive_position),
            p(&self.arrive_local_position),
            self.arrival_time,
            self.crystal_no,
            self.sipm_no,
            self.logical_volume,
        )
    }
}

// ============================================================================
// HIT COLLECTION
// ============================================================================

/// Hits of one event, keyed by sensitive detector name.
///
/// Within a detector the hits keep detection order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitCollection {
    detectors: BTreeMap<String, Vec<PhotonDetHit>>,
}

impl HitCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hit under `detector` and returns it.
    pub fn insert(&mut self, detector: &str, hit: PhotonDetHit) -> &PhotonDetHit {
        let hits = self.detectors.entry(detector.to_string()).or_default();
        hits.push(hit);
        &hits[hits.len() - 1]
    }

    /// Hits recorded by `detector`, in detection order.
    pub fn hits(&self, detector: &str) -> &[PhotonDetHit] {
        self.detectors
            .get(detector)
            .map(|hits| hits.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over (detector, hits) pairs.
    pub fn detectors(&self) -> impl Iterator<Item = (&str, &[PhotonDetHit])> {
        self.detectors
            .iter()
            .map(|(name, hits)| (name.as_str(), hits.as_slice()))
    }

    /// Total number of hits across detectors.
    pub fn total_hits(&self) -> usize {
        self.detectors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_hits() == 0
    }

    pub fn clear(&mut self) {
        self.detectors.clear();
    }
}

// ============================================================================
// RECORDER INTERFACE
// ============================================================================

/// Sink for detection events, injected into the boundary classifier.
pub trait HitRecorder: Send {
    /// Name of the sensitive detector the hits belong to.
    fn detector_name(&self) -> &str;

    /// Appends a hit to the current event and returns the stored record.
    fn record_hit(&mut self, hit: PhotonDetHit) -> &PhotonDetHit;
}

/// Sensitive detector made of the SiPM photocathodes.
///
/// Hits are generated manually by the classifier from the post-step point of
/// a detection step; the collection is rebuilt at the start of every event.
#[derive(Debug, Clone)]
pub struct PhotonDetector {
    name: String,
    hits: HitCollection,
    verbose: u32,
}

impl PhotonDetector {
    /// Name of the hit collection the detector fills.
    pub const COLLECTION_NAME: &'static str = "PhotonDetHitCollection";

    /// Creates a detector with the given name and verbosity.
    pub fn new(name: &str, verbose: u32) -> Self {
        Self {
            name: name.to_string(),
            hits: HitCollection::new(),
            verbose,
        }
    }

    /// Begin-of-event: start from an empty collection.
    pub fn initialize(&mut self) {
        self.hits.clear();
    }

    /// End-of-event: hands over the event's hits and starts a fresh collection.
    pub fn end_of_event(&mut self) -> HitCollection {
        let hits = std::mem::take(&mut self.hits);

        if self.verbose > 1 {
            let detected = hits.hits(&self.name);
            debug!(
                "<<< {} of {}: {} photons detected",
                Self::COLLECTION_NAME,
                self.name,
                detected.len()
            );
            for hit in detected {
                debug!("  {}", hit);
            }
        }

        hits
    }

    /// Hits recorded so far in this event.
    pub fn collection(&self) -> &HitCollection {
        &self.hits
    }

    /// Number of hits recorded so far in this event.
    pub fn hit_count(&self) -> usize {
        self.hits.hits(&self.name).len()
    }
}

impl HitRecorder for PhotonDetector {
    fn detector_name(&self) -> &str {
        &self.name
    }

    fn record_hit(&mut self, hit: PhotonDetHit) -> &PhotonDetHit {
        self.hits.insert(&self.name, hit)
    }
}
