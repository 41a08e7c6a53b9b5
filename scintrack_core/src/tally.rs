//! Event and run statistics.
//!
//! Every optical photon of an event ends with exactly one [`TrackFate`]; the
//! [`EventTally`] counts them next to the scintillation yield so the books
//! can be balanced at the end of the event. Worker tallies are merged into a
//! [`RunSummary`] at run end.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Terminal classification of an optical-photon track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackFate {
    /// Detected by a SiPM, hit recorded
    Detected,
    /// Detection reported outside the photodetector volume, no hit
    DetectedOutside,
    /// Bulk absorption inside a volume
    VolumeAbsorbed,
    /// Absorbed at an interface
    BoundaryAbsorbed,
    /// Left the crystal through a side face
    EscapedFromSide,
    /// Left the crystal through the read-out end
    EscapedFromReadOut,
    /// Killed by the bounce limit
    BounceLimit,
    /// Stepped out of the world volume
    LeftWorld,
}

impl TrackFate {
    /// Returns the fate name.
    pub fn name(&self) -> &'static str {
        match self {
            TrackFate::Detected => "detected",
            TrackFate::DetectedOutside => "detected_outside",
            TrackFate::VolumeAbsorbed => "volume_absorbed",
            TrackFate::BoundaryAbsorbed => "boundary_absorbed",
            TrackFate::EscapedFromSide => "escaped_from_side",
            TrackFate::EscapedFromReadOut => "escaped_from_readout",
            TrackFate::BounceLimit => "bounce_limit",
            TrackFate::LeftWorld => "left_world",
        }
    }
}

impl std::fmt::Display for TrackFate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Counters of a single event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    /// Photons detected (one hit each)
    pub hits: u64,
    /// Optical photons produced by scintillation
    pub scintillation_photons: u64,
    /// Bulk absorptions
    pub absorptions: u64,
    /// Absorptions at an interface
    pub boundary_absorptions: u64,
    pub escaped_side: u64,
    pub escaped_readout: u64,
    /// Tracks killed by the bounce limit
    pub bounce_kills: u64,
    pub left_world: u64,
    /// Detections outside the photodetector volume
    pub undetected_detections: u64,
    /// Fresnel reflections at the read-out plane (first per track)
    pub reflected_at_readout: u64,
}

impl EventTally {
    /// Creates an all-zero tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one newly produced scintillation photon.
    pub fn inc_scintillation(&mut self) {
        self.scintillation_photons += 1;
    }

    /// Counts the fate of a finished track.
    pub fn record_fate(&mut self, fate: TrackFate) {
        match fate {
            TrackFate::Detected => self.hits += 1,
            TrackFate::DetectedOutside => self.undetected_detections += 1,
            TrackFate::VolumeAbsorbed => self.absorptions += 1,
            TrackFate::BoundaryAbsorbed => self.boundary_absorptions += 1,
            TrackFate::EscapedFromSide => self.escaped_side += 1,
            TrackFate::EscapedFromReadOut => self.escaped_readout += 1,
            TrackFate::BounceLimit => self.bounce_kills += 1,
            TrackFate::LeftWorld => self.left_world += 1,
        }
    }

    /// Number of tracks that reached a fate.
    pub fn terminated_tracks(&self) -> u64 {
        self.hits
            + self.undetected_detections
            + self.absorptions
            + self.boundary_absorptions
            + self.escaped_side
            + self.escaped_readout
            + self.bounce_kills
            + self.left_world
    }

    /// Number of tracks that left the crystal by either route.
    pub fn escaped(&self) -> u64 {
        self.escaped_side + self.escaped_readout
    }

    /// Adds another tally into this one.
    pub fn merge(&mut self, other: &EventTally) {
        self.hits += other.hits;
        self.scintillation_photons += other.scintillation_photons;
        self.absorptions += other.absorptions;
        self.boundary_absorptions += other.boundary_absorptions;
        self.escaped_side += other.escaped_side;
        self.escaped_readout += other.escaped_readout;
        self.bounce_kills += other.bounce_kills;
        self.left_world += other.left_world;
        self.undetected_detections += other.undetected_detections;
        self.reflected_at_readout += other.reflected_at_readout;
    }
}

/// Averages per event, as printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerEventAverages {
    pub hits: f64,
    pub scintillation_photons: f64,
    pub absorptions: f64,
    pub boundary_absorptions: f64,
}

/// Run-level statistics accumulated from event tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of events processed
    pub events: u64,
    /// Sum of all event tallies
    pub totals: EventTally,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates one finished event.
    pub fn add_event(&mut self, tally: &EventTally) {
        self.events += 1;
        self.totals.merge(tally);
    }

    /// Merges the summary of another worker.
    pub fn merge(&mut self, other: &RunSummary) {
        self.events += other.events;
        self.totals.merge(&other.totals);
    }

    /// Per-event averages, `None` for an empty run.
    pub fn per_event(&self) -> Option<PerEventAverages> {
        if self.events == 0 {
            return None;
        }
        let n = self.events as f64;
        Some(PerEventAverages {
            hits: self.totals.hits as f64 / n,
            scintillation_photons: self.totals.scintillation_photons as f64 / n,
            absorptions: self.totals.absorptions as f64 / n,
            boundary_absorptions: self.totals.boundary_absorptions as f64 / n,
        })
    }

    /// Fraction of scintillation photons that were detected.
    pub fn light_yield_fraction(&self) -> f64 {
        if self.totals.scintillation_photons == 0 {
            0.0
        } else {
            self.totals.hits as f64 / self.totals.scintillation_photons as f64
        }
    }

    /// Logs the end-of-run report.
    pub fn log_summary(&self, run_id: u32) {
        let Some(avg) = self.per_event() else {
            info!("Run {} ended with no events", run_id);
            return;
        };

        info!("--------------------End of Global Run-----------------------");
        info!(" The run {} consists of {} events", run_id, self.events);
        info!(" Average number of hits per event: {:.2}", avg.hits);
        info!(" Average scintillation photons per event: {:.2}", avg.scintillation_photons);
        info!(" Average absorptions per event: {:.2}", avg.absorptions);
        info!(" Average boundary absorptions per event: {:.2}", avg.boundary_absorptions);
        info!(
            " Escapes: side={} readout={} | bounce kills={} | left world={}",
            self.totals.escaped_side,
            self.totals.escaped_readout,
            self.totals.bounce_kills,
            self.totals.left_world
        );
        info!("------------------------------------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_every_fate_counts_one_track() {
        let fates = [
            TrackFate::Detected,
            TrackFate::DetectedOutside,
            TrackFate::VolumeAbsorbed,
            TrackFate::BoundaryAbsorbed,
            TrackFate::EscapedFromSide,
            TrackFate::EscapedFromReadOut,
            TrackFate::BounceLimit,
            TrackFate::LeftWorld,
        ];
        let mut tally = EventTally::new();
        for fate in fates {
            tally.record_fate(fate);
        }
        assert_eq!(tally.terminated_tracks(), fates.len() as u64);
        assert_eq!(tally.hits, 1);
        assert_eq!(tally.escaped(), 2);
    }

    #[test]
    fn test_merge_adds_counters() {
        let mut a = EventTally::new();
        a.inc_scintillation();
        a.record_fate(TrackFate::Detected);

        let mut b = EventTally::new();
        b.inc_scintillation();
        b.record_fate(TrackFate::VolumeAbsorbed);
        b.reflected_at_readout = 2;

        a.merge(&b);
        assert_eq!(a.scintillation_photons, 2);
        assert_eq!(a.hits, 1);
        assert_eq!(a.absorptions, 1);
        assert_eq!(a.reflected_at_readout, 2);
    }

    #[test]
    fn test_run_averages() {
        let mut run = RunSummary::new();
        assert!(run.per_event().is_none());

        let mut event = EventTally::new();
        for _ in 0..10 {
            event.inc_scintillation();
        }
        for _ in 0..4 {
            event.record_fate(TrackFate::Detected);
        }
        run.add_event(&event);
        run.add_event(&EventTally::new());

        let avg = run.per_event().unwrap();
        assert_relative_eq!(avg.hits, 2.0);
        assert_relative_eq!(avg.scintillation_photons, 5.0);
        assert_relative_eq!(run.light_yield_fraction(), 0.4);
    }

    #[test]
    fn test_run_merge() {
        let mut a = RunSummary::new();
        a.add_event(&EventTally::new());
        let mut b = RunSummary::new();
        let mut event = EventTally::new();
        event.record_fate(TrackFate::BounceLimit);
        b.add_event(&event);
        b.add_event(&event);

        a.merge(&b);
        assert_eq!(a.events, 3);
        assert_eq!(a.totals.bounce_kills, 2);
    }
}
