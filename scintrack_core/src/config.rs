//! Detector and tracking configuration.
//!
//! All lengths are in mm and all times in ns.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// DETECTOR GEOMETRY
// ============================================================================

/// Geometry parameters of the crystal calorimeter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of crystals (1..=9)
    pub n_crystals: u32,

    /// Crystals placed per row of the array
    pub crystals_per_row: u32,

    /// Crystal size in the XY plane
    pub crystal_size_xy: f64,

    /// Crystal size along the beam (z)
    pub crystal_depth: f64,

    /// SiPM size in the XY plane
    pub sipm_size_xy: f64,

    /// SiPM size along z (0 < depth <= 1 mm)
    pub sipm_depth: f64,

    /// Photon detection efficiency of the SiPMs [0, 1]
    pub sipm_pde: f64,

    /// SiPMs per row of the read-out grid
    pub sipms_per_row: u32,

    /// Rows of SiPMs on the read-out face
    pub sipm_rows: u32,

    /// Pitch of the SiPM grid
    pub sipm_spacing: f64,

    /// World box size in the XY plane
    pub world_size_xy: f64,

    /// World box size along z
    pub world_size_z: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            n_crystals: 1,
            crystals_per_row: 3,
            crystal_size_xy: 100.0, // 10 cm
            crystal_depth: 300.0,   // 30 cm
            sipm_size_xy: 1.0,
            sipm_depth: 0.1,
            sipm_pde: 1.0,
            sipms_per_row: 5,
            sipm_rows: 5,
            sipm_spacing: 5.0,
            world_size_xy: 1000.0,
            world_size_z: 1000.0,
        }
    }
}

impl DetectorConfig {
    /// Maximum number of crystals the array supports.
    pub const MAX_CRYSTALS: u32 = 9;

    /// z coordinate of the crystal read-out end.
    pub fn crystal_end(&self) -> f64 {
        self.crystal_depth
    }

    /// Side of the calorimeter footprint in the XY plane.
    pub fn calo_size_xy(&self) -> f64 {
        self.crystal_size_xy * self.crystals_per_row as f64
    }

    /// Total depth of crystal plus read-out.
    pub fn calo_depth(&self) -> f64 {
        self.crystal_depth + self.sipm_depth
    }

    /// Number of SiPMs on each crystal.
    pub fn sipms_per_crystal(&self) -> u32 {
        self.sipms_per_row * self.sipm_rows
    }

    /// Checks every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_crystals == 0 || self.n_crystals > Self::MAX_CRYSTALS {
            return Err(ConfigError::invalid(
                "n_crystals",
                format!("{} not in 1..={}", self.n_crystals, Self::MAX_CRYSTALS),
            ));
        }
        if self.crystals_per_row == 0 {
            return Err(ConfigError::invalid("crystals_per_row", "must be > 0"));
        }
        if self.n_crystals > 3 * self.crystals_per_row {
            return Err(ConfigError::invalid(
                "n_crystals",
                format!("{} crystals do not fit in 3 rows of {}", self.n_crystals, self.crystals_per_row),
            ));
        }
        positive("crystal_size_xy", self.crystal_size_xy)?;
        positive("crystal_depth", self.crystal_depth)?;
        positive("sipm_size_xy", self.sipm_size_xy)?;
        positive("sipm_spacing", self.sipm_spacing)?;
        positive("world_size_xy", self.world_size_xy)?;
        positive("world_size_z", self.world_size_z)?;

        if !(self.sipm_depth > 0.0 && self.sipm_depth <= 1.0) {
            return Err(ConfigError::invalid(
                "sipm_depth",
                format!("{} not in (0, 1] mm", self.sipm_depth),
            ));
        }
        if !(0.0..=1.0).contains(&self.sipm_pde) {
            return Err(ConfigError::invalid(
                "sipm_pde",
                format!("{} not in [0, 1]", self.sipm_pde),
            ));
        }
        if self.sipms_per_row == 0 || self.sipm_rows == 0 {
            return Err(ConfigError::invalid("sipms_per_row", "SiPM grid must not be empty"));
        }
        if self.sipm_size_xy > self.sipm_spacing {
            return Err(ConfigError::invalid(
                "sipm_size_xy",
                "SiPMs larger than the grid pitch would overlap",
            ));
        }

        // The grid starts one pitch in from the crystal corner.
        let grid_extent = self.sipm_spacing * self.sipms_per_row.max(self.sipm_rows) as f64
            + self.sipm_size_xy / 2.0;
        if grid_extent > self.crystal_size_xy {
            return Err(ConfigError::invalid(
                "sipm_spacing",
                format!("SiPM grid extent {:.2} exceeds crystal size {:.2}", grid_extent, self.crystal_size_xy),
            ));
        }
        if self.calo_size_xy() > self.world_size_xy || self.calo_depth() > self.world_size_z {
            return Err(ConfigError::invalid("world_size_xy", "calorimeter does not fit in the world"));
        }

        Ok(())
    }
}

// ============================================================================
// TRACKING POLICY
// ============================================================================

/// Policy parameters of the boundary classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Maximum reflections before a photon is killed (0 = unlimited)
    pub bounce_limit: u32,

    /// Physical volume name of the crystals
    pub crystal_volume: String,

    /// Physical volume name of the world
    pub world_volume: String,

    /// Physical volume name of the photosensitive surface
    pub photodetector_volume: String,

    /// Name of the sensitive detector that owns the hits
    pub detector_name: String,

    /// z of the crystal read-out plane
    pub readout_plane_z: f64,

    /// Tolerance when comparing positions against the read-out plane
    pub plane_tolerance: f64,

    /// Sensitive detector verbosity (> 1 logs every hit at end of event)
    pub detector_verbose: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            bounce_limit: 10_000,
            crystal_volume: "Crystal".to_string(),
            world_volume: "WorldBox".to_string(),
            photodetector_volume: "PhotonDet".to_string(),
            detector_name: "d2tb/PhotonDet".to_string(),
            readout_plane_z: DetectorConfig::default().crystal_end(),
            plane_tolerance: 1e-6,
            detector_verbose: 0,
        }
    }
}

impl TrackingConfig {
    /// Tracking policy matching the given detector (read-out plane at the crystal end).
    pub fn for_detector(detector: &DetectorConfig) -> Self {
        Self {
            readout_plane_z: detector.crystal_end(),
            ..Default::default()
        }
    }

    /// Sets the bounce limit.
    pub fn with_bounce_limit(mut self, limit: u32) -> Self {
        self.bounce_limit = limit;
        self
    }

    /// Checks names and numeric parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("crystal_volume", &self.crystal_volume),
            ("world_volume", &self.world_volume),
            ("photodetector_volume", &self.photodetector_volume),
            ("detector_name", &self.detector_name),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid(name, "must not be empty"));
            }
        }
        if self.crystal_volume == self.world_volume {
            return Err(ConfigError::invalid("world_volume", "must differ from crystal_volume"));
        }
        if !self.readout_plane_z.is_finite() {
            return Err(ConfigError::invalid("readout_plane_z", "must be finite"));
        }
        if !(self.plane_tolerance.is_finite() && self.plane_tolerance >= 0.0) {
            return Err(ConfigError::invalid("plane_tolerance", "must be finite and >= 0"));
        }
        Ok(())
    }
}

// ============================================================================
// COMBINED CONFIG
// ============================================================================

/// Detector geometry plus tracking policy.
///
/// When a document leaves out `tracking.readout_plane_z`, the plane follows
/// the end of the crystals it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScintrackConfigDoc")]
pub struct ScintrackConfig {
    pub detector: DetectorConfig,
    pub tracking: TrackingConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ScintrackConfigDoc {
    detector: DetectorConfig,
    tracking: TrackingDoc,
}

#[derive(Deserialize, Default)]
struct TrackingDoc {
    #[serde(default)]
    readout_plane_z: Option<f64>,
    #[serde(flatten)]
    rest: TrackingConfig,
}

impl From<ScintrackConfigDoc> for ScintrackConfig {
    fn from(doc: ScintrackConfigDoc) -> Self {
        let ScintrackConfigDoc { detector, tracking } = doc;
        let readout_plane_z = tracking
            .readout_plane_z
            .unwrap_or_else(|| detector.crystal_end());
        Self {
            tracking: TrackingConfig {
                readout_plane_z,
                ..tracking.rest
            },
            detector,
        }
    }
}

impl Default for ScintrackConfig {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        let tracking = TrackingConfig::for_detector(&detector);
        Self { detector, tracking }
    }
}

impl ScintrackConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates both sections and that the read-out plane sits on the crystal end.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.tracking.validate()?;
        let crystal_end = self.detector.crystal_end();
        if (self.tracking.readout_plane_z - crystal_end).abs() > self.tracking.plane_tolerance {
            return Err(ConfigError::invalid(
                "readout_plane_z",
                format!(
                    "{} does not match the crystal end z={}",
                    self.tracking.readout_plane_z, crystal_end
                ),
            ));
        }
        Ok(())
    }
}

/// Reads a JSON document into any deserializable config type.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("{} must be > 0", value)))
    }
}
