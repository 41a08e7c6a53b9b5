//! Common types exchanged between the transport kernel and the tracking core.

use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};

/// Identifier of a track within one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Particle species of the track being stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Photon tracked by the optical transport model
    OpticalPhoton,

    /// Anything else (primaries, electrons, gammas...)
    Other,
}

/// Process that limited the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepProcess {
    /// Geometric step to the next volume boundary
    Transportation,

    /// Bulk absorption inside a material
    OpAbsorption,

    /// Optical boundary interaction
    OpBoundary,

    /// Rayleigh scattering inside a material
    OpRayleigh,

    /// Any other process
    Other,
}

impl StepProcess {
    /// Returns the kernel-side process name.
    pub fn name(&self) -> &'static str {
        match self {
            StepProcess::Transportation => "Transportation",
            StepProcess::OpAbsorption => "OpAbsorption",
            StepProcess::OpBoundary => "OpBoundary",
            StepProcess::OpRayleigh => "OpRayleigh",
            StepProcess::Other => "Other",
        }
    }
}

/// Placement history of the volume a step point lies in.
///
/// Only detector volumes carry one. The copy numbers are 0-based as placed by
/// the geometry; `global_to_local` maps global coordinates into the frame of
/// the touched volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Touchable {
    /// Name of the touched physical volume
    pub physical_volume: String,

    /// Name of its logical volume
    pub logical_volume: String,

    /// Copy number of the enclosing crystal
    pub crystal_copy: u32,

    /// Copy number of the SiPM inside the crystal
    pub sipm_copy: u32,

    /// Rigid transform from global into the touched volume's frame
    pub global_to_local: Isometry3<f64>,
}

impl Touchable {
    /// Transforms a global point into the touched volume's local frame.
    pub fn to_local(&self, global: &Point3<f64>) -> Point3<f64> {
        self.global_to_local.transform_point(global)
    }

    /// Transforms a local point back into global coordinates.
    pub fn to_global(&self, local: &Point3<f64>) -> Point3<f64> {
        self.global_to_local.inverse_transform_point(local)
    }
}

/// One end of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepPoint {
    /// Global position in mm
    pub position: Point3<f64>,

    /// Global time in ns
    pub global_time: f64,

    /// Physical volume name (`None` once the track left the world)
    pub volume: Option<String>,

    /// Touchable of the volume, when it is a detector volume
    pub touchable: Option<Touchable>,
}

impl StepPoint {
    /// Creates a point inside the named volume.
    pub fn new(position: Point3<f64>, global_time: f64, volume: &str) -> Self {
        Self {
            position,
            global_time,
            volume: Some(volume.to_string()),
            touchable: None,
        }
    }

    /// Creates a point outside the world volume.
    pub fn outside_world(position: Point3<f64>, global_time: f64) -> Self {
        Self {
            position,
            global_time,
            volume: None,
            touchable: None,
        }
    }

    /// Attaches a touchable.
    pub fn with_touchable(mut self, touchable: Touchable) -> Self {
        self.touchable = Some(touchable);
        self
    }

    /// Returns the volume name, if any.
    pub fn volume_name(&self) -> Option<&str> {
        self.volume.as_deref()
    }
}

/// A single geometric step of a track, as delivered by the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalStep {
    /// Track being stepped
    pub track_id: TrackId,

    /// Particle species
    pub particle: ParticleKind,

    /// Start of the step
    pub pre: StepPoint,

    /// End of the step
    pub post: StepPoint,

    /// Process that limited the step
    pub process: StepProcess,
}

impl OpticalStep {
    /// Creates an optical-photon step limited by transportation.
    pub fn photon(track_id: TrackId, pre: StepPoint, post: StepPoint) -> Self {
        Self {
            track_id,
            particle: ParticleKind::OpticalPhoton,
            pre,
            post,
            process: StepProcess::Transportation,
        }
    }

    /// Overrides the limiting process.
    pub fn with_process(mut self, process: StepProcess) -> Self {
        self.process = process;
        self
    }

    /// Returns true if the stepping track is an optical photon.
    pub fn is_optical_photon(&self) -> bool {
        self.particle == ParticleKind::OpticalPhoton
    }

    /// Volume the step started in.
    pub fn pre_volume(&self) -> Option<&str> {
        self.pre.volume_name()
    }

    /// Volume the step ended in.
    pub fn post_volume(&self) -> Option<&str> {
        self.post.volume_name()
    }

    /// Returns true if the step ended outside the world.
    pub fn left_world(&self) -> bool {
        self.post.volume.is_none()
    }
}
