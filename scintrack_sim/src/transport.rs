//! Toy optical transport kernel.
//!
//! Moves photons on straight lines inside a crystal box and decides what
//! happens at each face:
//! - **Read-out face over a SiPM**: detected with probability PDE, else
//!   absorbed at the boundary
//! - **Any face**: total internal reflection when `n sin(theta) > n_out`
//! - **Wrapped faces**: specular reflection with the wrap reflectivity, else
//!   boundary absorption
//! - **Bare faces** (read-out face, unwrapped sides): Fresnel reflection or
//!   refraction into the world
//!
//! Bulk absorption and, when a Rayleigh length is set, isotropic scattering
//! compete with every flight through exponential free paths. The outcome of each step is written to the shared boundary status
//! cell before the step is handed over.

use crate::geometry::{Crystal, CrystalArray};
use nalgebra::{Point3, Unit, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Exp, UnitSphere};
use scintrack_core::{ConfigError, TrackingConfig};
use scintrack_env::{BoundaryOutcome, OpticalStep, SharedBoundaryStatus, StepPoint, StepProcess, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Speed of light in mm/ns.
pub const C_LIGHT: f64 = 299.792_458;

/// Optical properties of the crystals and their wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticsConfig {
    /// Crystal refractive index (LYSO)
    pub refractive_index: f64,

    /// Refractive index outside the crystal
    pub outside_index: f64,

    /// Bulk absorption length (mm)
    pub absorption_length: f64,

    /// Rayleigh scattering length (mm), 0 = no scattering
    pub rayleigh_length: f64,

    /// Scintillation decay time (ns), 0 = prompt emission
    pub decay_time: f64,

    /// Probability that the wrapping reflects a photon
    pub wrap_reflectivity: f64,

    /// Side and back faces carry a reflective wrapping
    pub wrapped_sides: bool,
}

impl Default for OpticsConfig {
    fn default() -> Self {
        Self {
            refractive_index: 1.82,
            outside_index: 1.0,
            absorption_length: 200.0, // 20 cm
            rayleigh_length: 0.0,
            decay_time: 40.0,
            wrap_reflectivity: 0.95,
            wrapped_sides: true,
        }
    }
}

impl OpticsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.refractive_index.is_finite() && self.refractive_index >= 1.0) {
            return Err(ConfigError::invalid("refractive_index", "must be >= 1"));
        }
        if !(self.outside_index.is_finite() && self.outside_index >= 1.0) {
            return Err(ConfigError::invalid("outside_index", "must be >= 1"));
        }
        // A finite absorption length is what ends every photon.
        if !(self.absorption_length.is_finite() && self.absorption_length > 0.0) {
            return Err(ConfigError::invalid("absorption_length", "must be finite and > 0"));
        }
        if !(self.rayleigh_length.is_finite() && self.rayleigh_length >= 0.0) {
            return Err(ConfigError::invalid("rayleigh_length", "must be finite and >= 0"));
        }
        if !(self.decay_time.is_finite() && self.decay_time >= 0.0) {
            return Err(ConfigError::invalid("decay_time", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.wrap_reflectivity) {
            return Err(ConfigError::invalid("wrap_reflectivity", "must be in [0, 1]"));
        }
        Ok(())
    }

    /// Photon group velocity inside the crystal (mm/ns).
    pub fn speed(&self) -> f64 {
        C_LIGHT / self.refractive_index
    }
}

/// A photon in flight, only ever built by [`OpticalTransport::emit`].
#[derive(Debug, Clone)]
pub struct Photon {
    pub track_id: TrackId,

    /// Index of the crystal the photon travels in
    crystal: usize,

    pub position: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,

    /// Global time (ns)
    pub time: f64,
}

impl Photon {
    /// Index of the crystal the photon travels in.
    pub fn crystal(&self) -> usize {
        self.crystal
    }
}

/// Unpolarized Fresnel reflectance for an incidence cosine `cos_i`.
///
/// Returns 1 beyond the critical angle.
pub fn fresnel_reflectance(n1: f64, n2: f64, cos_i: f64) -> f64 {
    let cos_i = cos_i.abs().min(1.0);
    let sin_t = n1 / n2 * (1.0 - cos_i * cos_i).sqrt();
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).sqrt();
    let rs = (n1 * cos_i - n2 * cos_t) / (n1 * cos_i + n2 * cos_t);
    let rp = (n1 * cos_t - n2 * cos_i) / (n1 * cos_t + n2 * cos_i);
    0.5 * (rs * rs + rp * rp)
}

/// Face of a crystal box hit by a photon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Face {
    axis: usize,
    upper: bool,
}

impl Face {
    fn is_readout(&self) -> bool {
        self.axis == 2 && self.upper
    }
}

/// Straight-line optical transport inside the crystal array.
pub struct OpticalTransport {
    array: Arc<CrystalArray>,
    optics: OpticsConfig,
    crystal_volume: String,
    world_volume: String,
    photodetector_volume: String,
    boundary: SharedBoundaryStatus,
    free_path: Exp<f64>,
    scatter_path: Option<Exp<f64>>,
    decay: Option<Exp<f64>>,
}

impl OpticalTransport {
    /// Creates a kernel writing step outcomes into `boundary`.
    pub fn new(
        array: Arc<CrystalArray>,
        optics: OpticsConfig,
        tracking: &TrackingConfig,
        boundary: SharedBoundaryStatus,
    ) -> Result<Self, ConfigError> {
        optics.validate()?;

        let free_path = Exp::new(1.0 / optics.absorption_length)
            .map_err(|e| ConfigError::invalid("absorption_length", e.to_string()))?;
        let scatter_path = if optics.rayleigh_length > 0.0 {
            Some(
                Exp::new(1.0 / optics.rayleigh_length)
                    .map_err(|e| ConfigError::invalid("rayleigh_length", e.to_string()))?,
            )
        } else {
            None
        };
        let decay = if optics.decay_time > 0.0 {
            Some(
                Exp::new(1.0 / optics.decay_time)
                    .map_err(|e| ConfigError::invalid("decay_time", e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Self {
            array,
            optics,
            crystal_volume: tracking.crystal_volume.clone(),
            world_volume: tracking.world_volume.clone(),
            photodetector_volume: tracking.photodetector_volume.clone(),
            boundary,
            free_path,
            scatter_path,
            decay,
        })
    }

    pub fn array(&self) -> &CrystalArray {
        &self.array
    }

    pub fn optics(&self) -> &OpticsConfig {
        &self.optics
    }

    /// Uniform energy deposit point inside a crystal.
    pub fn sample_deposit<R: Rng>(&self, crystal: &Crystal, rng: &mut R) -> Point3<f64> {
        Point3::new(
            rng.gen_range(crystal.min.x..crystal.max.x),
            rng.gen_range(crystal.min.y..crystal.max.y),
            rng.gen_range(crystal.min.z..crystal.max.z),
        )
    }

    /// Emits an isotropic scintillation photon at `origin`.
    ///
    /// Returns `None` unless `crystal` belongs to this array and contains `origin`.
    pub fn emit<R: Rng>(
        &self,
        track_id: TrackId,
        crystal: usize,
        origin: Point3<f64>,
        rng: &mut R,
    ) -> Option<Photon> {
        if !self.array.crystal(crystal)?.contains(&origin) {
            return None;
        }
        Some(Photon {
            track_id,
            crystal,
            position: origin,
            direction: random_direction(rng),
            time: self.decay.map(|d| d.sample(rng)).unwrap_or(0.0),
        })
    }

    /// Advances a photon by one step and returns the step for the tracking core.
    pub fn step<R: Rng>(&self, photon: &mut Photon, rng: &mut R) -> OpticalStep {
        // emit() checked the index against this array.
        let crystal = &self.array.crystals()[photon.crystal];

        let pre = self.point_in(&self.crystal_volume, photon);
        let (distance, face) = distance_to_face(crystal, &photon.position, &photon.direction);
        let free_path = self.free_path.sample(rng);
        let scatter_path = self.scatter_path.map_or(f64::INFINITY, |s| s.sample(rng));

        if free_path < distance && free_path <= scatter_path {
            self.advance(photon, crystal, free_path);
            let post = self.point_in(&self.crystal_volume, photon);
            return self.finish_step(photon, pre, post, StepProcess::OpAbsorption, BoundaryOutcome::NotAtBoundary);
        }
        if scatter_path < distance {
            self.advance(photon, crystal, scatter_path);
            photon.direction = random_direction(rng);
            let post = self.point_in(&self.crystal_volume, photon);
            return self.finish_step(photon, pre, post, StepProcess::OpRayleigh, BoundaryOutcome::NotAtBoundary);
        }

        self.advance(photon, crystal, distance);
        // Land exactly on the face.
        photon.position[face.axis] = if face.upper { crystal.max[face.axis] } else { crystal.min[face.axis] };

        let cos_i = photon.direction[face.axis].abs();
        let n1 = self.optics.refractive_index;
        let n2 = self.optics.outside_index;

        if face.is_readout() {
            if let Some(sipm) = self.array.sipm_at(crystal, &photon.position) {
                let outcome = if rng.gen::<f64>() < self.array.detector().sipm_pde {
                    BoundaryOutcome::Detection
                } else {
                    BoundaryOutcome::Absorption
                };
                let post = self
                    .point_in(&self.photodetector_volume, photon)
                    .with_touchable(sipm.touchable.clone());
                return self.finish_step(photon, pre, post, StepProcess::OpBoundary, outcome);
            }
        }

        let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
        if n1 * sin_i > n2 {
            self.reflect(photon, face);
            let post = self.point_in(&self.crystal_volume, photon);
            return self.finish_step(photon, pre, post, StepProcess::OpBoundary, BoundaryOutcome::TotalInternalReflection);
        }

        if self.optics.wrapped_sides && !face.is_readout() {
            if rng.gen::<f64>() < self.optics.wrap_reflectivity {
                self.reflect(photon, face);
                let post = self.point_in(&self.crystal_volume, photon);
                return self.finish_step(photon, pre, post, StepProcess::OpBoundary, BoundaryOutcome::SpikeReflection);
            }
            let post = self.point_in(&self.crystal_volume, photon);
            return self.finish_step(photon, pre, post, StepProcess::OpBoundary, BoundaryOutcome::Absorption);
        }

        if rng.gen::<f64>() < fresnel_reflectance(n1, n2, cos_i) {
            self.reflect(photon, face);
            let post = self.point_in(&self.crystal_volume, photon);
            return self.finish_step(photon, pre, post, StepProcess::OpBoundary, BoundaryOutcome::FresnelReflection);
        }

        let post = self.point_in(&self.world_volume, photon);
        self.finish_step(photon, pre, post, StepProcess::OpBoundary, BoundaryOutcome::FresnelRefraction)
    }

    fn point_in(&self, volume: &str, photon: &Photon) -> StepPoint {
        StepPoint::new(photon.position, photon.time, volume)
    }

    fn advance(&self, photon: &mut Photon, crystal: &Crystal, distance: f64) {
        photon.position += photon.direction.into_inner() * distance;
        for i in 0..3 {
            photon.position[i] = photon.position[i].clamp(crystal.min[i], crystal.max[i]);
        }
        photon.time += distance / self.optics.speed();
    }

    fn reflect(&self, photon: &mut Photon, face: Face) {
        let mut d = photon.direction.into_inner();
        d[face.axis] = -d[face.axis];
        photon.direction = Unit::new_normalize(d);
    }

    fn finish_step(
        &self,
        photon: &Photon,
        pre: StepPoint,
        post: StepPoint,
        process: StepProcess,
        outcome: BoundaryOutcome,
    ) -> OpticalStep {
        self.boundary.set(outcome);
        OpticalStep::photon(photon.track_id, pre, post).with_process(process)
    }
}

fn random_direction<R: Rng>(rng: &mut R) -> Unit<Vector3<f64>> {
    let [x, y, z]: [f64; 3] = UnitSphere.sample(rng);
    Unit::new_normalize(Vector3::new(x, y, z))
}

/// Distance along `direction` to the first face of the crystal box.
fn distance_to_face(crystal: &Crystal, position: &Point3<f64>, direction: &Vector3<f64>) -> (f64, Face) {
    let mut best = (f64::INFINITY, Face { axis: 2, upper: true });
    for axis in 0..3 {
        let d = direction[axis];
        if d == 0.0 {
            continue;
        }
        let upper = d > 0.0;
        let bound = if upper { crystal.max[axis] } else { crystal.min[axis] };
        let t = ((bound - position[axis]) / d).max(0.0);
        if t < best.0 {
            best = (t, Face { axis, upper });
        }
    }
    best
}
