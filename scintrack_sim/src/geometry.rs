//! Crystal array geometry.
//!
//! Crystals are boxes on a square grid (`crystals_per_row` per row) centred
//! on the beam axis, each spanning z in [0, depth]. The read-out face at
//! z = depth carries a grid of SiPMs. Every SiPM is placed with a half-turn
//! about x so its local +z looks back into the crystal.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use scintrack_core::{ConfigError, DetectorConfig};
use scintrack_env::Touchable;

/// One SiPM on a crystal read-out face.
#[derive(Debug, Clone)]
pub struct Sipm {
    /// Copy number inside the crystal (0-based)
    pub copy: u32,

    /// Global centre of the SiPM volume
    pub centre: Point3<f64>,

    /// Touchable handed to the tracking core on detection
    pub touchable: Touchable,
}

/// One scintillating crystal.
#[derive(Debug, Clone)]
pub struct Crystal {
    /// Copy number (0-based)
    pub copy: u32,

    /// Lower corner
    pub min: Point3<f64>,

    /// Upper corner (max.z is the read-out face)
    pub max: Point3<f64>,

    pub sipms: Vec<Sipm>,
}

impl Crystal {
    /// Returns true if `p` lies inside or on the crystal box.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Centre of the crystal box.
    pub fn centre(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

/// The full calorimeter: crystals and their SiPMs.
#[derive(Debug, Clone)]
pub struct CrystalArray {
    detector: DetectorConfig,
    crystals: Vec<Crystal>,
}

impl CrystalArray {
    /// Builds the array, `photodetector_volume` naming the SiPM volumes.
    pub fn new(detector: &DetectorConfig, photodetector_volume: &str) -> Result<Self, ConfigError> {
        detector.validate()?;

        let size = detector.crystal_size_xy;
        let half_calo = detector.calo_size_xy() / 2.0;
        let per_row = detector.crystals_per_row;

        let crystals = (0..detector.n_crystals)
            .map(|copy| {
                let col = (copy % per_row) as f64;
                let row = (copy / per_row) as f64;
                let min = Point3::new(-half_calo + col * size, -half_calo + row * size, 0.0);
                let max = Point3::new(min.x + size, min.y + size, detector.crystal_depth);
                let sipms = Self::place_sipms(detector, copy, &min, &max, photodetector_volume);
                Crystal { copy, min, max, sipms }
            })
            .collect();

        Ok(Self {
            detector: detector.clone(),
            crystals,
        })
    }

    fn place_sipms(
        detector: &DetectorConfig,
        crystal_copy: u32,
        min: &Point3<f64>,
        max: &Point3<f64>,
        photodetector_volume: &str,
    ) -> Vec<Sipm> {
        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;
        let half = detector.crystal_size_xy / 2.0;
        let z = detector.crystal_depth + detector.sipm_depth / 2.0;
        let flip = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI);

        let mut sipms = Vec::with_capacity(detector.sipms_per_crystal() as usize);
        for iy in 0..detector.sipm_rows {
            for ix in 0..detector.sipms_per_row {
                let copy = iy * detector.sipms_per_row + ix;
                let centre = Point3::new(
                    cx - half + detector.sipm_spacing + ix as f64 * detector.sipm_spacing,
                    cy - half + detector.sipm_spacing + iy as f64 * detector.sipm_spacing,
                    z,
                );
                let placement = Isometry3::from_parts(Translation3::from(centre.coords), flip);
                sipms.push(Sipm {
                    copy,
                    centre,
                    touchable: Touchable {
                        physical_volume: photodetector_volume.to_string(),
                        logical_volume: format!("{}LV", photodetector_volume),
                        crystal_copy,
                        sipm_copy: copy,
                        global_to_local: placement.inverse(),
                    },
                });
            }
        }
        sipms
    }

    pub fn detector(&self) -> &DetectorConfig {
        &self.detector
    }

    pub fn crystals(&self) -> &[Crystal] {
        &self.crystals
    }

    pub fn crystal(&self, index: usize) -> Option<&Crystal> {
        self.crystals.get(index)
    }

    /// SiPM whose footprint on the read-out face covers `p`.
    pub fn sipm_at<'a>(&self, crystal: &'a Crystal, p: &Point3<f64>) -> Option<&'a Sipm> {
        let half = self.detector.sipm_size_xy / 2.0;
        crystal
            .sipms
            .iter()
            .find(|s| (p.x - s.centre.x).abs() <= half && (p.y - s.centre.y).abs() <= half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_crystal_layout() {
        let array = CrystalArray::new(&DetectorConfig::default(), "PhotonDet").unwrap();
        assert_eq!(array.crystals().len(), 1);

        let crystal = &array.crystals()[0];
        assert_relative_eq!(crystal.min.x, -150.0);
        assert_relative_eq!(crystal.max.z, 300.0);
        assert_eq!(crystal.sipms.len(), 25);

        // First SiPM sits one pitch in from the crystal corner.
        let first = &crystal.sipms[0];
        assert_relative_eq!(first.centre.x, crystal.min.x + 5.0);
        assert_relative_eq!(first.centre.y, crystal.min.y + 5.0);
        assert_relative_eq!(first.centre.z, 300.05);
        assert_eq!(crystal.sipms[24].copy, 24);
    }

    #[test]
    fn test_nine_crystals_fill_grid() {
        let detector = DetectorConfig {
            n_crystals: 9,
            ..Default::default()
        };
        let array = CrystalArray::new(&detector, "PhotonDet").unwrap();
        assert_eq!(array.crystals().len(), 9);

        let centre = array.crystals().iter().find(|c| c.contains(&Point3::new(0.0, 0.0, 150.0))).unwrap();
        assert_eq!(centre.copy, 4);
        assert!(array.crystals().iter().all(|c| !c.contains(&Point3::new(0.0, 0.0, 301.0))));
    }

    #[test]
    fn test_sipm_lookup_and_frame() {
        let array = CrystalArray::new(&DetectorConfig::default(), "PhotonDet").unwrap();
        let crystal = &array.crystals()[0];
        let target = &crystal.sipms[7];

        let p = Point3::new(target.centre.x + 0.3, target.centre.y - 0.2, 300.0);
        let sipm = array.sipm_at(crystal, &p).unwrap();
        assert_eq!(sipm.copy, 7);
        assert_eq!(sipm.touchable.sipm_copy, 7);

        let local = sipm.touchable.to_local(&p);
        assert_relative_eq!(local.x, 0.3, epsilon = 1e-9);
        assert_relative_eq!(local.y, 0.2, epsilon = 1e-9);
        assert_relative_eq!(local.z, 0.05, epsilon = 1e-9);

        let gap = Point3::new(target.centre.x + 2.5, target.centre.y, 300.0);
        assert!(array.sipm_at(crystal, &gap).is_none());
    }

    #[test]
    fn test_invalid_detector_rejected() {
        let detector = DetectorConfig {
            n_crystals: 12,
            ..Default::default()
        };
        assert!(CrystalArray::new(&detector, "PhotonDet").is_err());
    }
}
