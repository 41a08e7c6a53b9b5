//! Per-track status of an optical photon.
//!
//! A [`TrackStatus`] is created when a photon track starts, mutated only by
//! the boundary classifier while that track is stepped, and dropped when the
//! track ends. Flags are never poked directly: every change goes through
//! [`TrackStatus::add_flag`], which enforces the exclusion rules:
//!
//! - `InsideOfCrystal` and `OutsideOfCrystal` are mutually exclusive
//! - an escape flag is refused once the track is already outside
//! - `Killed` is terminal; after it nothing else changes
//! - `Undefined` means "no flag at all" and can never be added

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Lifecycle flags of an optical-photon track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFlag {
    /// No flag set (query only)
    Undefined,
    /// Track is known to the tracker
    Defined,
    /// Photon is inside a crystal
    InsideOfCrystal,
    /// Photon is outside every crystal
    OutsideOfCrystal,
    /// Photon left through a side face of the crystal
    EscapedFromSide,
    /// Photon left through the read-out end of the crystal
    EscapedFromReadOut,
    /// Photon was Fresnel-reflected at the read-out end
    ReflectedAtReadOut,
    /// Photon was detected by a SiPM
    HitDetector,
    /// Photon was stopped by bulk absorption
    Absorbed,
    /// Photon was absorbed at a boundary
    BoundaryAbsorbed,
    /// Photon was artificially killed
    Killed,
}

impl StatusFlag {
    /// Every flag, in declaration order.
    pub const ALL: [StatusFlag; 11] = [
        StatusFlag::Undefined,
        StatusFlag::Defined,
        StatusFlag::InsideOfCrystal,
        StatusFlag::OutsideOfCrystal,
        StatusFlag::EscapedFromSide,
        StatusFlag::EscapedFromReadOut,
        StatusFlag::ReflectedAtReadOut,
        StatusFlag::HitDetector,
        StatusFlag::Absorbed,
        StatusFlag::BoundaryAbsorbed,
        StatusFlag::Killed,
    ];

    /// Returns the flag name.
    pub fn name(&self) -> &'static str {
        match self {
            StatusFlag::Undefined => "undefined",
            StatusFlag::Defined => "defined",
            StatusFlag::InsideOfCrystal => "insideOfCrystal",
            StatusFlag::OutsideOfCrystal => "outsideOfCrystal",
            StatusFlag::EscapedFromSide => "escapedFromSide",
            StatusFlag::EscapedFromReadOut => "escapedFromReadOut",
            StatusFlag::ReflectedAtReadOut => "reflectedAtReadOut",
            StatusFlag::HitDetector => "hitDetector",
            StatusFlag::Absorbed => "absorbed",
            StatusFlag::BoundaryAbsorbed => "boundaryAbsorbed",
            StatusFlag::Killed => "killed",
        }
    }
}

impl std::fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Status of one optical-photon track.
///
/// `TrackStatus::default()` is the undefined status (no flag set);
/// `TrackStatus::new()` is a freshly defined, active track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackStatus {
    defined: bool,
    inside_of_crystal: bool,
    outside_of_crystal: bool,
    escaped_from_side: bool,
    escaped_from_readout: bool,
    reflected_at_readout: bool,
    hit_detector: bool,
    absorbed: bool,
    boundary_absorbed: bool,
    killed: bool,

    /// Global position where the photon left the tracked geometry
    exit_position: Option<Point3<f64>>,
}

impl TrackStatus {
    /// Creates the status of a newly started track.
    pub fn new() -> Self {
        Self {
            defined: true,
            ..Default::default()
        }
    }

    /// Tries to add a flag, clearing the flags it supersedes.
    ///
    /// Returns false and leaves the status untouched when the flag conflicts
    /// with the current state:
    /// - `Undefined` can never be added
    /// - nothing but `Killed` can be added to a killed track
    /// - an escape flag is refused when the track is already outside or has
    ///   already escaped by the other route
    pub fn add_flag(&mut self, flag: StatusFlag) -> bool {
        if self.killed && flag != StatusFlag::Killed {
            return false;
        }

        match flag {
            StatusFlag::Undefined => return false,
            StatusFlag::Defined => {}
            StatusFlag::InsideOfCrystal => {
                // Re-entry wipes every trace of the previous exit.
                self.escaped_from_side = false;
                self.escaped_from_readout = false;
                self.outside_of_crystal = false;
                self.inside_of_crystal = true;
            }
            StatusFlag::OutsideOfCrystal => {
                self.inside_of_crystal = false;
                self.outside_of_crystal = true;
            }
            StatusFlag::EscapedFromSide => {
                if self.outside_of_crystal || self.escaped_from_readout {
                    return false;
                }
                self.escaped_from_side = true;
            }
            StatusFlag::EscapedFromReadOut => {
                if self.outside_of_crystal || self.escaped_from_side {
                    return false;
                }
                self.escaped_from_readout = true;
            }
            StatusFlag::ReflectedAtReadOut => self.reflected_at_readout = true,
            StatusFlag::HitDetector => self.hit_detector = true,
            StatusFlag::Absorbed => self.absorbed = true,
            StatusFlag::BoundaryAbsorbed => self.boundary_absorbed = true,
            StatusFlag::Killed => self.killed = true,
        }

        self.defined = true;
        true
    }

    /// Returns true if the flag is currently set.
    ///
    /// `Undefined` is a pure query: true only when no flag at all is set.
    pub fn is_status(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Undefined => self.is_undefined(),
            StatusFlag::Defined => self.defined,
            StatusFlag::InsideOfCrystal => self.inside_of_crystal,
            StatusFlag::OutsideOfCrystal => self.outside_of_crystal,
            StatusFlag::EscapedFromSide => self.escaped_from_side,
            StatusFlag::EscapedFromReadOut => self.escaped_from_readout,
            StatusFlag::ReflectedAtReadOut => self.reflected_at_readout,
            StatusFlag::HitDetector => self.hit_detector,
            StatusFlag::Absorbed => self.absorbed,
            StatusFlag::BoundaryAbsorbed => self.boundary_absorbed,
            StatusFlag::Killed => self.killed,
        }
    }

    /// Returns true when no flag is set.
    pub fn is_undefined(&self) -> bool {
        StatusFlag::ALL[1..].iter().all(|flag| !self.is_status(*flag))
    }

    /// Returns true once the track has been killed.
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Returns true if the track left the crystal by either route.
    pub fn has_escaped(&self) -> bool {
        self.escaped_from_side || self.escaped_from_readout
    }

    /// Returns the flags currently set.
    pub fn flags(&self) -> Vec<StatusFlag> {
        StatusFlag::ALL
            .iter()
            .copied()
            .filter(|flag| self.is_status(*flag))
            .collect()
    }

    /// Global exit position, once recorded.
    pub fn exit_position(&self) -> Option<Point3<f64>> {
        self.exit_position
    }

    /// Records where the photon left the tracked geometry.
    pub fn set_exit_position(&mut self, position: Point3<f64>) {
        self.exit_position = Some(position);
    }
}

impl std::fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.flags().iter().map(|flag| flag.name()).collect();
        write!(f, "[{}]", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_undefined() {
        let status = TrackStatus::default();
        assert!(status.is_status(StatusFlag::Undefined));
        assert!(!status.is_status(StatusFlag::Defined));
        assert_eq!(status.flags(), vec![StatusFlag::Undefined]);
        // Querying must not change anything.
        assert!(status.is_status(StatusFlag::Undefined));
    }

    #[test]
    fn test_new_track_is_defined() {
        let status = TrackStatus::new();
        assert!(status.is_status(StatusFlag::Defined));
        assert!(!status.is_status(StatusFlag::Undefined));
        assert!(status.exit_position().is_none());
    }

    #[test]
    fn test_cannot_add_undefined() {
        let mut status = TrackStatus::new();
        assert!(!status.add_flag(StatusFlag::Undefined));
        assert!(status.is_status(StatusFlag::Defined));
    }

    #[test]
    fn test_inside_and_outside_are_exclusive() {
        let mut status = TrackStatus::new();

        assert!(status.add_flag(StatusFlag::InsideOfCrystal));
        assert!(status.add_flag(StatusFlag::OutsideOfCrystal));
        assert!(!status.is_status(StatusFlag::InsideOfCrystal));
        assert!(status.is_status(StatusFlag::OutsideOfCrystal));

        assert!(status.add_flag(StatusFlag::InsideOfCrystal));
        assert!(status.is_status(StatusFlag::InsideOfCrystal));
        assert!(!status.is_status(StatusFlag::OutsideOfCrystal));
    }

    #[test]
    fn test_escape_refused_once_outside() {
        let mut status = TrackStatus::new();
        status.add_flag(StatusFlag::InsideOfCrystal);
        status.add_flag(StatusFlag::OutsideOfCrystal);

        let before = status.clone();
        assert!(!status.add_flag(StatusFlag::EscapedFromSide));
        assert!(!status.add_flag(StatusFlag::EscapedFromReadOut));
        assert_eq!(status, before);
    }

    #[test]
    fn test_escape_routes_are_exclusive() {
        let mut status = TrackStatus::new();
        status.add_flag(StatusFlag::InsideOfCrystal);

        assert!(status.add_flag(StatusFlag::EscapedFromReadOut));
        assert!(!status.add_flag(StatusFlag::EscapedFromSide));
        assert!(status.has_escaped());
    }

    #[test]
    fn test_reentry_clears_exit_flags() {
        let mut status = TrackStatus::new();
        status.add_flag(StatusFlag::InsideOfCrystal);
        status.add_flag(StatusFlag::EscapedFromSide);
        status.add_flag(StatusFlag::OutsideOfCrystal);

        assert!(status.add_flag(StatusFlag::InsideOfCrystal));
        assert!(!status.has_escaped());
        assert!(!status.is_status(StatusFlag::OutsideOfCrystal));

        // A fresh exit is accepted after re-entry.
        assert!(status.add_flag(StatusFlag::EscapedFromReadOut));
    }

    #[test]
    fn test_killed_is_terminal() {
        let mut status = TrackStatus::new();
        status.add_flag(StatusFlag::InsideOfCrystal);
        assert!(status.add_flag(StatusFlag::Killed));

        let before = status.clone();
        assert!(!status.add_flag(StatusFlag::OutsideOfCrystal));
        assert!(!status.add_flag(StatusFlag::HitDetector));
        assert_eq!(status, before);

        // Kill always wins, even twice.
        assert!(status.add_flag(StatusFlag::Killed));
        assert!(status.is_killed());
    }

    #[test]
    fn test_killing_undefined_track_defines_it() {
        let mut status = TrackStatus::default();
        assert!(status.add_flag(StatusFlag::Killed));
        assert!(!status.is_undefined());
        assert!(status.is_status(StatusFlag::Defined));
    }

    #[test]
    fn test_display_lists_flags() {
        let mut status = TrackStatus::new();
        status.add_flag(StatusFlag::InsideOfCrystal);
        assert_eq!(status.to_string(), "[defined|insideOfCrystal]");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_flag() -> impl Strategy<Value = StatusFlag> {
        (0..StatusFlag::ALL.len()).prop_map(|i| StatusFlag::ALL[i])
    }

    proptest! {
        #[test]
        fn inside_and_outside_never_coexist(flags in prop::collection::vec(any_flag(), 0..64)) {
            let mut status = TrackStatus::new();
            for flag in flags {
                status.add_flag(flag);
                prop_assert!(!(status.is_status(StatusFlag::InsideOfCrystal)
                    && status.is_status(StatusFlag::OutsideOfCrystal)));
            }
        }

        #[test]
        fn escape_after_outside_never_mutates(
            prefix in prop::collection::vec(any_flag(), 0..32),
            side in any::<bool>(),
        ) {
            let mut status = TrackStatus::new();
            for flag in prefix {
                status.add_flag(flag);
            }
            if status.is_status(StatusFlag::OutsideOfCrystal) {
                let before = status.clone();
                let flag = if side { StatusFlag::EscapedFromSide } else { StatusFlag::EscapedFromReadOut };
                prop_assert!(!status.add_flag(flag));
                prop_assert_eq!(status, before);
            }
        }

        #[test]
        fn killed_stays_killed(
            prefix in prop::collection::vec(any_flag(), 0..16),
            suffix in prop::collection::vec(any_flag(), 0..32),
        ) {
            let mut status = TrackStatus::new();
            for flag in prefix {
                status.add_flag(flag);
            }
            status.add_flag(StatusFlag::Killed);
            for flag in suffix {
                status.add_flag(flag);
                prop_assert!(status.is_killed());
            }
        }

        #[test]
        fn never_both_escape_routes(flags in prop::collection::vec(any_flag(), 0..64)) {
            let mut status = TrackStatus::default();
            for flag in flags {
                status.add_flag(flag);
                prop_assert!(!(status.is_status(StatusFlag::EscapedFromSide)
                    && status.is_status(StatusFlag::EscapedFromReadOut)));
            }
        }

        #[test]
        fn undefined_never_coexists(flags in prop::collection::vec(any_flag(), 0..32)) {
            let mut status = TrackStatus::default();
            for flag in flags {
                let accepted = status.add_flag(flag);
                if accepted {
                    prop_assert!(!status.is_status(StatusFlag::Undefined));
                }
                if status.is_status(StatusFlag::Undefined) {
                    prop_assert_eq!(status.flags(), vec![StatusFlag::Undefined]);
                }
            }
        }
    }
}
