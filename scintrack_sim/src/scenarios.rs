//! Tracking scenarios for the simulation harness.

use crate::transport::OpticsConfig;
use scintrack_core::ScintrackConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SCN-001: default detector, wrapped crystal
    Baseline,

    /// SCN-002: tiny bounce limit, bounce kills expected
    BounceLimited,

    /// SCN-003: bounce limit disabled
    UnlimitedBounces,

    /// SCN-004: bare side faces, photons escape sideways
    Unwrapped,

    /// SCN-005: ideal SiPMs and a lossless mirror wrapping
    PerfectPde,

    /// SCN-006: blind SiPMs
    DarkReadout,
}

impl ScenarioId {
    /// Bounce limit used by [`ScenarioId::BounceLimited`].
    pub const TIGHT_BOUNCE_LIMIT: u32 = 3;

    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::BounceLimited,
            ScenarioId::UnlimitedBounces,
            ScenarioId::Unwrapped,
            ScenarioId::PerfectPde,
            ScenarioId::DarkReadout,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::BounceLimited => "bounce_limited",
            ScenarioId::UnlimitedBounces => "unlimited_bounces",
            ScenarioId::Unwrapped => "unwrapped",
            ScenarioId::PerfectPde => "perfect_pde",
            ScenarioId::DarkReadout => "dark_readout",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Default LYSO crystal, wrapped sides, every photon accounted for",
            ScenarioId::BounceLimited => "Bounce limit of 3, runaway photons must be killed",
            ScenarioId::UnlimitedBounces => "Bounce limit 0, no photon is ever bounce-killed",
            ScenarioId::Unwrapped => "Bare side faces, photons refract out through the sides",
            ScenarioId::PerfectPde => "PDE 1 and perfect mirror wrap, no boundary absorption",
            ScenarioId::DarkReadout => "PDE 0, SiPMs absorb and nothing is detected",
        }
    }

    /// Applies the scenario to a base configuration.
    pub fn configure(&self, scintrack: &mut ScintrackConfig, optics: &mut OpticsConfig) {
        match self {
            ScenarioId::Baseline => {}
            ScenarioId::BounceLimited => {
                scintrack.tracking.bounce_limit = Self::TIGHT_BOUNCE_LIMIT;
            }
            ScenarioId::UnlimitedBounces => {
                scintrack.tracking.bounce_limit = 0;
            }
            ScenarioId::Unwrapped => {
                optics.wrapped_sides = false;
            }
            ScenarioId::PerfectPde => {
                scintrack.detector.sipm_pde = 1.0;
                optics.wrap_reflectivity = 1.0;
            }
            ScenarioId::DarkReadout => {
                scintrack.detector.sipm_pde = 0.0;
            }
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "scn-001" => Ok(ScenarioId::Baseline),
            "bounce_limited" | "bouncelimited" | "scn-002" => Ok(ScenarioId::BounceLimited),
            "unlimited_bounces" | "unlimitedbounces" | "unlimited" | "scn-003" => {
                Ok(ScenarioId::UnlimitedBounces)
            }
            "unwrapped" | "scn-004" => Ok(ScenarioId::Unwrapped),
            "perfect_pde" | "perfectpde" | "scn-005" => Ok(ScenarioId::PerfectPde),
            "dark_readout" | "darkreadout" | "scn-006" => Ok(ScenarioId::DarkReadout),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("SCN-002".parse::<ScenarioId>(), Ok(ScenarioId::BounceLimited));
        assert_eq!("unlimited".parse::<ScenarioId>(), Ok(ScenarioId::UnlimitedBounces));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_configure_overrides() {
        let mut scintrack = ScintrackConfig::default();
        let mut optics = OpticsConfig::default();

        ScenarioId::BounceLimited.configure(&mut scintrack, &mut optics);
        assert_eq!(scintrack.tracking.bounce_limit, ScenarioId::TIGHT_BOUNCE_LIMIT);

        ScenarioId::DarkReadout.configure(&mut scintrack, &mut optics);
        assert_eq!(scintrack.detector.sipm_pde, 0.0);

        ScenarioId::Unwrapped.configure(&mut scintrack, &mut optics);
        assert!(!optics.wrapped_sides);
    }
}
