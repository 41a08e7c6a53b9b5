//! Boundary process outcomes and the provider that exposes them.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Classified result of a photon reaching (or not reaching) a material interface.
///
/// Mirrors the status set reported by the optical boundary process of the
/// transport kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryOutcome {
    /// No boundary status available
    #[default]
    Undefined,
    Transmission,
    FresnelRefraction,
    FresnelReflection,
    TotalInternalReflection,
    LambertianReflection,
    LobeReflection,
    SpikeReflection,
    BackScattering,
    /// Absorbed at the interface
    Absorption,
    /// Detected by a photosensitive surface
    Detection,
    /// Step did not end on a boundary
    NotAtBoundary,
    /// Crossed into a volume of the same material
    SameMaterial,
    StepTooSmall,
    /// Next material has no refractive index
    NoRINDEX,
}

impl BoundaryOutcome {
    /// Returns true for every outcome that turns the photon back into the
    /// volume it came from.
    pub fn is_reflection(self) -> bool {
        matches!(
            self,
            BoundaryOutcome::TotalInternalReflection
                | BoundaryOutcome::FresnelReflection
                | BoundaryOutcome::LambertianReflection
                | BoundaryOutcome::LobeReflection
                | BoundaryOutcome::SpikeReflection
                | BoundaryOutcome::BackScattering
        )
    }

    /// Returns true for outcomes where the photon carries on into the next volume.
    pub fn is_crossing(self) -> bool {
        matches!(
            self,
            BoundaryOutcome::SameMaterial | BoundaryOutcome::FresnelRefraction
        )
    }

    /// Returns the outcome name.
    pub fn name(&self) -> &'static str {
        match self {
            BoundaryOutcome::Undefined => "Undefined",
            BoundaryOutcome::Transmission => "Transmission",
            BoundaryOutcome::FresnelRefraction => "FresnelRefraction",
            BoundaryOutcome::FresnelReflection => "FresnelReflection",
            BoundaryOutcome::TotalInternalReflection => "TotalInternalReflection",
            BoundaryOutcome::LambertianReflection => "LambertianReflection",
            BoundaryOutcome::LobeReflection => "LobeReflection",
            BoundaryOutcome::SpikeReflection => "SpikeReflection",
            BoundaryOutcome::BackScattering => "BackScattering",
            BoundaryOutcome::Absorption => "Absorption",
            BoundaryOutcome::Detection => "Detection",
            BoundaryOutcome::NotAtBoundary => "NotAtBoundary",
            BoundaryOutcome::SameMaterial => "SameMaterial",
            BoundaryOutcome::StepTooSmall => "StepTooSmall",
            BoundaryOutcome::NoRINDEX => "NoRINDEX",
        }
    }
}

impl std::fmt::Display for BoundaryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Source of the boundary outcome for the step currently being processed.
///
/// Resolved once when the tracking core is set up. Implementations must
/// report the outcome of the most recent step delivered by the kernel.
pub trait BoundaryOutcomeProvider: Send + Sync {
    /// Returns the outcome of the current step.
    fn current_outcome(&self) -> BoundaryOutcome;
}

/// Boundary status cell shared between a kernel (writer) and the core (reader).
///
/// Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct SharedBoundaryStatus {
    status: Arc<Mutex<BoundaryOutcome>>,
}

impl SharedBoundaryStatus {
    /// Creates a cell holding `Undefined`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the outcome of the step just taken.
    pub fn set(&self, outcome: BoundaryOutcome) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        *status = outcome;
    }

    /// Resets the cell to `Undefined`.
    pub fn reset(&self) {
        self.set(BoundaryOutcome::Undefined);
    }
}

impl BoundaryOutcomeProvider for SharedBoundaryStatus {
    fn current_outcome(&self) -> BoundaryOutcome {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflection_set() {
        assert!(BoundaryOutcome::TotalInternalReflection.is_reflection());
        assert!(BoundaryOutcome::BackScattering.is_reflection());
        assert!(!BoundaryOutcome::FresnelRefraction.is_reflection());
        assert!(!BoundaryOutcome::Detection.is_reflection());
    }

    #[test]
    fn test_crossing_set() {
        assert!(BoundaryOutcome::SameMaterial.is_crossing());
        assert!(BoundaryOutcome::FresnelRefraction.is_crossing());
        assert!(!BoundaryOutcome::Transmission.is_crossing());
    }

    #[test]
    fn test_shared_status_clones_share_cell() {
        let writer = SharedBoundaryStatus::new();
        let reader = writer.clone();

        assert_eq!(reader.current_outcome(), BoundaryOutcome::Undefined);

        writer.set(BoundaryOutcome::Detection);
        assert_eq!(reader.current_outcome(), BoundaryOutcome::Detection);

        writer.reset();
        assert_eq!(reader.current_outcome(), BoundaryOutcome::Undefined);
    }
}
