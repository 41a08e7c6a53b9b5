//! scintrack Transport Abstraction Layer
//!
//! This crate is the seam between an optical transport kernel and the
//! photon-tracking core. The kernel advances photons one geometric step at a
//! time and hands each step over as an [`OpticalStep`]; the core never sees
//! the kernel's internals.
//!
//! # Core Concept: Injected Boundary Status
//!
//! The boundary process outcome of the current step is read through a
//! [`BoundaryOutcomeProvider`] that is resolved once at setup time and
//! injected into the classifier:
//! - **Kernel side**: writes the outcome of every step into a
//!   [`SharedBoundaryStatus`]
//! - **Core side**: reads it back through the provider trait
//!
//! # Example
//!
//! ```ignore
//! use scintrack_env::{BoundaryOutcome, SharedBoundaryStatus};
//!
//! let status = SharedBoundaryStatus::new();
//! let provider = Arc::new(status.clone());
//! // ... hand `provider` to the classifier, keep `status` in the kernel
//! status.set(BoundaryOutcome::TotalInternalReflection);
//! ```

mod boundary;
mod types;

pub use boundary::{BoundaryOutcome, BoundaryOutcomeProvider, SharedBoundaryStatus};
pub use types::{OpticalStep, ParticleKind, StepPoint, StepProcess, Touchable, TrackId};
