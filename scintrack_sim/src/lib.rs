//! scintrack Deterministic Simulation Harness
//!
//! This crate drives the tracking core end-to-end with a small, seeded
//! optical transport kernel so that every accounting rule of the state
//! machine can be checked on whole events.
//!
//! # Core Principle: Seeded Everything
//!
//! All sources of non-determinism are controlled:
//! - **Randomness**: every event draws from a ChaCha8 stream derived from
//!   `(seed, event_id)`
//! - **Threads**: workers own independent tracking state; statistics are
//!   merged only at run end, so the worker count never changes a result
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────┐  ┌──────────────────┐                 │
//! │  │   EventWorker #1 │  │   EventWorker #2 │   ...           │
//! │  │ OpticalTransport │  │ OpticalTransport │                 │
//! │  │        │ step    │  │        │ step    │                 │
//! │  │        ▼         │  │        ▼         │                 │
//! │  │ BoundaryClassif. │  │ BoundaryClassif. │                 │
//! │  └────────┬─────────┘  └────────┬─────────┘                 │
//! │           └──────── RunSummary ─┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use scintrack_sim::{SimWorld, SimConfig};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     events: 10,
//!     ..Default::default()
//! };
//!
//! let outcome = SimWorld::new(config)?.run()?;
//! outcome.summary.log_summary(0);
//! ```

mod error;
mod exporter;
mod geometry;
mod runner;
pub mod scenarios;
mod transport;
mod world;

pub use error::SimError;
pub use exporter::SimExport;
pub use geometry::{Crystal, CrystalArray, Sipm};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use transport::{fresnel_reflectance, OpticalTransport, OpticsConfig, Photon, C_LIGHT};
pub use world::{event_seed, status_matches_fate, EventRecord, RunOutcome, SimConfig, SimWorld};
