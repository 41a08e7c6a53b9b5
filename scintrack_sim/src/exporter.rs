//! JSON exporter for event records.
//!
//! Writes one document per run: the scenario, the merged statistics and one
//! entry per event (run id, event id, scintillation count, hits per detector).

use crate::error::SimError;
use crate::world::EventRecord;
use scintrack_core::RunSummary;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// All event records, in event order
    pub events: Vec<EventRecord>,

    /// Final results
    pub passed: bool,

    /// Merged run statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            events: Vec::new(),
            passed: false,
            summary: None,
            failure_reason: None,
        }
    }

    /// Adds an event record.
    pub fn add_event(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    /// Total hits across all exported events.
    pub fn total_hits(&self) -> usize {
        self.events.iter().map(|e| e.detectors.total_hits()).sum()
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, summary: RunSummary, failure_reason: Option<String>) {
        self.passed = passed;
        self.summary = Some(summary);
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
