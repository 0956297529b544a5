//! Run report types.
//!
//! Serialised as pretty JSON next to the result artifacts so a finished or
//! aborted run can be audited without re-reading the console.
//!
//! ```json
//! {
//!   "deviceCount": 1,
//!   "mode": "streaming",
//!   "state": { "state": "allDone" },
//!   "outcomes": [ { "method": "ctc_greedy_search", "batchSize": 1, ... } ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mode::ExecutionMode;
use crate::policy::{BatchSize, DecodingMethod};

// ---------------------------------------------------------------------------
// Sequencer state
// ---------------------------------------------------------------------------

/// Position of the strategy sequencer in its state machine.
///
/// `Pending → Running → Succeeded → (Running … | AllDone)`, or
/// `Running → Failed → Aborted` on the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "method", rename_all = "camelCase")]
pub enum SequencerState {
    /// Nothing invoked yet.
    Pending,
    /// Waiting on the engine for this method.
    Running(DecodingMethod),
    /// The engine reported success for this method.
    Succeeded(DecodingMethod),
    /// The engine reported failure for this method.
    Failed(DecodingMethod),
    /// Terminal: the run stopped after this method failed.
    Aborted(DecodingMethod),
    /// Terminal: every planned method succeeded.
    AllDone,
}

impl SequencerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SequencerState::Aborted(_) | SequencerState::AllDone)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of one attempted method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodOutcome {
    pub stage: u32,
    pub method: DecodingMethod,
    pub batch_size: BatchSize,
    pub artifact_path: PathBuf,
    /// Engine exit status; `None` if the engine never reported one.
    pub exit_status: Option<i32>,
    pub elapsed_ms: f64,
    pub succeeded: bool,
    /// Human-readable failure reason.
    pub error: Option<String>,
}

/// Summary of a whole decoding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub device_count: usize,
    pub mode: ExecutionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: SequencerState,
    pub outcomes: Vec<MethodOutcome>,
}

impl RunReport {
    pub fn new(device_count: usize, mode: ExecutionMode) -> Self {
        Self {
            device_count,
            mode,
            started_at: Utc::now(),
            finished_at: None,
            state: SequencerState::Pending,
            outcomes: Vec::new(),
        }
    }

    /// Artifacts of methods that completed successfully.
    pub fn completed_artifacts(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.artifact_path.as_path())
            .collect()
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)?;
        Ok(())
    }
}
