//! Runner settings (optional JSON file + environment overrides).

use std::fs;
use std::path::{Path, PathBuf};

use decodex_core::{
    ChunkPatternClassifier, ExecutionMode, FixedModeClassifier, ModeClassifier, ProcessInvoker,
    RunOptions,
};
use serde::{Deserialize, Serialize};

/// Path of the settings file, if any.
pub const SETTINGS_ENV: &str = "DECODEX_SETTINGS";
const STAGE_ENV: &str = "DECODEX_STAGE";
const STOP_STAGE_ENV: &str = "DECODEX_STOP_STAGE";
const BIN_DIR_ENV: &str = "BIN_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct RunnerSettings {
    pub stage: u32,
    pub stop_stage: u32,
    pub enable_attention_stage: bool,
    pub execution_mode: String,
    pub invoker_command: Vec<String>,
    pub bin_dir: String,
    pub report_path: Option<PathBuf>,
    pub dry_run: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            stage: 0,
            stop_stage: 100,
            enable_attention_stage: true,
            execution_mode: "auto".into(),
            invoker_command: Vec::new(),
            bin_dir: ".".into(),
            report_path: None,
            dry_run: false,
        }
    }
}

impl RunnerSettings {
    pub fn normalize(&mut self) {
        self.execution_mode = normalize_execution_mode(&self.execution_mode);
        self.invoker_command = self
            .invoker_command
            .iter()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let bin_dir = self.bin_dir.trim();
        self.bin_dir = if bin_dir.is_empty() {
            ".".into()
        } else {
            bin_dir.into()
        };
        self.report_path = self
            .report_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Apply `DECODEX_STAGE`, `DECODEX_STOP_STAGE` and `BIN_DIR` on top of
    /// the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(stage) = parse_stage(STAGE_ENV, lookup(STAGE_ENV)) {
            self.stage = stage;
        }
        if let Some(stop_stage) = parse_stage(STOP_STAGE_ENV, lookup(STOP_STAGE_ENV)) {
            self.stop_stage = stop_stage;
        }
        if let Some(bin_dir) = lookup(BIN_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.bin_dir = bin_dir.trim().to_string();
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            enable_attention_stage: self.enable_attention_stage,
            stage: self.stage,
            stop_stage: self.stop_stage,
        }
    }

    pub fn mode_classifier(&self) -> Box<dyn ModeClassifier> {
        match self.execution_mode.as_str() {
            "streaming" => Box::new(FixedModeClassifier(ExecutionMode::Streaming)),
            "batch" => Box::new(FixedModeClassifier(ExecutionMode::Batch)),
            _ => Box::new(ChunkPatternClassifier::default()),
        }
    }

    pub fn process_invoker(&self) -> ProcessInvoker {
        match self.invoker_command.split_first() {
            Some((program, leading_args)) => ProcessInvoker::new(program, leading_args),
            None => ProcessInvoker::python_script(Path::new(&self.bin_dir)),
        }
    }
}

pub fn normalize_execution_mode(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "streaming" | "stream" | "chunk" | "chunked" => "streaming".into(),
        "batch" | "full" | "non_streaming" => "batch".into(),
        _ => "auto".into(),
    }
}

fn parse_stage(key: &str, raw: Option<String>) -> Option<u32> {
    let raw = raw?;
    match raw.trim().parse::<u32>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw:?}: not a stage number");
            None
        }
    }
}

/// Settings file named by `DECODEX_SETTINGS`, if set.
pub fn settings_path_from_env() -> Option<PathBuf> {
    std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
}

/// Parse settings JSON. Unknown fields are ignored, missing ones default.
pub fn parse_settings(raw: &str) -> serde_json::Result<RunnerSettings> {
    let mut settings = serde_json::from_str::<RunnerSettings>(raw)?;
    settings.normalize();
    Ok(settings)
}

/// Load settings from `path`, falling back to defaults if the file is
/// missing or malformed.
pub fn load_settings(path: Option<&Path>) -> RunnerSettings {
    let Some(path) = path else {
        return RunnerSettings::default();
    };
    match fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw).unwrap_or_else(|e| {
            tracing::warn!("malformed settings {}: {e}; using defaults", path.display());
            RunnerSettings::default()
        }),
        Err(e) => {
            tracing::warn!("cannot read settings {}: {e}; using defaults", path.display());
            RunnerSettings::default()
        }
    }
}
