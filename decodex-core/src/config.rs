//! Run inputs: what to decode and with which options.

use std::path::{Path, PathBuf};

use crate::error::{DecodexError, Result};

/// Immutable input bundle for one decoding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Model configuration document (also drives mode classification).
    pub model_config_path: PathBuf,
    /// Decode configuration document.
    pub decode_config_path: PathBuf,
    /// Checkpoint identity. Loads the model and names every artifact.
    pub checkpoint_prefix: PathBuf,
    /// Number of visible accelerator devices.
    pub device_count: usize,
}

impl RunConfig {
    /// Build from exactly three positional arguments:
    /// `config_path decode_config_path ckpt_path_prefix`.
    ///
    /// `probe_devices` is only called once the arguments are valid.
    ///
    /// # Errors
    /// `DecodexError::Usage` for any other argument count.
    pub fn from_positional(
        program: &str,
        args: &[String],
        probe_devices: impl FnOnce() -> usize,
    ) -> Result<Self> {
        let [config, decode_config, ckpt_prefix] = args else {
            return Err(DecodexError::Usage {
                program: program.to_string(),
            });
        };
        Ok(Self {
            model_config_path: PathBuf::from(config),
            decode_config_path: PathBuf::from(decode_config),
            checkpoint_prefix: PathBuf::from(ckpt_prefix),
            device_count: probe_devices(),
        })
    }

    /// The model-config identifier handed to mode classification.
    pub fn model_config_identifier(&self) -> std::borrow::Cow<'_, str> {
        self.model_config_path.to_string_lossy()
    }

    pub fn checkpoint_prefix(&self) -> &Path {
        &self.checkpoint_prefix
    }
}

/// Which stages of the decoding sequence are allowed to run.
///
/// A stage runs iff `stage <= index <= stop_stage`. The attention stage
/// additionally needs `enable_attention_stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub enable_attention_stage: bool,
    pub stage: u32,
    pub stop_stage: u32,
}

impl RunOptions {
    pub fn includes_stage(&self, index: u32) -> bool {
        self.stage <= index && index <= self.stop_stage
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            enable_attention_stage: true,
            stage: 0,
            stop_stage: 100,
        }
    }
}
