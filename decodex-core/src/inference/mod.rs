//! Inference engine contract.
//!
//! The `InferenceInvoker` trait decouples the sequencer from how the model
//! is actually evaluated (an external `test.py` process, a stub for dry runs
//! and tests, ...). Each call blocks until the engine finishes one decoding
//! method over the evaluation set and reports a typed outcome.

pub mod process;
pub mod stub;

pub use process::ProcessInvoker;
pub use stub::{CallLog, StubInvoker};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::RunConfig;
use crate::policy::{BatchSize, DecodingMethod};

/// File extension of every result artifact.
pub const ARTIFACT_EXTENSION: &str = "rsl";

/// Deterministic artifact location: `<checkpoint_prefix>.<method>.rsl`.
///
/// Built by plain string concatenation so prefixes such as `/ckpt/50`
/// (no extension) and `/ckpt/avg_10.pdparams` are kept byte for byte.
pub fn artifact_path(checkpoint_prefix: &Path, method: DecodingMethod) -> PathBuf {
    let mut raw: OsString = checkpoint_prefix.as_os_str().to_os_string();
    raw.push(".");
    raw.push(method.name());
    raw.push(".");
    raw.push(ARTIFACT_EXTENSION);
    PathBuf::from(raw)
}

/// Everything the engine is called with for one decoding method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub device_count: usize,
    pub model_config_path: PathBuf,
    pub decode_config_path: PathBuf,
    pub output_artifact_path: PathBuf,
    pub checkpoint_prefix: PathBuf,
    pub decoding_method: DecodingMethod,
    pub batch_size: BatchSize,
}

impl InvocationRequest {
    pub fn new(config: &RunConfig, method: DecodingMethod, batch_size: BatchSize) -> Self {
        Self {
            device_count: config.device_count,
            model_config_path: config.model_config_path.clone(),
            decode_config_path: config.decode_config_path.clone(),
            output_artifact_path: artifact_path(&config.checkpoint_prefix, method),
            checkpoint_prefix: config.checkpoint_prefix.clone(),
            decoding_method: method,
            batch_size,
        }
    }
}

/// Successful engine run for one method. The artifact itself is written
/// by the engine, not by decodex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub method: DecodingMethod,
    pub exit_status: i32,
    pub result_artifact_path: PathBuf,
}

/// Why an engine run did not succeed. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum InvocationFailure {
    #[error("{method} exited with status {code}")]
    NonZeroExit { method: DecodingMethod, code: i32 },

    #[error("{method} terminated without an exit status")]
    Terminated { method: DecodingMethod },

    #[error("failed to launch inference engine for {method}: {source}")]
    Launch {
        method: DecodingMethod,
        #[source]
        source: std::io::Error,
    },
}

impl InvocationFailure {
    pub fn method(&self) -> DecodingMethod {
        match self {
            InvocationFailure::NonZeroExit { method, .. }
            | InvocationFailure::Terminated { method }
            | InvocationFailure::Launch { method, .. } => *method,
        }
    }

    /// Exit status reported by the engine, if it reported one.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            InvocationFailure::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Map an engine exit status onto the typed outcome.
///
/// Zero is success and anything else is failure, regardless of what the
/// engine printed. `None` means the engine ended without a status.
pub fn interpret_exit(
    request: &InvocationRequest,
    status: Option<i32>,
) -> Result<InvocationResult, InvocationFailure> {
    let method = request.decoding_method;
    match status {
        Some(0) => Ok(InvocationResult {
            method,
            exit_status: 0,
            result_artifact_path: request.output_artifact_path.clone(),
        }),
        Some(code) => Err(InvocationFailure::NonZeroExit { method, code }),
        None => Err(InvocationFailure::Terminated { method }),
    }
}

/// Contract for inference engines.
///
/// `invoke` blocks until the engine has finished (or failed) the whole
/// evaluation set for one method. There is no mid-call cancellation.
pub trait InferenceInvoker {
    /// Run one decoding method.
    ///
    /// # Errors
    /// Any `InvocationFailure` is terminal for the run.
    fn invoke(&mut self, request: &InvocationRequest)
        -> Result<InvocationResult, InvocationFailure>;
}

impl<I: InferenceInvoker + ?Sized> InferenceInvoker for Box<I> {
    fn invoke(
        &mut self,
        request: &InvocationRequest,
    ) -> Result<InvocationResult, InvocationFailure> {
        (**self).invoke(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            model_config_path: "conf/conformer.yaml".into(),
            decode_config_path: "conf/decode.yaml".into(),
            checkpoint_prefix: "/m/ckpt".into(),
            device_count: 1,
        }
    }

    #[test]
    fn artifact_path_appends_method_and_extension() {
        assert_eq!(
            artifact_path(Path::new("/m/ckpt"), DecodingMethod::CtcGreedySearch),
            PathBuf::from("/m/ckpt.ctc_greedy_search.rsl")
        );
        assert_eq!(
            artifact_path(Path::new("exp/avg_10"), DecodingMethod::AttentionRescoring),
            PathBuf::from("exp/avg_10.attention_rescoring.rsl")
        );
    }

    #[test]
    fn request_carries_run_inputs() {
        let req = InvocationRequest::new(&config(), DecodingMethod::Attention, BatchSize::ONE);
        assert_eq!(req.device_count, 1);
        assert_eq!(req.output_artifact_path, PathBuf::from("/m/ckpt.attention.rsl"));
        assert_eq!(req.checkpoint_prefix, PathBuf::from("/m/ckpt"));
        assert_eq!(req.batch_size.get(), 1);
    }

    #[test]
    fn zero_status_is_success() {
        let req = InvocationRequest::new(&config(), DecodingMethod::Attention, BatchSize::ONE);
        let result = interpret_exit(&req, Some(0)).expect("success");
        assert_eq!(result.exit_status, 0);
        assert_eq!(result.result_artifact_path, req.output_artifact_path);
    }

    #[test]
    fn non_zero_and_missing_status_are_failures() {
        let req = InvocationRequest::new(&config(), DecodingMethod::Attention, BatchSize::ONE);
        let err = interpret_exit(&req, Some(2)).unwrap_err();
        assert_eq!(err.method(), DecodingMethod::Attention);
        assert_eq!(err.exit_status(), Some(2));

        let err = interpret_exit(&req, Some(-1)).unwrap_err();
        assert_eq!(err.exit_status(), Some(-1));

        let err = interpret_exit(&req, None).unwrap_err();
        assert!(matches!(err, InvocationFailure::Terminated { .. }));
    }
}
