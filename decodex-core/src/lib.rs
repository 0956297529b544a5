//! # decodex-core
//!
//! Decoding-run orchestration for a trained speech-recognition checkpoint.
//!
//! ## Architecture
//!
//! ```text
//! CUDA_VISIBLE_DEVICES → device::probe_device_count ─┐
//! argv (3 positionals) → RunConfig ──────────────────┤
//!                                                    ▼
//!                          ModeClassifier::classify (once per run)
//!                                                    │
//!                      for each enabled stage / method, in order:
//!                          policy::batch_size(method, mode)
//!                                                    │
//!                          InferenceInvoker::invoke (blocking)
//!                                                    │
//!                          ok → next method   failure → Aborted
//! ```
//!
//! Result artifacts are named `<ckpt_prefix>.<method>.rsl` and written by
//! the inference engine itself.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod inference;
pub mod mode;
pub mod policy;
pub mod report;

// Convenience re-exports for downstream crates
pub use config::{RunConfig, RunOptions};
pub use engine::{PlannedInvocation, Sequencer};
pub use error::DecodexError;
pub use inference::{
    artifact_path, InferenceInvoker, InvocationFailure, InvocationRequest, InvocationResult,
    ProcessInvoker, StubInvoker,
};
pub use mode::{ChunkPatternClassifier, ExecutionMode, FixedModeClassifier, ModeClassifier};
pub use policy::{batch_size, BatchSize, DecodingMethod};
pub use report::{MethodOutcome, RunReport, SequencerState};
