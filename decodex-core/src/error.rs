use thiserror::Error;

use crate::inference::InvocationFailure;

/// All errors produced by decodex-core.
#[derive(Debug, Error)]
pub enum DecodexError {
    #[error("usage: {program} config_path decode_config_path ckpt_path_prefix")]
    Usage { program: String },

    #[error("evaluation failed: {0}")]
    Invocation(#[from] InvocationFailure),

    #[error("sequencer has already finished")]
    AlreadyFinished,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodexError {
    /// Process exit status for this error: `-1` for usage, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            DecodexError::Usage { .. } => -1,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodexError>;
