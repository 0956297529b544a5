//! Decoding methods and the batch-size policy table.
//!
//! | Method | Batch mode | Streaming mode |
//! |---|---|---|
//! | `attention` | 64 | 1 |
//! | `ctc_greedy_search` | 64 | 1 |
//! | `ctc_prefix_beam_search` | 1 | 1 |
//! | `attention_rescoring` | 1 | 1 |
//!
//! [`batch_size`] is the only place batch sizes are decided.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::mode::ExecutionMode;

/// Batch size used by methods that parallelise across utterances.
const PARALLEL_BATCH: u32 = 64;

/// One decoding strategy understood by the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodingMethod {
    Attention,
    CtcGreedySearch,
    CtcPrefixBeamSearch,
    AttentionRescoring,
}

impl DecodingMethod {
    pub const ALL: [DecodingMethod; 4] = [
        DecodingMethod::Attention,
        DecodingMethod::CtcGreedySearch,
        DecodingMethod::CtcPrefixBeamSearch,
        DecodingMethod::AttentionRescoring,
    ];

    /// Name passed to the engine and used in artifact file names.
    pub fn name(self) -> &'static str {
        match self {
            DecodingMethod::Attention => "attention",
            DecodingMethod::CtcGreedySearch => "ctc_greedy_search",
            DecodingMethod::CtcPrefixBeamSearch => "ctc_prefix_beam_search",
            DecodingMethod::AttentionRescoring => "attention_rescoring",
        }
    }

    /// Whether the method decodes each utterance independently of the
    /// others and may therefore batch.
    ///
    /// Prefix beam search and rescoring keep per-hypothesis paths and run
    /// one utterance at a time in every mode.
    pub fn is_batchable(self) -> bool {
        matches!(
            self,
            DecodingMethod::Attention | DecodingMethod::CtcGreedySearch
        )
    }
}

impl std::fmt::Display for DecodingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A positive number of utterances decoded per engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchSize(NonZeroU32);

impl BatchSize {
    pub const ONE: BatchSize = BatchSize(NonZeroU32::MIN);

    pub fn new(size: u32) -> Option<Self> {
        NonZeroU32::new(size).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for BatchSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve the batch size for `method` under `mode`.
///
/// Streaming models always decode one utterance at a time.
pub fn batch_size(method: DecodingMethod, mode: ExecutionMode) -> BatchSize {
    if mode.is_streaming() || !method.is_batchable() {
        return BatchSize::ONE;
    }
    BatchSize::new(PARALLEL_BATCH).unwrap_or(BatchSize::ONE)
}
