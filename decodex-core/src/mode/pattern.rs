//! File-name based mode classification.
//!
//! A model config is treated as chunked when its identifier contains the
//! marker `chunk_` and the text after that marker ends with `yaml`, e.g.
//! `conf/chunk_conformer.yaml`. Matching is case sensitive. Anything else,
//! including identifiers that only partially match, is `Batch`.

use super::{ExecutionMode, ModeClassifier};

const DEFAULT_MARKER: &str = "chunk_";
const DEFAULT_SUFFIX: &str = "yaml";

/// Marker + suffix rule over the model-config identifier.
#[derive(Debug, Clone)]
pub struct ChunkPatternClassifier {
    marker: String,
    suffix: String,
}

impl ChunkPatternClassifier {
    pub fn new(marker: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            suffix: suffix.into(),
        }
    }

    /// True if `identifier` follows the chunked-model naming convention.
    pub fn is_chunked(&self, identifier: &str) -> bool {
        // The leftmost marker leaves the longest tail, so checking it alone
        // is enough.
        identifier
            .find(&self.marker)
            .map(|pos| identifier[pos + self.marker.len()..].ends_with(&self.suffix))
            .unwrap_or(false)
    }
}

impl Default for ChunkPatternClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_SUFFIX)
    }
}

impl ModeClassifier for ChunkPatternClassifier {
    fn classify(&self, model_config: &str) -> ExecutionMode {
        if self.is_chunked(model_config) {
            ExecutionMode::Streaming
        } else {
            ExecutionMode::Batch
        }
    }
}
