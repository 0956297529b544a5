//! The fixed decoding stage list.

use crate::config::RunOptions;
use crate::policy::DecodingMethod;

/// A group of methods run back to back, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// Position used for `stage`/`stop_stage` gating.
    pub index: u32,
    pub methods: &'static [DecodingMethod],
    /// Also gated on `RunOptions::enable_attention_stage`.
    pub optional: bool,
}

impl Stage {
    pub fn is_enabled(&self, options: &RunOptions) -> bool {
        options.includes_stage(self.index) && (!self.optional || options.enable_attention_stage)
    }
}

/// Attention, then greedy CTC, then beam search followed by rescoring.
pub static STAGES: [Stage; 3] = [
    Stage {
        index: 0,
        methods: &[DecodingMethod::Attention],
        optional: true,
    },
    Stage {
        index: 1,
        methods: &[DecodingMethod::CtcGreedySearch],
        optional: false,
    },
    Stage {
        index: 2,
        methods: &[
            DecodingMethod::CtcPrefixBeamSearch,
            DecodingMethod::AttentionRescoring,
        ],
        optional: false,
    },
];

/// Stages that will run under `options`, in execution order.
pub fn enabled_stages(options: &RunOptions) -> impl Iterator<Item = &'static Stage> + '_ {
    STAGES.iter().filter(move |stage| stage.is_enabled(options))
}
