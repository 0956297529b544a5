//! `Sequencer` — drives the decoding stages through the inference engine.
//!
//! ## Lifecycle
//!
//! ```text
//! Sequencer::new()        → mode classified once, state = Pending
//!     └─► run()           → for each planned method:
//!                             Running(m) → Succeeded(m) → next
//!                             Running(m) → Failed(m) → Aborted(m), stop
//!                           all succeeded → AllDone
//! ```
//!
//! Execution is strictly sequential: each engine call blocks until it
//! reports, and the next method is only considered afterwards. The first
//! failure ends the run; artifacts from methods that already succeeded are
//! left in place. There are no retries.

pub mod stage;

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    config::{RunConfig, RunOptions},
    error::{DecodexError, Result},
    inference::{InferenceInvoker, InvocationFailure, InvocationRequest, InvocationResult},
    mode::{ExecutionMode, ModeClassifier},
    policy::{batch_size, BatchSize, DecodingMethod},
    report::{MethodOutcome, RunReport, SequencerState},
};

/// One step of the execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInvocation {
    pub stage: u32,
    pub request: InvocationRequest,
}

impl PlannedInvocation {
    pub fn method(&self) -> DecodingMethod {
        self.request.decoding_method
    }

    pub fn batch_size(&self) -> BatchSize {
        self.request.batch_size
    }
}

/// Runs the enabled stages against one inference engine.
pub struct Sequencer<I> {
    config: RunConfig,
    options: RunOptions,
    /// Fixed for the lifetime of the sequencer.
    mode: ExecutionMode,
    invoker: I,
    state: SequencerState,
    history: Vec<SequencerState>,
    report: RunReport,
}

impl<I: InferenceInvoker> Sequencer<I> {
    /// Classify the run and prepare the sequencer. Does not invoke anything.
    pub fn new(
        config: RunConfig,
        options: RunOptions,
        classifier: &dyn ModeClassifier,
        invoker: I,
    ) -> Self {
        let mode = classifier.classify(&config.model_config_identifier());
        info!("chunk mode {} ({mode})", mode.is_streaming());
        let report = RunReport::new(config.device_count, mode);

        Self {
            config,
            options,
            mode,
            invoker,
            state: SequencerState::Pending,
            history: vec![SequencerState::Pending],
            report,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Current state (snapshot).
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Every state entered so far, starting with `Pending`.
    pub fn history(&self) -> &[SequencerState] {
        &self.history
    }

    /// Report of what has run so far. Complete once `run()` returns.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// The invocations `run()` will make, in order. Pure.
    pub fn plan(&self) -> Vec<PlannedInvocation> {
        stage::enabled_stages(&self.options)
            .flat_map(|stage| {
                stage.methods.iter().map(move |&method| PlannedInvocation {
                    stage: stage.index,
                    request: InvocationRequest::new(
                        &self.config,
                        method,
                        batch_size(method, self.mode),
                    ),
                })
            })
            .collect()
    }

    /// Execute the plan, stopping at the first failure.
    ///
    /// # Errors
    /// - `DecodexError::Invocation` naming the first method that failed.
    /// - `DecodexError::AlreadyFinished` if called a second time.
    pub fn run(&mut self) -> Result<()> {
        if self.state != SequencerState::Pending {
            return Err(DecodexError::AlreadyFinished);
        }

        let plan = self.plan();
        if plan.is_empty() {
            warn!(
                stage = self.options.stage,
                stop_stage = self.options.stop_stage,
                "no decoding stage selected"
            );
        }

        for planned in plan {
            self.execute(planned)?;
        }

        self.transition(SequencerState::AllDone);
        self.report.finished_at = Some(Utc::now());
        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn execute(&mut self, planned: PlannedInvocation) -> Result<()> {
        let method = planned.method();
        self.transition(SequencerState::Running(method));
        info!("decoding {method}");
        debug!(
            batch_size = %planned.batch_size(),
            artifact = %planned.request.output_artifact_path.display(),
            "invoking inference engine"
        );

        let started = Instant::now();
        let outcome = self
            .invoker
            .invoke(&planned.request)
            .and_then(|result| reject_non_zero(method, result));
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                self.record(&planned, Some(result.exit_status), elapsed_ms, None);
                self.transition(SequencerState::Succeeded(method));
                info!("decoding {method} done.");
                Ok(())
            }
            Err(failure) => {
                self.record(
                    &planned,
                    failure.exit_status(),
                    elapsed_ms,
                    Some(failure.to_string()),
                );
                self.transition(SequencerState::Failed(method));
                error!("Failed in evaluation! ({failure})");
                self.transition(SequencerState::Aborted(method));
                self.report.finished_at = Some(Utc::now());
                Err(failure.into())
            }
        }
    }

    fn record(
        &mut self,
        planned: &PlannedInvocation,
        exit_status: Option<i32>,
        elapsed_ms: f64,
        error: Option<String>,
    ) {
        self.report.outcomes.push(MethodOutcome {
            stage: planned.stage,
            method: planned.method(),
            batch_size: planned.batch_size(),
            artifact_path: planned.request.output_artifact_path.clone(),
            exit_status,
            elapsed_ms,
            succeeded: error.is_none(),
            error,
        });
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(from = ?self.state, to = ?next, "sequencer transition");
        self.state = next;
        self.history.push(next);
        self.report.state = next;
    }
}

/// An engine may hand back a result carrying a non-zero status; that is
/// still a failure.
fn reject_non_zero(
    method: DecodingMethod,
    result: InvocationResult,
) -> std::result::Result<InvocationResult, InvocationFailure> {
    if result.exit_status == 0 {
        Ok(result)
    } else {
        Err(InvocationFailure::NonZeroExit {
            method,
            code: result.exit_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::StubInvoker;
    use crate::mode::{ChunkPatternClassifier, FixedModeClassifier};

    fn config(model_config: &str) -> RunConfig {
        RunConfig {
            model_config_path: model_config.into(),
            decode_config_path: "conf/decode.yaml".into(),
            checkpoint_prefix: "/m/ckpt".into(),
            device_count: 1,
        }
    }

    /// Engine that returns `Ok` with a non-zero status.
    struct LyingInvoker;

    impl InferenceInvoker for LyingInvoker {
        fn invoke(
            &mut self,
            request: &InvocationRequest,
        ) -> std::result::Result<InvocationResult, InvocationFailure> {
            Ok(InvocationResult {
                method: request.decoding_method,
                exit_status: 7,
                result_artifact_path: request.output_artifact_path.clone(),
            })
        }
    }

    #[test]
    fn plan_uses_batch_policy_for_mode() {
        let seq = Sequencer::new(
            config("conf/conformer.yaml"),
            RunOptions::default(),
            &ChunkPatternClassifier::default(),
            StubInvoker::new(),
        );
        assert_eq!(seq.mode(), ExecutionMode::Batch);
        let sizes: Vec<_> = seq
            .plan()
            .iter()
            .map(|p| (p.method(), p.batch_size().get()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                (DecodingMethod::Attention, 64),
                (DecodingMethod::CtcGreedySearch, 64),
                (DecodingMethod::CtcPrefixBeamSearch, 1),
                (DecodingMethod::AttentionRescoring, 1),
            ]
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let seq = Sequencer::new(
            config("conf/chunk_16.yaml"),
            RunOptions::default(),
            &ChunkPatternClassifier::default(),
            StubInvoker::new(),
        );
        assert_eq!(seq.plan(), seq.plan());
    }

    #[test]
    fn successful_run_walks_every_state() {
        let mut seq = Sequencer::new(
            config("conf/conformer.yaml"),
            RunOptions {
                enable_attention_stage: false,
                ..RunOptions::default()
            },
            &FixedModeClassifier(ExecutionMode::Batch),
            StubInvoker::new(),
        );
        seq.run().expect("all methods succeed");

        use DecodingMethod::*;
        use SequencerState::*;
        assert_eq!(
            seq.history(),
            &[
                Pending,
                Running(CtcGreedySearch),
                Succeeded(CtcGreedySearch),
                Running(CtcPrefixBeamSearch),
                Succeeded(CtcPrefixBeamSearch),
                Running(AttentionRescoring),
                Succeeded(AttentionRescoring),
                AllDone,
            ]
        );
        assert_eq!(seq.report().state, AllDone);
        assert!(seq.report().finished_at.is_some());
    }

    #[test]
    fn ok_with_non_zero_status_still_aborts() {
        let mut seq = Sequencer::new(
            config("conf/conformer.yaml"),
            RunOptions::default(),
            &FixedModeClassifier(ExecutionMode::Batch),
            LyingInvoker,
        );
        let err = seq.run().unwrap_err();
        assert!(matches!(
            err,
            DecodexError::Invocation(InvocationFailure::NonZeroExit { code: 7, .. })
        ));
        assert_eq!(
            seq.state(),
            SequencerState::Aborted(DecodingMethod::Attention)
        );
        assert_eq!(seq.report().outcomes.len(), 1);
    }

    #[test]
    fn second_run_is_rejected() {
        let mut seq = Sequencer::new(
            config("conf/conformer.yaml"),
            RunOptions::default(),
            &FixedModeClassifier(ExecutionMode::Batch),
            StubInvoker::new(),
        );
        seq.run().expect("first run");
        assert!(matches!(seq.run(), Err(DecodexError::AlreadyFinished)));
    }

    #[test]
    fn empty_plan_finishes_immediately() {
        let stub = StubInvoker::new();
        let log = stub.call_log();
        let mut seq = Sequencer::new(
            config("conf/conformer.yaml"),
            RunOptions {
                enable_attention_stage: true,
                stage: 5,
                stop_stage: 10,
            },
            &FixedModeClassifier(ExecutionMode::Batch),
            stub,
        );
        seq.run().expect("nothing to fail");
        assert!(log.is_empty());
        assert_eq!(seq.state(), SequencerState::AllDone);
    }
}
