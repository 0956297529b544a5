//! `StubInvoker` — placeholder engine that never spawns anything.
//!
//! Used for dry runs and tests. Every request is recorded in a shared
//! [`CallLog`], and exit statuses can be scripted per method so failure
//! paths can be exercised without a real model.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use super::{interpret_exit, InferenceInvoker, InvocationFailure, InvocationRequest, InvocationResult};
use crate::policy::DecodingMethod;

/// Shared, clonable record of every request a stub received, in order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<InvocationRequest>>>);

impl CallLog {
    /// Snapshot of the recorded requests.
    pub fn requests(&self) -> Vec<InvocationRequest> {
        self.0.lock().clone()
    }

    /// Methods invoked so far, in call order.
    pub fn methods(&self) -> Vec<DecodingMethod> {
        self.0.lock().iter().map(|r| r.decoding_method).collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn record(&self, request: &InvocationRequest) {
        self.0.lock().push(request.clone());
    }
}

/// Engine stand-in with scripted exit statuses (zero unless told otherwise).
#[derive(Debug, Default)]
pub struct StubInvoker {
    exit_codes: HashMap<DecodingMethod, Option<i32>>,
    log: CallLog,
}

impl StubInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `code` whenever `method` is invoked.
    pub fn exit_with(mut self, method: DecodingMethod, code: i32) -> Self {
        self.exit_codes.insert(method, Some(code));
        self
    }

    /// Report no exit status (as if killed by a signal) for `method`.
    pub fn terminate_on(mut self, method: DecodingMethod) -> Self {
        self.exit_codes.insert(method, None);
        self
    }

    /// Handle on the call log; stays valid after the stub is moved.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }
}

impl InferenceInvoker for StubInvoker {
    fn invoke(
        &mut self,
        request: &InvocationRequest,
    ) -> Result<InvocationResult, InvocationFailure> {
        self.log.record(request);
        info!(
            "[stub] {} batch_size={} -> {}",
            request.decoding_method,
            request.batch_size,
            request.output_artifact_path.display()
        );
        let status = self
            .exit_codes
            .get(&request.decoding_method)
            .copied()
            .unwrap_or(Some(0));
        interpret_exit(request, status)
    }
}
