//! `ProcessInvoker` — runs the evaluation script as a child process.
//!
//! The child inherits stdin/stdout/stderr so its progress output streams
//! straight to the console, and the call blocks until it exits.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::{interpret_exit, InferenceInvoker, InvocationFailure, InvocationRequest, InvocationResult};

/// Default interpreter for the evaluation script.
const DEFAULT_PROGRAM: &str = "python3";
/// Evaluation entry point, relative to the bin directory.
const SCRIPT_NAME: &str = "test.py";

/// Inference engine backed by an external command.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl ProcessInvoker {
    /// Invoke `program` with `leading_args` in front of the decoding flags.
    pub fn new<P, I, A>(program: P, leading_args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// `python3 -u <bin_dir>/test.py`.
    pub fn python_script(bin_dir: &Path) -> Self {
        let script = bin_dir.join(SCRIPT_NAME);
        Self::new(
            DEFAULT_PROGRAM,
            [OsString::from("-u"), script.into_os_string()],
        )
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// Full argument vector for one request (program excluded).
    pub fn command_args(&self, request: &InvocationRequest) -> Vec<OsString> {
        let flags: [OsString; 16] = [
            "--ngpu".into(),
            request.device_count.to_string().into(),
            "--config".into(),
            request.model_config_path.clone().into_os_string(),
            "--decode_cfg".into(),
            request.decode_config_path.clone().into_os_string(),
            "--result_file".into(),
            request.output_artifact_path.clone().into_os_string(),
            "--checkpoint_path".into(),
            request.checkpoint_prefix.clone().into_os_string(),
            "--opts".into(),
            "decode.decoding_method".into(),
            request.decoding_method.name().into(),
            "--opts".into(),
            "decode.decode_batch_size".into(),
            request.batch_size.to_string().into(),
        ];
        let mut args = self.leading_args.clone();
        args.extend(flags);
        args
    }
}

impl InferenceInvoker for ProcessInvoker {
    fn invoke(
        &mut self,
        request: &InvocationRequest,
    ) -> Result<InvocationResult, InvocationFailure> {
        let args = self.command_args(request);
        debug!(program = ?self.program, ?args, "spawning inference engine");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| InvocationFailure::Launch {
                method: request.decoding_method,
                source,
            })?;

        interpret_exit(request, status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::policy::{BatchSize, DecodingMethod};
    use std::path::PathBuf;

    fn request(method: DecodingMethod, batch: u32) -> InvocationRequest {
        let config = RunConfig {
            model_config_path: "conf/conformer.yaml".into(),
            decode_config_path: "conf/tuning/decode.yaml".into(),
            checkpoint_prefix: "exp/checkpoints/avg_10".into(),
            device_count: 2,
        };
        InvocationRequest::new(&config, method, BatchSize::new(batch).expect("non-zero"))
    }

    #[test]
    fn python_script_builds_engine_flags() {
        let invoker = ProcessInvoker::python_script(Path::new("/opt/bin"));
        assert_eq!(invoker.program(), "python3");

        let args = invoker.command_args(&request(DecodingMethod::CtcGreedySearch, 64));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let script = PathBuf::from("/opt/bin").join("test.py");
        assert_eq!(
            args,
            vec![
                "-u".to_string(),
                script.to_string_lossy().into_owned(),
                "--ngpu".into(),
                "2".into(),
                "--config".into(),
                "conf/conformer.yaml".into(),
                "--decode_cfg".into(),
                "conf/tuning/decode.yaml".into(),
                "--result_file".into(),
                "exp/checkpoints/avg_10.ctc_greedy_search.rsl".into(),
                "--checkpoint_path".into(),
                "exp/checkpoints/avg_10".into(),
                "--opts".into(),
                "decode.decoding_method".into(),
                "ctc_greedy_search".into(),
                "--opts".into(),
                "decode.decode_batch_size".into(),
                "64".into(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn zero_exit_is_success() {
        let mut invoker = ProcessInvoker::new("true", Vec::<OsString>::new());
        let req = request(DecodingMethod::Attention, 1);
        let result = invoker.invoke(&req).expect("`true` exits zero");
        assert_eq!(result.method, DecodingMethod::Attention);
        assert_eq!(result.result_artifact_path, req.output_artifact_path);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_failure() {
        let mut invoker = ProcessInvoker::new("false", Vec::<OsString>::new());
        let err = invoker
            .invoke(&request(DecodingMethod::AttentionRescoring, 1))
            .unwrap_err();
        assert_eq!(err.method(), DecodingMethod::AttentionRescoring);
        assert_eq!(err.exit_status(), Some(1));
    }

    #[test]
    fn missing_program_is_launch_failure() {
        let mut invoker =
            ProcessInvoker::new("decodex-no-such-engine-binary", Vec::<OsString>::new());
        let err = invoker
            .invoke(&request(DecodingMethod::CtcPrefixBeamSearch, 1))
            .unwrap_err();
        assert!(matches!(err, InvocationFailure::Launch { .. }));
    }
}
