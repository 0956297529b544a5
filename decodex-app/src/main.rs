//! decodex — run every decoding strategy of a trained checkpoint over the
//! evaluation set.
//!
//! ```text
//! decodex <config_path> <decode_config_path> <ckpt_path_prefix>
//! ```
//!
//! Exit status: `0` when every method succeeded, `-1` on a usage error,
//! `1` when the inference engine failed for some method.

mod settings;

use std::path::Path;

use anyhow::Context;
use decodex_core::{
    device::probe_device_count, InferenceInvoker, ModeClassifier, RunConfig, RunOptions,
    Sequencer, StubInvoker,
};
use settings::{load_settings, settings_path_from_env};
use tracing::{info, warn};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut argv = std::env::args();
    let program = argv.next().unwrap_or_else(|| "decodex".into());
    let positional: Vec<String> = argv.collect();

    // Devices are only probed once the argument count is known to be right.
    let config = match RunConfig::from_positional(&program, &positional, probe_device_count) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let mut settings = load_settings(settings_path_from_env().as_deref());
    settings.apply_env_overrides();

    let options = settings.run_options();
    let classifier = settings.mode_classifier();
    let report_path = settings.report_path.as_deref();

    let code = if settings.dry_run {
        info!("dry run: no inference engine will be started");
        run(config, options, classifier.as_ref(), StubInvoker::new(), report_path)
    } else {
        run(
            config,
            options,
            classifier.as_ref(),
            settings.process_invoker(),
            report_path,
        )
    };
    std::process::exit(code);
}

/// Sequence every enabled method and return the process exit status.
fn run<I: InferenceInvoker>(
    config: RunConfig,
    options: RunOptions,
    classifier: &dyn ModeClassifier,
    invoker: I,
    report_path: Option<&Path>,
) -> i32 {
    let mut sequencer = Sequencer::new(config, options, classifier, invoker);
    let outcome = sequencer.run();

    if let Some(path) = report_path {
        if let Err(e) = write_report(&sequencer, path) {
            warn!("{e:#}");
        }
    }

    match outcome {
        Ok(()) => {
            info!("Finished");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    }
}

fn write_report<I: InferenceInvoker>(
    sequencer: &Sequencer<I>,
    path: &Path,
) -> anyhow::Result<()> {
    sequencer
        .report()
        .write_json(path)
        .with_context(|| format!("failed to write run report to {}", path.display()))?;
    info!("wrote run report: {}", path.display());
    Ok(())
}
