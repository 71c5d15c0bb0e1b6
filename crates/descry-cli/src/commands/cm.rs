use super::{resolve_label, write_artifacts};
use crate::cli::ExperimentArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use descry::engine::progress::ProgressReporter;
use descry::workflows::scaling::run_coulomb_scaling;
use tracing::info;

pub fn run(args: ExperimentArgs) -> Result<()> {
    let experiment = config::resolve_cm(&args)?;
    let label = resolve_label(&args);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting Coulomb-matrix scaling experiment...");
    info!("Invoking the Coulomb-matrix scaling workflow...");
    let report = run_coulomb_scaling(&experiment, &reporter)?;

    let title = format!("Coulomb matrix, version={label}");
    write_artifacts(&args, &format!("cm_scaling_{label}"), &title, &report)
}
