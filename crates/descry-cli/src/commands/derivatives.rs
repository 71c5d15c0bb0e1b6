use super::{resolve_label, write_artifacts};
use crate::cli::ExperimentArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use descry::engine::progress::ProgressReporter;
use descry::workflows::scaling::run_derivative_scaling;
use tracing::info;

pub fn run(args: ExperimentArgs) -> Result<()> {
    let experiment = config::resolve_derivatives(&args)?;
    let label = resolve_label(&args);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting SOAP derivative scaling experiment...");
    info!("Invoking the derivative scaling workflow...");
    let report = run_derivative_scaling(&experiment, &reporter)?;

    let title = format!(
        "SOAP derivatives nmax={}, lmax={}, version={}",
        experiment.hyperparameters.nmax, experiment.hyperparameters.lmax, label
    );
    write_artifacts(
        &args,
        &format!("soap_derivatives_scaling_{label}"),
        &title,
        &report,
    )
}
