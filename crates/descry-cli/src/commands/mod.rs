pub mod cm;
pub mod derivatives;
pub mod soap;

use crate::cli::ExperimentArgs;
use crate::error::Result;
use descry::core::io::{chart, samples};
use descry::workflows::scaling::ScalingReport;
use tracing::info;

/// The version label embedded in titles and file names: the CLI flag if
/// given, otherwise the descriptor library's own version.
pub(crate) fn resolve_label(args: &ExperimentArgs) -> String {
    args.label
        .clone()
        .unwrap_or_else(|| descry::VERSION.to_string())
}

/// Writes the chart (and, when requested, the raw CSV samples) for a
/// finished sweep into the output directory.
pub(crate) fn write_artifacts(
    args: &ExperimentArgs,
    stem: &str,
    title: &str,
    report: &ScalingReport,
) -> Result<()> {
    let chart_path = args.output_dir.join(format!("{stem}.svg"));
    chart::render_scaling_chart(&chart_path, title, &report.series)?;
    info!("Chart written to {:?}", chart_path);
    println!("✓ Chart written to: {}", chart_path.display());

    if args.csv {
        let csv_path = args.output_dir.join(format!("{stem}.csv"));
        samples::write_samples_csv(&csv_path, &report.series)?;
        info!("Timing samples written to {:?}", csv_path);
        println!("  Timing samples written to: {}", csv_path.display());
    }
    Ok(())
}
