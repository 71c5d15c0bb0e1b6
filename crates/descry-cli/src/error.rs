use descry::core::io::chart::ChartError;
use descry::core::io::samples::SampleError;
use descry::core::models::structure::StructureError;
use descry::workflows::scaling::ExperimentError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Experiment(#[from] ExperimentError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Samples(#[from] SampleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = .path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
