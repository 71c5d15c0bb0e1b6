use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One timed sweep point: how long one descriptor invocation took on a
/// structure with `n_atoms` sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSample {
    pub n_atoms: usize,
    pub seconds: f64,
}

/// The ordered timing samples of one configuration variant, in sweep order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSeries {
    pub label: String,
    pub samples: Vec<TimingSample>,
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    variant: &'a str,
    n_atoms: usize,
    seconds: f64,
}

/// Writes every sample of every variant as one flat CSV table
/// (`variant,n_atoms,seconds`), overwriting any existing file.
pub fn write_samples_csv(path: &Path, series: &[VariantSeries]) -> Result<(), SampleError> {
    let mut writer = csv::Writer::from_path(path)?;
    for variant in series {
        for sample in &variant.samples {
            writer.serialize(CsvRecord {
                variant: &variant.label,
                n_atoms: sample.n_atoms,
                seconds: sample.seconds,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
