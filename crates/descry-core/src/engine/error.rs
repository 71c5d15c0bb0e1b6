use thiserror::Error;

use crate::core::basis::BasisError;
use crate::core::models::structure::StructureError;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Invalid descriptor parameter: {0}")]
    InvalidParameter(String),

    #[error("Species '{symbol}' present in the structure is not in the configured species list")]
    UnconfiguredSpecies { symbol: String },

    #[error("Unknown element symbol '{symbol}'")]
    UnknownElement { symbol: String },

    #[error("Periodic descriptor requested for a structure with no periodic axes")]
    NonPeriodicStructure,

    #[error("Structure has {n_sites} sites but the descriptor was sized for at most {n_max}")]
    TooManySites { n_sites: usize, n_max: usize },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Radial basis construction failed: {source}")]
    Basis {
        #[from]
        source: BasisError,
    },
}
