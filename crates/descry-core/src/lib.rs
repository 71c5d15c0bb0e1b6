//! # Descry Core Library
//!
//! A library for computing atomic-environment descriptors (fingerprints of
//! local atomic structure used as inputs to machine-learning models) together
//! with the benchmark workflows used to characterize how those computations
//! scale with system size.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains the stateless data model
//!   (`Structure`, the element table), pure mathematics (radial bases, real
//!   spherical harmonics, neighbor search), and output utilities (chart and
//!   CSV rendering of benchmark results).
//!
//! - **[`engine`]: The Descriptors.** The descriptor implementations
//!   themselves: the SOAP power spectrum with its numerical and analytical
//!   derivative paths, and the Coulomb matrix. Engines are configured once,
//!   validated up front, and then applied to any number of structures.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer.
//!   It ties engines and structures together into complete timing sweeps
//!   (descriptor scaling, derivative scaling, Coulomb-matrix scaling) whose
//!   results feed the chart and CSV writers.

pub mod core;
pub mod engine;
pub mod workflows;

/// Version string of this library, embedded into chart titles and artifact
/// file names unless the caller supplies an explicit label.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
