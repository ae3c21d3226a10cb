//! # Core Module
//!
//! Fundamental building blocks for genome structure reconstruction.
//!
//! - **Data Models** ([`models`]) - Observations, constraints, the locus index space,
//!   chromosome partitions and flat coordinate structures
//! - **Quality Metrics** ([`metrics`]) - RMSE and rank/linear correlations between
//!   contact data and reconstructed distances
//! - **File I/O** ([`io`]) - Contact list/matrix reading, PDB and mapping output
//! - **Geometry** ([`utils`]) - Point access and distances over flat coordinate arrays

pub mod io;
pub mod metrics;
pub mod models;
pub mod utils;
