//! # hicmax Core Library
//!
//! Maximum-likelihood reconstruction of three-dimensional genome structures from
//! pairwise chromosome contact frequencies (Hi-C style interaction data).
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Constraint`, `ConstraintSet`,
//!   `LocusIndex`, `ChromosomePartition`, `Structure`), geometry and quality metrics,
//!   and I/O for contact lists, contact matrices, PDB structures and index mappings.
//!
//! - **[`engine`]: The Logic Core.** The preprocessing pipeline that turns raw contacts
//!   into target distances, the log-likelihood objective and its gradient, the worker
//!   partitioner that fans evaluations out over constraint ranges, and the gradient
//!   ascent optimizer that drives it.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures: structure reconstruction
//!   at a fixed conversion exponent, or after sweeping candidate exponents.

pub mod core;
pub mod engine;
pub mod workflows;
