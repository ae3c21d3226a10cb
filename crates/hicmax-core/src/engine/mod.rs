//! # Engine Module
//!
//! The computational core of structure reconstruction: from raw contact
//! observations to an optimized set of 3D coordinates.
//!
//! ## Overview
//!
//! Preprocessing runs once per conversion exponent and freezes a
//! [`ConstraintSet`](crate::core::models::constraint::ConstraintSet) of
//! normalized frequencies and target distances. The objective engine then
//! scores candidate coordinate vectors against it with a Gaussian
//! log-likelihood, fanning each evaluation out over contiguous constraint
//! ranges. The optimizer climbs that objective.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Model, conversion, optimization and parallelism settings
//! - **Preprocessing** ([`preprocess`]) - Index compaction, normalization, adjacency completion
//! - **Objective** ([`objective`]) - Cost and gradient, behind the [`objective::Objective`] trait
//! - **Partitioning** ([`partition`]) - Worker ranges, panic isolation and deterministic reduction
//! - **Optimizer** ([`optimizer`]) - Gradient ascent with an adaptive step size
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod objective;
pub mod optimizer;
pub mod partition;
pub mod preprocess;
pub mod progress;
