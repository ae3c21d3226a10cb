//! # Workflows Module
//!
//! High-level entry points that take parsed contact observations and a
//! [`ReconstructionConfig`](crate::engine::config::ReconstructionConfig) and
//! return finished structures.
//!
//! ## Overview
//!
//! A workflow owns the run: it picks the conversion exponent (given, or found
//! by sweeping candidates), preprocesses the observations once, generates the
//! requested number of structures from random starts and scores each one.
//! Progress is reported through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter); nothing
//! here touches the filesystem.
//!
//! ## Architecture
//!
//! - **Reconstruction Workflow** ([`reconstruct`]) - Preprocessing, structure generation and metrics
//! - **Exponent Sweep** ([`alpha_search`]) - Trial generations per candidate exponent, best-score selection

pub mod alpha_search;
pub mod reconstruct;
