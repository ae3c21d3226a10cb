//! Data models shared by the preprocessing pipeline and the objective engine.
//!
//! Observations enter as [`observation::RawObservation`] triples in raw genomic
//! coordinates. Preprocessing compacts them into the dense [`locus::LocusIndex`]
//! space, tags loci with chromosomes through [`chromosome::ChromosomePartition`],
//! and produces a frozen [`constraint::ConstraintSet`] that the engine reads while
//! the optimizer mutates a [`structure::Structure`].

pub mod chromosome;
pub mod constraint;
pub mod locus;
pub mod observation;
pub mod structure;
