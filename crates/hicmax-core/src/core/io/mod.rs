//! Input/output for contact data and reconstructed structures.
//!
//! Contact lists and dense contact matrices are read into raw observations;
//! structures are written as PDB files alongside the locus index mapping and,
//! for inspection, the preprocessed constraint table.

pub mod contacts;
pub mod mapping;
pub mod pdb;
