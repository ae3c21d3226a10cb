use crate::core::models::chromosome::ChromosomePartition;
use crate::core::utils::geometry;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const CHAIN_IDS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Structure has {found} points but the chromosome partition covers {expected}")]
    SizeMismatch { expected: usize, found: usize },
}

fn chain_id(chromosome: usize) -> char {
    CHAIN_IDS[chromosome % CHAIN_IDS.len()] as char
}

/// Writes one `ATOM` record per locus (chain per chromosome) and `CONECT`
/// records linking consecutive loci on the same chromosome.
pub fn write_structure(
    coords: &[f64],
    chromosomes: &ChromosomePartition,
    header: &str,
    writer: &mut impl Write,
) -> Result<(), PdbError> {
    let num_points = coords.len() / 3;
    if coords.len() % 3 != 0 || num_points != chromosomes.num_loci() {
        return Err(PdbError::SizeMismatch {
            expected: chromosomes.num_loci(),
            found: num_points,
        });
    }

    for line in header.lines() {
        writeln!(writer, "REMARK {}", line)?;
    }

    for index in 0..num_points {
        let point = geometry::point_at(coords, index);
        let chromosome = chromosomes.chromosome_of(index).unwrap_or(0);
        writeln!(
            writer,
            "ATOM  {:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}",
            index + 1,
            "CA",
            "MET",
            chain_id(chromosome),
            index + 1,
            point.x,
            point.y,
            point.z,
            1.0,
            0.0
        )?;
    }

    for index in 1..num_points {
        if chromosomes.is_adjacent(index - 1, index) {
            writeln!(writer, "CONECT{:>5}{:>5}", index, index + 1)?;
        }
    }

    writeln!(writer, "END")?;
    Ok(())
}

pub fn write_structure_to_path<P: AsRef<Path>>(
    coords: &[f64],
    chromosomes: &ChromosomePartition,
    header: &str,
    path: P,
) -> Result<(), PdbError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_structure(coords, chromosomes, header, &mut writer)?;
    writer.flush()?;
    Ok(())
}
