use crate::core::models::constraint::ConstraintSet;
use crate::core::models::locus::LocusIndex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes `raw_position<TAB>index` lines so output coordinates can be traced
/// back to genomic positions.
pub fn write_coordinate_mapping(loci: &LocusIndex, writer: &mut impl Write) -> io::Result<()> {
    for (raw, index) in loci.iter() {
        writeln!(writer, "{}\t{}", raw, index)?;
    }
    Ok(())
}

pub fn write_coordinate_mapping_to_path<P: AsRef<Path>>(
    loci: &LocusIndex,
    path: P,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_coordinate_mapping(loci, &mut writer)?;
    writer.flush()
}

/// Writes the preprocessed constraints as `pos1 pos2 frequency target_distance`.
pub fn write_constraint_table(constraints: &ConstraintSet, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "#pos1\tpos2\tfrequency\ttarget_distance")?;
    for c in constraints {
        writeln!(
            writer,
            "{}\t{}\t{:.6}\t{:.6}",
            c.pos1(),
            c.pos2(),
            c.frequency(),
            c.target_distance()
        )?;
    }
    Ok(())
}

pub fn write_constraint_table_to_path<P: AsRef<Path>>(
    constraints: &ConstraintSet,
    path: P,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_constraint_table(constraints, &mut writer)?;
    writer.flush()
}
