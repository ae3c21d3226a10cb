use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PartitionError {
    #[error("Chromosome length list is empty")]
    Empty,
    #[error("Chromosome {chromosome} has zero length")]
    ZeroLength { chromosome: usize },
    #[error("Chromosome lengths cover {covered} loci but the data has {loci}")]
    TooShort { covered: usize, loci: usize },
}

/// Assignment of every locus index to a chromosome.
///
/// Built from per-chromosome lengths (in loci, in index order) or as a single
/// chromosome spanning everything. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomePartition {
    chromosome_of: Vec<usize>,
    lengths: Vec<usize>,
}

impl ChromosomePartition {
    pub fn single(num_loci: usize) -> Self {
        Self {
            chromosome_of: vec![0; num_loci],
            lengths: vec![num_loci],
        }
    }

    /// Builds the partition from cumulative sums of `lengths`. A total longer
    /// than `num_loci` is accepted; the tail simply maps no locus.
    pub fn from_lengths(lengths: &[usize], num_loci: usize) -> Result<Self, PartitionError> {
        if lengths.is_empty() {
            return Err(PartitionError::Empty);
        }
        if let Some(chromosome) = lengths.iter().position(|&len| len == 0) {
            return Err(PartitionError::ZeroLength { chromosome });
        }
        let covered: usize = lengths.iter().sum();
        if covered < num_loci {
            return Err(PartitionError::TooShort {
                covered,
                loci: num_loci,
            });
        }

        let chromosome_of = lengths
            .iter()
            .enumerate()
            .flat_map(|(chr, &len)| std::iter::repeat_n(chr, len))
            .take(num_loci)
            .collect();

        Ok(Self {
            chromosome_of,
            lengths: lengths.to_vec(),
        })
    }

    pub fn num_loci(&self) -> usize {
        self.chromosome_of.len()
    }

    pub fn num_chromosomes(&self) -> usize {
        self.lengths.len()
    }

    /// The configured lengths, before cumulative summation.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn chromosome_of(&self, index: usize) -> Option<usize> {
        self.chromosome_of.get(index).copied()
    }

    pub fn same_chromosome(&self, a: usize, b: usize) -> bool {
        match (self.chromosome_of(a), self.chromosome_of(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    /// Consecutive indices on the same chromosome.
    #[inline]
    pub fn is_adjacent(&self, a: usize, b: usize) -> bool {
        a.abs_diff(b) == 1 && self.same_chromosome(a, b)
    }
}
