/// Dense renumbering of the raw positions that actually appear in the data.
///
/// Index `i` corresponds to the `i`-th smallest observed raw position, so gaps
/// in the raw coordinates (unobserved bins) disappear from the index space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocusIndex {
    positions: Vec<u64>,
}

impl LocusIndex {
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut positions: Vec<u64> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn index_of(&self, raw_position: u64) -> Option<usize> {
        self.positions.binary_search(&raw_position).ok()
    }

    pub fn position_of(&self, index: usize) -> Option<u64> {
        self.positions.get(index).copied()
    }

    /// `(raw_position, index)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, usize)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, &raw)| (raw, index))
    }
}
