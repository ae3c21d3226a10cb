use std::cmp::Ordering;

/// A locus-pair record in the dense index space whose frequency may still be
/// rescaled. Positions are stored with `pos1 < pos2`, so the derived order and
/// equality only look at the unordered pair.
#[derive(Debug, Clone, Copy)]
pub struct RawConstraint {
    pos1: usize,
    pos2: usize,
    pub frequency: f64,
}

impl RawConstraint {
    pub fn new(a: usize, b: usize, frequency: f64) -> Self {
        Self {
            pos1: a.min(b),
            pos2: a.max(b),
            frequency,
        }
    }

    #[inline]
    pub fn pos1(&self) -> usize {
        self.pos1
    }

    #[inline]
    pub fn pos2(&self) -> usize {
        self.pos2
    }

    #[inline]
    pub fn pair(&self) -> (usize, usize) {
        (self.pos1, self.pos2)
    }

    /// True when the two loci are consecutive in the index space. Whether they
    /// also share a chromosome is the partition's call.
    #[inline]
    pub fn is_consecutive(&self) -> bool {
        self.pos2 - self.pos1 == 1
    }
}

impl PartialEq for RawConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.pair() == other.pair()
    }
}
impl Eq for RawConstraint {}

impl PartialOrd for RawConstraint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RawConstraint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pair().cmp(&other.pair())
    }
}

/// Mutable constraint list used while preprocessing. Lookups by pair require
/// the list to be sorted first (see [`ConstraintSetBuilder::sort`]).
#[derive(Debug, Clone, Default)]
pub struct ConstraintSetBuilder {
    constraints: Vec<RawConstraint>,
}

impl ConstraintSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constraints: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, constraint: RawConstraint) {
        self.constraints.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawConstraint> {
        self.constraints.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RawConstraint> {
        self.constraints.iter_mut()
    }

    pub fn sort(&mut self) {
        self.constraints.sort_unstable();
    }

    /// Binary search for the pair `{a, b}`; mirrors [`slice::binary_search`].
    pub fn search(&self, a: usize, b: usize) -> Result<usize, usize> {
        let key = (a.min(b), a.max(b));
        self.constraints.binary_search_by(|c| c.pair().cmp(&key))
    }

    pub fn get(&self, index: usize) -> Option<&RawConstraint> {
        self.constraints.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RawConstraint> {
        self.constraints.get_mut(index)
    }

    pub fn extend<I: IntoIterator<Item = RawConstraint>>(&mut self, iter: I) {
        self.constraints.extend(iter);
    }

    /// Fixes every frequency and assigns target distances, producing the
    /// read-only set the objective engine consumes. The order is preserved.
    pub fn freeze<F>(self, mut target_distance: F) -> ConstraintSet
    where
        F: FnMut(&RawConstraint) -> f64,
    {
        let constraints = self
            .constraints
            .into_iter()
            .map(|raw| Constraint {
                pos1: raw.pos1,
                pos2: raw.pos2,
                frequency: raw.frequency,
                target_distance: target_distance(&raw),
            })
            .collect();
        ConstraintSet { constraints }
    }
}

/// A preprocessed locus-pair with its normalized frequency and target distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pos1: usize,
    pos2: usize,
    frequency: f64,
    target_distance: f64,
}

impl Constraint {
    pub fn new(a: usize, b: usize, frequency: f64, target_distance: f64) -> Self {
        Self {
            pos1: a.min(b),
            pos2: a.max(b),
            frequency,
            target_distance,
        }
    }

    #[inline]
    pub fn pos1(&self) -> usize {
        self.pos1
    }

    #[inline]
    pub fn pos2(&self) -> usize {
        self.pos2
    }

    #[inline]
    pub fn pair(&self) -> (usize, usize) {
        (self.pos1, self.pos2)
    }

    #[inline]
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    #[inline]
    pub fn target_distance(&self) -> f64 {
        self.target_distance
    }

    #[inline]
    pub fn is_consecutive(&self) -> bool {
        self.pos2 - self.pos1 == 1
    }
}

/// Frozen, sorted constraint collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Builds a set directly from finished constraints, sorting them by pair.
    pub fn from_constraints(mut constraints: Vec<Constraint>) -> Self {
        constraints.sort_unstable_by_key(Constraint::pair);
        Self { constraints }
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn as_slice(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Constraint> {
        self.constraints.get(index)
    }

    pub fn find(&self, a: usize, b: usize) -> Option<&Constraint> {
        let key = (a.min(b), a.max(b));
        self.constraints
            .binary_search_by(|c| c.pair().cmp(&key))
            .ok()
            .map(|idx| &self.constraints[idx])
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}
