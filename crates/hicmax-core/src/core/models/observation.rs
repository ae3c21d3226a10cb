/// One contact observation as supplied by the input collaborator, in raw
/// genomic coordinates (bin positions or matrix row indices).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub pos1: u64,
    pub pos2: u64,
    pub frequency: f64,
}

impl RawObservation {
    pub fn new(pos1: u64, pos2: u64, frequency: f64) -> Self {
        Self {
            pos1,
            pos2,
            frequency,
        }
    }

    /// The unordered pair as `(low, high)`.
    #[inline]
    pub fn canonical_pair(&self) -> (u64, u64) {
        (self.pos1.min(self.pos2), self.pos1.max(self.pos2))
    }

    #[inline]
    pub fn is_self_contact(&self) -> bool {
        self.pos1 == self.pos2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_orders_positions() {
        let obs = RawObservation::new(40, 10, 2.0);
        assert_eq!(obs.canonical_pair(), (10, 40));
    }

    #[test]
    fn self_contact_is_detected() {
        assert!(RawObservation::new(7, 7, 1.0).is_self_contact());
        assert!(!RawObservation::new(7, 8, 1.0).is_self_contact());
    }
}
