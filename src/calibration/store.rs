use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::capture::Region;
use crate::pricing::Tier;

/// Region per tier as persisted; `None` marks an uncalibrated tier.
pub type RegionSet = BTreeMap<Tier, Option<Region>>;

/// Calibrated capture regions, one slot per tier.
///
/// Each slot has its own lock, so recalibrating one tier never blocks a read
/// of another and a reader always sees a whole `Region`.
#[derive(Debug, Default)]
pub struct RegionStore {
    slots: [RwLock<Option<Region>>; 3],
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from persisted regions.
    pub fn from_map(regions: &RegionSet) -> Self {
        let store = Self::new();
        store.replace_all(regions);
        store
    }

    /// Region for `tier`, or `None` if it was never calibrated.
    pub fn get(&self, tier: Tier) -> Option<Region> {
        *self.slots[tier.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, tier: Tier, region: Option<Region>) {
        *self.slots[tier.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner) = region;
    }

    /// Copy of every slot, keyed by tier.
    pub fn snapshot(&self) -> RegionSet {
        Tier::ALL.iter().map(|&t| (t, self.get(t))).collect()
    }

    /// Overwrites every slot; tiers missing from `regions` become uncalibrated.
    pub fn replace_all(&self, regions: &RegionSet) {
        for tier in Tier::ALL {
            self.set(tier, regions.get(&tier).copied().flatten());
        }
    }

    /// Number of calibrated tiers.
    pub fn calibrated_count(&self) -> usize {
        Tier::ALL.iter().filter(|&&t| self.get(t).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_store() {
        let store = RegionStore::new();
        for tier in Tier::ALL {
            assert_eq!(store.get(tier), None);
        }
        assert_eq!(store.calibrated_count(), 0);
    }

    #[test]
    fn test_set_and_snapshot() {
        let store = RegionStore::new();
        store.set(Tier::Ten, Some(Region::new(1, 2, 3, 4)));
        let snap = store.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[&Tier::One], None);
        assert_eq!(snap[&Tier::Ten], Some(Region::new(1, 2, 3, 4)));
        assert_eq!(store.calibrated_count(), 1);
    }

    #[test]
    fn test_replace_all_clears_missing_tiers() {
        let store = RegionStore::new();
        store.set(Tier::One, Some(Region::new(0, 0, 10, 10)));

        let mut regions = BTreeMap::new();
        regions.insert(Tier::Hundred, Some(Region::new(5, 5, 20, 20)));
        store.replace_all(&regions);

        assert_eq!(store.get(Tier::One), None);
        assert_eq!(store.get(Tier::Hundred), Some(Region::new(5, 5, 20, 20)));
    }

    #[test]
    fn test_concurrent_writers_leave_whole_regions() {
        let store = Arc::new(RegionStore::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for n in 0..200 {
                        let v = i * 1000 + n;
                        store.set(Tier::One, Some(Region::new(v, v, v as u32, v as u32)));
                        let r = store.get(Tier::One).unwrap();
                        assert_eq!(r.x, r.y);
                        assert_eq!(r.width, r.height);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
