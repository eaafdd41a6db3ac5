use super::Grain;

// -------------------------------------------------------------------------------------------------

/// Handle to a slot in a [`GrainPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrainSlot(usize);

impl GrainSlot {
    /// The slot's index in the pool.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Info about a grain which got terminated to make room for a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StolenGrain {
    /// Id of the stolen grain.
    pub id: u64,
    /// Samples the stolen grain had left to play.
    pub remaining: usize,
}

/// Result of [`GrainPool::try_allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainAllocation {
    /// The allocated slot. The grain in it is inactive and needs to be activated by the caller.
    pub slot: GrainSlot,
    /// Set when the pool was saturated and a live grain got stolen for the allocation.
    pub stolen: Option<StolenGrain>,
}

// -------------------------------------------------------------------------------------------------

/// Fixed capacity storage for [`Grain`]s.
///
/// All memory is allocated up front in [`GrainPool::new`], so allocating, reclaiming and
/// traversing grains is real-time safe. Live slots are tracked in a dense list, which makes
/// traversals proportional to the number of live grains rather than to the capacity.
///
/// When the pool is saturated, allocations steal the live grain with the fewest remaining
/// samples. Ties are broken by stealing the oldest grain (lowest id).
#[derive(Debug, Clone)]
pub struct GrainPool {
    grains: Box<[Grain]>,
    /// Unused slot indices.
    free_slots: Vec<usize>,
    /// Allocated slot indices, in no particular order.
    live_slots: Vec<usize>,
    /// Position of each slot in `live_slots`, or `Self::NOT_LIVE`.
    live_positions: Box<[usize]>,
}

impl GrainPool {
    const NOT_LIVE: usize = usize::MAX;

    /// Create a new pool with the given capacity. A pool with capacity 0 never allocates grains.
    pub fn new(capacity: usize) -> Self {
        let grains = vec![Grain::new(); capacity].into_boxed_slice();
        // pop from the end: hand out low slots first
        let free_slots = (0..capacity).rev().collect();
        let live_slots = Vec::with_capacity(capacity);
        let live_positions = vec![Self::NOT_LIVE; capacity].into_boxed_slice();
        Self {
            grains,
            free_slots,
            live_slots,
            live_positions,
        }
    }

    /// Maximum number of simultaneously live grains.
    pub fn capacity(&self) -> usize {
        self.grains.len()
    }

    /// Number of currently allocated grains.
    pub fn live_count(&self) -> usize {
        self.live_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_slots.is_empty()
    }

    /// True when every slot is in use: further allocations will steal.
    pub fn is_saturated(&self) -> bool {
        self.free_slots.is_empty()
    }

    /// Allocate a grain slot, stealing a live grain when the pool is saturated.
    /// Returns `None` for pools with zero capacity only. Real-time safe.
    pub fn try_allocate(&mut self) -> Option<GrainAllocation> {
        if let Some(slot) = self.free_slots.pop() {
            debug_assert!(self.live_positions[slot] == Self::NOT_LIVE);
            self.live_positions[slot] = self.live_slots.len();
            self.live_slots.push(slot);
            return Some(GrainAllocation {
                slot: GrainSlot(slot),
                stolen: None,
            });
        }
        let slot = self.steal_candidate()?;
        let grain = &mut self.grains[slot];
        let stolen = grain.is_alive().then_some(StolenGrain {
            id: grain.id(),
            remaining: grain.remaining(),
        });
        grain.deactivate();
        // the slot stays in the live list: the caller reuses it right away
        Some(GrainAllocation {
            slot: GrainSlot(slot),
            stolen,
        })
    }

    /// Access a grain by slot.
    #[inline]
    pub fn grain(&self, slot: GrainSlot) -> &Grain {
        &self.grains[slot.0]
    }

    /// Mutable access to a grain by slot.
    #[inline]
    pub fn grain_mut(&mut self, slot: GrainSlot) -> &mut Grain {
        &mut self.grains[slot.0]
    }

    /// Deactivate the grain in the given slot and return the slot to the free list.
    /// Does nothing for slots which are not allocated.
    pub fn reclaim(&mut self, slot: GrainSlot) {
        let slot = slot.0;
        let position = self.live_positions[slot];
        if position == Self::NOT_LIVE {
            return;
        }
        self.live_slots.swap_remove(position);
        if let Some(&moved_slot) = self.live_slots.get(position) {
            self.live_positions[moved_slot] = position;
        }
        self.live_positions[slot] = Self::NOT_LIVE;
        self.grains[slot].deactivate();
        self.free_slots.push(slot);
    }

    /// Iterate over all allocated slots and their grains, in unspecified order.
    pub fn iter_live(&self) -> impl Iterator<Item = (GrainSlot, &Grain)> + '_ {
        self.live_slots
            .iter()
            .map(|&slot| (GrainSlot(slot), &self.grains[slot]))
    }

    /// Apply `f` to every allocated, alive grain and reclaim all grains for which `f` returns
    /// false, as well as allocated grains which are no longer alive. Each live grain is visited
    /// exactly once. Real-time safe.
    pub fn retain_live<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Grain) -> bool,
    {
        let mut position = 0;
        while position < self.live_slots.len() {
            let slot = self.live_slots[position];
            let grain = &mut self.grains[slot];
            if grain.is_alive() && f(grain) {
                position += 1;
            } else {
                // swaps the last, not yet visited live slot into `position`
                self.reclaim(GrainSlot(slot));
            }
        }
    }

    /// Apply `f` to every allocated, alive grain without reclaiming anything.
    pub fn for_each_live_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Grain),
    {
        for &slot in &self.live_slots {
            let grain = &mut self.grains[slot];
            if grain.is_alive() {
                f(grain);
            }
        }
    }

    /// Reclaim all grains. Real-time safe.
    pub fn clear(&mut self) {
        while let Some(&slot) = self.live_slots.last() {
            self.reclaim(GrainSlot(slot));
        }
    }

    fn steal_candidate(&self) -> Option<usize> {
        self.live_slots.iter().copied().min_by_key(|&slot| {
            let grain = &self.grains[slot];
            if grain.is_alive() {
                (grain.remaining(), grain.id())
            } else {
                (0, 0)
            }
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(pool: &mut GrainPool, id: u64, duration: usize) -> GrainAllocation {
        let allocation = pool.try_allocate().expect("pool has capacity");
        pool.grain_mut(allocation.slot)
            .activate(id, 60.0, 0.0, 1.0, duration, 0.0);
        allocation
    }

    #[test]
    fn allocation_up_to_capacity() {
        let mut pool = GrainPool::new(4);
        assert!(pool.is_empty());
        for id in 0..4 {
            let allocation = allocate(&mut pool, id, 100);
            assert!(allocation.stolen.is_none());
        }
        assert_eq!(pool.live_count(), 4);
        assert!(pool.is_saturated());

        let mut ids = pool.iter_live().map(|(_, g)| g.id()).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        // further allocations steal and never exceed the capacity
        for id in 4..10 {
            let allocation = allocate(&mut pool, id, 100);
            assert!(allocation.stolen.is_some());
            assert_eq!(pool.live_count(), 4);
        }
    }

    #[test]
    fn zero_capacity() {
        let mut pool = GrainPool::new(0);
        assert!(pool.try_allocate().is_none());
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn steals_grain_closest_to_completion() {
        let mut pool = GrainPool::new(3);
        allocate(&mut pool, 1, 500);
        let short = allocate(&mut pool, 2, 50);
        allocate(&mut pool, 3, 800);
        pool.grain_mut(short.slot).age = 10;

        let allocation = allocate(&mut pool, 4, 100);
        assert_eq!(
            allocation.stolen,
            Some(StolenGrain {
                id: 2,
                remaining: 40
            })
        );
        assert_eq!(allocation.slot, short.slot);
        assert_eq!(pool.grain(allocation.slot).id(), 4);
    }

    #[test]
    fn steal_ties_pick_oldest_grain() {
        let mut pool = GrainPool::new(3);
        allocate(&mut pool, 7, 100);
        allocate(&mut pool, 3, 100);
        allocate(&mut pool, 5, 100);
        let allocation = allocate(&mut pool, 8, 100);
        assert_eq!(allocation.stolen.map(|s| s.id), Some(3));
    }

    #[test]
    fn reclaim_and_retain() {
        let mut pool = GrainPool::new(8);
        let slots = (0..8)
            .map(|id| allocate(&mut pool, id, 10).slot)
            .collect::<Vec<_>>();

        pool.reclaim(slots[2]);
        pool.reclaim(slots[2]); // no-op
        assert_eq!(pool.live_count(), 7);
        assert!(!pool.is_saturated());

        // drop all odd ids, visiting every grain once
        let mut visited = Vec::new();
        pool.retain_live(|grain| {
            visited.push(grain.id());
            grain.id() % 2 == 0
        });
        visited.sort();
        assert_eq!(visited, vec![0, 1, 3, 4, 5, 6, 7]);

        let mut ids = pool.iter_live().map(|(_, g)| g.id()).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec![0, 4, 6]);
        assert!(pool.iter_live().all(|(_, g)| g.is_alive()));

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.iter_live().count(), 0);
        // all slots usable again
        for id in 0..8 {
            assert!(allocate(&mut pool, id, 10).stolen.is_none());
        }
    }

    #[test]
    fn retain_reclaims_dead_grains() {
        let mut pool = GrainPool::new(2);
        let a = allocate(&mut pool, 0, 10);
        allocate(&mut pool, 1, 10);
        pool.grain_mut(a.slot).deactivate();
        let mut visited = 0;
        pool.retain_live(|_| {
            visited += 1;
            true
        });
        assert_eq!(visited, 1);
        assert_eq!(pool.live_count(), 1);
    }
}
