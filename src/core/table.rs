use std::cmp::Ordering;

use keyed_priority_queue::KeyedPriorityQueue;
use log::debug;
use rustc_hash::FxHashMap;

use super::{
    memory::{Addr, FreeSegmentList},
    state::{Pid, Ticks},
};
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Resident { top: Addr },
    OnDisk,
}

#[derive(Debug, Clone)]
pub struct ProcessMemory {
    pub pid: Pid,
    pub size: usize,
    pub placement: Placement,
    pub last_swap_in: Option<Ticks>,
    // Registration order; settles eviction ties on size and swap-in time
    seq: u64,
}

impl ProcessMemory {
    pub fn is_on_disk(&self) -> bool {
        self.placement == Placement::OnDisk
    }

    /// `(bottom, top]` when resident.
    pub fn range(&self) -> Option<(Addr, Addr)> {
        match self.placement {
            Placement::Resident { top } => Some((top - self.size, top)),
            Placement::OnDisk => None,
        }
    }
}

/// How attractive a resident image is to evict. The heap pops the greatest
/// rank: largest image first, then the one swapped in earliest, then the one
/// registered last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EvictionRank {
    size: usize,
    swapped_in: Ticks,
    seq: u64,
}

impl Ord for EvictionRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.size
            .cmp(&other.size)
            .then_with(|| other.swapped_in.cmp(&self.swapped_in))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for EvictionRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns every process memory image, resident or not.
#[derive(Debug)]
pub struct MemoryTable {
    // Arrival order
    records: Vec<ProcessMemory>,
    index: FxHashMap<Pid, usize>,
    resident: KeyedPriorityQueue<Pid, EvictionRank>,
    next_seq: u64,
    swap_outs: u64,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: FxHashMap::default(),
            resident: KeyedPriorityQueue::new(),
            next_seq: 0,
            swap_outs: 0,
        }
    }

    pub fn register(&mut self, pid: Pid, size: usize) -> SimResult<&ProcessMemory> {
        if self.index.contains_key(&pid) {
            return Err(SimError::DuplicateProcess { pid });
        }
        if size == 0 {
            return Err(SimError::InvalidMemorySize { pid });
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.index.insert(pid, self.records.len());
        self.records.push(ProcessMemory {
            pid,
            size,
            placement: Placement::OnDisk,
            last_swap_in: None,
            seq,
        });
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessMemory> {
        self.index.get(&pid).map(|&i| &self.records[i])
    }

    fn slot(&self, pid: Pid) -> SimResult<usize> {
        self.index
            .get(&pid)
            .copied()
            .ok_or(SimError::UnknownProcess { pid })
    }

    pub fn is_on_disk(&self, pid: Pid) -> SimResult<bool> {
        Ok(self.records[self.slot(pid)?].is_on_disk())
    }

    /// Make `pid` resident, evicting other images until a hole is big enough.
    /// Returns the evicted process ids in eviction order.
    pub fn swap_in(
        &mut self,
        pid: Pid,
        now: Ticks,
        free: &mut FreeSegmentList,
        total: usize,
    ) -> SimResult<Vec<Pid>> {
        let i = self.slot(pid)?;
        let size = self.records[i].size;
        if !self.records[i].is_on_disk() {
            return Ok(Vec::new());
        }
        if size > total {
            return Err(SimError::ProcessTooLarge { pid, size, total });
        }

        let mut evicted = Vec::new();
        loop {
            if let Some(hole) = free.find_first_fit(size) {
                let top = free.consume(hole, size);
                let record = &mut self.records[i];
                record.placement = Placement::Resident { top };
                record.last_swap_in = Some(now);
                self.resident.push(
                    pid,
                    EvictionRank {
                        size,
                        swapped_in: now,
                        seq: record.seq,
                    },
                );
                debug!("t={now} swap in pid={pid} size={size} at ({}, {top}]", top - size);
                return Ok(evicted);
            }

            match self.evict_victim(free)? {
                Some(victim) => evicted.push(victim),
                None => return Err(SimError::NothingToEvict { pid, size }),
            }
        }
    }

    /// Swap out the largest resident image, oldest first on ties. `None` when
    /// nothing is resident.
    pub fn evict_victim(&mut self, free: &mut FreeSegmentList) -> SimResult<Option<Pid>> {
        let Some((&victim, _)) = self.resident.peek() else {
            return Ok(None);
        };
        self.swap_out(victim, free)?;
        Ok(Some(victim))
    }

    pub fn swap_out(&mut self, pid: Pid, free: &mut FreeSegmentList) -> SimResult<()> {
        let i = self.slot(pid)?;
        let record = &mut self.records[i];
        let Placement::Resident { top } = record.placement else {
            return Ok(());
        };

        free.release(top, record.size);
        record.placement = Placement::OnDisk;
        record.last_swap_in = None;
        self.resident.remove(&pid);
        self.swap_outs += 1;
        debug!("swap out pid={pid} size={}", record.size);
        Ok(())
    }

    /// Drop the record for `pid`, releasing its memory first if resident.
    pub fn remove(&mut self, pid: Pid, free: &mut FreeSegmentList) -> SimResult<bool> {
        if !self.index.contains_key(&pid) {
            return Ok(false);
        }
        self.swap_out(pid, free)?;

        let i = self.slot(pid)?;
        self.records.remove(i);
        self.index.remove(&pid);
        for (offset, record) in self.records[i..].iter().enumerate() {
            self.index.insert(record.pid, i + offset);
        }
        Ok(true)
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn resident_total_size(&self) -> usize {
        self.resident.iter().map(|(_, rank)| rank.size).sum()
    }

    pub fn swap_outs(&self) -> u64 {
        self.swap_outs
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessMemory> {
        self.records.iter()
    }

    pub fn resident(&self) -> impl Iterator<Item = &ProcessMemory> {
        self.records.iter().filter(|r| !r.is_on_disk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: usize = 150;

    fn table_with(sizes: &[(Pid, usize)]) -> MemoryTable {
        let mut table = MemoryTable::new();
        for &(pid, size) in sizes {
            table.register(pid, size).unwrap();
        }
        table
    }

    #[test]
    fn register_starts_on_disk() {
        let table = table_with(&[(1, 20)]);
        let record = table.get(1).unwrap();
        assert!(record.is_on_disk());
        assert_eq!(record.last_swap_in, None);
        assert_eq!(table.resident_count(), 0);
    }

    #[test]
    fn register_rejects_duplicates_and_empty_images() {
        let mut table = table_with(&[(1, 20)]);
        assert!(matches!(
            table.register(1, 10),
            Err(SimError::DuplicateProcess { pid: 1 })
        ));
        assert!(matches!(
            table.register(2, 0),
            Err(SimError::InvalidMemorySize { pid: 2 })
        ));
    }

    #[test]
    fn canonical_four_process_layout() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = table_with(&[(1, 20), (2, 20), (3, 20), (4, 30)]);
        for (pid, t) in [(1, 0), (2, 0), (3, 1), (4, 1)] {
            assert!(table.swap_in(pid, t, &mut free, TOTAL).unwrap().is_empty());
        }

        assert_eq!(table.get(1).unwrap().range(), Some((130, 150)));
        assert_eq!(table.get(4).unwrap().range(), Some((60, 90)));
        assert_eq!(free.count(), 1);
        assert_eq!(free.total_free(), 60);
        assert_eq!(table.resident_count(), 4);
        assert_eq!(table.resident_total_size(), 90);
    }

    #[test]
    fn fifth_process_fits_without_eviction() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = table_with(&[(1, 20), (2, 20), (3, 20), (4, 30), (5, 30)]);
        for (pid, t) in [(1, 0), (2, 0), (3, 1), (4, 1)] {
            table.swap_in(pid, t, &mut free, TOTAL).unwrap();
        }

        let evicted = table.swap_in(5, 2, &mut free, TOTAL).unwrap();
        assert!(evicted.is_empty());
        assert_eq!(free.count(), 1);
        assert_eq!(free.total_free(), 30);
        assert_eq!(table.resident_count(), 5);
    }

    #[test]
    fn eviction_picks_largest_image() {
        let mut free = FreeSegmentList::new(100);
        let mut table = table_with(&[(1, 20), (2, 50), (3, 30), (4, 40)]);
        for pid in 1..=3 {
            table.swap_in(pid, 0, &mut free, 100).unwrap();
        }

        let evicted = table.swap_in(4, 1, &mut free, 100).unwrap();
        assert_eq!(evicted, vec![2]);
        assert!(table.is_on_disk(2).unwrap());
        assert_eq!(table.get(4).unwrap().range(), Some((40, 80)));
    }

    #[test]
    fn eviction_tie_goes_to_earliest_swap_in() {
        let mut free = FreeSegmentList::new(60);
        let mut table = table_with(&[(1, 30), (2, 30), (3, 30)]);
        // pid 2 arrives in memory first even though it registered later.
        table.swap_in(2, 3, &mut free, 60).unwrap();
        table.swap_in(1, 5, &mut free, 60).unwrap();

        let evicted = table.swap_in(3, 7, &mut free, 60).unwrap();
        assert_eq!(evicted, vec![2]);
        assert!(!table.is_on_disk(1).unwrap());
        assert_eq!(table.get(3).unwrap().last_swap_in, Some(7));
    }

    #[test]
    fn exact_tie_goes_to_latest_registration() {
        let mut free = FreeSegmentList::new(60);
        let mut table = table_with(&[(1, 30), (2, 30), (3, 30)]);
        table.swap_in(1, 0, &mut free, 60).unwrap();
        table.swap_in(2, 0, &mut free, 60).unwrap();

        let evicted = table.swap_in(3, 1, &mut free, 60).unwrap();
        assert_eq!(evicted, vec![2]);
    }

    #[test]
    fn swap_in_evicts_until_a_hole_fits() {
        let mut free = FreeSegmentList::new(100);
        let mut table = table_with(&[(1, 25), (2, 25), (3, 25), (4, 25), (5, 60)]);
        for pid in 1..=4 {
            table.swap_in(pid, pid, &mut free, 100).unwrap();
        }

        // Equal sizes evict oldest first: 1 frees (75, 100], 2 frees (50, 75].
        // Those merge into a 50 hole, still too small, so 3 goes next.
        let evicted = table.swap_in(5, 9, &mut free, 100).unwrap();
        assert_eq!(evicted, vec![1, 2, 3]);
        assert_eq!(table.get(5).unwrap().range(), Some((40, 100)));
        assert_eq!(free.total_free() + table.resident_total_size(), 100);
    }

    #[test]
    fn oversized_request_is_rejected_up_front() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = table_with(&[(1, 20), (2, TOTAL + 1)]);
        table.swap_in(1, 0, &mut free, TOTAL).unwrap();

        let err = table.swap_in(2, 1, &mut free, TOTAL).unwrap_err();
        assert!(matches!(
            err,
            SimError::ProcessTooLarge { pid: 2, size: 151, total: TOTAL }
        ));
        // Nothing was evicted on the way to the error.
        assert!(!table.is_on_disk(1).unwrap());
    }

    #[test]
    fn swap_out_restores_free_space() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = table_with(&[(1, 20), (2, 20)]);
        table.swap_in(1, 0, &mut free, TOTAL).unwrap();
        table.swap_in(2, 0, &mut free, TOTAL).unwrap();

        table.swap_out(1, &mut free).unwrap();
        assert_eq!(free.count(), 2);
        assert!(table.get(1).unwrap().is_on_disk());
        assert_eq!(table.get(1).unwrap().last_swap_in, None);

        table.swap_out(2, &mut free).unwrap();
        assert_eq!(free.count(), 1);
        assert_eq!(free.total_free(), TOTAL);
        assert_eq!(table.swap_outs(), 2);
    }

    #[test]
    fn remove_releases_resident_memory() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = table_with(&[(1, 20), (2, 30), (3, 40)]);
        table.swap_in(2, 0, &mut free, TOTAL).unwrap();

        assert!(table.remove(2, &mut free).unwrap());
        assert!(!table.remove(2, &mut free).unwrap());
        assert_eq!(free.total_free(), TOTAL);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(3).unwrap().size, 40);
        assert!(table.is_on_disk(3).unwrap());
    }

    #[test]
    fn empty_memory_with_no_fit_reports_nothing_to_evict() {
        // The table believes 100 units exist but the free list only has 50.
        let mut free = FreeSegmentList::new(50);
        let mut table = table_with(&[(1, 80)]);
        assert!(matches!(
            table.swap_in(1, 0, &mut free, 100),
            Err(SimError::NothingToEvict { pid: 1, size: 80 })
        ));
        assert!(table.is_on_disk(1).unwrap());
    }

    #[test]
    fn unknown_process_is_an_error() {
        let mut free = FreeSegmentList::new(TOTAL);
        let mut table = MemoryTable::new();
        assert!(matches!(
            table.swap_in(9, 0, &mut free, TOTAL),
            Err(SimError::UnknownProcess { pid: 9 })
        ));
    }
}
