use std::collections::VecDeque;

use super::state::{Pid, PcbKey, Priority};

/// Position of a PCB in a sorted queue: lower priority value first, then
/// lower pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueueRank {
    pub priority: Priority,
    pub pid: Pid,
}

/// Ordered run of PCB keys. Serves as both the ready queue (sorted inserts,
/// or plain appends for first-come-first-served) and the terminated list.
#[derive(Debug, Default, Clone)]
pub struct PcbQueue {
    entries: VecDeque<(QueueRank, PcbKey)>,
}

impl PcbQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert ahead of the first entry that ranks strictly after `rank`.
    pub fn insert(&mut self, key: PcbKey, rank: QueueRank) {
        let at = self.entries.partition_point(|(r, _)| *r <= rank);
        self.entries.insert(at, (rank, key));
    }

    pub fn append(&mut self, key: PcbKey, rank: QueueRank) {
        self.entries.push_back((rank, key));
    }

    pub fn pop_front(&mut self) -> Option<PcbKey> {
        self.entries.pop_front().map(|(_, key)| key)
    }

    pub fn front(&self) -> Option<PcbKey> {
        self.entries.front().map(|(_, key)| *key)
    }

    pub fn contains(&self, key: PcbKey) -> bool {
        self.entries.iter().any(|(_, k)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|((a, _), (b, _))| a <= b)
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.iter().map(|(rank, _)| rank.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<PcbKey> {
        let mut arena: SlotMap<PcbKey, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    fn rank(priority: Priority, pid: Pid) -> QueueRank {
        QueueRank { priority, pid }
    }

    #[test]
    fn insert_orders_by_priority_then_pid() {
        let k = keys(5);
        let mut queue = PcbQueue::new();
        queue.insert(k[0], rank(2, 1));
        queue.insert(k[1], rank(1, 9));
        queue.insert(k[2], rank(1, 3));
        queue.insert(k[3], rank(3, 0));
        queue.insert(k[4], rank(2, 0));

        assert!(queue.is_sorted());
        assert_eq!(queue.pids().collect::<Vec<_>>(), vec![3, 9, 0, 1, 0]);
        assert_eq!(queue.pop_front(), Some(k[2]));
        assert_eq!(queue.pop_front(), Some(k[1]));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn append_ignores_rank() {
        let k = keys(3);
        let mut queue = PcbQueue::new();
        queue.append(k[0], rank(1, 7));
        queue.append(k[1], rank(1, 2));
        queue.append(k[2], rank(1, 5));

        assert_eq!(queue.pids().collect::<Vec<_>>(), vec![7, 2, 5]);
        assert!(!queue.is_sorted());
        assert_eq!(queue.front(), Some(k[0]));
    }

    #[test]
    fn pop_from_empty_queue() {
        let mut queue = PcbQueue::new();
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn contains_tracks_membership() {
        let k = keys(2);
        let mut queue = PcbQueue::new();
        queue.insert(k[0], rank(1, 1));
        assert!(queue.contains(k[0]));
        assert!(!queue.contains(k[1]));
        queue.pop_front();
        assert!(!queue.contains(k[0]));
    }
}
