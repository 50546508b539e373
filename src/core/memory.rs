/// Address or length in simulated memory units.
pub type Addr = usize;

/// A hole in physical memory, described by its highest address and length.
/// It covers `(top - size, top]`, so the lowest occupied unit is
/// `bottom()` and the next hole below may start exactly there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSegment {
    pub top: Addr,
    pub size: usize,
}

impl FreeSegment {
    pub fn bottom(&self) -> Addr {
        self.top - self.size
    }
}

/// Free holes ordered by descending top address. Never holds two
/// address-contiguous segments or an empty one.
#[derive(Debug, Clone)]
pub struct FreeSegmentList {
    segments: Vec<FreeSegment>,
}

impl FreeSegmentList {
    pub fn new(total: usize) -> Self {
        let segments = if total > 0 {
            vec![FreeSegment {
                top: total,
                size: total,
            }]
        } else {
            Vec::new()
        };
        Self { segments }
    }

    /// Return `(top - size, top]` to the free pool.
    pub fn release(&mut self, top: Addr, size: usize) {
        debug_assert!(size > 0, "Released an empty range at {top}");
        debug_assert!(size <= top, "Range of {size} below address 0 at {top}");
        debug_assert!(
            self.segments
                .iter()
                .all(|s| top <= s.bottom() || top - size >= s.top),
            "Released range ({}, {top}] overlaps a free segment",
            top - size
        );

        let at = self
            .segments
            .iter()
            .position(|s| s.top <= top)
            .unwrap_or(self.segments.len());
        self.segments.insert(at, FreeSegment { top, size });
        self.consolidate();
    }

    /// Merge every pair of neighbours where one ends where the next begins.
    /// A merge only ever exposes the following segment, so one forward
    /// pass is enough.
    pub fn consolidate(&mut self) {
        let mut i = 0;
        while i + 1 < self.segments.len() {
            if self.segments[i].bottom() == self.segments[i + 1].top {
                let next = self.segments.remove(i + 1);
                self.segments[i].size += next.size;
            } else {
                i += 1;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the first segment, scanning from the highest address, that
    /// can hold `size` units.
    pub fn find_first_fit(&self, size: usize) -> Option<usize> {
        self.segments.iter().position(|s| s.size >= size)
    }

    /// Carve `amount` units off the top of segment `index` and return the
    /// top address of the carved range.
    pub fn consume(&mut self, index: usize, amount: usize) -> Addr {
        let segment = &mut self.segments[index];
        debug_assert!(
            amount <= segment.size,
            "Consumed {amount} from a segment of {}",
            segment.size
        );

        let top = segment.top;
        segment.top -= amount;
        segment.size -= amount;
        if segment.size == 0 {
            self.segments.remove(index);
        }
        top
    }

    pub fn total_free(&self) -> usize {
        self.segments.iter().map(|s| s.size).sum()
    }

    pub fn largest(&self) -> usize {
        self.segments.iter().map(|s| s.size).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FreeSegment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[FreeSegment] {
        &self.segments
    }
}
