/// Fixed-capacity circular buffer of normalized distances (cm).
///
/// The mean always covers every slot, including the pre-fill value, so it is
/// well defined from the first push. `filled()` only turns true after one full
/// wraparound.
#[derive(Debug, Clone)]
pub struct DistanceRing {
    slots: Vec<i32>,
    head: usize,
    sum: i64,
    pushes: u64,
}

impl DistanceRing {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize, fill: i32) -> Self {
        let cap = capacity.max(1);
        Self {
            slots: vec![fill; cap],
            head: 0,
            sum: i64::from(fill) * cap as i64,
            pushes: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, v: i32) {
        let old = std::mem::replace(&mut self.slots[self.head], v);
        self.sum += i64::from(v) - i64::from(old);
        self.head = (self.head + 1) % self.slots.len();
        self.pushes = self.pushes.saturating_add(1);
    }

    /// Integer mean over all slots, truncated toward zero.
    #[inline]
    pub fn mean(&self) -> i32 {
        (self.sum / self.slots.len() as i64) as i32
    }

    #[inline]
    pub fn filled(&self) -> bool {
        self.pushes >= self.slots.len() as u64
    }

    /// Total pushes since construction.
    #[inline]
    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    /// Completed wraparounds since construction.
    #[inline]
    pub fn wraps(&self) -> u64 {
        self.pushes / self.slots.len() as u64
    }
}
