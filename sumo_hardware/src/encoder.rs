//! Lock-free wheel encoder counters.
//!
//! The edge interrupt is the only writer and performs a single relaxed
//! `fetch_add`; it never blocks or allocates. The control loop is the only
//! reader and treats each load as a snapshot that may already be stale by a
//! few edges. Counts only move forward, so a late snapshot just shifts ticks
//! into the next velocity window.

use std::sync::atomic::{AtomicU64, Ordering};

use sumo_traits::{Encoders, Wheel};

#[derive(Debug, Default)]
pub struct EncoderCounters {
    counts: [AtomicU64; 2],
}

impl EncoderCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt-side hook: one rising edge on `wheel`'s encoder.
    #[inline]
    pub fn record_edge(&self, wheel: Wheel) {
        self.counts[wheel.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Credit several edges at once (simulated plants).
    #[inline]
    pub fn record_edges(&self, wheel: Wheel, n: u64) {
        if n > 0 {
            self.counts[wheel.index()].fetch_add(n, Ordering::Relaxed);
        }
    }
}

impl Encoders for EncoderCounters {
    #[inline]
    fn read_count(&self, wheel: Wheel) -> u64 {
        self.counts[wheel.index()].load(Ordering::Relaxed)
    }

    fn reset(&self) {
        for c in &self.counts {
            c.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn edges_accumulate_per_wheel() {
        let enc = EncoderCounters::new();
        enc.record_edge(Wheel::Left);
        enc.record_edge(Wheel::Left);
        enc.record_edges(Wheel::Right, 5);
        assert_eq!(enc.read_count(Wheel::Left), 2);
        assert_eq!(enc.read_count(Wheel::Right), 5);
        enc.reset();
        assert_eq!(enc.read_count(Wheel::Left), 0);
        assert_eq!(enc.read_count(Wheel::Right), 0);
    }

    #[test]
    fn concurrent_writers_lose_no_edges() {
        let enc = Arc::new(EncoderCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let enc = Arc::clone(&enc);
                let wheel = if i % 2 == 0 { Wheel::Left } else { Wheel::Right };
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        enc.record_edge(wheel);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(enc.read_count(Wheel::Left), 20_000);
        assert_eq!(enc.read_count(Wheel::Right), 20_000);
    }
}
