//! Periodic metrics publication from the engine thread.

use fleet_core::Tick;
use fleet_engine::{EngineObserver, TickReport};
use fleet_store::{KvBackend, MemoryBackend, SharedFleetStore};

use crate::publish;

/// An [`EngineObserver`] that republishes fleet metrics every `interval`
/// ticks and once more when the runner stops.
///
/// An `interval` of zero disables the periodic publication; the final one on
/// stop still happens.
pub struct MetricsPublisher<B: KvBackend = MemoryBackend> {
    store:         SharedFleetStore<B>,
    vehicle_count: usize,
    interval:      u64,
    published:     u64,
}

impl<B: KvBackend> MetricsPublisher<B> {
    pub fn new(store: SharedFleetStore<B>, vehicle_count: usize, interval: u64) -> Self {
        Self { store, vehicle_count, interval, published: 0 }
    }

    /// Number of publications so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    fn publish_now(&mut self) {
        publish(&self.store, self.vehicle_count);
        self.published += 1;
    }
}

impl<B: KvBackend> EngineObserver for MetricsPublisher<B> {
    fn on_tick_end(&mut self, report: &TickReport) {
        if self.interval > 0 && report.tick.0 % self.interval == 0 {
            self.publish_now();
        }
    }

    fn on_stopped(&mut self, _final_tick: Tick) {
        self.publish_now();
    }
}
