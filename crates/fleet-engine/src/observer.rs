//! Engine observer trait for progress reporting and data collection.

use fleet_core::{GridPos, Tick, VehicleId};
use fleet_store::DeliveryEvent;

use crate::{EngineError, TickReport};

/// Callbacks invoked by the engine during each tick pass.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.  Observers run on the engine thread, hence
/// the `Send` bound; keep them quick, the tick waits for them.
///
/// # Example — delivery printer
///
/// ```rust,ignore
/// struct DeliveryPrinter;
///
/// impl EngineObserver for DeliveryPrinter {
///     fn on_delivery(&mut self, tick: Tick, event: &DeliveryEvent) {
///         println!("{tick}: {} delivered #{}", event.vehicle_id, event.sequence);
///     }
/// }
/// ```
pub trait EngineObserver: Send {
    /// Called before the first vehicle of a pass is processed.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// A vehicle's target was the active traffic zone; it moved to `detour`.
    fn on_reroute(&mut self, _tick: Tick, _vehicle: VehicleId, _blocked: GridPos, _detour: GridPos) {}

    /// A delivery was credited and published.
    fn on_delivery(&mut self, _tick: Tick, _event: &DeliveryEvent) {}

    /// Called after every vehicle of a pass was processed successfully.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// The pass at `tick` failed and will be retried at the same step.
    fn on_tick_failed(&mut self, _tick: Tick, _error: &EngineError) {}

    /// Called once when a runner stops, with the next step it would have run.
    fn on_stopped(&mut self, _final_tick: Tick) {}
}

/// An [`EngineObserver`] that does nothing.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

/// Fans every callback out to a list of observers, in insertion order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn EngineObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: impl EngineObserver + 'static) {
        self.observers.push(Box::new(observer));
    }
}

impl EngineObserver for ObserverSet {
    fn on_tick_start(&mut self, tick: Tick) {
        self.observers.iter_mut().for_each(|o| o.on_tick_start(tick));
    }

    fn on_reroute(&mut self, tick: Tick, vehicle: VehicleId, blocked: GridPos, detour: GridPos) {
        self.observers.iter_mut().for_each(|o| o.on_reroute(tick, vehicle, blocked, detour));
    }

    fn on_delivery(&mut self, tick: Tick, event: &DeliveryEvent) {
        self.observers.iter_mut().for_each(|o| o.on_delivery(tick, event));
    }

    fn on_tick_end(&mut self, report: &TickReport) {
        self.observers.iter_mut().for_each(|o| o.on_tick_end(report));
    }

    fn on_tick_failed(&mut self, tick: Tick, error: &EngineError) {
        self.observers.iter_mut().for_each(|o| o.on_tick_failed(tick, error));
    }

    fn on_stopped(&mut self, final_tick: Tick) {
        self.observers.iter_mut().for_each(|o| o.on_stopped(final_tick));
    }
}
