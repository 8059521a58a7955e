//! The `MovementEngine` and its tick pass.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::{
    Clock, DeliveryCredit, FleetConfig, Grid, GridPos, SystemClock, Tick, TrafficEvent, VehicleId,
    fleet_ids,
};
use fleet_store::{DeliveryEvent, KvBackend, MemoryBackend, SharedFleetStore};
use tracing::{debug, info, warn};

use crate::{
    EngineError, EngineObserver, EngineResult, NoopObserver, TRAFFIC_LOOKAHEAD, VehicleStatus,
    will_hit_traffic,
};

// ── TickReport ────────────────────────────────────────────────────────────────

/// Summary of one successful tick pass.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TickReport {
    pub tick:       Tick,
    /// Vehicles whose position was written, detours included.
    pub moved:      usize,
    /// Vehicles that detoured around the traffic zone.
    pub rerouted:   usize,
    /// Deliveries newly credited this pass.
    pub delivered:  usize,
    /// Extra time the tick should take: one congestion delay per reroute,
    /// saturating at `Duration::MAX`.
    pub congestion: Duration,
}

// ── MovementEngine ────────────────────────────────────────────────────────────

/// Advances every vehicle one route step per tick.
///
/// Each pass, for every vehicle in ascending id order:
///
/// 1. Read the route from the store.  A vehicle whose route is shorter than
///    the step is idle and left untouched.
/// 2. If the target is the traffic zone and the jam has started, move to the
///    detour cell and flag the vehicle as rerouting; otherwise move to the
///    target.
/// 3. Credit a delivery according to the [`DeliveryCredit`] policy.  Credits
///    are stamped with the step, so replaying a tick never double counts.
///
/// The engine holds no vehicle state between ticks; the store is the only
/// copy.  The step, zone and trigger are fixed for the whole pass.
pub struct MovementEngine<B: KvBackend = MemoryBackend> {
    store:            SharedFleetStore<B>,
    vehicles:         Vec<VehicleId>,
    grid:             Grid,
    depot:            GridPos,
    traffic:          TrafficEvent,
    credit:           DeliveryCredit,
    congestion_delay: Duration,
    clock:            Arc<dyn Clock>,
    step:             Tick,
}

impl<B: KvBackend> MovementEngine<B> {
    /// Build an engine for the fleet described by `config`, starting at step
    /// zero.  Records `traffic` in the store for external readers.
    pub fn new(config: &FleetConfig, store: SharedFleetStore<B>, traffic: TrafficEvent) -> Self {
        store.set_traffic_event(traffic);
        Self {
            store,
            vehicles:         fleet_ids(config.vehicle_count).collect(),
            grid:             config.grid(),
            depot:            config.depot,
            traffic,
            credit:           config.delivery_credit,
            congestion_delay: config.congestion_delay(),
            clock:            Arc::new(SystemClock),
            step:             Tick::ZERO,
        }
    }

    /// Timestamp deliveries and memory entries with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_delivery_credit(mut self, credit: DeliveryCredit) -> Self {
        self.credit = credit;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// The step the next call to [`step`](Self::step) will process.
    pub fn current_step(&self) -> Tick {
        self.step
    }

    pub fn traffic(&self) -> TrafficEvent {
        self.traffic
    }

    pub fn store(&self) -> &SharedFleetStore<B> {
        &self.store
    }

    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    pub fn depot(&self) -> GridPos {
        self.depot
    }

    /// Presentation status of `id` at the current step.
    pub fn status(&self, id: VehicleId) -> VehicleStatus {
        VehicleStatus::of(&self.store.snapshot(id, self.depot), self.step, self.depot)
    }

    /// `true` if `id` will reach the active traffic zone within the next
    /// [`TRAFFIC_LOOKAHEAD`] route steps.
    pub fn heading_into_traffic(&self, id: VehicleId) -> bool {
        let route = self.store.route_or(id, vec![self.depot]);
        will_hit_traffic(self.step, &route, self.traffic, TRAFFIC_LOOKAHEAD)
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Process the current step and advance by one on success.
    pub fn step(&mut self) -> EngineResult<TickReport> {
        self.step_with(&mut NoopObserver, &|| false)
    }

    /// [`step`](Self::step) with an observer and a cancellation check.
    ///
    /// On failure the step is not advanced and `observer.on_tick_failed` is
    /// called, except for [`EngineError::Cancelled`].
    pub fn step_with(
        &mut self,
        observer:  &mut dyn EngineObserver,
        cancelled: &dyn Fn() -> bool,
    ) -> EngineResult<TickReport> {
        let now = self.step;
        match self.process_tick_with(now, observer, cancelled) {
            Ok(report) => {
                if !report.congestion.is_zero() {
                    self.clock.add_delay(report.congestion);
                }
                self.step = now.next();
                Ok(report)
            }
            Err(e) => {
                if !matches!(e, EngineError::Cancelled) {
                    observer.on_tick_failed(now, &e);
                }
                Err(e)
            }
        }
    }

    /// One pass over every vehicle at `step`.  Does not advance the counter.
    pub fn process_tick(&self, step: Tick) -> EngineResult<TickReport> {
        self.process_tick_with(step, &mut NoopObserver, &|| false)
    }

    /// [`process_tick`](Self::process_tick) with an observer and a
    /// cancellation check consulted before each vehicle.
    pub fn process_tick_with(
        &self,
        step:      Tick,
        observer:  &mut dyn EngineObserver,
        cancelled: &dyn Fn() -> bool,
    ) -> EngineResult<TickReport> {
        observer.on_tick_start(step);
        let mut report = TickReport { tick: step, ..TickReport::default() };

        for &id in &self.vehicles {
            if cancelled() {
                return Err(EngineError::Cancelled);
            }
            self.process_vehicle(id, step, observer, &mut report)?;
        }

        report.congestion = u32::try_from(report.rerouted)
            .ok()
            .and_then(|n| self.congestion_delay.checked_mul(n))
            .unwrap_or(Duration::MAX);
        debug!(
            tick = step.0,
            moved = report.moved,
            rerouted = report.rerouted,
            delivered = report.delivered,
            "tick complete"
        );
        observer.on_tick_end(&report);
        Ok(report)
    }

    fn process_vehicle(
        &self,
        id:       VehicleId,
        step:     Tick,
        observer: &mut dyn EngineObserver,
        report:   &mut TickReport,
    ) -> EngineResult<()> {
        let route = match self.store.try_route(id) {
            Ok(Some(route)) => route,
            Ok(None) => vec![self.depot],
            Err(e) if e.is_transient() => {
                warn!(vehicle = id.0, tick = step.0, error = %e, "route unavailable; vehicle holds position");
                return Ok(());
            }
            Err(e) => {
                return Err(EngineError::CorruptRoute { vehicle: id, reason: e.to_string() });
            }
        };

        let Some(&target) = route.get(step.index()) else {
            return Ok(());
        };
        let now_secs = self.clock.now_secs(step);

        if self.traffic.blocks(step, target) {
            let detour = self.grid.detour(target);
            self.store.set_position(id, detour, true);
            self.store.log_event(
                id,
                now_secs,
                format!("Rerouted at traffic zone {} from {} to {}", self.traffic.zone, target, detour),
            );
            info!(vehicle = id.0, tick = step.0, from = %target, to = %detour, "rerouted around traffic");
            observer.on_reroute(step, id, target, detour);
            report.rerouted += 1;
        } else {
            self.store.set_position(id, target, false);
            self.store.log_event(id, now_secs, format!("Moved to {target}"));
            debug!(vehicle = id.0, tick = step.0, to = %target, "moved");
        }
        report.moved += 1;

        let Some(previous) = self.credited_leg_start(&route, step, target) else {
            return Ok(());
        };
        let miles = f64::from(target.manhattan(previous));
        let Some(record) = self.store.credit_delivery(id, step, now_secs, miles)? else {
            debug!(vehicle = id.0, tick = step.0, "delivery already credited");
            return Ok(());
        };

        let event = DeliveryEvent {
            vehicle_id: id,
            sequence:   record.sequence,
            timestamp:  record.timestamp,
            miles:      record.miles,
            position:   target,
        };
        self.store.publish_delivery(&event);
        self.store.log_event(id, now_secs, format!("Delivered package at {target}, miles: {miles}"));
        info!(vehicle = id.0, tick = step.0, sequence = record.sequence, miles, "delivery credited");
        observer.on_delivery(step, &event);
        report.delivered += 1;
        Ok(())
    }

    /// Start of the leg ending at `target` if this step earns a delivery
    /// credit under the configured policy.
    fn credited_leg_start(&self, route: &[GridPos], step: Tick, target: GridPos) -> Option<GridPos> {
        if step == Tick::ZERO || target == self.depot {
            return None;
        }
        let previous = *route.get(step.index() - 1)?;
        match self.credit {
            DeliveryCredit::OnDepotDeparture if previous != self.depot => None,
            _ => Some(previous),
        }
    }
}

