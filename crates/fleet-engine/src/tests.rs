//! Unit tests for fleet-engine.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_core::{FleetConfig, GridPos, SteppedClock, Tick, TrafficEvent, VehicleId};
    use fleet_store::SharedFleetStore;

    use crate::MovementEngine;

    pub const DEPOT: GridPos = GridPos::new(0, 0);

    pub fn config(vehicles: usize) -> FleetConfig {
        FleetConfig {
            vehicle_count:       vehicles,
            depot:               DEPOT,
            congestion_delay_ms: 500,
            ..FleetConfig::default()
        }
    }

    /// One-vehicle fleet whose route is `[DEPOT] + stops`.
    pub fn single(stops: &[GridPos], traffic: TrafficEvent) -> (SharedFleetStore, MovementEngine) {
        let store = SharedFleetStore::in_memory(100);
        store.init_vehicle(VehicleId(0), DEPOT).unwrap();
        store.append_route(VehicleId(0), stops, DEPOT).unwrap();
        let clock = Arc::new(SteppedClock::new(1_000.0, Duration::from_secs(1)));
        let engine = MovementEngine::new(&config(1), store.clone(), traffic).with_clock(clock);
        (store, engine)
    }

    /// A traffic event that never fires.
    pub fn no_traffic() -> TrafficEvent {
        TrafficEvent::new(Tick(u64::MAX), GridPos::new(-1, -1))
    }

    pub fn total_miles(store: &SharedFleetStore, id: VehicleId) -> f64 {
        store.deliveries(id).iter().map(|d| d.miles).sum()
    }
}

#[cfg(test)]
mod movement {
    use fleet_core::{GridPos, Tick, TrafficEvent, VehicleId};

    use super::helpers::{DEPOT, no_traffic, single, total_miles};

    #[test]
    fn end_to_end_single_vehicle() {
        let zone = GridPos::new(1, 0);
        let (store, mut engine) = single(
            &[GridPos::new(1, 0), GridPos::new(2, 0), DEPOT],
            TrafficEvent::new(Tick(2), zone),
        );
        for _ in 0..6 {
            engine.step().unwrap();
        }
        let v = VehicleId(0);
        assert_eq!(store.delivered(v), 1);
        assert_eq!(total_miles(&store, v), 1.0);
        assert_eq!(store.position(v, GridPos::new(9, 9)), DEPOT);
        assert_eq!(engine.current_step(), Tick(6));
    }

    #[test]
    fn position_follows_route() {
        let (store, engine) = single(&[GridPos::new(3, 4), DEPOT], no_traffic());
        let v = VehicleId(0);

        let report = engine.process_tick(Tick(1)).unwrap();
        assert_eq!(report.moved, 1);
        assert_eq!(store.position(v, DEPOT), GridPos::new(3, 4));
        assert!(!store.rerouting(v));
        assert_eq!(store.recent_memory(v, 5)[0].event, "Moved to (3, 4)");
    }

    #[test]
    fn exhausted_route_is_idle() {
        let (store, engine) = single(&[GridPos::new(3, 4), DEPOT], no_traffic());
        let v = VehicleId(0);
        store.set_position(v, GridPos::new(7, 7), false);

        let report = engine.process_tick(Tick(3)).unwrap();
        assert_eq!(report.moved, 0);
        assert_eq!(store.position(v, DEPOT), GridPos::new(7, 7));
        assert!(store.recent_memory(v, 5).is_empty());
    }

    #[test]
    fn missing_route_treated_as_depot_only() {
        use fleet_store::KvBackend;

        let (store, engine) = single(&[], no_traffic());
        store.backend().delete(&fleet_store::keys::vehicle_key(VehicleId(0))).unwrap();

        assert_eq!(engine.process_tick(Tick(0)).unwrap().moved, 1);
        assert_eq!(engine.process_tick(Tick(1)).unwrap().moved, 0);
    }

    #[test]
    fn step_advances_exactly_one() {
        let (_, mut engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        assert_eq!(engine.step().unwrap().tick, Tick(0));
        assert_eq!(engine.step().unwrap().tick, Tick(1));
        assert_eq!(engine.current_step(), Tick(2));
    }
}

#[cfg(test)]
mod rerouting {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_core::{Clock, GridPos, SteppedClock, Tick, TrafficEvent, VehicleId};

    use super::helpers::{DEPOT, config, single};
    use crate::MovementEngine;

    #[test]
    fn detours_one_cell_east_once_per_pass() {
        let zone = GridPos::new(5, 5);
        let (store, engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(0), zone));
        let v = VehicleId(0);

        let report = engine.process_tick(Tick(1)).unwrap();
        assert_eq!(report.rerouted, 1);
        assert_eq!(report.moved, 1);
        assert_eq!(report.congestion, Duration::from_millis(500));

        let pos = store.position(v, DEPOT);
        assert_eq!(pos, GridPos::new(6, 5));
        assert_eq!(pos.manhattan(zone), 1);
        assert!(store.rerouting(v));
        assert_eq!(
            store.recent_memory(v, 5).iter().filter(|e| e.event.starts_with("Rerouted")).count(),
            1
        );
        assert!(store.recent_memory(v, 5).iter().any(|e| {
            e.event == "Rerouted at traffic zone (5, 5) from (5, 5) to (6, 5)"
        }));
    }

    #[test]
    fn detours_west_on_right_edge() {
        let zone = GridPos::new(19, 3);
        let (store, engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(0), zone));
        engine.process_tick(Tick(1)).unwrap();
        assert_eq!(store.position(VehicleId(0), DEPOT), GridPos::new(18, 3));
    }

    #[test]
    fn zone_ignored_before_trigger() {
        let zone = GridPos::new(5, 5);
        let (store, engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(2), zone));
        let report = engine.process_tick(Tick(1)).unwrap();
        assert_eq!(report.rerouted, 0);
        assert_eq!(store.position(VehicleId(0), DEPOT), zone);
    }

    #[test]
    fn rerouting_flag_clears_on_next_move() {
        let zone = GridPos::new(5, 5);
        let (store, mut engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(0), zone));
        engine.step().unwrap();
        engine.step().unwrap();
        assert!(store.rerouting(VehicleId(0)));
        engine.step().unwrap();
        assert!(!store.rerouting(VehicleId(0)));
    }

    #[test]
    fn congestion_added_to_clock_after_pass() {
        let zone = GridPos::new(2, 2);
        let store = fleet_store::SharedFleetStore::in_memory(100);
        for i in 0..3 {
            store.init_vehicle(VehicleId(i), DEPOT).unwrap();
            store.append_route(VehicleId(i), &[zone, DEPOT], DEPOT).unwrap();
        }
        let clock = Arc::new(SteppedClock::new(0.0, Duration::from_secs(1)));
        let mut engine = MovementEngine::new(&config(3), store, TrafficEvent::new(Tick(0), zone))
            .with_clock(clock.clone());

        engine.step().unwrap();
        assert_eq!(clock.accumulated_delay(), Duration::ZERO);
        let report = engine.step().unwrap();
        assert_eq!(report.rerouted, 3);
        assert_eq!(clock.accumulated_delay(), Duration::from_millis(1_500));
        assert_eq!(clock.now_secs(Tick(2)), 3.5);
    }

    #[test]
    fn congestion_saturates_instead_of_overflowing() {
        let zone = GridPos::new(2, 2);
        let store = fleet_store::SharedFleetStore::in_memory(100);
        for i in 0..2 {
            store.init_vehicle(VehicleId(i), DEPOT).unwrap();
            store.append_route(VehicleId(i), &[zone, DEPOT], DEPOT).unwrap();
        }
        let cfg = fleet_core::FleetConfig { congestion_delay_ms: u64::MAX, ..config(2) };
        let mut engine = MovementEngine::new(&cfg, store, TrafficEvent::new(Tick(0), zone));

        engine.step().unwrap();
        let report = engine.step().unwrap();
        assert_eq!(report.rerouted, 2);
        assert_eq!(report.congestion, Duration::MAX);
        assert_eq!(engine.current_step(), Tick(2));
    }
}

#[cfg(test)]
mod deliveries {
    use std::time::Duration;

    use fleet_core::{DeliveryCredit, GridPos, Tick, VehicleId};

    use super::helpers::{DEPOT, no_traffic, single, total_miles};

    #[test]
    fn replayed_tick_credits_once() {
        let (store, engine) = single(&[GridPos::new(2, 3), DEPOT], no_traffic());
        let feed = store.subscribe_deliveries().unwrap();
        let v = VehicleId(0);

        let first = engine.process_tick(Tick(1)).unwrap();
        let replay = engine.process_tick(Tick(1)).unwrap();
        assert_eq!(first.delivered, 1);
        assert_eq!(replay.delivered, 0);
        assert_eq!(store.delivered(v), 1);
        assert_eq!(feed.drain().len(), 1);
    }

    #[test]
    fn delivery_published_with_leg_details() {
        let (store, engine) = single(&[GridPos::new(2, 3), DEPOT], no_traffic());
        let feed = store.subscribe_deliveries().unwrap();
        engine.process_tick(Tick(1)).unwrap();

        let event = feed.next_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.vehicle_id, VehicleId(0));
        assert_eq!(event.sequence, 1);
        assert_eq!(event.miles, 5.0);
        assert_eq!(event.position, GridPos::new(2, 3));
        // SteppedClock: 1000 s + 1 tick.
        assert_eq!(event.timestamp, 1_001.0);

        let memory = store.recent_memory(VehicleId(0), 1);
        assert_eq!(memory[0].event, "Delivered package at (2, 3), miles: 5");
    }

    #[test]
    fn return_to_depot_is_not_a_delivery() {
        let (store, mut engine) = single(&[GridPos::new(2, 3), DEPOT], no_traffic());
        for _ in 0..3 {
            engine.step().unwrap();
        }
        assert_eq!(store.delivered(VehicleId(0)), 1);
    }

    #[test]
    fn departure_policy_skips_consecutive_stops() {
        let stops = [GridPos::new(1, 0), GridPos::new(2, 0), DEPOT];
        let (store, mut engine) = single(&stops, no_traffic());
        for _ in 0..4 {
            engine.step().unwrap();
        }
        assert_eq!(store.delivered(VehicleId(0)), 1);
    }

    #[test]
    fn arrival_policy_counts_every_stop() {
        let stops = [GridPos::new(1, 0), GridPos::new(2, 0), DEPOT];
        let (store, engine) = single(&stops, no_traffic());
        let mut engine = engine.with_delivery_credit(DeliveryCredit::OnArrival);
        for _ in 0..4 {
            engine.step().unwrap();
        }
        let v = VehicleId(0);
        assert_eq!(store.delivered(v), 2);
        assert_eq!(total_miles(&store, v), 2.0);
    }
}

#[cfg(test)]
mod failures {
    use fleet_core::{GridPos, Tick, VehicleId};
    use fleet_store::keys;

    use super::helpers::{DEPOT, no_traffic, single};
    use crate::{EngineError, EngineObserver, NoopObserver};

    #[derive(Default)]
    struct FailureCounter {
        failed: Vec<Tick>,
    }

    impl EngineObserver for FailureCounter {
        fn on_tick_failed(&mut self, tick: Tick, _error: &EngineError) {
            self.failed.push(tick);
        }
    }

    #[test]
    fn corrupt_route_fails_tick_without_advancing() {
        let (store, mut engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        store.set_or_log(&keys::vehicle_key(VehicleId(0)), &[(keys::vehicle::ROUTE, "{oops".into())]);

        let mut counter = FailureCounter::default();
        let err = engine.step_with(&mut counter, &|| false).unwrap_err();
        assert!(matches!(err, EngineError::CorruptRoute { vehicle: VehicleId(0), .. }));
        assert_eq!(engine.current_step(), Tick(0));
        assert_eq!(counter.failed, [Tick(0)]);
    }

    #[test]
    fn cancellation_is_not_a_failure() {
        let (store, mut engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        let mut counter = FailureCounter::default();
        let err = engine.step_with(&mut counter, &|| true).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(counter.failed.is_empty());
        assert_eq!(engine.current_step(), Tick(0));
        assert!(store.recent_memory(VehicleId(0), 1).is_empty());
    }

    #[test]
    fn cancellation_checked_between_vehicles() {
        use std::cell::Cell;

        let (_, engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        let calls = Cell::new(0);
        let cancelled = || {
            calls.set(calls.get() + 1);
            calls.get() > 1
        };
        // One vehicle: a single check happens before it, so the pass completes.
        engine.process_tick_with(Tick(0), &mut NoopObserver, &cancelled).unwrap();
        assert_eq!(calls.get(), 1);
    }
}

#[cfg(test)]
mod degraded {
    use std::sync::atomic::{AtomicBool, Ordering};

    use crossbeam_channel::Receiver;
    use fleet_core::{GridPos, Tick, TrafficEvent, VehicleId};
    use fleet_store::{Hash, KvBackend, MemoryBackend, SharedFleetStore, StoreError, StoreResult, keys};
    use parking_lot::Mutex;

    use super::helpers::{DEPOT, config, no_traffic};
    use crate::{EngineError, MovementEngine};

    /// Memory backend whose reads of one key, or whose atomic updates, can be
    /// made to fail as if the server were unreachable.
    #[derive(Default)]
    struct FlakyBackend {
        inner:           MemoryBackend,
        unreadable:      Mutex<Option<String>>,
        failing_updates: AtomicBool,
    }

    impl FlakyBackend {
        fn check_read(&self, key: &str) -> StoreResult<()> {
            match self.unreadable.lock().as_deref() {
                Some(k) if k == key => Err(StoreError::Unavailable(format!("{key} unreachable"))),
                _ => Ok(()),
            }
        }
    }

    impl KvBackend for FlakyBackend {
        fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
            self.check_read(key)?;
            self.inner.hget(key, field)
        }
        fn hgetall(&self, key: &str) -> StoreResult<Hash> {
            self.check_read(key)?;
            self.inner.hgetall(key)
        }
        fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
            self.inner.hset(key, fields)
        }
        fn hupdate(&self, key: &str, f: &mut dyn FnMut(&mut Hash) -> StoreResult<()>) -> StoreResult<()> {
            if self.failing_updates.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("update timed out".into()));
            }
            self.inner.hupdate(key, f)
        }
        fn rpush_capped(&self, key: &str, value: String, cap: usize) -> StoreResult<usize> {
            self.inner.rpush_capped(key, value, cap)
        }
        fn lrange_tail(&self, key: &str, n: usize) -> StoreResult<Vec<String>> {
            self.inner.lrange_tail(key, n)
        }
        fn publish(&self, channel: &str, message: String) -> StoreResult<usize> {
            self.inner.publish(channel, message)
        }
        fn subscribe(&self, channel: &str) -> StoreResult<Receiver<String>> {
            self.inner.subscribe(channel)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }
        fn flush(&self) -> StoreResult<()> {
            self.inner.flush()
        }
    }

    /// Vehicle `i` gets route `[DEPOT, stops[i], DEPOT]`.
    fn fleet(stops: &[GridPos], traffic: TrafficEvent) -> (SharedFleetStore<FlakyBackend>, MovementEngine<FlakyBackend>) {
        let store = SharedFleetStore::new(FlakyBackend::default(), 100);
        for (i, &stop) in stops.iter().enumerate() {
            let id = VehicleId(i as u32);
            store.init_vehicle(id, DEPOT).unwrap();
            store.append_route(id, &[stop, DEPOT], DEPOT).unwrap();
        }
        let engine = MovementEngine::new(&config(stops.len()), store.clone(), traffic);
        (store, engine)
    }

    #[test]
    fn unreachable_route_holds_vehicle_while_others_advance() {
        let (store, mut engine) = fleet(&[GridPos::new(1, 1), GridPos::new(2, 2)], no_traffic());
        engine.step().unwrap();

        *store.backend().unreadable.lock() = Some(keys::vehicle_key(VehicleId(0)));
        let report = engine.step().unwrap();
        assert_eq!(report.moved, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(engine.current_step(), Tick(2));

        *store.backend().unreadable.lock() = None;
        assert_eq!(store.position(VehicleId(0), GridPos::new(-1, -1)), DEPOT);
        assert_eq!(store.delivered(VehicleId(0)), 0);
        assert_eq!(store.position(VehicleId(1), DEPOT), GridPos::new(2, 2));
        assert_eq!(store.delivered(VehicleId(1)), 1);
    }

    #[test]
    fn transient_credit_failure_fails_tick_then_credits_once() {
        let (store, mut engine) = fleet(&[GridPos::new(3, 0)], no_traffic());
        let v = VehicleId(0);
        engine.step().unwrap();

        store.backend().failing_updates.store(true, Ordering::SeqCst);
        let err = engine.step().unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Unavailable(_))));
        assert_eq!(engine.current_step(), Tick(1));
        assert_eq!(store.delivered(v), 0);

        store.backend().failing_updates.store(false, Ordering::SeqCst);
        let report = engine.step().unwrap();
        assert_eq!(report.tick, Tick(1));
        assert_eq!(report.delivered, 1);
        assert_eq!(engine.current_step(), Tick(2));

        // Replaying the same step never credits a second time.
        engine.process_tick(Tick(1)).unwrap();
        assert_eq!(store.delivered(v), 1);
        let legs = store.deliveries(v);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].miles, 3.0);
    }
}

#[cfg(test)]
mod observers {
    use std::sync::Arc;

    use fleet_core::{GridPos, Tick, TrafficEvent, VehicleId};
    use fleet_store::DeliveryEvent;
    use parking_lot::Mutex;

    use super::helpers::{DEPOT, single};
    use crate::{EngineObserver, ObserverSet, TickReport};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl EngineObserver for Recorder {
        fn on_tick_start(&mut self, tick: Tick) {
            self.events.push(format!("start {}", tick.0));
        }
        fn on_reroute(&mut self, _tick: Tick, vehicle: VehicleId, _blocked: GridPos, detour: GridPos) {
            self.events.push(format!("reroute {} {detour}", vehicle.0));
        }
        fn on_delivery(&mut self, _tick: Tick, event: &DeliveryEvent) {
            self.events.push(format!("delivery {}", event.sequence));
        }
        fn on_tick_end(&mut self, report: &TickReport) {
            self.events.push(format!("end {}", report.tick.0));
        }
    }

    #[test]
    fn callbacks_in_order() {
        let zone = GridPos::new(4, 4);
        let (_, mut engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(1), zone));
        let mut rec = Recorder::default();
        engine.step_with(&mut rec, &|| false).unwrap();
        engine.step_with(&mut rec, &|| false).unwrap();
        assert_eq!(rec.events, [
            "start 0",
            "end 0",
            "start 1",
            "reroute 0 (5, 4)",
            "delivery 1",
            "end 1",
        ]);
    }

    struct TickLog(Arc<Mutex<Vec<(usize, u64)>>>, usize);

    impl EngineObserver for TickLog {
        fn on_tick_end(&mut self, report: &TickReport) {
            self.0.lock().push((self.1, report.tick.0));
        }
    }

    #[test]
    fn observer_set_fans_out_in_insertion_order() {
        let (_, engine) = single(&[GridPos::new(1, 1), DEPOT], super::helpers::no_traffic());
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = ObserverSet::new();
        set.push(TickLog(log.clone(), 0));
        set.push(TickLog(log.clone(), 1));
        engine.process_tick_with(Tick(1), &mut set, &|| false).unwrap();
        assert_eq!(*log.lock(), [(0, 1), (1, 1)]);
    }
}

#[cfg(test)]
mod status {
    use fleet_core::{GridPos, Tick, TrafficEvent, VehicleId};

    use super::helpers::{DEPOT, single};
    use crate::{TRAFFIC_LOOKAHEAD, VehicleStatus, will_hit_traffic};

    #[test]
    fn classify_from_route_and_flag() {
        let route = [DEPOT, GridPos::new(3, 3), DEPOT];
        assert_eq!(VehicleStatus::classify(Tick(0), &route, DEPOT, false), VehicleStatus::Idle);
        assert_eq!(VehicleStatus::classify(Tick(1), &route, DEPOT, false), VehicleStatus::Delivering);
        assert_eq!(VehicleStatus::classify(Tick(1), &route, DEPOT, true), VehicleStatus::Rerouting);
        assert_eq!(VehicleStatus::classify(Tick(3), &route, DEPOT, true), VehicleStatus::Idle);
        assert_eq!(VehicleStatus::Rerouting.to_string(), "rerouting");
    }

    #[test]
    fn lookahead_window() {
        let zone = GridPos::new(9, 9);
        let mut route = vec![DEPOT; 8];
        route[6] = zone;
        let traffic = TrafficEvent::new(Tick(0), zone);

        assert!(!will_hit_traffic(Tick(0), &route, traffic, TRAFFIC_LOOKAHEAD));
        assert!(will_hit_traffic(Tick(2), &route, traffic, TRAFFIC_LOOKAHEAD));
        assert!(will_hit_traffic(Tick(6), &route, traffic, TRAFFIC_LOOKAHEAD));
        assert!(!will_hit_traffic(Tick(7), &route, traffic, TRAFFIC_LOOKAHEAD));
        assert!(!will_hit_traffic(Tick(50), &route, traffic, TRAFFIC_LOOKAHEAD));
    }

    #[test]
    fn lookahead_respects_trigger() {
        let zone = GridPos::new(9, 9);
        let route = [DEPOT, zone, DEPOT];
        // Zone reached at step 1, jam starts at step 2.
        assert!(!will_hit_traffic(Tick(0), &route, TrafficEvent::new(Tick(2), zone), 5));
        assert!(will_hit_traffic(Tick(0), &route, TrafficEvent::new(Tick(1), zone), 5));
    }

    #[test]
    fn engine_reports_status() {
        let zone = GridPos::new(4, 4);
        let (_, mut engine) = single(&[zone, DEPOT], TrafficEvent::new(Tick(0), zone));
        let v = VehicleId(0);
        assert!(engine.heading_into_traffic(v));
        engine.step().unwrap();
        engine.step().unwrap();
        // The vehicle detoured at step 1; at step 2 it heads home, still flagged.
        assert_eq!(engine.status(v), VehicleStatus::Rerouting);
        engine.step().unwrap();
        assert_eq!(engine.status(v), VehicleStatus::Idle);
    }
}

#[cfg(test)]
mod runner {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use fleet_core::{GridPos, Tick, VehicleId};
    use fleet_store::keys;

    use super::helpers::{DEPOT, no_traffic, single};
    use crate::{EngineError, EngineObserver, EngineRunner, RunnerTiming};

    fn fast() -> RunnerTiming {
        RunnerTiming {
            tick_period:      Duration::from_millis(1),
            failure_cooldown: Duration::from_millis(1),
        }
    }

    fn wait_until(deadline: Duration, mut f: impl FnMut() -> bool) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        f()
    }

    #[test]
    fn second_start_is_rejected() {
        let (_, engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        let runner = EngineRunner::new(engine, fast());
        runner.start().unwrap();
        assert!(matches!(runner.start(), Err(EngineError::AlreadyRunning)));
        assert!(runner.is_running());
        runner.stop().unwrap();
        assert!(!runner.is_running());
    }

    #[test]
    fn stop_without_start_is_noop() {
        let (_, engine) = single(&[], no_traffic());
        let runner = EngineRunner::new(engine, fast());
        assert_eq!(runner.stop().unwrap(), Tick(0));
        assert_eq!(runner.stop().unwrap(), Tick(0));
    }

    #[test]
    fn runs_until_stopped() {
        let (store, engine) = single(&[GridPos::new(1, 0), GridPos::new(2, 0), DEPOT], no_traffic());
        let runner = EngineRunner::new(engine, fast());
        runner.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || runner.current_step() >= Tick(5)));
        let final_step = runner.stop().unwrap();
        assert!(final_step >= Tick(5));
        assert_eq!(store.delivered(VehicleId(0)), 1);

        // Restarting continues from where it stopped.
        runner.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || runner.current_step() > final_step));
        runner.stop().unwrap();
    }

    #[test]
    fn stop_interrupts_long_sleep() {
        let (_, engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        let timing = RunnerTiming {
            tick_period:      Duration::from_secs(60),
            failure_cooldown: Duration::from_secs(60),
        };
        let runner = EngineRunner::new(engine, timing);
        runner.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || runner.current_step() == Tick(1)));

        let started = Instant::now();
        assert_eq!(runner.stop().unwrap(), Tick(1));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    struct Failures(Arc<AtomicUsize>);

    impl EngineObserver for Failures {
        fn on_tick_failed(&mut self, _tick: Tick, _error: &EngineError) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn failed_tick_retried_at_same_step() {
        let (store, engine) = single(&[GridPos::new(1, 1), DEPOT], no_traffic());
        let key = keys::vehicle_key(VehicleId(0));
        store.set_or_log(&key, &[(keys::vehicle::ROUTE, "garbage".into())]);

        let failures = Arc::new(AtomicUsize::new(0));
        let runner = EngineRunner::new(engine, fast());
        runner.add_observer(Failures(failures.clone()));
        runner.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || failures.load(Ordering::SeqCst) >= 3));
        assert_eq!(runner.current_step(), Tick(0));

        // Repair the record; the same step now succeeds and the loop moves on.
        store.set_or_log(&key, &[(keys::vehicle::ROUTE, "[[0,0],[1,1],[0,0]]".into())]);
        assert!(wait_until(Duration::from_secs(5), || runner.current_step() >= Tick(3)));
        runner.stop().unwrap();
        assert_eq!(store.delivered(VehicleId(0)), 1);
    }

    /// Panics the first time it sees the end of `at`.
    struct PanicOnce {
        at:    Tick,
        fired: bool,
    }

    impl EngineObserver for PanicOnce {
        fn on_tick_end(&mut self, report: &crate::TickReport) {
            if report.tick == self.at && !self.fired {
                self.fired = true;
                panic!("observer blew up at {}", report.tick);
            }
        }
    }

    struct FailedTicks(Arc<parking_lot::Mutex<Vec<(Tick, String)>>>);

    impl EngineObserver for FailedTicks {
        fn on_tick_failed(&mut self, tick: Tick, error: &EngineError) {
            self.0.lock().push((tick, error.to_string()));
        }
    }

    #[test]
    fn panicking_tick_is_retried_not_fatal() {
        let stops = [GridPos::new(1, 0), GridPos::new(2, 0), DEPOT, GridPos::new(3, 3), DEPOT];
        let (store, engine) = single(&stops, no_traffic());
        let failed = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let runner = EngineRunner::new(engine, fast());
        runner.add_observer(PanicOnce { at: Tick(2), fired: false });
        runner.add_observer(FailedTicks(failed.clone()));
        runner.start().unwrap();

        assert!(wait_until(Duration::from_secs(5), || runner.current_step() >= Tick(6)));
        assert!(runner.is_running());
        assert!(runner.stop().unwrap() >= Tick(6));

        let failed = failed.lock();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, Tick(2));
        assert!(failed[0].1.contains("observer blew up at T2"), "{}", failed[0].1);
        // Both depot departures credited exactly once despite the replayed step.
        assert_eq!(store.delivered(VehicleId(0)), 2);
    }
}

#[cfg(test)]
mod fleet {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_core::{FleetConfig, GridPos, SteppedClock, fleet_ids};
    use fleet_dispatch::{draw_traffic_event, initialize};
    use fleet_store::SharedFleetStore;

    use crate::MovementEngine;

    #[test]
    fn every_order_delivered_once() {
        let config = FleetConfig::default();
        let store = SharedFleetStore::in_memory(config.memory_retention);
        let orders = initialize(&config, &store).unwrap();
        let clock = Arc::new(SteppedClock::new(0.0, Duration::from_millis(300)));
        let mut engine = MovementEngine::new(&config, store.clone(), draw_traffic_event(&config).unwrap())
            .with_clock(clock);

        for _ in 0..(2 * config.order_count + 5) {
            engine.step().unwrap();
        }
        // An order placed on the depot itself never earns a credit.
        let expected = orders.iter().filter(|o| o.position != config.depot).count();
        let delivered: u32 = fleet_ids(config.vehicle_count).map(|id| store.delivered(id)).sum();
        assert_eq!(delivered as usize, expected);
        for id in fleet_ids(config.vehicle_count) {
            assert_eq!(store.position(id, GridPos::new(-1, -1)), config.depot);
        }
    }
}
