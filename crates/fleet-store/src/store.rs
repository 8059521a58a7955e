//! `SharedFleetStore` — the typed, failure-tolerant view over a backend.
//!
//! # Failure policy
//!
//! Methods come in two flavours:
//!
//! - `try_*` and the few lifecycle methods return [`StoreResult`] so callers
//!   that must distinguish failures (startup, corrupt routes) can.
//! - Everything else never fails: reads fall back to the caller's default (or
//!   the type's natural zero) and writes log a warning and carry on.  The
//!   engine's tick loop only uses this flavour for transient data.

use std::str::FromStr;
use std::sync::Arc;

use fleet_core::{GridPos, Tick, TrafficEvent, VehicleId};
use tracing::warn;

use crate::backend::{Hash, KvBackend};
use crate::keys::{self, memory_key, vehicle_key};
use crate::{
    DeliveryEvent, DeliveryFeed, DeliveryRecord, FleetMetrics, MemoryBackend, MemoryEntry,
    StoreError, StoreResult, VehicleSnapshot,
};

/// Default number of memory-log entries kept per vehicle.
pub const DEFAULT_MEMORY_RETENTION: usize = 100;

/// Handle to the shared fleet state.
///
/// Cheap to clone; every clone talks to the same backend.  Construct once at
/// process start and hand a clone to each component.
pub struct SharedFleetStore<B: KvBackend = MemoryBackend> {
    backend:          Arc<B>,
    memory_retention: usize,
}

impl<B: KvBackend> Clone for SharedFleetStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend:          Arc::clone(&self.backend),
            memory_retention: self.memory_retention,
        }
    }
}

impl SharedFleetStore<MemoryBackend> {
    /// A store over a fresh [`MemoryBackend`].
    pub fn in_memory(memory_retention: usize) -> Self {
        Self::new(MemoryBackend::new(), memory_retention)
    }
}

impl<B: KvBackend> SharedFleetStore<B> {
    pub fn new(backend: B, memory_retention: usize) -> Self {
        Self::from_arc(Arc::new(backend), memory_retention)
    }

    /// Share an existing backend handle.
    pub fn from_arc(backend: Arc<B>, memory_retention: usize) -> Self {
        Self { backend, memory_retention: memory_retention.max(1) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn memory_retention(&self) -> usize {
        self.memory_retention
    }

    // ── Generic safe accessors ────────────────────────────────────────────

    /// Parse one hash field, or return `default` if it is missing, the
    /// backend fails, or the value does not parse.
    pub fn get_or<T: FromStr>(&self, key: &str, field: &str, default: T) -> T {
        match self.backend.hget(key, field) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(key, field, value = %raw, "unparseable store field; using default");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!(key, field, error = %e, "store read failed; using default");
                default
            }
        }
    }

    /// Write hash fields, logging instead of failing.
    pub fn set_or_log(&self, key: &str, fields: &[(&str, String)]) {
        if let Err(e) = self.backend.hset(key, fields) {
            warn!(key, error = %e, "store write failed; continuing");
        }
    }

    fn hgetall_or_empty(&self, key: &str) -> Hash {
        self.backend.hgetall(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "store read failed; using empty record");
            Hash::new()
        })
    }

    // ── Vehicle records ───────────────────────────────────────────────────

    /// Reset `id` to an idle vehicle parked at `depot` with route `[depot]`.
    ///
    /// Clears any fields and memory left over from a previous run.
    pub fn init_vehicle(&self, id: VehicleId, depot: GridPos) -> StoreResult<()> {
        let key = vehicle_key(id);
        self.backend.delete(&key)?;
        self.backend.delete(&memory_key(id))?;
        self.backend.hset(&key, &[
            (keys::vehicle::POS_X, depot.x.to_string()),
            (keys::vehicle::POS_Y, depot.y.to_string()),
            (keys::vehicle::ROUTE, encode_route(&[depot])),
            (keys::vehicle::DELIVERED, "0".to_owned()),
            (keys::vehicle::REROUTING, "0".to_owned()),
        ])
    }

    /// The stored route, `None` if the vehicle has none.
    ///
    /// Fails with [`StoreError::Decode`] when the stored JSON is corrupt, and
    /// with whatever the backend raises otherwise.
    pub fn try_route(&self, id: VehicleId) -> StoreResult<Option<Vec<GridPos>>> {
        let key = vehicle_key(id);
        match self.backend.hget(&key, keys::vehicle::ROUTE)? {
            None => Ok(None),
            Some(raw) => decode_route(&key, &raw).map(Some),
        }
    }

    /// The stored route, or `default` on any failure.
    pub fn route_or(&self, id: VehicleId, default: Vec<GridPos>) -> Vec<GridPos> {
        match self.try_route(id) {
            Ok(Some(route)) => route,
            Ok(None) => default,
            Err(e) => {
                warn!(vehicle = id.0, error = %e, "route read failed; using default");
                default
            }
        }
    }

    /// Atomically append `stops` to the vehicle's current route.
    ///
    /// A vehicle without a route starts from `[start]`.  The read and the
    /// write happen under one lock, so concurrent readers never observe a
    /// half-built route and concurrent appends are never lost.  Returns the
    /// new route.
    pub fn append_route(
        &self,
        id:    VehicleId,
        stops: &[GridPos],
        start: GridPos,
    ) -> StoreResult<Vec<GridPos>> {
        let key = vehicle_key(id);
        let mut updated = Vec::new();
        self.backend.hupdate(&key, &mut |h| {
            let mut route = match h.get(keys::vehicle::ROUTE) {
                Some(raw) => decode_route(&key, raw)?,
                None => vec![start],
            };
            route.extend_from_slice(stops);
            h.insert(keys::vehicle::ROUTE.to_owned(), encode_route(&route));
            updated = route;
            Ok(())
        })?;
        Ok(updated)
    }

    pub fn position(&self, id: VehicleId, default: GridPos) -> GridPos {
        let h = self.hgetall_or_empty(&vehicle_key(id));
        match (parse::<i32>(&h, keys::vehicle::POS_X), parse::<i32>(&h, keys::vehicle::POS_Y)) {
            (Some(x), Some(y)) => GridPos::new(x, y),
            _ => default,
        }
    }

    /// Write position and rerouting flag together.
    pub fn set_position(&self, id: VehicleId, pos: GridPos, rerouting: bool) {
        self.set_or_log(&vehicle_key(id), &[
            (keys::vehicle::POS_X, pos.x.to_string()),
            (keys::vehicle::POS_Y, pos.y.to_string()),
            (keys::vehicle::REROUTING, (rerouting as u8).to_string()),
        ]);
    }

    pub fn rerouting(&self, id: VehicleId) -> bool {
        self.get_or::<u8>(&vehicle_key(id), keys::vehicle::REROUTING, 0) != 0
    }

    pub fn delivered(&self, id: VehicleId) -> u32 {
        self.get_or(&vehicle_key(id), keys::vehicle::DELIVERED, 0)
    }

    /// Step of the most recent credited delivery, if any.
    pub fn credited_step(&self, id: VehicleId) -> Option<Tick> {
        self.backend
            .hget(&vehicle_key(id), keys::vehicle::CREDITED_STEP)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok())
            .map(Tick)
    }

    /// Credit one delivery at `step`, exactly once.
    ///
    /// Increments `delivered`, writes `delivery_time_{n}` / `delivery_miles_{n}`
    /// and stamps `credited_step`, all in one atomic update.  Returns `None`
    /// without touching the record if a delivery was already credited at or
    /// after `step`, so replaying a tick never double counts.
    pub fn credit_delivery(
        &self,
        id:        VehicleId,
        step:      Tick,
        timestamp: f64,
        miles:     f64,
    ) -> StoreResult<Option<DeliveryRecord>> {
        let key = vehicle_key(id);
        let mut credited = None;
        self.backend.hupdate(&key, &mut |h| {
            credited = None;
            if parse::<u64>(h, keys::vehicle::CREDITED_STEP).is_some_and(|last| last >= step.0) {
                return Ok(());
            }
            let sequence = parse::<u32>(h, keys::vehicle::DELIVERED).unwrap_or(0) + 1;
            h.insert(keys::vehicle::DELIVERED.to_owned(), sequence.to_string());
            h.insert(keys::vehicle::delivery_time(sequence), timestamp.to_string());
            h.insert(keys::vehicle::delivery_miles(sequence), miles.to_string());
            h.insert(keys::vehicle::CREDITED_STEP.to_owned(), step.0.to_string());
            credited = Some(DeliveryRecord { sequence, timestamp, miles });
            Ok(())
        })?;
        Ok(credited)
    }

    /// Every recorded delivery leg of `id`, in sequence order.
    ///
    /// Reads the record once.  Legs whose fields are missing read as zero.
    pub fn deliveries(&self, id: VehicleId) -> Vec<DeliveryRecord> {
        let h = self.hgetall_or_empty(&vehicle_key(id));
        let delivered = parse::<u32>(&h, keys::vehicle::DELIVERED).unwrap_or(0);
        (1..=delivered)
            .map(|sequence| DeliveryRecord {
                sequence,
                timestamp: parse(&h, &keys::vehicle::delivery_time(sequence)).unwrap_or(0.0),
                miles:     parse(&h, &keys::vehicle::delivery_miles(sequence)).unwrap_or(0.0),
            })
            .collect()
    }

    /// One consistent read of a vehicle record.
    ///
    /// Missing position reads as `depot`; a missing or corrupt route reads
    /// as `[depot]`.
    pub fn snapshot(&self, id: VehicleId, depot: GridPos) -> VehicleSnapshot {
        let key = vehicle_key(id);
        let h = self.hgetall_or_empty(&key);
        let position = match (parse::<i32>(&h, keys::vehicle::POS_X), parse::<i32>(&h, keys::vehicle::POS_Y)) {
            (Some(x), Some(y)) => GridPos::new(x, y),
            _ => depot,
        };
        let route = h
            .get(keys::vehicle::ROUTE)
            .and_then(|raw| decode_route(&key, raw).ok())
            .unwrap_or_else(|| vec![depot]);
        VehicleSnapshot {
            id,
            position,
            route,
            delivered: parse(&h, keys::vehicle::DELIVERED).unwrap_or(0),
            rerouting: parse::<u8>(&h, keys::vehicle::REROUTING).unwrap_or(0) != 0,
        }
    }

    // ── Memory log ────────────────────────────────────────────────────────

    /// Append an event to the vehicle's memory, evicting the oldest entries
    /// beyond the retention limit.
    pub fn log_event(&self, id: VehicleId, time: f64, event: impl Into<String>) {
        let entry = MemoryEntry { time, event: event.into() };
        let key = memory_key(id);
        let result = serde_json::to_string(&entry)
            .map_err(|e| StoreError::Decode {
                key:    key.clone(),
                field:  "event".into(),
                reason: e.to_string(),
            })
            .and_then(|json| self.backend.rpush_capped(&key, json, self.memory_retention));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "memory log append failed; continuing");
        }
    }

    /// The last `n` memory entries, oldest first.  Undecodable entries are
    /// skipped.
    pub fn recent_memory(&self, id: VehicleId, n: usize) -> Vec<MemoryEntry> {
        let key = memory_key(id);
        match self.backend.lrange_tail(&key, n) {
            Ok(raw) => raw.iter().filter_map(|r| serde_json::from_str(r).ok()).collect(),
            Err(e) => {
                warn!(key = %key, error = %e, "memory read failed; returning nothing");
                Vec::new()
            }
        }
    }

    // ── Delivery channel ──────────────────────────────────────────────────

    /// Publish on the `delivery` channel.  Returns the number of receivers.
    pub fn publish_delivery(&self, event: &DeliveryEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "cannot encode delivery event");
                return 0;
            }
        };
        self.backend
            .publish(keys::DELIVERY_CHANNEL, json)
            .unwrap_or_else(|e| {
                warn!(error = %e, "delivery publish failed; continuing");
                0
            })
    }

    pub fn subscribe_deliveries(&self) -> StoreResult<DeliveryFeed> {
        self.backend.subscribe(keys::DELIVERY_CHANNEL).map(DeliveryFeed::new)
    }

    // ── Global slots ──────────────────────────────────────────────────────

    pub fn set_traffic_event(&self, event: TrafficEvent) {
        self.set_or_log(keys::TRAFFIC_KEY, &[
            (keys::traffic::TRIGGER_STEP, event.trigger_step.0.to_string()),
            (keys::traffic::ZONE_X, event.zone.x.to_string()),
            (keys::traffic::ZONE_Y, event.zone.y.to_string()),
        ]);
    }

    pub fn traffic_event(&self) -> Option<TrafficEvent> {
        let h = self.hgetall_or_empty(keys::TRAFFIC_KEY);
        Some(TrafficEvent::new(
            Tick(parse(&h, keys::traffic::TRIGGER_STEP)?),
            GridPos::new(parse(&h, keys::traffic::ZONE_X)?, parse(&h, keys::traffic::ZONE_Y)?),
        ))
    }

    pub fn set_metrics(&self, metrics: &FleetMetrics) {
        self.set_or_log(keys::METRICS_KEY, &[
            (keys::metrics::AVG_DELIVERY_TIME, metrics.avg_delivery_time.to_string()),
            (keys::metrics::AVG_DELIVERY_MILES, metrics.avg_delivery_miles.to_string()),
            (keys::metrics::TOTAL_DELIVERIES, metrics.total_deliveries.to_string()),
            (keys::metrics::TOTAL_MILES, metrics.total_miles.to_string()),
        ]);
    }

    /// Last published metrics; zeros if none were published yet.
    pub fn metrics(&self) -> FleetMetrics {
        let h = self.hgetall_or_empty(keys::METRICS_KEY);
        FleetMetrics {
            avg_delivery_time:  parse(&h, keys::metrics::AVG_DELIVERY_TIME).unwrap_or(0.0),
            avg_delivery_miles: parse(&h, keys::metrics::AVG_DELIVERY_MILES).unwrap_or(0.0),
            total_deliveries:   parse(&h, keys::metrics::TOTAL_DELIVERIES).unwrap_or(0),
            total_miles:        parse(&h, keys::metrics::TOTAL_MILES).unwrap_or(0.0),
        }
    }

    /// Drop all state.  Delivery subscriptions survive.
    pub fn flush(&self) -> StoreResult<()> {
        self.backend.flush()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse<T: FromStr>(h: &Hash, field: &str) -> Option<T> {
    h.get(field).and_then(|raw| raw.parse().ok())
}

fn encode_route(route: &[GridPos]) -> String {
    // A Vec of integer pairs always serializes.
    serde_json::to_string(route).unwrap_or_else(|_| "[]".to_owned())
}

fn decode_route(key: &str, raw: &str) -> StoreResult<Vec<GridPos>> {
    serde_json::from_str(raw).map_err(|e| StoreError::Decode {
        key:    key.to_owned(),
        field:  keys::vehicle::ROUTE.to_owned(),
        reason: e.to_string(),
    })
}
