//! Per-vehicle state derived from `(step, route)`.
//!
//! Vehicles carry no state machine of their own: every tick the engine
//! re-derives where a vehicle is heading from the stored route and the
//! current step, so a crashed or replayed tick can never leave a vehicle in
//! a state its route does not explain.

use std::fmt;

use fleet_core::{GridPos, Tick, TrafficEvent};
use fleet_store::VehicleSnapshot;

/// How many route steps ahead [`will_hit_traffic`] looks by default.
pub const TRAFFIC_LOOKAHEAD: usize = 5;

/// Presentation status of one vehicle.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VehicleStatus {
    /// Route exhausted or parked at the depot.
    Idle,
    /// Heading for a non-depot stop.
    Delivering,
    /// Detouring around the traffic zone.
    Rerouting,
}

impl VehicleStatus {
    /// Status at `step` given the stored `rerouting` flag.
    ///
    /// The flag wins over the route target, so a vehicle detouring next to
    /// the depot still reports `Rerouting`.
    pub fn classify(step: Tick, route: &[GridPos], depot: GridPos, rerouting: bool) -> Self {
        match route.get(step.index()) {
            None => VehicleStatus::Idle,
            Some(_) if rerouting => VehicleStatus::Rerouting,
            Some(&target) if target == depot => VehicleStatus::Idle,
            Some(_) => VehicleStatus::Delivering,
        }
    }

    pub fn of(snapshot: &VehicleSnapshot, step: Tick, depot: GridPos) -> Self {
        Self::classify(step, &snapshot.route, depot, snapshot.rerouting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleStatus::Idle       => "idle",
            VehicleStatus::Delivering => "delivering",
            VehicleStatus::Rerouting  => "rerouting",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `true` if any of the route steps `step .. step + lookahead` targets the
/// traffic zone at or after its trigger step.
pub fn will_hit_traffic(step: Tick, route: &[GridPos], traffic: TrafficEvent, lookahead: usize) -> bool {
    let start = step.index().min(route.len());
    let end = start.saturating_add(lookahead).min(route.len());
    route[start..end]
        .iter()
        .enumerate()
        .any(|(offset, &target)| traffic.blocks(step + offset as u64, target))
}
