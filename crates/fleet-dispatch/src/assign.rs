//! Greedy order-to-vehicle assignment.

use std::sync::Arc;

use fleet_core::{Clock, GridPos, OrderId, SystemClock, TRAFFIC_PENALTY, Tick, VehicleId, fleet_ids};
use fleet_store::{KvBackend, MemoryBackend, SharedFleetStore};
use tracing::info;

use crate::{DispatchError, DispatchResult, Order};

/// Score of appending `order` to `route`.  Lower is better.
pub fn insertion_score(route: &[GridPos], order: GridPos, zone: Option<GridPos>) -> u64 {
    let tail = route.last().map_or(0, |last| last.manhattan(order));
    let penalty = match zone {
        Some(z) if route.contains(&z) => TRAFFIC_PENALTY,
        _ => 0,
    };
    u64::from(tail) + route.len() as u64 + u64::from(penalty)
}

/// Assigns each order to the vehicle with the lowest insertion score.
///
/// ```text
/// score = manhattan(route.last, order) + len(route)
///       + TRAFFIC_PENALTY   if the traffic zone is already on the route
/// ```
///
/// Routes are always read from the store at assignment time, so orders
/// assigned earlier in the same batch are taken into account.
pub struct DispatchAssigner<B: KvBackend = MemoryBackend> {
    store:    SharedFleetStore<B>,
    vehicles: Vec<VehicleId>,
    depot:    GridPos,
    clock:    Arc<dyn Clock>,
}

impl<B: KvBackend> DispatchAssigner<B> {
    pub fn new(store: SharedFleetStore<B>, vehicle_count: usize, depot: GridPos) -> Self {
        Self {
            store,
            vehicles: fleet_ids(vehicle_count).collect(),
            depot,
            clock: Arc::new(SystemClock),
        }
    }

    /// Timestamp memory-log entries with `clock` instead of wall time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pick the best vehicle for `order` and append `[order, depot]` to its
    /// route.
    ///
    /// Vehicles are scanned in ascending id order and only a strictly lower
    /// score replaces the current best, so ties go to the lowest id.
    pub fn assign(&self, order: &Order, zone: Option<GridPos>) -> DispatchResult<VehicleId> {
        let mut best: Option<(u64, VehicleId)> = None;
        for &id in &self.vehicles {
            let route = self.store.route_or(id, vec![self.depot]);
            let score = insertion_score(&route, order.position, zone);
            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, id));
            }
        }
        let (score, winner) = best.ok_or(DispatchError::EmptyFleet)?;

        let route = self.store.append_route(winner, &[order.position, self.depot], self.depot)?;
        let pos = order.position;
        self.store.log_event(
            winner,
            self.clock.now_secs(Tick::ZERO),
            format!("Assigned new order {} at ({}, {})", order.id.0, pos.x, pos.y),
        );
        info!(order = order.id.0, vehicle = winner.0, score, route_len = route.len(), "order assigned");
        Ok(winner)
    }

    /// Assign `orders` in sequence.
    pub fn assign_all(
        &self,
        orders: &[Order],
        zone:   Option<GridPos>,
    ) -> DispatchResult<Vec<(OrderId, VehicleId)>> {
        orders
            .iter()
            .map(|order| self.assign(order, zone).map(|v| (order.id, v)))
            .collect()
    }
}
