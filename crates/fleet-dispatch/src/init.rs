//! Fleet initialization from a [`FleetConfig`].

use std::sync::Arc;

use fleet_core::{Clock, FleetConfig, SimRng, SystemClock, TrafficEvent, fleet_ids};
use fleet_store::{KvBackend, SharedFleetStore};
use tracing::info;

use crate::{DispatchAssigner, DispatchResult, Order, OrderGenerator};

/// RNG stream offset for the traffic draw, independent of order generation.
const TRAFFIC_STREAM: u64 = 1;

/// Reset the store and load a fresh fleet.
///
/// Validates `config`, clears the store, parks every vehicle at the depot,
/// generates `order_count` orders and assigns them with no traffic zone.
/// Returns the generated orders.
pub fn initialize<B: KvBackend>(
    config: &FleetConfig,
    store:  &SharedFleetStore<B>,
) -> DispatchResult<Vec<Order>> {
    initialize_with_clock(config, store, Arc::new(SystemClock))
}

/// [`initialize`] with an explicit timestamp source for memory-log entries.
pub fn initialize_with_clock<B: KvBackend>(
    config: &FleetConfig,
    store:  &SharedFleetStore<B>,
    clock:  Arc<dyn Clock>,
) -> DispatchResult<Vec<Order>> {
    config.validate()?;
    store.flush()?;
    for id in fleet_ids(config.vehicle_count) {
        store.init_vehicle(id, config.depot)?;
    }

    let orders = OrderGenerator::new(config.grid(), config.downtown.clone(), config.downtown_probability)?
        .generate(config.order_count, config.seed);
    DispatchAssigner::new(store.clone(), config.vehicle_count, config.depot)
        .with_clock(clock)
        .assign_all(&orders, None)?;

    info!(vehicles = config.vehicle_count, orders = orders.len(), "fleet initialized");
    Ok(orders)
}

/// The run's traffic event, drawn from its own stream of `config.seed`.
///
/// Validates `config` first.
pub fn draw_traffic_event(config: &FleetConfig) -> DispatchResult<TrafficEvent> {
    config.validate()?;
    let mut rng = SimRng::stream(config.seed, TRAFFIC_STREAM);
    Ok(TrafficEvent::random(&config.traffic, config.grid(), &mut rng)?)
}
