//! Reduction of delivery legs into [`FleetMetrics`].

use fleet_core::{VehicleId, fleet_ids};
use fleet_store::{DeliveryRecord, FleetMetrics, KvBackend, SharedFleetStore};
use tracing::debug;

/// Every recorded delivery leg of one vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleDeliveries {
    pub vehicle: VehicleId,
    pub legs:    Vec<DeliveryRecord>,
}

/// Running sums of one or more vehicles' legs.
#[derive(Copy, Clone, Default)]
struct Totals {
    count: u64,
    time:  f64,
    miles: f64,
}

impl Totals {
    fn of(legs: &[DeliveryRecord]) -> Self {
        legs.iter().fold(Totals::default(), |t, leg| Totals {
            count: t.count + 1,
            time:  t.time + leg.timestamp,
            miles: t.miles + leg.miles,
        })
    }

    fn merge(self, other: Totals) -> Totals {
        Totals {
            count: self.count + other.count,
            time:  self.time + other.time,
            miles: self.miles + other.miles,
        }
    }
}

/// Fleet-wide averages over every leg of every vehicle.
///
/// All fields are zero when there are no deliveries.
pub fn aggregate(fleet: &[VehicleDeliveries]) -> FleetMetrics {
    #[cfg(not(feature = "parallel"))]
    let totals = fleet
        .iter()
        .map(|v| Totals::of(&v.legs))
        .fold(Totals::default(), Totals::merge);

    #[cfg(feature = "parallel")]
    let totals = {
        use rayon::prelude::*;
        fleet
            .par_iter()
            .map(|v| Totals::of(&v.legs))
            .reduce(Totals::default, Totals::merge)
    };

    if totals.count == 0 {
        return FleetMetrics::default();
    }
    FleetMetrics {
        avg_delivery_time:  totals.time / totals.count as f64,
        avg_delivery_miles: totals.miles / totals.count as f64,
        total_deliveries:   totals.count,
        total_miles:        totals.miles,
    }
}

/// Read the legs of vehicles `0..vehicle_count` from `store` and aggregate.
///
/// Missing or unreadable leg fields count as zero.
pub fn aggregate_store<B: KvBackend>(store: &SharedFleetStore<B>, vehicle_count: usize) -> FleetMetrics {
    let fleet: Vec<VehicleDeliveries> = fleet_ids(vehicle_count)
        .map(|vehicle| VehicleDeliveries { vehicle, legs: store.deliveries(vehicle) })
        .collect();
    aggregate(&fleet)
}

/// Aggregate and write the result to the store's `metrics` hash.
pub fn publish<B: KvBackend>(store: &SharedFleetStore<B>, vehicle_count: usize) -> FleetMetrics {
    let metrics = aggregate_store(store, vehicle_count);
    store.set_metrics(&metrics);
    debug!(
        deliveries = metrics.total_deliveries,
        total_miles = metrics.total_miles,
        "metrics published"
    );
    metrics
}
