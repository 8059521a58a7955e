//! Key layout shared with external readers.
//!
//! ```text
//! vehicle:{id}          hash   pos_x pos_y route delivered rerouting credited_step
//!                              delivery_time_{n} delivery_miles_{n}   (n = 1..=delivered)
//! vehicle:{id}:memory   list   JSON {"time": f64, "event": str}
//! metrics               hash   avg_delivery_time avg_delivery_miles
//!                              total_deliveries_computed total_miles
//! traffic               hash   trigger_step zone_x zone_y
//! ```
//!
//! Delivery notifications are published on the [`DELIVERY_CHANNEL`] topic.

use fleet_core::VehicleId;

pub const DELIVERY_CHANNEL: &str = "delivery";
pub const METRICS_KEY: &str = "metrics";
pub const TRAFFIC_KEY: &str = "traffic";

pub fn vehicle_key(id: VehicleId) -> String {
    format!("vehicle:{}", id.0)
}

pub fn memory_key(id: VehicleId) -> String {
    format!("vehicle:{}:memory", id.0)
}

/// Field names of a `vehicle:{id}` hash.
pub mod vehicle {
    pub const POS_X: &str = "pos_x";
    pub const POS_Y: &str = "pos_y";
    /// JSON array of `[x, y]` pairs.
    pub const ROUTE: &str = "route";
    pub const DELIVERED: &str = "delivered";
    /// `"1"` while detouring around the traffic zone, else `"0"`.
    pub const REROUTING: &str = "rerouting";
    /// Engine step of the most recent credited delivery.
    pub const CREDITED_STEP: &str = "credited_step";

    pub fn delivery_time(n: u32) -> String {
        format!("delivery_time_{n}")
    }

    pub fn delivery_miles(n: u32) -> String {
        format!("delivery_miles_{n}")
    }
}

/// Field names of the `metrics` hash.
pub mod metrics {
    pub const AVG_DELIVERY_TIME: &str = "avg_delivery_time";
    pub const AVG_DELIVERY_MILES: &str = "avg_delivery_miles";
    pub const TOTAL_DELIVERIES: &str = "total_deliveries_computed";
    pub const TOTAL_MILES: &str = "total_miles";
}

/// Field names of the `traffic` hash.
pub mod traffic {
    pub const TRIGGER_STEP: &str = "trigger_step";
    pub const ZONE_X: &str = "zone_x";
    pub const ZONE_Y: &str = "zone_y";
}
