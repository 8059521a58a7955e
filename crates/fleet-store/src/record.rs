//! Plain data types read from and written to the store.

use fleet_core::{GridPos, VehicleId};
use serde::{Deserialize, Serialize};

/// One credited delivery leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// 1-based, per vehicle.
    pub sequence:  u32,
    /// Seconds, from the engine's clock.
    pub timestamp: f64,
    pub miles:     f64,
}

/// Structured notification published on the `delivery` channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub vehicle_id: VehicleId,
    pub sequence:   u32,
    pub timestamp:  f64,
    pub miles:      f64,
    pub position:   GridPos,
}

/// One entry of a vehicle's memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub time:  f64,
    pub event: String,
}

/// Point-in-time view of one vehicle record.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id:        VehicleId,
    pub position:  GridPos,
    pub route:     Vec<GridPos>,
    pub delivered: u32,
    pub rerouting: bool,
}

/// Fleet-wide delivery averages.  All zeros before the first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FleetMetrics {
    pub avg_delivery_time:  f64,
    pub avg_delivery_miles: f64,
    pub total_deliveries:   u64,
    pub total_miles:        f64,
}
