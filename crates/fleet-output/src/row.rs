//! Plain data row types written by output backends.

/// Outcome of one engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:          u64,
    pub moved:         u64,
    pub rerouted:      u64,
    pub delivered:     u64,
    /// Extra sleep the runner added for congestion, in milliseconds.
    pub congestion_ms: u64,
}

/// One credited delivery leg, with the stop projected onto the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryLegRow {
    pub vehicle_id: u32,
    pub sequence:   u32,
    pub tick:       u64,
    pub timestamp:  f64,
    pub miles:      f64,
    pub x:          i32,
    pub y:          i32,
    pub lat:        f32,
    pub lon:        f32,
}
