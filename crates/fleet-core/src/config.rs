//! Run configuration.
//!
//! Typically loaded from a JSON file by the application crate and passed to
//! fleet initialization and the engine runner.  Every field has a default, so
//! a config file only needs to name what it changes.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FleetError, FleetResult, Grid, GridPos, GridProjection, GridRect};

/// Smallest grid [`FleetConfig::validate`] accepts.
pub const MIN_GRID_SIZE: i32 = 2;

// ── DeliveryCredit ────────────────────────────────────────────────────────────

/// When the engine credits a delivery.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryCredit {
    /// Credit the step a vehicle leaves the depot toward a stop (the
    /// previous route entry is the depot).  Matches previously recorded
    /// metrics.
    #[default]
    OnDepotDeparture,
    /// Credit every arrival at a non-depot route coordinate.  Counts
    /// consecutive non-depot stops individually.
    OnArrival,
}

// ── TrafficConfig ─────────────────────────────────────────────────────────────

/// Ranges the run's [`TrafficEvent`](crate::TrafficEvent) is drawn from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Inclusive `(min, max)` trigger step.
    pub trigger_steps: (u64, u64),
    /// Zone coordinates are drawn from `margin..=grid_size - margin`.
    pub zone_margin:   i32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self { trigger_steps: (20, 40), zone_margin: 5 }
    }
}

impl TrafficConfig {
    /// Inclusive per-axis range of zone coordinates, clipped to the grid.
    pub fn zone_range(&self, grid: Grid) -> RangeInclusive<i32> {
        self.zone_margin..=(grid.size - self.zone_margin).min(grid.size - 1)
    }
}

// ── FleetConfig ───────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub vehicle_count: usize,
    pub order_count:   usize,

    /// Side length of the square grid, in cells (≈ miles).
    pub grid_size: i32,

    /// Where every vehicle starts and returns after each stop.
    pub depot: GridPos,

    /// High-density sub-region orders are drawn from with
    /// `downtown_probability`.
    pub downtown:             GridRect,
    pub downtown_probability: f64,

    pub traffic: TrafficConfig,

    /// Master RNG seed.  The same seed always produces the same orders and
    /// traffic event.
    pub seed: u64,

    /// Sleep between ticks.
    pub tick_period_ms: u64,
    /// Extra sleep per rerouting vehicle in a tick.
    pub congestion_delay_ms: u64,
    /// Back-off after a failed tick.
    pub failure_cooldown_ms: u64,

    /// Memory-log entries kept per vehicle; older entries are evicted.
    pub memory_retention: usize,

    pub delivery_credit: DeliveryCredit,

    /// Publish fleet metrics every N ticks.  0 disables periodic publishing.
    pub metrics_interval_ticks: u64,

    pub projection: GridProjection,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            vehicle_count:          4,
            order_count:            4,
            grid_size:              20,
            depot:                  GridPos::new(10, 2),
            downtown:               GridRect::new(6..14, 4..16),
            downtown_probability:   0.4,
            traffic:                TrafficConfig::default(),
            seed:                   42,
            tick_period_ms:         300,
            congestion_delay_ms:    500,
            failure_cooldown_ms:    5_000,
            memory_retention:       100,
            delivery_credit:        DeliveryCredit::default(),
            metrics_interval_ticks: 1,
            projection:             GridProjection::default(),
        }
    }
}

impl FleetConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(json: &str) -> FleetResult<Self> {
        let cfg: FleetConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[inline]
    pub fn grid(&self) -> Grid {
        Grid::new(self.grid_size)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn congestion_delay(&self) -> Duration {
        Duration::from_millis(self.congestion_delay_ms)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }

    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> FleetResult<()> {
        let grid = self.grid();
        if self.vehicle_count == 0 {
            return Err(FleetError::Config("fleet must have at least one vehicle".into()));
        }
        // A detour needs a neighbouring cell.
        if self.grid_size < MIN_GRID_SIZE {
            return Err(FleetError::Config(format!(
                "grid_size must be at least {MIN_GRID_SIZE}, got {}",
                self.grid_size
            )));
        }
        if !grid.contains(self.depot) {
            return Err(FleetError::Config(format!(
                "depot {} lies outside the {}x{} grid",
                self.depot, self.grid_size, self.grid_size
            )));
        }
        if !self.downtown.within(grid) {
            return Err(FleetError::Config(format!(
                "downtown region {:?} x {:?} is empty or outside the grid",
                self.downtown.x, self.downtown.y
            )));
        }
        if !(0.0..=1.0).contains(&self.downtown_probability) {
            return Err(FleetError::Config(format!(
                "downtown_probability must be in [0, 1], got {}",
                self.downtown_probability
            )));
        }
        let (lo, hi) = self.traffic.trigger_steps;
        if lo > hi {
            return Err(FleetError::Config(format!("traffic trigger range {lo}..={hi} is inverted")));
        }
        if self.traffic.zone_margin < 0 || self.traffic.zone_range(grid).is_empty() {
            return Err(FleetError::Config(format!(
                "traffic zone margin {} leaves no cells on a {}-cell grid",
                self.traffic.zone_margin, self.grid_size
            )));
        }
        if self.memory_retention == 0 {
            return Err(FleetError::Config("memory_retention must be at least 1".into()));
        }
        Ok(())
    }
}
