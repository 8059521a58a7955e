//! The single traffic disruption injected into a run.

use serde::{Deserialize, Serialize};

use crate::{FleetError, FleetResult, Grid, GridPos, SimRng, Tick, TrafficConfig};

/// A traffic jam at `zone`, active from `trigger_step` onward.
///
/// Chosen once at simulation start and never mutated; the engine receives it
/// by value.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TrafficEvent {
    pub trigger_step: Tick,
    pub zone:         GridPos,
}

impl TrafficEvent {
    pub fn new(trigger_step: Tick, zone: GridPos) -> Self {
        Self { trigger_step, zone }
    }

    /// Draw a trigger step and zone from the configured ranges.
    ///
    /// The step is drawn first, then `x`, then `y`.  Fails without drawing
    /// if either range is empty.
    pub fn random(cfg: &TrafficConfig, grid: Grid, rng: &mut SimRng) -> FleetResult<Self> {
        let (lo, hi) = cfg.trigger_steps;
        if lo > hi {
            return Err(FleetError::Config(format!("traffic trigger range {lo}..={hi} is inverted")));
        }
        let zone_range = cfg.zone_range(grid);
        if zone_range.is_empty() {
            return Err(FleetError::Config(format!(
                "traffic zone margin {} leaves no cells on a {}-cell grid",
                cfg.zone_margin, grid.size
            )));
        }
        let trigger = rng.gen_range(lo..=hi);
        let x = rng.gen_range(zone_range.clone());
        let y = rng.gen_range(zone_range);
        Ok(Self::new(Tick(trigger), GridPos::new(x, y)))
    }

    /// `true` once the jam has started.
    #[inline]
    pub fn is_active(&self, step: Tick) -> bool {
        step >= self.trigger_step
    }

    /// `true` if a vehicle heading for `target` at `step` must detour.
    #[inline]
    pub fn blocks(&self, step: Tick, target: GridPos) -> bool {
        self.is_active(step) && target == self.zone
    }
}
