//! Seeded order generation.
//!
//! Orders cluster in a high-density region: each draw first decides, with
//! probability `p`, whether the order falls in that region or anywhere on
//! the grid, then draws `x` and `y` uniformly from the chosen rectangle.
//! The draw order (`u`, then `x`, then `y`) is fixed so a seed reproduces
//! the same orders across runs.

use fleet_core::{FleetError, FleetResult, Grid, GridPos, GridRect, OrderId, SimRng};
use serde::{Deserialize, Serialize};

/// A delivery request at one grid cell.
///
/// `delivered` stays `false` in the generated set; deliveries are counted per
/// vehicle, not per order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id:        OrderId,
    pub position:  GridPos,
    pub delivered: bool,
}

/// Draws orders from a fixed grid and density region.
#[derive(Clone, Debug)]
pub struct OrderGenerator {
    grid:        GridRect,
    region:      GridRect,
    probability: f64,
}

impl OrderGenerator {
    /// `probability` is clamped to `[0, 1]`.  An empty `region` falls back
    /// to the whole grid; a grid without cells is rejected.
    pub fn new(grid: Grid, region: GridRect, probability: f64) -> FleetResult<Self> {
        let bounds = grid.bounds();
        if bounds.is_empty() {
            return Err(FleetError::Config(format!("cannot place orders on a {}-cell grid", grid.size)));
        }
        Ok(Self {
            grid:        bounds,
            region,
            probability: probability.clamp(0.0, 1.0),
        })
    }

    /// `count` orders with ids `0..count`.
    pub fn generate(&self, count: usize, seed: u64) -> Vec<Order> {
        let mut rng = SimRng::new(seed);
        (0..count)
            .map(|i| Order {
                id:        OrderId(i as u32),
                position:  self.draw(&mut rng),
                delivered: false,
            })
            .collect()
    }

    fn draw(&self, rng: &mut SimRng) -> GridPos {
        let u: f64 = rng.random();
        let rect = if u < self.probability && !self.region.is_empty() {
            &self.region
        } else {
            &self.grid
        };
        let x = rng.gen_range(rect.x.clone());
        let y = rng.gen_range(rect.y.clone());
        GridPos::new(x, y)
    }
}

/// Shorthand for `OrderGenerator::new(grid, region, p)?.generate(n, seed)`.
pub fn generate(n: usize, grid: Grid, region: GridRect, p: f64, seed: u64) -> FleetResult<Vec<Order>> {
    Ok(OrderGenerator::new(grid, region, p)?.generate(n, seed))
}
