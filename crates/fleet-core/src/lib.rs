//! `fleet-core` — foundational types for the fleetgrid dispatch simulator.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies.
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `VehicleId`, `OrderId`                                |
//! | [`grid`]        | `GridPos`, `Grid`, `GridRect`, Manhattan distance     |
//! | [`geo`]         | `GeoPoint`, `GridProjection`                          |
//! | [`traffic`]     | `TrafficEvent`                                        |
//! | [`time`]        | `Tick`, `Clock`, `SystemClock`, `SteppedClock`        |
//! | [`rng`]         | `SimRng`                                              |
//! | [`config`]      | `FleetConfig`, `TrafficConfig`, `DeliveryCredit`      |
//! | [`error`]       | `FleetError`, `FleetResult`                           |

pub mod config;
pub mod error;
pub mod geo;
pub mod grid;
pub mod ids;
pub mod rng;
pub mod time;
pub mod traffic;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{DeliveryCredit, FleetConfig, MIN_GRID_SIZE, TrafficConfig};
pub use error::{FleetError, FleetResult};
pub use geo::{GeoPoint, GridProjection};
pub use grid::{Grid, GridPos, GridRect};
pub use ids::{OrderId, VehicleId, fleet_ids};
pub use rng::SimRng;
pub use time::{Clock, SteppedClock, SystemClock, Tick};
pub use traffic::TrafficEvent;

/// Penalty added to an assignment score when the candidate's route already
/// passes through the active traffic zone.
pub const TRAFFIC_PENALTY: u32 = 10;
