//! `fleet-engine` — the movement state machine and its runner.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`engine`]   | `MovementEngine`, `TickReport` — one pass per step          |
//! | [`runner`]   | `EngineRunner` — background thread, start/stop, cooldowns   |
//! | [`state`]    | `VehicleStatus`, `will_hit_traffic`                         |
//! | [`observer`] | `EngineObserver`, `NoopObserver`, `ObserverSet`             |
//! | [`error`]    | `EngineError`, `EngineResult`                               |
//!
//! # Tick pass
//!
//! ```text
//! for vehicle in ascending id:
//!     route  = store.route(vehicle)
//!     target = route[step]                 (idle if step >= len(route))
//!     target is the active zone → move to detour, rerouting = 1
//!     otherwise                 → move to target, rerouting = 0
//!     credit policy satisfied   → delivered += 1, record leg, publish
//! ```

pub mod engine;
pub mod error;
pub mod observer;
pub mod runner;
pub mod state;

#[cfg(test)]
mod tests;

pub use engine::{MovementEngine, TickReport};
pub use error::{EngineError, EngineResult};
pub use observer::{EngineObserver, NoopObserver, ObserverSet};
pub use runner::{EngineRunner, RunnerTiming};
pub use state::{TRAFFIC_LOOKAHEAD, VehicleStatus, will_hit_traffic};
