//! `fleet-store` — concurrent shared fleet state.
//!
//! All cross-component communication goes through a [`SharedFleetStore`]:
//! the dispatcher writes routes, the engine reads routes and writes positions
//! and delivery legs, the metrics aggregator reads legs and writes the
//! `metrics` hash, and external consumers subscribe to the delivery channel.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`backend`] | `KvBackend` trait (hashes, capped lists, pub/sub)         |
//! | [`memory`]  | `MemoryBackend` — `DashMap` + crossbeam fan-out           |
//! | [`keys`]    | Key and field names of the shared layout                  |
//! | [`record`]  | `DeliveryRecord`, `DeliveryEvent`, `FleetMetrics`, …      |
//! | [`store`]   | `SharedFleetStore` typed facade                           |
//! | [`feed`]    | `DeliveryFeed` subscriber handle                          |
//! | [`error`]   | `StoreError`, `StoreResult`                               |

pub mod backend;
pub mod error;
pub mod feed;
pub mod keys;
pub mod memory;
pub mod record;
pub mod store;


pub use backend::{Hash, KvBackend};
pub use error::{StoreError, StoreResult};
pub use feed::DeliveryFeed;
pub use memory::MemoryBackend;
pub use record::{DeliveryEvent, DeliveryRecord, FleetMetrics, MemoryEntry, VehicleSnapshot};
pub use store::{DEFAULT_MEMORY_RETENTION, SharedFleetStore};
