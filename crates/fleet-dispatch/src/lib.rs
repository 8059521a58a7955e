//! `fleet-dispatch` — turning demand into routes.
//!
//! | Module     | Contents                                                |
//! |------------|---------------------------------------------------------|
//! | [`orders`] | `Order`, `OrderGenerator` (seeded, density-weighted)    |
//! | [`assign`] | `DispatchAssigner` greedy insertion scoring             |
//! | [`init`]   | `initialize` — reset the store and load a fresh fleet   |
//! | [`error`]  | `DispatchError`, `DispatchResult`                       |
//!
//! The assigner is the only component that extends routes.  It never caches
//! them: each assignment reads the current route from the store and appends
//! under the record's lock.

pub mod assign;
pub mod error;
pub mod init;
pub mod orders;


pub use assign::{DispatchAssigner, insertion_score};
pub use error::{DispatchError, DispatchResult};
pub use init::{draw_traffic_event, initialize, initialize_with_clock};
pub use orders::{Order, OrderGenerator, generate};
