//! `fleet-metrics` — fleet-wide delivery averages.
//!
//! Metrics are never updated incrementally: every pass re-reads every
//! vehicle's delivery legs and recomputes from scratch, so a missed or
//! replayed publication can never skew the result.
//!
//! | Item                 | Purpose                                             |
//! |----------------------|-----------------------------------------------------|
//! | [`aggregate`]        | Pure reduction over per-vehicle legs                |
//! | [`aggregate_store`]  | Read every vehicle's legs from the store, reduce    |
//! | [`publish`]          | `aggregate_store` + write the `metrics` hash        |
//! | [`MetricsPublisher`] | Engine observer publishing every N ticks            |

pub mod aggregate;
pub mod publisher;


pub use aggregate::{VehicleDeliveries, aggregate, aggregate_store, publish};
pub use publisher::MetricsPublisher;
