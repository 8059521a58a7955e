//! `fleet-output` — run output writers for the fleetgrid simulator.
//!
//! | Backend | Files created                               |
//! |---------|---------------------------------------------|
//! | CSV     | `tick_summaries.csv`, `delivery_legs.csv`   |
//!
//! Writers implement [`OutputWriter`] and are driven by
//! [`FleetOutputObserver`], which implements `fleet_engine::EngineObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_output::{CsvWriter, FleetOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! runner.add_observer(FleetOutputObserver::new(writer, config.projection));
//! runner.start()?;
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use self::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::FleetOutputObserver;
pub use row::{DeliveryLegRow, TickSummaryRow};
pub use writer::OutputWriter;
