//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `tick_summaries.csv`
//! - `delivery_legs.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{DeliveryLegRow, OutputResult, TickSummaryRow};

pub const TICK_SUMMARIES_FILE: &str = "tick_summaries.csv";
pub const DELIVERY_LEGS_FILE: &str = "delivery_legs.csv";

/// Writes run output to two CSV files.
pub struct CsvWriter {
    summaries:  Writer<File>,
    deliveries: Writer<File>,
    finished:   bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut summaries = Writer::from_path(dir.join(TICK_SUMMARIES_FILE))?;
        summaries.write_record(["tick", "moved", "rerouted", "delivered", "congestion_ms"])?;

        let mut deliveries = Writer::from_path(dir.join(DELIVERY_LEGS_FILE))?;
        deliveries.write_record([
            "vehicle_id", "sequence", "tick", "timestamp", "miles", "x", "y", "lat", "lon",
        ])?;

        Ok(Self { summaries, deliveries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.moved.to_string(),
            row.rerouted.to_string(),
            row.delivered.to_string(),
            row.congestion_ms.to_string(),
        ])?;
        Ok(())
    }

    fn write_delivery(&mut self, row: &DeliveryLegRow) -> OutputResult<()> {
        self.deliveries.write_record(&[
            row.vehicle_id.to_string(),
            row.sequence.to_string(),
            row.tick.to_string(),
            row.timestamp.to_string(),
            row.miles.to_string(),
            row.x.to_string(),
            row.y.to_string(),
            format!("{:.5}", row.lat),
            format!("{:.5}", row.lon),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summaries.flush()?;
        self.deliveries.flush()?;
        Ok(())
    }
}
