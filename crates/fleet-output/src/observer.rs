//! `FleetOutputObserver<W>` — bridges `EngineObserver` to an `OutputWriter`.

use fleet_core::{GridProjection, Tick};
use fleet_engine::{EngineObserver, TickReport};
use fleet_store::DeliveryEvent;
use tracing::error;

use crate::row::{DeliveryLegRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// An [`EngineObserver`] that writes tick summaries and delivery legs to any
/// [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because observer methods
/// have no return value; the first one is also logged.  Retrieve it with
/// [`take_error`][Self::take_error] when driving the engine directly.
pub struct FleetOutputObserver<W: OutputWriter> {
    writer:     W,
    projection: GridProjection,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> FleetOutputObserver<W> {
    /// Create an observer backed by `writer`, projecting delivery stops with
    /// `projection`.
    pub fn new(writer: W, projection: GridProjection) -> Self {
        Self { writer, projection, last_error: None }
    }

    /// Take the stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                error!(error = %e, "output write failed; further errors suppressed");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> EngineObserver for FleetOutputObserver<W> {
    fn on_delivery(&mut self, tick: Tick, event: &DeliveryEvent) {
        let geo = self.projection.to_geo(event.position);
        let row = DeliveryLegRow {
            vehicle_id: event.vehicle_id.0,
            sequence:   event.sequence,
            tick:       tick.0,
            timestamp:  event.timestamp,
            miles:      event.miles,
            x:          event.position.x,
            y:          event.position.y,
            lat:        geo.lat,
            lon:        geo.lon,
        };
        let result = self.writer.write_delivery(&row);
        self.store_err(result);
    }

    fn on_tick_end(&mut self, report: &TickReport) {
        let row = TickSummaryRow {
            tick:          report.tick.0,
            moved:         report.moved as u64,
            rerouted:      report.rerouted as u64,
            delivered:     report.delivered as u64,
            congestion_ms: report.congestion.as_millis() as u64,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_stopped(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
