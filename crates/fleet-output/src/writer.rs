//! The `OutputWriter` trait implemented by backend writers.

use crate::{DeliveryLegRow, OutputResult, TickSummaryRow};

/// Sink for run output.
///
/// Errors are stored by [`FleetOutputObserver`](crate::FleetOutputObserver)
/// rather than interrupting the engine.
pub trait OutputWriter: Send {
    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    fn write_delivery(&mut self, row: &DeliveryLegRow) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
