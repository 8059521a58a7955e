use fleet_core::{Tick, VehicleId};
use fleet_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    AlreadyRunning,

    /// The pass was interrupted between vehicles; the step did not advance.
    #[error("tick cancelled")]
    Cancelled,

    #[error("{vehicle} has an unreadable route: {reason}")]
    CorruptRoute {
        vehicle: VehicleId,
        reason:  String,
    },

    #[error("store error during tick: {0}")]
    Store(#[from] StoreError),

    #[error("cannot spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A panic escaped the pass at `tick`, from the engine or an observer.
    /// The runner treats it as a failed tick.
    #[error("tick {tick} panicked: {message}")]
    TickPanicked {
        tick:    Tick,
        message: String,
    },

    #[error("engine thread panicked")]
    WorkerPanicked,
}

pub type EngineResult<T> = Result<T, EngineError>;
