use fleet_core::FleetError;
use fleet_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch configuration error: {0}")]
    Config(#[from] FleetError),

    #[error("cannot assign orders: the fleet has no vehicles")]
    EmptyFleet,

    #[error("store error during dispatch: {0}")]
    Store(#[from] StoreError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
