//! Crate-level error aggregation.
//!
//! Each protocol subsystem defines its own `thiserror` enum next to its
//! code; this module folds them into one [`UpnpError`] for callers mixing
//! subsystems (the discover-then-describe conveniences, for instance).

use thiserror::Error;

pub use crate::control::{SoapError, SoapResult};
pub use crate::description::{DescriptionError, DescriptionResult};
pub use crate::eventing::{GenaError, GenaResult};
pub use crate::ssdp::{SsdpError, SsdpResult};

/// Any error this library can produce.
#[derive(Debug, Error)]
pub enum UpnpError {
    /// SSDP discovery failed.
    #[error("discovery failed: {0}")]
    Ssdp(#[from] SsdpError),

    /// Description retrieval or resolution failed.
    #[error("description failed: {0}")]
    Description(#[from] DescriptionError),

    /// SOAP invocation failed.
    #[error("control failed: {0}")]
    Soap(#[from] SoapError),

    /// GENA eventing failed.
    #[error("eventing failed: {0}")]
    Gena(#[from] GenaError),
}

/// Convenient Result alias for cross-subsystem operations.
pub type UpnpResult<T> = Result<T, UpnpError>;
