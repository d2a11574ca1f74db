//! Device and service description retrieval.
//!
//! Descriptions are UTF-8 XML documents fetched over plain HTTP from the
//! `Location` URL a device advertises via SSDP. [`device`] models the
//! recursive device tree and its pure lookups, [`service`] models the SCPD
//! document, and [`client`] does the fetching plus the
//! discover-then-describe conveniences.

pub mod client;
pub mod device;
pub mod service;

pub use client::{
    describe_device, describe_service, discover_device_description,
    discover_service_description,
};
pub use device::{Device, DeviceDescription, Icon, Service, SpecVersion};
pub use service::{Action, Argument, Direction, ServiceDescription, StateVariable};

use thiserror::Error;

/// Errors from description retrieval and URL resolution.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// HTTP fetch failure.
    #[error("description fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The document did not unmarshal as a description.
    #[error("failed to decode description XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A base or reference URL did not parse / resolve.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The document declares a UPnP major version this library cannot read.
    #[error("unsupported UPnP major version {0}")]
    UnsupportedVersion(u32),

    /// The description has no `URLBase` and no recorded origin URL to
    /// resolve relative references against.
    #[error("description has no base URL")]
    NoBaseUrl,

    /// No device answered the search within the wait window.
    #[error("no device answered the search for {0}")]
    NoResponse(String),

    /// The description tree does not contain the requested service.
    #[error("service not found in description: {0}")]
    ServiceNotFound(String),
}

/// Convenient Result alias for description operations.
pub type DescriptionResult<T> = Result<T, DescriptionError>;
