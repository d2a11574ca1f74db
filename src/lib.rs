//! A UPnP 1.1/2.0 control point.
//!
//! This crate implements the control-point half of UPnP: finding devices
//! and talking to them. Hosting (advertising) a device is out of scope.
//!
//! # Subsystems
//!
//! - [`ssdp`]: discovery. Multicast M-SEARCH with a bounded listen window,
//!   and a passive listener for NOTIFY advertisements.
//! - [`description`]: fetching and navigating device and service (SCPD)
//!   XML descriptions, including base-URL resolution for the relative
//!   links they contain.
//! - [`control`]: SOAP action invocation against a service's control URL,
//!   with structured `Fault` decoding.
//! - [`eventing`]: GENA subscriptions with automatic renewal and a
//!   per-subscription callback HTTP server, plus the passive multicast
//!   event listener.
//!
//! Streaming operations hand back bounded [`tokio::sync::mpsc`] channels;
//! a slow consumer backpressures the producing task instead of losing
//! messages. Logging goes through the [`log`] facade; install whatever
//! logger the application prefers.
//!
//! # Example
//!
//! Find an Internet Gateway Device and read its WAN byte counter:
//!
//! ```no_run
//! use std::time::Duration;
//! use serde::Deserialize;
//! use upnp_client::control::{control_url_for, invoke_typed, ActionRequest};
//! use upnp_client::description::discover_device_description;
//!
//! #[derive(Deserialize)]
//! struct GetTotalBytesReceivedResponse {
//!     #[serde(rename = "NewTotalBytesReceived")]
//!     new_total_bytes_received: u64,
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";
//! let dd = discover_device_description(
//!     "urn:schemas-upnp-org:device:InternetGatewayDevice:1",
//!     Duration::from_secs(3),
//! )
//! .await?;
//!
//! let control_url = control_url_for(&dd, service)?;
//! let action = ActionRequest::new(service, "GetTotalBytesReceived");
//! let client = reqwest::Client::new();
//! if let Some(reply) =
//!     invoke_typed::<GetTotalBytesReceivedResponse>(&client, &control_url, &action).await?
//! {
//!     println!("bytes received: {}", reply.new_total_bytes_received);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod control;
pub mod description;
pub mod error;
pub mod eventing;
pub mod protocol_constants;
pub mod ssdp;

mod utils;

// Re-export the library surface at the crate root.
pub use control::{control_url_for, invoke, invoke_typed, ActionRequest, Fault, SoapError};
pub use description::{
    describe_device, describe_service, discover_device_description,
    discover_service_description, DescriptionError, Device, DeviceDescription, Icon, Service,
    ServiceDescription,
};
pub use error::{UpnpError, UpnpResult};
pub use eventing::{
    listen_multicast_events, Event, GenaError, PropertySet, SubscriptionManager,
};
pub use ssdp::{
    discover, listen_notify, NotifyResponse, SearchRequest, SearchResponse, SsdpError,
    SsdpHeaders,
};
