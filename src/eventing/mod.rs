//! GENA eventing: unicast subscriptions with a per-manager callback server,
//! and the passive multicast event listener.
//!
//! [`SubscriptionManager`] owns one subscription to one service: it learns
//! the right local address with a TCP probe, binds an ephemeral callback
//! listener there, keeps the subscription alive by renewing at 90% of the
//! granted lifetime, and delivers each NOTIFY's property set on the caller's
//! channel. [`multicast::listen_multicast_events`] is the UPnP 1.1+
//! multicast side: passive, no subscription state at all.

pub mod multicast;
pub mod propertyset;
pub mod subscription;

mod callback;

pub use multicast::listen_multicast_events;
pub use propertyset::PropertySet;
pub use subscription::SubscriptionManager;

use thiserror::Error;

/// Headers of a GENA NOTIFY, unicast or multicast, plus the parsed
/// property set.
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Notification type (`upnp:event`).
    pub nt: String,
    /// Notification sub-type (`upnp:propchange`).
    pub nts: String,
    /// Subscription ID (unicast only).
    pub sid: String,
    /// Event sequence number; zero when absent or unparseable.
    pub seq: u32,
    /// Unique service name (multicast events only).
    pub usn: String,
    /// Service ID (multicast events only).
    pub svcid: String,
    /// Event importance level (multicast events only), e.g. `upnp:/info`.
    pub lvl: String,
    /// `BOOTID.UPNP.ORG` (multicast events only); zero when absent.
    pub boot_id: u32,
    /// The evented variables, in document order.
    pub properties: PropertySet,
}

/// Errors from the GENA subscription lifecycle and event listeners.
#[derive(Debug, Error)]
pub enum GenaError {
    /// HTTP request failure on SUBSCRIBE/UNSUBSCRIBE.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Socket or listener failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A multicast event datagram failed HTTPU decoding before reaching
    /// the GENA layer.
    #[error(transparent)]
    Httpu(#[from] crate::ssdp::SsdpError),

    /// A NOTIFY that did not decode as a GENA event (wrong method, or a
    /// body that is not a propertyset document).
    #[error("failed to decode event: {0}")]
    Decode(String),

    /// The device rejected a subscription request; this terminates the
    /// subscription (construct a new manager to start over).
    #[error("subscription request returned HTTP {0}")]
    Rejected(u16),

    /// The SUBSCRIBE response carried no SID.
    #[error("SUBSCRIBE response did not carry a SID")]
    MissingSid,

    /// The event subscription URL has no usable host.
    #[error("event subscription URL has no host: {0}")]
    InvalidUrl(String),

    /// `event_loop` was called while a previous call still owns the
    /// callback listener.
    #[error("event loop is already running")]
    AlreadyRunning,
}

/// Convenient Result alias for GENA operations.
pub type GenaResult<T> = Result<T, GenaError>;
