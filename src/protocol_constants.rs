//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the UPnP Device Architecture (1.1/2.0) and
//! changing them would break protocol compliance.

use std::net::Ipv4Addr;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// SSDP (discovery)
// ─────────────────────────────────────────────────────────────────────────────

/// SSDP multicast group address.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP multicast group as an [`Ipv4Addr`], for socket membership.
pub const SSDP_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// SSDP multicast port.
pub const SSDP_PORT: u16 = 1900;

/// Default search target. Note that some devices (WeMo switches, for one)
/// ignore `ssdp:all` but do answer `upnp:rootdevice`.
pub const DEFAULT_SEARCH_TARGET: &str = "ssdp:all";

/// Lower bound on the M-SEARCH MX value (seconds a responder may delay).
pub const DISCOVERY_WAIT_MIN: Duration = Duration::from_secs(1);

/// Upper bound on the M-SEARCH MX value.
pub const DISCOVERY_WAIT_MAX: Duration = Duration::from_secs(5);

/// Multicast TTL recommended for SSDP by UPnP 1.0.
pub const SSDP_MULTICAST_TTL: u32 = 4;

// ─────────────────────────────────────────────────────────────────────────────
// GENA (eventing)
// ─────────────────────────────────────────────────────────────────────────────

/// Multicast group for UPnP 1.1+ multicast eventing.
pub const MULTICAST_EVENT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 246);

/// Port for UPnP 1.1+ multicast eventing.
pub const MULTICAST_EVENT_PORT: u16 = 7900;

/// Subscription lifetime used when the caller asks for less than
/// [`MIN_SUBSCRIPTION_DURATION`].
pub const DEFAULT_SUBSCRIPTION_DURATION: Duration = Duration::from_secs(30 * 60);

/// Minimum subscription lifetime a device can usefully grant.
///
/// Devices clamp to their own internal maximum anyway; the practical upper
/// limit on the wire is `Second-(2^31 - 1)`.
pub const MIN_SUBSCRIPTION_DURATION: Duration = Duration::from_secs(1);

/// Fraction of the granted lifetime to wait before renewing a subscription.
pub const RENEWAL_FACTOR: f64 = 0.9;

/// Maximum accepted size of a GENA NOTIFY body (bytes).
pub const MAX_NOTIFY_BODY_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for description document fetches outside the
/// discover-then-describe paths (those reuse the discovery wait).
pub const DESCRIPTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for SOAP control requests. 10 seconds is generous for LAN
/// operations.
pub const SOAP_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────────────────────────────────────
// Channels and buffers
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the bounded channels handed to consumers. A full channel
/// blocks the producing task until the consumer drains it.
pub const CHANNEL_CAPACITY: usize = 10;

/// Receive buffer for SSDP datagrams.
pub const SSDP_RECV_BUFFER: usize = 4096;

/// Receive buffer for multicast event datagrams, which carry XML bodies.
pub const EVENT_RECV_BUFFER: usize = 8192;
