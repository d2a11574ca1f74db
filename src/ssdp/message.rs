//! HTTPU wire codec for SSDP.
//!
//! Encodes M-SEARCH requests and decodes the HTTP-shaped datagrams devices
//! send back: search responses (status line + headers, no body) and NOTIFY
//! requests (request line + headers). Header names are matched ASCII
//! case-insensitively; integer `*.UPNP.ORG` extension headers decode to zero
//! when absent or unparseable rather than failing the whole datagram.

use std::time::Duration;

use crate::protocol_constants::{
    DEFAULT_SEARCH_TARGET, DISCOVERY_WAIT_MAX, SSDP_MULTICAST_ADDR, SSDP_PORT,
};

use super::SsdpError;

// ─────────────────────────────────────────────────────────────────────────────
// Search request
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for an SSDP M-SEARCH.
///
/// Defaults target the standard multicast group with `ssdp:all` and the
/// maximum allowed wait. `wait` becomes the MX header and the listen window;
/// [`discovery::discover`](super::discovery::discover) clamps it into the
/// `[1s, 5s]` range the UPnP spec allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Destination host, normally the SSDP multicast group.
    pub host: String,
    /// Destination port, normally 1900.
    pub port: u16,
    /// Search target (`ssdp:all`, `upnp:rootdevice`, or a device/service URN).
    pub target: String,
    /// MX value: how long responders may delay, and how long we listen.
    pub wait: Duration,
}

impl SearchRequest {
    /// Creates a request with the standard multicast defaults.
    pub fn new() -> Self {
        Self {
            host: SSDP_MULTICAST_ADDR.to_string(),
            port: SSDP_PORT,
            target: DEFAULT_SEARCH_TARGET.to_string(),
            wait: DISCOVERY_WAIT_MAX,
        }
    }

    /// Creates a request for a specific search target and wait.
    pub fn for_target(target: impl Into<String>, wait: Duration) -> Self {
        Self {
            target: target.into(),
            wait,
            ..Self::new()
        }
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the M-SEARCH datagram text.
///
/// UPnP 2.0 multicast search additionally MUST set `CPFN.UPNP.ORG` (and MAY
/// set `CPUUID.UPNP.ORG`) when Device Protection is in play; plain discovery
/// does not need either.
pub fn encode_msearch(req: &SearchRequest) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        req.host,
        req.port,
        req.wait.as_secs(),
        req.target
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Response types
// ─────────────────────────────────────────────────────────────────────────────

/// Header block common to search responses and NOTIFY advertisements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsdpHeaders {
    /// Absolute URL of the root device description.
    pub location: String,
    /// Freshness directive (`max-age=N`).
    pub cache_control: String,
    /// OS/product token.
    pub server: String,
    /// Unique service name.
    pub usn: String,
    /// `BOOTID.UPNP.ORG`, zero when absent.
    pub boot_id: u32,
    /// `CONFIGID.UPNP.ORG`, zero when absent.
    pub config_id: u32,
    /// `SEARCHPORT.UPNP.ORG`, zero when absent.
    pub search_port: u32,
}

/// A decoded answer to an M-SEARCH.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// The search target the device responded to.
    pub st: String,
    /// Common SSDP headers.
    pub ssdp: SsdpHeaders,
}

/// A decoded `NOTIFY * HTTP/1.1` advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyResponse {
    /// Notification type.
    pub nt: String,
    /// Notification sub-type: `ssdp:alive`, `ssdp:byebye`, or `ssdp:update`.
    pub nts: String,
    /// `NEXTBOOTID.UPNP.ORG`, zero when absent.
    pub next_boot_id: u32,
    /// Common SSDP headers.
    pub ssdp: SsdpHeaders,
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTPU parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Header list with case-insensitive lookup (names folded at parse time).
#[derive(Debug, Clone, Default)]
pub(crate) struct Headers(Vec<(String, String)>);

impl Headers {
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.0
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Integer header value, zero when absent or unparseable.
    pub(crate) fn get_u32(&self, name: &str) -> u32 {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// An HTTPU request datagram (NOTIFY, or a round-tripped M-SEARCH).
#[derive(Debug, Clone)]
pub(crate) struct HttpuRequest {
    pub method: String,
    pub target: String,
    pub headers: Headers,
    pub body: String,
}

/// An HTTPU response datagram.
#[derive(Debug, Clone)]
pub(crate) struct HttpuResponse {
    pub status: u16,
    pub headers: Headers,
}

fn parse_message(text: &str) -> Result<(&str, Headers, &str), SsdpError> {
    let (head, body) = match text.find("\r\n\r\n") {
        Some(i) => (&text[..i], &text[i + 4..]),
        None => (text, ""),
    };

    let mut lines = head.lines();
    let start = lines
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| SsdpError::Malformed("empty datagram".to_string()))?;

    let mut headers = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let idx = line.find(':').ok_or_else(|| {
            SsdpError::Malformed(format!("header line without a colon: {line:?}"))
        })?;
        headers.push((
            line[..idx].trim().to_ascii_lowercase(),
            line[idx + 1..].trim().to_string(),
        ));
    }

    Ok((start, Headers(headers), body))
}

pub(crate) fn parse_request(text: &str) -> Result<HttpuRequest, SsdpError> {
    let (start, headers, body) = parse_message(text)?;

    let mut parts = start.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| SsdpError::Malformed("missing request method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| SsdpError::Malformed("missing request target".to_string()))?;
    let version = parts
        .next()
        .ok_or_else(|| SsdpError::Malformed("missing HTTP version".to_string()))?;
    if !version.starts_with("HTTP/") {
        return Err(SsdpError::Malformed(format!(
            "not an HTTP request line: {start:?}"
        )));
    }

    Ok(HttpuRequest {
        method: method.to_string(),
        target: target.to_string(),
        headers,
        body: body.to_string(),
    })
}

pub(crate) fn parse_response(text: &str) -> Result<HttpuResponse, SsdpError> {
    let (start, headers, _body) = parse_message(text)?;

    let mut parts = start.split_whitespace();
    let version = parts
        .next()
        .ok_or_else(|| SsdpError::Malformed("missing HTTP version".to_string()))?;
    if !version.starts_with("HTTP/") {
        return Err(SsdpError::Malformed(format!(
            "not an HTTP status line: {start:?}"
        )));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| SsdpError::Malformed(format!("missing status code: {start:?}")))?;

    Ok(HttpuResponse { status, headers })
}

fn ssdp_headers(headers: &Headers) -> SsdpHeaders {
    SsdpHeaders {
        location: headers.get("Location").unwrap_or("").to_string(),
        cache_control: headers.get("Cache-Control").unwrap_or("").to_string(),
        server: headers.get("Server").unwrap_or("").to_string(),
        usn: headers.get("USN").unwrap_or("").to_string(),
        boot_id: headers.get_u32("BOOTID.UPNP.ORG"),
        config_id: headers.get_u32("CONFIGID.UPNP.ORG"),
        search_port: headers.get_u32("SEARCHPORT.UPNP.ORG"),
    }
}

/// Decodes a search response datagram.
pub fn parse_search_response(text: &str) -> Result<SearchResponse, SsdpError> {
    let response = parse_response(text)?;
    Ok(SearchResponse {
        st: response.headers.get("ST").unwrap_or("").to_string(),
        ssdp: ssdp_headers(&response.headers),
    })
}

/// Decodes a `NOTIFY * HTTP/1.1` advertisement datagram.
///
/// A UPnP 2.0 `ssdp:alive` may additionally carry `SECURELOCATION.UPNP.ORG`
/// when Device Protection is in use; it is ignored here.
pub fn parse_notify_response(text: &str) -> Result<NotifyResponse, SsdpError> {
    let request = parse_request(text)?;
    if !request.method.eq_ignore_ascii_case("NOTIFY") {
        return Err(SsdpError::Malformed(format!(
            "expected NOTIFY, got {}",
            request.method
        )));
    }

    Ok(NotifyResponse {
        nt: request.headers.get("NT").unwrap_or("").to_string(),
        nts: request.headers.get("NTS").unwrap_or("").to_string(),
        next_boot_id: request.headers.get_u32("NEXTBOOTID.UPNP.ORG"),
        ssdp: ssdp_headers(&request.headers),
    })
}
