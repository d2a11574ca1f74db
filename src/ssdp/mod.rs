//! SSDP discovery: HTTP-over-UDP search and advertisement listening.
//!
//! SSDP reuses HTTP/1.1 syntax on UDP datagrams ("HTTPU"). This module
//! provides the wire codec ([`message`]) and the two discovery loops
//! ([`discovery`]): an active M-SEARCH with a bounded listen window, and a
//! passive listener joined to the SSDP multicast group.

pub mod discovery;
pub mod message;

pub use discovery::{discover, listen_notify};
pub use message::{
    encode_msearch, parse_notify_response, parse_search_response, NotifyResponse, SearchRequest,
    SearchResponse, SsdpHeaders,
};

use std::io;
use thiserror::Error;

/// Errors from the SSDP codec and discovery loops.
#[derive(Debug, Error)]
pub enum SsdpError {
    /// Socket setup, read, or write failure.
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    /// A datagram that does not parse as an HTTPU message. Streaming loops
    /// log and discard these; they are only surfaced by the codec itself.
    #[error("malformed SSDP datagram: {0}")]
    Malformed(String),
}

/// Convenient Result alias for SSDP operations.
pub type SsdpResult<T> = Result<T, SsdpError>;
