//! The passive multicast event listener (UPnP 1.1+).
//!
//! Devices with `multicast="yes"` state variables publish property changes
//! as `NOTIFY * HTTP/1.1` datagrams on `239.255.255.246:7900`; no
//! subscription is involved. Bad datagrams are logged and skipped; the
//! stream ends only on a non-temporary socket error.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::protocol_constants::{
    CHANNEL_CAPACITY, EVENT_RECV_BUFFER, MULTICAST_EVENT_GROUP, MULTICAST_EVENT_PORT,
};
use crate::ssdp::discovery::{is_temporary, join_multicast};
use crate::ssdp::message::parse_request;

use super::propertyset::parse_property_set;
use super::{Event, GenaError, GenaResult};

/// Joins the multicast event group and streams decoded events until a
/// non-temporary socket error closes the stream.
pub fn listen_multicast_events() -> GenaResult<mpsc::Receiver<Event>> {
    let (events, _addr) = listen_on(MULTICAST_EVENT_GROUP, MULTICAST_EVENT_PORT)?;
    Ok(events)
}

fn listen_on(
    group: Ipv4Addr,
    port: u16,
) -> GenaResult<(mpsc::Receiver<Event>, SocketAddr)> {
    let socket = join_multicast(group, port)?;
    let local_addr = socket.local_addr()?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(collect_events(socket, tx));
    Ok((rx, local_addr))
}

async fn collect_events(socket: UdpSocket, tx: mpsc::Sender<Event>) {
    let mut buf = [0u8; EVENT_RECV_BUFFER];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let text = String::from_utf8_lossy(&buf[..len]);
                match parse_event_notify(&text) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => log::warn!("discarding event datagram from {}: {}", src, e),
                }
            }
            Err(e) if is_temporary(&e) => continue,
            Err(e) => {
                log::error!("multicast event socket read failed: {}", e);
                return;
            }
        }
    }
}

/// Decodes a multicast `NOTIFY * HTTP/1.1` datagram into an [`Event`]:
/// GENA headers plus the multicast-only ones (`USN`, `SVCID`, `LVL`,
/// `BOOTID.UPNP.ORG`), then the propertyset body.
pub(crate) fn parse_event_notify(text: &str) -> GenaResult<Event> {
    let request = parse_request(text)?;
    if !request.method.eq_ignore_ascii_case("NOTIFY") {
        return Err(GenaError::Decode(format!(
            "expected NOTIFY, got {}",
            request.method
        )));
    }

    let header = |name: &str| request.headers.get(name).unwrap_or("").to_string();
    let properties = parse_property_set(&request.body)?;

    Ok(Event {
        nt: header("NT"),
        nts: header("NTS"),
        sid: header("SID"),
        seq: request.headers.get_u32("SEQ"),
        usn: header("USN"),
        svcid: header("SVCID"),
        lvl: header("LVL"),
        boot_id: request.headers.get_u32("BOOTID.UPNP.ORG"),
        properties,
    })
}
