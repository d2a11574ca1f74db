//! Active M-SEARCH discovery and the passive NOTIFY listener.
//!
//! Both loops deliver decoded messages on bounded channels; a slow consumer
//! backpressures the socket reader rather than dropping datagrams. Malformed
//! datagrams are logged and discarded so one bad peer cannot end a stream.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::protocol_constants::{
    CHANNEL_CAPACITY, DISCOVERY_WAIT_MAX, DISCOVERY_WAIT_MIN, SSDP_MULTICAST_GROUP,
    SSDP_MULTICAST_TTL, SSDP_PORT, SSDP_RECV_BUFFER,
};

use super::message::{
    encode_msearch, parse_notify_response, parse_search_response, NotifyResponse, SearchRequest,
    SearchResponse,
};
use super::SsdpError;

/// Clamps the search wait into the `[1s, 5s]` range the UPnP spec allows
/// for MX, warning when the caller's value had to be adjusted.
fn clamp_wait(wait: Duration) -> Duration {
    if wait < DISCOVERY_WAIT_MIN {
        log::warn!(
            "search wait of {:?} is below the allowed minimum, raising to {:?}",
            wait,
            DISCOVERY_WAIT_MIN
        );
        DISCOVERY_WAIT_MIN
    } else if wait > DISCOVERY_WAIT_MAX {
        log::warn!(
            "search wait of {:?} is above the allowed maximum, lowering to {:?}",
            wait,
            DISCOVERY_WAIT_MAX
        );
        DISCOVERY_WAIT_MAX
    } else {
        wait
    }
}

/// Errors the OS reports for conditions that clear on their own; the listen
/// loops keep going through these and only stop on anything else.
pub(crate) fn is_temporary(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

/// Issues an M-SEARCH and streams the responses that arrive within the wait
/// window.
///
/// Responses are delivered in arrival order with no deduplication (the same
/// `USN`+`ST` pair may appear more than once; the caller decides). The
/// channel closes once the wait deadline passes or the socket fails.
pub async fn discover(mut req: SearchRequest) -> Result<mpsc::Receiver<SearchResponse>, SsdpError> {
    req.wait = clamp_wait(req.wait);

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    if let Err(e) = socket.set_multicast_ttl_v4(SSDP_MULTICAST_TTL) {
        log::warn!("failed to set multicast TTL: {}", e);
    }

    let msg = encode_msearch(&req);
    socket
        .send_to(msg.as_bytes(), (req.host.as_str(), req.port))
        .await?;
    log::debug!(
        "sent M-SEARCH for {} to {}:{}, listening {:?}",
        req.target,
        req.host,
        req.port,
        req.wait
    );

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(collect_search_responses(socket, req.wait, tx));

    Ok(rx)
}

async fn collect_search_responses(
    socket: UdpSocket,
    wait: Duration,
    tx: mpsc::Sender<SearchResponse>,
) {
    let deadline = Instant::now() + wait;
    let mut buf = [0u8; SSDP_RECV_BUFFER];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match timeout(remaining, socket.recv_from(&mut buf)).await {
            // Deadline reached: the search window is over.
            Err(_) => break,
            Ok(Err(e)) => {
                if is_temporary(&e) {
                    continue;
                }
                log::error!("search socket read failed: {}", e);
                break;
            }
            Ok(Ok((len, src))) => {
                let text = String::from_utf8_lossy(&buf[..len]);
                match parse_search_response(&text) {
                    Ok(resp) => {
                        if tx.send(resp).await.is_err() {
                            // Consumer dropped the receiver.
                            break;
                        }
                    }
                    Err(e) => log::warn!("discarding datagram from {}: {}", src, e),
                }
            }
        }
    }
}

/// Joins the SSDP multicast group and streams decoded NOTIFY advertisements
/// until a non-temporary socket error.
pub fn listen_notify() -> Result<mpsc::Receiver<NotifyResponse>, SsdpError> {
    let socket = join_multicast(SSDP_MULTICAST_GROUP, SSDP_PORT)?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(collect_notifies(socket, tx));
    Ok(rx)
}

async fn collect_notifies(socket: UdpSocket, tx: mpsc::Sender<NotifyResponse>) {
    let mut buf = [0u8; SSDP_RECV_BUFFER];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let text = String::from_utf8_lossy(&buf[..len]);
                match parse_notify_response(&text) {
                    Ok(resp) => {
                        if tx.send(resp).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => log::warn!("discarding datagram from {}: {}", src, e),
                }
            }
            Err(e) if is_temporary(&e) => continue,
            Err(e) => {
                log::error!("notify socket read failed: {}", e);
                return;
            }
        }
    }
}

/// Creates a UDP socket joined to `group`, bound to the wildcard address on
/// `port`, ready for use with tokio.
///
/// SO_REUSEADDR (and SO_REUSEPORT on Unix) let the listener coexist with
/// other SSDP-speaking processes on the same host.
pub(crate) fn join_multicast(group: Ipv4Addr, port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("failed to set SO_REUSEADDR: {}", e);
    }
    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("failed to set SO_REUSEPORT: {}", e);
    }

    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&bind_addr.into())?;
    socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_below_minimum_is_raised_to_one_second() {
        assert_eq!(clamp_wait(Duration::from_millis(0)), DISCOVERY_WAIT_MIN);
        assert_eq!(clamp_wait(Duration::from_millis(250)), DISCOVERY_WAIT_MIN);
    }

    #[test]
    fn wait_above_maximum_is_lowered_to_five_seconds() {
        assert_eq!(clamp_wait(Duration::from_secs(6)), DISCOVERY_WAIT_MAX);
        assert_eq!(clamp_wait(Duration::from_secs(3600)), DISCOVERY_WAIT_MAX);
    }

    #[test]
    fn wait_inside_range_is_untouched() {
        for secs in 1..=5 {
            let wait = Duration::from_secs(secs);
            assert_eq!(clamp_wait(wait), wait);
        }
    }

    #[test]
    fn temporary_errors_are_recognized() {
        assert!(is_temporary(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_temporary(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_temporary(&io::Error::from(
            io::ErrorKind::ConnectionReset
        )));
    }

    #[tokio::test]
    async fn listen_loop_survives_malformed_datagrams() {
        // Bind a listener on an ephemeral port (no group membership needed
        // for loopback delivery) and feed it garbage followed by a valid
        // NOTIFY; only the valid one must come out.
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(collect_notifies(socket, tx));

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sender.send_to(b"complete garbage", addr).await.unwrap();
        let notify = "NOTIFY * HTTP/1.1\r\n\
                      HOST: 239.255.255.250:1900\r\n\
                      NT: upnp:rootdevice\r\n\
                      NTS: ssdp:byebye\r\n\
                      USN: uuid:gone::upnp:rootdevice\r\n\r\n";
        sender.send_to(notify.as_bytes(), addr).await.unwrap();

        let resp = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resp.nts, "ssdp:byebye");
        assert_eq!(resp.ssdp.usn, "uuid:gone::upnp:rootdevice");
    }
}
