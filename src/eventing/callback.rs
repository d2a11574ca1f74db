//! The NOTIFY callback handler behind a subscription's ephemeral listener.
//!
//! Every request is answered `200 OK`, whatever its method, path, or body:
//! per UPnP eventing, a control-point-side failure must never make the
//! device abandon the subscription. A NOTIFY that fails to parse is logged
//! and simply produces no event.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::any;
use axum::Router;
use tokio::sync::mpsc;

use crate::protocol_constants::MAX_NOTIFY_BODY_SIZE;

use super::propertyset::parse_property_set;
use super::Event;

/// Builds the router for one manager's listener. The router is owned by
/// that listener alone; nothing is registered process-wide, so multiple
/// managers in one process cannot collide.
pub(crate) fn router(events: mpsc::Sender<Event>) -> Router {
    Router::new()
        .route("/", any(notify))
        .fallback(notify)
        .with_state(events)
}

/// Decodes the GENA headers of a NOTIFY. A non-integer `SEQ` becomes zero.
pub(crate) fn event_from_headers(headers: &HeaderMap) -> Event {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    Event {
        nt: text("NT"),
        nts: text("NTS"),
        sid: text("SID"),
        seq: headers
            .get("SEQ")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0),
        ..Event::default()
    }
}

async fn notify(State(events): State<mpsc::Sender<Event>>, request: Request<Body>) -> StatusCode {
    let (parts, body) = request.into_parts();
    let mut event = event_from_headers(&parts.headers);

    let bytes = match axum::body::to_bytes(body, MAX_NOTIFY_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("failed to read NOTIFY body: {}", e);
            return StatusCode::OK;
        }
    };

    match parse_property_set(&String::from_utf8_lossy(&bytes)) {
        Ok(properties) => {
            event.properties = properties;
            // A full channel blocks here until the consumer drains it; the
            // device just sees a slow 200.
            if events.send(event).await.is_err() {
                log::debug!("event consumer is gone, dropping NOTIFY");
            }
        }
        Err(e) => log::warn!("discarding unparseable NOTIFY body: {}", e),
    }

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn extracts_gena_headers() {
        let event = event_from_headers(&headers(&[
            ("NT", "upnp:event"),
            ("NTS", "upnp:propchange"),
            ("SID", "uuid:abcd"),
            ("SEQ", "7"),
        ]));
        assert_eq!(event.nt, "upnp:event");
        assert_eq!(event.nts, "upnp:propchange");
        assert_eq!(event.sid, "uuid:abcd");
        assert_eq!(event.seq, 7);
    }

    #[test]
    fn non_integer_seq_becomes_zero() {
        let event = event_from_headers(&headers(&[("SID", "uuid:abcd"), ("SEQ", "first")]));
        assert_eq!(event.seq, 0);

        let event = event_from_headers(&headers(&[("SID", "uuid:abcd")]));
        assert_eq!(event.seq, 0);
    }
}
