//! The GENA subscription lifecycle.
//!
//! One manager owns one subscription: its callback listener, its SID, and
//! the single outstanding renewal timer. Construction does the network
//! legwork (probe for the local address, bind the listener); the actual
//! SUBSCRIBE happens when [`SubscriptionManager::event_loop`] runs.
//!
//! Lifecycle: pending → active(SID) → renewing → active → … → terminated.
//! Renewal fires at 90% of whatever lifetime the device actually granted,
//! as a bounded loop around a sleep. Any non-200 answer to a renewal
//! terminates the subscription with an error; the caller constructs a new
//! manager to start over.

use std::net::SocketAddr;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use reqwest::{Client, Method};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::protocol_constants::{
    CHANNEL_CAPACITY, DEFAULT_SUBSCRIPTION_DURATION, MIN_SUBSCRIPTION_DURATION, RENEWAL_FACTOR,
};

use super::callback;
use super::propertyset::PropertySet;
use super::{GenaError, GenaResult};

fn subscribe_method() -> Method {
    // SAFETY: "SUBSCRIBE" is a valid HTTP method name
    Method::from_bytes(b"SUBSCRIBE").expect("SUBSCRIBE is a valid method")
}

fn unsubscribe_method() -> Method {
    // SAFETY: "UNSUBSCRIBE" is a valid HTTP method name
    Method::from_bytes(b"UNSUBSCRIBE").expect("UNSUBSCRIBE is a valid method")
}

/// Parses a GENA `TIMEOUT` header of the form `Second-N`.
fn parse_timeout_header(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.strip_prefix("Second-"))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Replaces a lifetime below the allowed minimum with the default, warning
/// about the substitution.
fn normalize_lifetime(lifetime: Duration) -> Duration {
    if lifetime < MIN_SUBSCRIPTION_DURATION {
        log::warn!(
            "subscription lifetime {:?} is below the allowed minimum {:?}, using default {:?}",
            lifetime,
            MIN_SUBSCRIPTION_DURATION,
            DEFAULT_SUBSCRIPTION_DURATION
        );
        DEFAULT_SUBSCRIPTION_DURATION
    } else {
        lifetime
    }
}

struct SharedState {
    sid: RwLock<Option<String>>,
    granted: RwLock<Duration>,
}

/// Maintains a live GENA subscription to one service's `eventSubURL`.
pub struct SubscriptionManager {
    event_sub_url: Url,
    client: Client,
    lifetime: Duration,
    callback_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    state: SharedState,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl SubscriptionManager {
    /// Prepares a subscription to `event_sub_url` with the requested
    /// `lifetime`.
    ///
    /// Opens a throwaway TCP connection to the device to learn which local
    /// address the kernel routes toward it, then binds the ephemeral
    /// callback listener on that address. Lifetimes under one second are
    /// replaced with the 30-minute default (devices cap overlong requests
    /// themselves).
    pub async fn new(event_sub_url: Url, lifetime: Duration) -> GenaResult<Self> {
        let lifetime = normalize_lifetime(lifetime);

        let host = event_sub_url
            .host_str()
            .ok_or_else(|| GenaError::InvalidUrl(event_sub_url.to_string()))?
            .to_string();
        let port = event_sub_url.port_or_known_default().unwrap_or(80);

        let probe = TcpStream::connect((host.as_str(), port)).await?;
        let local_ip = probe.local_addr()?.ip();
        drop(probe);

        let listener = TcpListener::bind(SocketAddr::new(local_ip, 0)).await?;
        let callback_addr = listener.local_addr()?;
        log::debug!(
            "callback listener for {} bound on {}",
            event_sub_url,
            callback_addr
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);

        Ok(Self {
            event_sub_url,
            client: Client::new(),
            lifetime,
            callback_addr,
            listener: Mutex::new(Some(listener)),
            state: SharedState {
                sid: RwLock::new(None),
                granted: RwLock::new(lifetime),
            },
            cancel_tx,
            cancel_rx,
        })
    }

    /// The local address devices will NOTIFY.
    pub fn callback_addr(&self) -> SocketAddr {
        self.callback_addr
    }

    /// The device-assigned subscription ID, once the initial SUBSCRIBE has
    /// been answered.
    pub fn sid(&self) -> Option<String> {
        self.state.sid.read().clone()
    }

    /// The lifetime most recently granted by the device (the requested one
    /// until the first SUBSCRIBE completes).
    pub fn lifetime(&self) -> Duration {
        *self.state.granted.read()
    }

    /// Drives the subscription: starts the callback server, subscribes,
    /// renews at 90% of each granted lifetime, and delivers each NOTIFY's
    /// properties on `events`.
    ///
    /// Runs until [`unsubscribe`](Self::unsubscribe) is called (returns
    /// `Ok`), the consumer drops its receiver (also `Ok`), or the device
    /// rejects a subscribe/renewal (returns the error). The callback
    /// listener is torn down on every exit path.
    pub async fn event_loop(&self, events: mpsc::Sender<PropertySet>) -> GenaResult<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or(GenaError::AlreadyRunning)?;

        // The listener must be serving before the device learns the
        // callback URL from our SUBSCRIBE.
        let (raw_tx, mut raw_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, callback::router(raw_tx))
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let result = tokio::select! {
            r = self.run_subscription() => r,
            _ = async {
                while let Some(event) = raw_rx.recv().await {
                    if events.send(event.properties).await.is_err() {
                        break;
                    }
                }
            } => Ok(()),
        };

        let _ = shutdown_tx.send(());
        let _ = server.await;
        result
    }

    async fn run_subscription(&self) -> GenaResult<()> {
        let mut granted = self.send_subscribe(false).await?;
        log::info!(
            "subscribed to {} as {:?}, lifetime {:?}",
            self.event_sub_url,
            self.sid(),
            granted
        );

        let mut cancel = self.cancel_rx.clone();
        loop {
            if *cancel.borrow() {
                return Ok(());
            }

            let renew_after = granted.mul_f64(RENEWAL_FACTOR);
            tokio::select! {
                _ = cancel.wait_for(|cancelled| *cancelled) => return Ok(()),
                _ = tokio::time::sleep(renew_after) => {}
            }

            log::info!("renewing subscription {:?}", self.sid());
            granted = self.send_subscribe(true).await?;
        }
    }

    /// Sends the initial SUBSCRIBE (`NT` + `CALLBACK`) or a renewal
    /// (`SID` only); returns the lifetime the device granted.
    async fn send_subscribe(&self, renewal: bool) -> GenaResult<Duration> {
        let mut request = self
            .client
            .request(subscribe_method(), self.event_sub_url.clone())
            .header("TIMEOUT", format!("Second-{}", self.lifetime.as_secs()));

        if renewal {
            let sid = self.state.sid.read().clone().ok_or(GenaError::MissingSid)?;
            request = request.header("SID", sid);
        } else {
            request = request
                .header("NT", "upnp:event")
                .header("CALLBACK", format!("<http://{}/>", self.callback_addr));
        }

        let response = request.send().await?;
        if response.status().as_u16() != 200 {
            return Err(GenaError::Rejected(response.status().as_u16()));
        }

        // The SID is assigned on the first SUBSCRIBE and persists across
        // renewals; devices are not required to repeat it.
        match response
            .headers()
            .get("SID")
            .and_then(|v| v.to_str().ok())
        {
            Some(sid) => *self.state.sid.write() = Some(sid.to_string()),
            None if !renewal => return Err(GenaError::MissingSid),
            None => {}
        }

        // Devices may grant less than requested.
        let granted = parse_timeout_header(
            response
                .headers()
                .get("TIMEOUT")
                .and_then(|v| v.to_str().ok()),
        )
        .unwrap_or(self.lifetime);
        *self.state.granted.write() = granted;

        Ok(granted)
    }

    /// Cancels the subscription: stops the renewal loop (which tears down
    /// the callback listener and closes the event stream), then sends
    /// UNSUBSCRIBE with the held SID. Without a SID this is a no-op.
    pub async fn unsubscribe(&self) -> GenaResult<()> {
        let _ = self.cancel_tx.send(true);

        let Some(sid) = self.state.sid.write().take() else {
            return Ok(());
        };

        let response = self
            .client
            .request(unsubscribe_method(), self.event_sub_url.clone())
            .header("SID", sid)
            .send()
            .await?;

        if response.status().as_u16() != 200 {
            return Err(GenaError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}
