//! Fetching description documents, and the discover-then-describe
//! conveniences.
//!
//! Content-Type is deliberately not enforced: devices in the wild set
//! `text/xml` and `application/xml` inconsistently, and some send no
//! Content-Type at all. Whatever comes back is handed to the XML
//! unmarshaller, which is the real arbiter.

use std::time::Duration;

use url::Url;

use crate::protocol_constants::{DESCRIPTION_TIMEOUT, DISCOVERY_WAIT_MAX, DISCOVERY_WAIT_MIN};
use crate::ssdp::{self, SearchRequest};

use super::device::DeviceDescription;
use super::service::ServiceDescription;
use super::DescriptionError;

async fn fetch(url: &str, timeout: Duration) -> Result<String, DescriptionError> {
    // UPnP 2.0 control points additionally MUST send CPFN.UPNP.ORG (and MAY
    // send CPUUID.UPNP.ORG) when Device Protection is in play.
    let client = reqwest::Client::new();
    let response = client.get(url).timeout(timeout).send().await?;
    Ok(response.text().await?)
}

/// Fetches and unmarshals a device description from `url`.
pub async fn describe_device(url: &str) -> Result<DeviceDescription, DescriptionError> {
    describe_device_with_timeout(url, DESCRIPTION_TIMEOUT).await
}

pub(crate) async fn describe_device_with_timeout(
    url: &str,
    timeout: Duration,
) -> Result<DeviceDescription, DescriptionError> {
    let origin = Url::parse(url)?;
    let body = fetch(url, timeout).await?;
    DeviceDescription::parse(&body, origin)
}

/// Fetches and unmarshals an SCPD document from `url`.
pub async fn describe_service(url: &str) -> Result<ServiceDescription, DescriptionError> {
    describe_service_with_timeout(url, DESCRIPTION_TIMEOUT).await
}

pub(crate) async fn describe_service_with_timeout(
    url: &str,
    timeout: Duration,
) -> Result<ServiceDescription, DescriptionError> {
    let body = fetch(url, timeout).await?;
    ServiceDescription::parse(&body)
}

/// Multicast-searches for `target` and describes the first device that
/// answers.
///
/// Single-device by design: callers needing multi-device coverage iterate
/// [`ssdp::discover`] themselves and call [`describe_device`] per location.
pub async fn discover_device_description(
    target: &str,
    wait: Duration,
) -> Result<DeviceDescription, crate::error::UpnpError> {
    let wait = wait.clamp(DISCOVERY_WAIT_MIN, DISCOVERY_WAIT_MAX);
    let mut responses = ssdp::discover(SearchRequest::for_target(target, wait)).await?;

    let first = responses
        .recv()
        .await
        .ok_or_else(|| DescriptionError::NoResponse(target.to_string()))?;

    // The description fetch gets the same patience as the search itself.
    let dd = describe_device_with_timeout(&first.ssdp.location, wait).await?;
    Ok(dd)
}

/// Multicast-searches for the service URN `target`, then fetches the SCPD of
/// that service on the first device that answers.
pub async fn discover_service_description(
    target: &str,
    wait: Duration,
) -> Result<ServiceDescription, crate::error::UpnpError> {
    let wait = wait.clamp(DISCOVERY_WAIT_MIN, DISCOVERY_WAIT_MAX);
    let dd = discover_device_description(target, wait).await?;

    let service = dd
        .service_by_type(target)
        .ok_or_else(|| DescriptionError::ServiceNotFound(target.to_string()))?;

    // The SCPDURL is relative to the description base on every device seen
    // so far, but absolute URLs resolve fine too.
    let scpd_url = dd.build_url(&service.scpd_url)?;
    let sd = describe_service_with_timeout(scpd_url.as_str(), wait).await?;
    Ok(sd)
}
