//! SOAP action invocation against a service's control URL.
//!
//! The request side is a hand-formatted SOAP 1.1 envelope: the `s:` prefix
//! on Envelope/Body is non-negotiable for interoperability, and several
//! device stacks reject documents with whitespace before the root element,
//! so the envelope is emitted as a single line. The response side walks the
//! returned XML for the `Body` element and either hands its inner content to
//! the caller or decodes the SOAP `Fault` carried under an error status.

use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::description::{DescriptionError, DeviceDescription};
use crate::protocol_constants::SOAP_TIMEOUT;
use crate::utils::escape_xml;

/// Errors from SOAP invocation.
#[derive(Debug, Error)]
pub enum SoapError {
    /// Transport failure (connection refused, DNS, timeout). Surfaced
    /// verbatim; retry policy belongs to the caller.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered the action with a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(Fault),

    /// An error status whose body was not a SOAP fault.
    #[error("action returned HTTP {status} without a SOAP fault")]
    Status { status: u16 },

    /// The response did not decode as a SOAP envelope.
    #[error("failed to decode SOAP response: {0}")]
    Decode(String),
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

// ─────────────────────────────────────────────────────────────────────────────
// Fault
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
struct UpnpErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: String,
    #[serde(rename = "errorDescription", default)]
    error_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FaultDetail {
    #[serde(rename = "UPnPError", default)]
    upnp_error: UpnpErrorDetail,
}

/// A SOAP `Fault` element, including the UPnP-specific error information
/// from `detail/UPnPError`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fault {
    #[serde(rename = "faultcode", default)]
    pub fault_code: String,
    #[serde(rename = "faultstring", default)]
    pub fault_string: String,
    #[serde(rename = "detail", default)]
    detail: FaultDetail,
}

impl Fault {
    /// The UPnP error code, e.g. `"401"` for Invalid Action. Kept as text:
    /// the wire value is unvalidated device output.
    pub fn error_code(&self) -> &str {
        &self.detail.upnp_error.error_code
    }

    /// The UPnP error description.
    pub fn error_description(&self) -> &str {
        &self.detail.upnp_error.error_description
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_description(), self.error_code())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action requests
// ─────────────────────────────────────────────────────────────────────────────

/// A SOAP action to invoke: service type URN, action name, and the input
/// arguments, serialized as named child elements in insertion order.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    service_type: String,
    name: String,
    args: Vec<(String, String)>,
}

impl ActionRequest {
    /// Creates an action for the given service type URN and action name.
    pub fn new(service_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends an input argument. Order is preserved on the wire.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quoted `SOAPACTION` header value, `"urn#Action"`.
    fn soapaction(&self) -> String {
        format!("\"{}#{}\"", self.service_type, self.name)
    }

    /// Emits the envelope as a single line with no leading whitespace.
    fn to_envelope(&self) -> String {
        let mut body = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{} xmlns:u="{}">"#,
            self.name, self.service_type
        );
        for (name, value) in &self.args {
            body.push_str(&format!("<{name}>{}</{name}>", escape_xml(value)));
        }
        body.push_str(&format!("</u:{}></s:Body></s:Envelope>", self.name));
        body
    }
}

/// `User-Agent` per UPnP Device Architecture 3.2.1: OS token, UPnP version,
/// product token.
fn user_agent() -> String {
    format!(
        "{}/{} UPnP/1.1 {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// Invokes `action` against `control_url` and returns the inner XML of the
/// response `Body`, the caller payload stripped of the envelope
/// decorations. The string is empty when the device sent a bodyless 2xx.
pub async fn invoke(
    client: &Client,
    control_url: &Url,
    action: &ActionRequest,
) -> SoapResult<String> {
    let envelope = action.to_envelope();
    log::debug!("SOAP {} -> {}", action.name, control_url);

    let response = client
        .post(control_url.clone())
        .header("SOAPACTION", action.soapaction())
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("User-Agent", user_agent())
        .body(envelope)
        .timeout(SOAP_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if status.as_u16() >= 400 {
        return match parse_fault(&text) {
            Some(fault) => {
                log::debug!("action {} returned HTTP {}: {}", action.name, status, fault);
                Err(SoapError::Fault(fault))
            }
            None => Err(SoapError::Status {
                status: status.as_u16(),
            }),
        };
    }

    if text.trim().is_empty() {
        return Ok(String::new());
    }

    match body_inner(&text) {
        Some(inner) => Ok(inner),
        None => Err(SoapError::Decode(
            "response has no SOAP Body element".to_string(),
        )),
    }
}

/// Like [`invoke`], but unmarshals the response element into the caller's
/// structure, which defines the expected child field names. Returns `None`
/// when the device sent a 2xx with no response body.
pub async fn invoke_typed<T: DeserializeOwned>(
    client: &Client,
    control_url: &Url,
    action: &ActionRequest,
) -> SoapResult<Option<T>> {
    let inner = invoke(client, control_url, action).await?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = quick_xml::de::from_str(trimmed).map_err(|e| SoapError::Decode(e.to_string()))?;
    Ok(Some(value))
}

/// Resolves the control URL for a service type within a description:
/// the innermost device hosting the service, its `controlURL`, resolved
/// against the description base.
pub fn control_url_for(
    dd: &DeviceDescription,
    service_type: &str,
) -> Result<Url, DescriptionError> {
    let device = dd
        .device_by_service(service_type)
        .ok_or_else(|| DescriptionError::ServiceNotFound(service_type.to_string()))?;
    let service = device
        .services()
        .iter()
        .find(|s| s.service_type == service_type)
        .ok_or_else(|| DescriptionError::ServiceNotFound(service_type.to_string()))?;
    dd.build_url(&service.control_url)
}

// ─────────────────────────────────────────────────────────────────────────────
// Response parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the raw inner XML of the first `Body` element (any namespace
/// prefix), or `None` when the document has no such element.
fn body_inner(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if e.local_name().as_ref() == b"Body" => {
                let end = e.to_end().into_owned();
                return reader.read_text(end.name()).ok().map(|t| t.into_owned());
            }
            Ok(XmlEvent::Empty(e)) if e.local_name().as_ref() == b"Body" => {
                return Some(String::new());
            }
            Ok(XmlEvent::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Finds and decodes a `Fault` element (any namespace prefix) anywhere in
/// the response.
fn parse_fault(xml: &str) -> Option<Fault> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if e.local_name().as_ref() == b"Fault" => {
                let end = e.to_end().into_owned();
                let inner = reader.read_text(end.name()).ok()?;
                return quick_xml::de::from_str(&format!("<Fault>{inner}</Fault>")).ok();
            }
            Ok(XmlEvent::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_mandatory_prefixes_and_ordered_args() {
        let action = ActionRequest::new("urn:schemas-upnp-org:service:AVTransport:1", "Seek")
            .arg("InstanceID", "0")
            .arg("Unit", "REL_TIME")
            .arg("Target", "0:01:30");
        let envelope = action.to_envelope();

        assert!(envelope.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope"#));
        assert!(envelope.contains(r#"xmlns:s="http://schemas.xmlsoap.org/soap/envelope/""#));
        assert!(envelope
            .contains(r#"<u:Seek xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">"#));
        assert!(envelope.ends_with("</u:Seek></s:Body></s:Envelope>"));

        let instance = envelope.find("<InstanceID>").unwrap();
        let unit = envelope.find("<Unit>").unwrap();
        let target = envelope.find("<Target>").unwrap();
        assert!(instance < unit && unit < target);
    }

    #[test]
    fn envelope_escapes_argument_values() {
        let action = ActionRequest::new("urn:x:service:Test:1", "Set")
            .arg("Value", r#"<a>&"quoted"</a>"#);
        let envelope = action.to_envelope();
        assert!(envelope.contains("<Value>&lt;a&gt;&amp;&quot;quoted&quot;&lt;/a&gt;</Value>"));
        assert!(!envelope.contains(r#"<Value><a>"#));
    }

    #[test]
    fn soapaction_header_is_quoted() {
        let action = ActionRequest::new("urn:x:service:Test:1", "GetStatus");
        assert_eq!(action.soapaction(), "\"urn:x:service:Test:1#GetStatus\"");
    }

    #[test]
    fn body_inner_strips_envelope_decorations() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
            <s:Body><u:GetStatusResponse xmlns:u="urn:x:service:Test:1"><Status>1</Status></u:GetStatusResponse></s:Body>
        </s:Envelope>"#;

        let inner = body_inner(xml).unwrap();
        assert!(inner.contains("<u:GetStatusResponse"));
        assert!(inner.contains("<Status>1</Status>"));
        assert!(!inner.contains("Envelope"));
    }

    #[test]
    fn body_inner_handles_empty_and_missing_bodies() {
        assert_eq!(
            body_inner(r#"<s:Envelope xmlns:s="x"><s:Body/></s:Envelope>"#),
            Some(String::new())
        );
        assert!(body_inner("<other>doc</other>").is_none());
        assert!(body_inner("not xml").is_none());
    }

    #[test]
    fn parse_fault_extracts_upnp_error() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
          <s:Body>
            <s:Fault>
              <faultcode>s:Client</faultcode>
              <faultstring>UPnPError</faultstring>
              <detail>
                <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                  <errorCode>401</errorCode>
                  <errorDescription>Invalid Action</errorDescription>
                </UPnPError>
              </detail>
            </s:Fault>
          </s:Body>
        </s:Envelope>"#;

        let fault = parse_fault(xml).unwrap();
        assert_eq!(fault.fault_code, "s:Client");
        assert_eq!(fault.fault_string, "UPnPError");
        assert_eq!(fault.error_code(), "401");
        assert_eq!(fault.error_description(), "Invalid Action");
        assert_eq!(fault.to_string(), "Invalid Action: 401");
    }

    #[test]
    fn parse_fault_returns_none_for_non_fault_bodies() {
        let xml = r#"<s:Envelope xmlns:s="x"><s:Body><u:OkResponse xmlns:u="y"/></s:Body></s:Envelope>"#;
        assert!(parse_fault(xml).is_none());
        assert!(parse_fault("garbage").is_none());
    }

    #[test]
    fn typed_response_decodes_from_inner_body() {
        #[derive(Debug, Deserialize)]
        struct GetTotalBytesReceivedResponse {
            #[serde(rename = "NewTotalBytesReceived")]
            new_total_bytes_received: u64,
        }

        let inner = r#"<u:GetTotalBytesReceivedResponse xmlns:u="urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1"><NewTotalBytesReceived>12345</NewTotalBytesReceived></u:GetTotalBytesReceivedResponse>"#;
        let parsed: GetTotalBytesReceivedResponse = quick_xml::de::from_str(inner).unwrap();
        assert_eq!(parsed.new_total_bytes_received, 12345);
    }

    #[test]
    fn user_agent_carries_os_and_upnp_version() {
        let ua = user_agent();
        assert!(ua.contains("UPnP/1.1"));
        assert!(ua.contains(std::env::consts::OS));
    }
}
