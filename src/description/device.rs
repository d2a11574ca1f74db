//! The device description document: a recursive device tree plus the URL
//! base used to resolve the relative links it contains.
//!
//! Per UPnP Device Architecture section 2, devices may add vendor attributes
//! anywhere in the document; unknown elements are ignored when unmarshalling.
//! All tree lookups are pure, stateless depth-first walks over the parsed
//! value; results are never cached, so distinct descriptions can never
//! observe each other's data.

use serde::Deserialize;
use url::Url;

use super::DescriptionError;

/// A device icon entry from `iconList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Icon {
    /// Icon MIME type, e.g. `image/png`.
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Color depth in bits.
    #[serde(default)]
    pub depth: u32,
    /// Icon URL, possibly relative to the description base.
    #[serde(default)]
    pub url: String,
}

/// A service entry from `serviceList`.
///
/// The three URLs may be relative; resolve them with
/// [`DeviceDescription::build_url`] before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Service {
    #[serde(rename = "serviceType", default)]
    pub service_type: String,
    #[serde(rename = "serviceId", default)]
    pub service_id: String,
    /// URL of the service's SCPD document.
    #[serde(rename = "SCPDURL", default)]
    pub scpd_url: String,
    /// URL SOAP actions are POSTed to.
    #[serde(rename = "controlURL", default)]
    pub control_url: String,
    /// URL GENA subscriptions are sent to.
    #[serde(rename = "eventSubURL", default)]
    pub event_sub_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IconList {
    #[serde(rename = "icon", default)]
    pub icon: Vec<Icon>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceList {
    #[serde(rename = "service", default)]
    pub service: Vec<Service>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub device: Vec<Device>,
}

/// A node in the device tree. `device_list` nests child devices to
/// arbitrary depth.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceType", default)]
    pub device_type: String,
    #[serde(rename = "friendlyName", default)]
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(rename = "manufacturerURL", default)]
    pub manufacturer_url: String,
    #[serde(rename = "modelDescription", default)]
    pub model_description: String,
    #[serde(rename = "modelName", default)]
    pub model_name: String,
    #[serde(rename = "modelNumber", default)]
    pub model_number: String,
    #[serde(rename = "modelURL", default)]
    pub model_url: String,
    #[serde(rename = "serialNumber", default)]
    pub serial_number: String,
    /// Unique device name, stable across boots.
    #[serde(rename = "UDN", default)]
    pub udn: String,
    #[serde(rename = "UPC", default)]
    pub upc: String,
    #[serde(rename = "iconList", default)]
    icon_list: IconList,
    #[serde(rename = "serviceList", default)]
    service_list: ServiceList,
    #[serde(rename = "deviceList", default)]
    device_list: DeviceList,
    #[serde(rename = "presentationURL", default)]
    pub presentation_url: String,
}

impl Device {
    /// This device's icons.
    pub fn icons(&self) -> &[Icon] {
        &self.icon_list.icon
    }

    /// Services hosted directly by this device (children not included).
    pub fn services(&self) -> &[Service] {
        &self.service_list.service
    }

    /// Child devices, in document order.
    pub fn devices(&self) -> &[Device] {
        &self.device_list.device
    }

    /// Pre-order depth-first search for the first device (this one included)
    /// whose `deviceType` equals `device_type`.
    pub fn device_by_type(&self, device_type: &str) -> Option<&Device> {
        if self.device_type == device_type {
            return Some(self);
        }
        self.devices()
            .iter()
            .find_map(|d| d.device_by_type(device_type))
    }

    /// Depth-first search for the first service of the given type anywhere
    /// in this subtree.
    pub fn service_by_type(&self, service_type: &str) -> Option<&Service> {
        if let Some(svc) = self
            .services()
            .iter()
            .find(|s| s.service_type == service_type)
        {
            return Some(svc);
        }
        self.devices()
            .iter()
            .find_map(|d| d.service_by_type(service_type))
    }

    /// Finds the innermost device that directly hosts a service of the given
    /// type. Children are searched before this device, so the deepest match
    /// wins.
    pub fn device_by_service(&self, service_type: &str) -> Option<&Device> {
        if let Some(dev) = self
            .devices()
            .iter()
            .find_map(|d| d.device_by_service(service_type))
        {
            return Some(dev);
        }
        self.services()
            .iter()
            .any(|s| s.service_type == service_type)
            .then_some(self)
    }

    /// Linear scan of this device's icon list for the given MIME type.
    pub fn icon_by_mimetype(&self, mimetype: &str) -> Option<&Icon> {
        self.icons().iter().find(|i| i.mimetype == mimetype)
    }
}

/// The `specVersion` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SpecVersion {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
}

/// The root of a device description document.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDescription {
    #[serde(rename = "@configId", default)]
    pub config_id: u32,
    #[serde(rename = "specVersion", default)]
    pub spec_version: SpecVersion,
    /// `URLBase` is deprecated since UPnP 1.1 but plenty of devices still
    /// serve it; when present and non-empty it supersedes the origin URL
    /// for relative-reference resolution.
    #[serde(rename = "URLBase", default)]
    pub url_base: Option<String>,
    /// The single root device.
    pub device: Device,
    /// The URL this description was fetched from; fallback resolution base.
    #[serde(skip)]
    origin: Option<Url>,
}

impl DeviceDescription {
    /// Unmarshals a description document, recording `origin` (the URL it was
    /// fetched from) as the fallback base for relative references.
    pub fn parse(xml: &str, origin: Url) -> Result<Self, DescriptionError> {
        let mut dd: DeviceDescription = quick_xml::de::from_str(xml)?;
        if dd.spec_version.major < 1 {
            return Err(DescriptionError::UnsupportedVersion(dd.spec_version.major));
        }
        dd.origin = Some(origin);
        Ok(dd)
    }

    /// Resolves `path` against this description's base URL using standard
    /// RFC 3986 reference resolution. An absolute `path` comes back
    /// unchanged; a relative one resolves against `URLBase` when declared,
    /// else against the origin URL.
    pub fn build_url(&self, path: &str) -> Result<Url, DescriptionError> {
        let base = match self.url_base.as_deref().filter(|b| !b.is_empty()) {
            Some(b) => Url::parse(b)?,
            None => self.origin.clone().ok_or(DescriptionError::NoBaseUrl)?,
        };
        Ok(base.join(path)?)
    }

    /// See [`Device::device_by_type`]; the root device is included.
    pub fn device_by_type(&self, device_type: &str) -> Option<&Device> {
        self.device.device_by_type(device_type)
    }

    /// See [`Device::service_by_type`].
    pub fn service_by_type(&self, service_type: &str) -> Option<&Service> {
        self.device.service_by_type(service_type)
    }

    /// See [`Device::device_by_service`].
    pub fn device_by_service(&self, service_type: &str) -> Option<&Device> {
        self.device.device_by_service(service_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IGD_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" configId="9">
  <specVersion><major>1</major><minor>1</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>Test Router</friendlyName>
    <manufacturer>Acme</manufacturer>
    <modelName>AR-1000</modelName>
    <UDN>uuid:igd-root</UDN>
    <iconList>
      <icon>
        <mimetype>image/png</mimetype>
        <width>48</width>
        <height>48</height>
        <depth>24</depth>
        <url>/icons/device.png</url>
      </icon>
      <icon>
        <mimetype>image/jpeg</mimetype>
        <width>120</width>
        <height>120</height>
        <depth>24</depth>
        <url>/icons/device.jpg</url>
      </icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:L3Forwarding1</serviceId>
        <SCPDURL>/l3frwd.xml</SCPDURL>
        <controlURL>/ctl/L3F</controlURL>
        <eventSubURL>/evt/L3F</eventSubURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <friendlyName>WAN Device</friendlyName>
        <UDN>uuid:igd-wan</UDN>
        <serviceList>
          <service>
            <serviceType>urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1</serviceType>
            <serviceId>urn:upnp-org:serviceId:WANCommonIFC1</serviceId>
            <SCPDURL>/wancfg.xml</SCPDURL>
            <controlURL>/ctl/CmnIfCfg</controlURL>
            <eventSubURL>/evt/CmnIfCfg</eventSubURL>
          </service>
        </serviceList>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <friendlyName>WAN Connection Device</friendlyName>
            <UDN>uuid:igd-wanconn</UDN>
            <serviceList>
              <service>
                <serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType>
                <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
                <SCPDURL>/wanipc.xml</SCPDURL>
                <controlURL>/ctl/IPConn</controlURL>
                <eventSubURL>/evt/IPConn</eventSubURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
    <presentationURL>http://192.168.1.1/</presentationURL>
  </device>
</root>"#;

    fn origin() -> Url {
        Url::parse("http://192.168.1.1:49152/rootDesc.xml").unwrap()
    }

    fn parsed() -> DeviceDescription {
        DeviceDescription::parse(IGD_DESCRIPTION, origin()).unwrap()
    }

    #[test]
    fn parses_root_metadata() {
        let dd = parsed();
        assert_eq!(dd.config_id, 9);
        assert_eq!(dd.spec_version, SpecVersion { major: 1, minor: 1 });
        assert_eq!(dd.device.friendly_name, "Test Router");
        assert_eq!(dd.device.udn, "uuid:igd-root");
        assert_eq!(dd.device.manufacturer, "Acme");
        assert_eq!(dd.device.model_name, "AR-1000");
        assert_eq!(dd.device.presentation_url, "http://192.168.1.1/");
    }

    #[test]
    fn device_by_type_finds_nested_devices_pre_order() {
        let dd = parsed();

        // The root itself is part of the tree.
        let root = dd
            .device_by_type("urn:schemas-upnp-org:device:InternetGatewayDevice:1")
            .unwrap();
        assert_eq!(root.udn, "uuid:igd-root");

        let wan = dd
            .device_by_type("urn:schemas-upnp-org:device:WANDevice:1")
            .unwrap();
        assert_eq!(wan.udn, "uuid:igd-wan");

        let conn = dd
            .device_by_type("urn:schemas-upnp-org:device:WANConnectionDevice:1")
            .unwrap();
        assert_eq!(conn.udn, "uuid:igd-wanconn");

        assert!(dd.device_by_type("urn:nonexistent:device:Nope:1").is_none());
    }

    #[test]
    fn service_by_type_searches_whole_tree() {
        let dd = parsed();

        let svc = dd
            .service_by_type("urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1")
            .unwrap();
        assert_eq!(svc.control_url, "/ctl/CmnIfCfg");

        let deep = dd
            .service_by_type("urn:schemas-upnp-org:service:WANIPConnection:1")
            .unwrap();
        assert_eq!(deep.scpd_url, "/wanipc.xml");

        assert!(dd.service_by_type("urn:nonexistent:service:Nope:1").is_none());
    }

    #[test]
    fn device_by_service_returns_innermost_host() {
        let dd = parsed();

        let host = dd
            .device_by_service("urn:schemas-upnp-org:service:WANIPConnection:1")
            .unwrap();
        assert_eq!(host.udn, "uuid:igd-wanconn");

        let host = dd
            .device_by_service("urn:schemas-upnp-org:service:Layer3Forwarding:1")
            .unwrap();
        assert_eq!(host.udn, "uuid:igd-root");
    }

    #[test]
    fn icon_by_mimetype_scans_current_device_only() {
        let dd = parsed();
        let icon = dd.device.icon_by_mimetype("image/jpeg").unwrap();
        assert_eq!(icon.url, "/icons/device.jpg");
        assert_eq!(icon.width, 120);
        assert!(dd.device.icon_by_mimetype("image/gif").is_none());

        // Child devices have no icons of their own here.
        let wan = dd
            .device_by_type("urn:schemas-upnp-org:device:WANDevice:1")
            .unwrap();
        assert!(wan.icon_by_mimetype("image/png").is_none());
    }

    #[test]
    fn lookups_do_not_cache_across_descriptions() {
        // Two documents that only differ in the nested device's UDN; each
        // lookup must observe its own tree.
        let first = parsed();
        let other_xml = IGD_DESCRIPTION.replace("uuid:igd-wan", "uuid:other-wan");
        let second = DeviceDescription::parse(&other_xml, origin()).unwrap();

        let a = first
            .device_by_type("urn:schemas-upnp-org:device:WANDevice:1")
            .unwrap();
        let b = second
            .device_by_type("urn:schemas-upnp-org:device:WANDevice:1")
            .unwrap();
        assert_eq!(a.udn, "uuid:igd-wan");
        assert_eq!(b.udn, "uuid:other-wan");
    }

    #[test]
    fn build_url_resolves_relative_against_origin() {
        let dd = parsed();
        let url = dd.build_url("/ctl/CmnIfCfg").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.1:49152/ctl/CmnIfCfg");

        let relative = dd.build_url("wancfg.xml").unwrap();
        assert_eq!(relative.as_str(), "http://192.168.1.1:49152/wancfg.xml");
    }

    #[test]
    fn build_url_returns_absolute_urls_unchanged() {
        let dd = parsed();
        let url = dd.build_url("http://10.0.0.5:8080/other.xml").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/other.xml");
    }

    #[test]
    fn build_url_honors_url_base() {
        let xml = IGD_DESCRIPTION.replace(
            "<specVersion>",
            "<URLBase>http://192.168.1.1:5000/base/</URLBase><specVersion>",
        );
        let dd = DeviceDescription::parse(&xml, origin()).unwrap();
        let url = dd.build_url("scpd.xml").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.1:5000/base/scpd.xml");
    }

    #[test]
    fn empty_url_base_falls_back_to_origin() {
        let xml = IGD_DESCRIPTION.replace("<specVersion>", "<URLBase></URLBase><specVersion>");
        let dd = DeviceDescription::parse(&xml, origin()).unwrap();
        let url = dd.build_url("scpd.xml").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.1:49152/scpd.xml");
    }

    #[test]
    fn rejects_unsupported_major_version() {
        let xml = IGD_DESCRIPTION.replace(
            "<major>1</major><minor>1</minor>",
            "<major>0</major><minor>9</minor>",
        );
        let err = DeviceDescription::parse(&xml, origin()).unwrap_err();
        assert!(matches!(err, DescriptionError::UnsupportedVersion(0)));
    }
}
