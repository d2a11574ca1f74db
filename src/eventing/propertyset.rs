//! Parsing of the GENA `propertyset` body.
//!
//! The wire shape is `<e:propertyset><e:property><Var>value</Var>
//! </e:property>…</e:propertyset>`: one variable per `property` element,
//! the variable's local name carrying the property name. Order matters to
//! consumers diffing successive events, so the result is an ordered list
//! rather than a hash map.

use quick_xml::escape::unescape;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

use super::GenaError;

/// An ordered set of evented properties: `(name, value)` pairs in document
/// order, with map-style lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: Vec<(String, String)>,
}

impl PropertySet {
    /// The value of the first property with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All properties in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }
}

impl FromIterator<(String, String)> for PropertySet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = (&'a str, &'a str);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a str)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Parses a `propertyset` document into an ordered [`PropertySet`].
///
/// Fails with [`GenaError::Decode`] on malformed XML or when the root
/// element is not a `propertyset`; an empty-but-valid propertyset yields an
/// empty set.
pub fn parse_property_set(xml: &str) -> Result<PropertySet, GenaError> {
    let decode = |e: quick_xml::Error| GenaError::Decode(e.to_string());
    let mut reader = Reader::from_str(xml);
    let mut props = PropertySet::default();

    // Find the propertyset root, skipping the XML declaration and
    // whitespace.
    loop {
        match reader.read_event().map_err(decode)? {
            XmlEvent::Start(e) if e.local_name().as_ref() == b"propertyset" => break,
            XmlEvent::Empty(e) if e.local_name().as_ref() == b"propertyset" => {
                return Ok(props);
            }
            XmlEvent::Decl(_) | XmlEvent::Comment(_) | XmlEvent::DocType(_) => {}
            XmlEvent::Text(t) if t.unescape().map(|s| s.trim().is_empty()).unwrap_or(false) => {}
            XmlEvent::Eof => return Err(GenaError::Decode("no propertyset element".to_string())),
            other => {
                return Err(GenaError::Decode(format!(
                    "unexpected content before propertyset: {other:?}"
                )))
            }
        }
    }

    let mut in_property = false;
    loop {
        match reader.read_event().map_err(decode)? {
            XmlEvent::Start(e) if !in_property && e.local_name().as_ref() == b"property" => {
                in_property = true;
            }
            XmlEvent::End(e) if in_property && e.local_name().as_ref() == b"property" => {
                in_property = false;
            }
            XmlEvent::Start(e) if in_property => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let end = e.to_end().into_owned();
                let raw = reader.read_text(end.name()).map_err(decode)?;
                let value = unescape(&raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.into_owned());
                props.push(name, value);
            }
            XmlEvent::Empty(e) if in_property => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                props.push(name, String::new());
            }
            XmlEvent::End(e) if e.local_name().as_ref() == b"propertyset" => break,
            XmlEvent::Eof => {
                return Err(GenaError::Decode(
                    "truncated propertyset document".to_string(),
                ))
            }
            _ => {}
        }
    }

    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_property() {
        let xml = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Status>ON</Status></e:property>
</e:propertyset>"#;

        let props = parse_property_set(xml).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("Status"), Some("ON"));
    }

    #[test]
    fn preserves_document_order() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Zeta>1</Zeta></e:property>
  <e:property><Alpha>2</Alpha></e:property>
  <e:property><Mu>3</Mu></e:property>
</e:propertyset>"#;

        let props = parse_property_set(xml).unwrap();
        let names: Vec<_> = props.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mu"]);
    }

    #[test]
    fn one_property_element_per_variable_and_multiple_vars_tolerated() {
        // Devices are supposed to wrap each variable in its own property
        // element, but two variables in one property still both decode.
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><A>1</A><B>2</B></e:property>
</e:propertyset>"#;

        let props = parse_property_set(xml).unwrap();
        assert_eq!(props.get("A"), Some("1"));
        assert_eq!(props.get("B"), Some("2"));
    }

    #[test]
    fn unescapes_entity_encoded_values() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><LastChange>&lt;Event val=&quot;x&quot;/&gt;</LastChange></e:property>
</e:propertyset>"#;

        let props = parse_property_set(xml).unwrap();
        assert_eq!(props.get("LastChange"), Some(r#"<Event val="x"/>"#));
    }

    #[test]
    fn empty_variable_element_yields_empty_value() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Status/></e:property>
</e:propertyset>"#;

        let props = parse_property_set(xml).unwrap();
        assert_eq!(props.get("Status"), Some(""));
    }

    #[test]
    fn empty_propertyset_is_valid_and_empty() {
        let props = parse_property_set(
            r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"></e:propertyset>"#,
        )
        .unwrap();
        assert!(props.is_empty());

        let props =
            parse_property_set(r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"/>"#)
                .unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(parse_property_set("").is_err());
        assert!(parse_property_set("not xml at all").is_err());
        assert!(parse_property_set("<other><thing/></other>").is_err());
        assert!(parse_property_set(
            r#"<e:propertyset xmlns:e="u"><e:property><A>1</A>"#
        )
        .is_err());

        let err = parse_property_set("<other/>").unwrap_err();
        assert!(matches!(err, GenaError::Decode(_)));
    }
}
