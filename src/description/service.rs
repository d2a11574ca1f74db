//! The SCPD (Service Control Protocol Description) document: the actions a
//! service offers and the state variables backing them.
//!
//! As with device descriptions, vendor extras are ignored when
//! unmarshalling.

use serde::Deserialize;

use super::device::SpecVersion;
use super::DescriptionError;

/// Direction of a SOAP action argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    In,
    Out,
    /// Anything the device made up; tolerated rather than failing the
    /// whole document.
    Unknown,
}

impl<'de> serde::Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(match text.trim() {
            t if t.eq_ignore_ascii_case("in") => Direction::In,
            t if t.eq_ignore_ascii_case("out") => Direction::Out,
            _ => Direction::Unknown,
        })
    }
}

/// One argument of an action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    /// Name of the state variable this argument mirrors.
    #[serde(rename = "relatedStateVariable", default)]
    pub related_state_variable: String,
    #[serde(rename = "retval", default)]
    retval: Option<String>,
}

impl Argument {
    /// Whether the document marks this argument as the action's return
    /// value (the bare `<retval/>` element).
    pub fn is_retval(&self) -> bool {
        self.retval.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArgumentList {
    #[serde(rename = "argument", default)]
    pub argument: Vec<Argument>,
}

/// An action the service exposes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "argumentList", default)]
    argument_list: ArgumentList,
}

impl Action {
    /// Arguments in document order.
    pub fn arguments(&self) -> &[Argument] {
        &self.argument_list.argument
    }
}

/// An allowed numeric range for a state variable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowedValueRange {
    #[serde(default)]
    pub minimum: String,
    #[serde(default)]
    pub maximum: String,
    #[serde(default)]
    pub step: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowedValueList {
    #[serde(rename = "allowedValue", default)]
    pub allowed_value: Vec<String>,
}

/// One row of the service state table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateVariable {
    /// `sendEvents` attribute: `"yes"` (the default on the wire) when
    /// changes to this variable are evented.
    #[serde(rename = "@sendEvents", default)]
    pub send_events: String,
    /// `multicast` attribute (UPnP 1.1+).
    #[serde(rename = "@multicast", default)]
    pub multicast: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "dataType", default)]
    pub data_type: String,
    #[serde(rename = "defaultValue", default)]
    pub default_value: String,
    #[serde(rename = "allowedValueRange", default)]
    pub allowed_value_range: Option<AllowedValueRange>,
    #[serde(rename = "allowedValueList", default)]
    allowed_value_list: AllowedValueList,
}

impl StateVariable {
    /// The allowed-value enumeration, empty when the document declares none.
    pub fn allowed_values(&self) -> &[String] {
        &self.allowed_value_list.allowed_value
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionList {
    #[serde(rename = "action", default)]
    pub action: Vec<Action>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceStateTable {
    #[serde(rename = "stateVariable", default)]
    pub state_variable: Vec<StateVariable>,
}

/// The root of an SCPD document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceDescription {
    #[serde(rename = "@configId", default)]
    pub config_id: u32,
    #[serde(rename = "specVersion", default)]
    pub spec_version: SpecVersion,
    #[serde(rename = "actionList", default)]
    action_list: ActionList,
    #[serde(rename = "serviceStateTable", default)]
    service_state_table: ServiceStateTable,
}

impl ServiceDescription {
    /// Unmarshals an SCPD document.
    pub fn parse(xml: &str) -> Result<Self, DescriptionError> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    /// The service's actions.
    pub fn actions(&self) -> &[Action] {
        &self.action_list.action
    }

    /// The service state table.
    pub fn state_variables(&self) -> &[StateVariable] {
        &self.service_state_table.state_variable
    }

    /// Finds an action by name.
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions().iter().find(|a| a.name == name)
    }

    /// Finds a state variable by name.
    pub fn state_variable(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables().iter().find(|v| v.name == name)
    }
}
