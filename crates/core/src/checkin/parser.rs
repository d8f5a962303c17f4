//! Parsers for policy definition annotations.
//!
//! Stateless definitions (Team Explorer format):
//!
//! ```xml
//! <policy-definitions>
//!   <policy-definition enabled="true">
//!     <policy-type id="..." name="..." short-description="..." installation-instructions="..."/>
//!   </policy-definition>
//! </policy-definitions>
//! ```
//!
//! Stateful definitions (Teamprise format) carry a configuration element
//! whose inner XML is handed to the policy untouched:
//!
//! ```xml
//! <policy-annotation version="1">
//!   <policy-definition enabled="true">
//!     <policy-type id="..." name="..."/>
//!     <configuration>...</configuration>
//!   </policy-definition>
//! </policy-annotation>
//! ```

use tracing::debug;

use super::compat::parse_bool;
use super::policy::{PolicyDescriptor, PolicyType};
use super::xml::{self, Element};
use crate::errors::PolicyParseError;

const STATEFUL_VERSION: &str = "1";

pub fn parse_stateless_descriptors(value: &str) -> Result<Vec<PolicyDescriptor>, PolicyParseError> {
    let root = xml::root(value, "policy-definitions")
        .ok_or_else(|| PolicyParseError::MissingRoot("policy-definitions".into()))?;

    let descriptors = root
        .children("policy-definition")
        .iter()
        .map(|definition| {
            let (policy_type, enabled) = parse_definition(definition)?;
            Ok(PolicyDescriptor::stateless(policy_type, enabled))
        })
        .collect::<Result<Vec<_>, PolicyParseError>>()?;
    debug!(count = descriptors.len(), "parsed stateless policy definitions");
    Ok(descriptors)
}

pub fn parse_stateful_descriptors(value: &str) -> Result<Vec<PolicyDescriptor>, PolicyParseError> {
    let root = xml::root(value, "policy-annotation")
        .ok_or_else(|| PolicyParseError::MissingRoot("policy-annotation".into()))?;
    match root.attr("version") {
        Some(version) if version.trim() == STATEFUL_VERSION => {}
        Some(version) => {
            return Err(PolicyParseError::InvalidValue {
                field: "policy-annotation version".into(),
                value: version,
            })
        }
        None => return Err(PolicyParseError::MissingField("policy-annotation version".into())),
    }

    let descriptors = root
        .children("policy-definition")
        .iter()
        .map(|definition| {
            let (policy_type, enabled) = parse_definition(definition)?;
            let configuration = definition
                .child("configuration")
                .map(|c| c.body.trim().to_string())
                .unwrap_or_default();
            Ok(PolicyDescriptor::stateful(policy_type, enabled, configuration))
        })
        .collect::<Result<Vec<_>, PolicyParseError>>()?;
    debug!(count = descriptors.len(), "parsed stateful policy definitions");
    Ok(descriptors)
}

/// Policy type and enabled flag of one `<policy-definition>`. A missing
/// `enabled` attribute means enabled.
fn parse_definition(definition: &Element<'_>) -> Result<(PolicyType, bool), PolicyParseError> {
    let enabled = match definition.attr("enabled") {
        Some(raw) => parse_bool("enabled", &raw)?,
        None => true,
    };
    let type_element = definition
        .child("policy-type")
        .ok_or_else(|| PolicyParseError::MissingField("policy-type".into()))?;
    let id = type_element
        .attr("id")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PolicyParseError::MissingField("policy-type id".into()))?;
    let name = type_element
        .attr("name")
        .ok_or_else(|| PolicyParseError::MissingField("policy-type name".into()))?;

    let policy_type = PolicyType {
        id,
        name,
        short_description: type_element.attr("short-description").unwrap_or_default(),
        installation_instructions: type_element
            .attr("installation-instructions")
            .unwrap_or_default(),
    };
    Ok((policy_type, enabled))
}
