//! Which policy annotation formats a team project honours.

use serde::{Deserialize, Serialize};

use super::xml;
use crate::errors::PolicyParseError;

/// Compatibility flags of one team project.
///
/// `team_explorer` enables the stateless annotation format, `teamprise`
/// the stateful one. `non_installed` turns a policy without a local
/// implementation into a failure instead of silently skipping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoliciesCompatibility {
    #[serde(default = "default_true")]
    pub team_explorer: bool,
    #[serde(default = "default_true")]
    pub teamprise: bool,
    #[serde(default)]
    pub non_installed: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PoliciesCompatibility {
    fn default() -> Self {
        Self {
            team_explorer: true,
            teamprise: true,
            non_installed: false,
        }
    }
}

impl PoliciesCompatibility {
    pub fn new(team_explorer: bool, teamprise: bool, non_installed: bool) -> Self {
        Self {
            team_explorer,
            teamprise,
            non_installed,
        }
    }

    /// Whether any policy format is enabled.
    pub fn evaluation_enabled(&self) -> bool {
        self.team_explorer || self.teamprise
    }

    /// Parse the value of an overrides annotation:
    ///
    /// ```xml
    /// <overrides>
    ///   <compatibility teamExplorer="true" teamprise="false" nonInstalled="true"/>
    /// </overrides>
    /// ```
    ///
    /// An absent attribute reads as `false`.
    pub fn from_overrides_annotation_value(value: &str) -> Result<Self, PolicyParseError> {
        let root = xml::root(value, "overrides")
            .ok_or_else(|| PolicyParseError::MissingRoot("overrides".into()))?;
        let compatibility = root
            .child("compatibility")
            .ok_or_else(|| PolicyParseError::MissingField("compatibility".into()))?;

        let flag = |name: &str| -> Result<bool, PolicyParseError> {
            match compatibility.attr(name) {
                None => Ok(false),
                Some(raw) => parse_bool(name, &raw),
            }
        };

        Ok(Self {
            team_explorer: flag("teamExplorer")?,
            teamprise: flag("teamprise")?,
            non_installed: flag("nonInstalled")?,
        })
    }

    /// Serialize back into the overrides annotation format.
    pub fn to_overrides_annotation_value(&self) -> String {
        format!(
            r#"<overrides><compatibility teamExplorer="{}" teamprise="{}" nonInstalled="{}"/></overrides>"#,
            self.team_explorer, self.teamprise, self.non_installed
        )
    }
}

pub(crate) fn parse_bool(field: &str, raw: &str) -> Result<bool, PolicyParseError> {
    match raw.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(PolicyParseError::InvalidValue {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let compat = PoliciesCompatibility::default();
        assert!(compat.team_explorer);
        assert!(compat.teamprise);
        assert!(!compat.non_installed);
        assert!(compat.evaluation_enabled());
        assert!(!PoliciesCompatibility::new(false, false, true).evaluation_enabled());
    }

    #[test]
    fn test_parse_overrides() {
        let value = r#"<?xml version="1.0"?>
            <overrides>
              <compatibility teamExplorer="false" teamprise="TRUE" nonInstalled="true" />
            </overrides>"#;
        let compat = PoliciesCompatibility::from_overrides_annotation_value(value).unwrap();
        assert_eq!(compat, PoliciesCompatibility::new(false, true, true));
    }

    #[test]
    fn test_missing_attribute_is_false() {
        let value = r#"<overrides><compatibility teamprise="true"/></overrides>"#;
        let compat = PoliciesCompatibility::from_overrides_annotation_value(value).unwrap();
        assert_eq!(compat, PoliciesCompatibility::new(false, true, false));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            PoliciesCompatibility::from_overrides_annotation_value("garbage"),
            Err(PolicyParseError::MissingRoot("overrides".into()))
        );
        assert_eq!(
            PoliciesCompatibility::from_overrides_annotation_value("<overrides></overrides>"),
            Err(PolicyParseError::MissingField("compatibility".into()))
        );
        assert!(matches!(
            PoliciesCompatibility::from_overrides_annotation_value(
                r#"<overrides><compatibility teamExplorer="yes"/></overrides>"#
            ),
            Err(PolicyParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_annotation_value_roundtrip() {
        let compat = PoliciesCompatibility::new(true, false, true);
        let parsed =
            PoliciesCompatibility::from_overrides_annotation_value(&compat.to_overrides_annotation_value())
                .unwrap();
        assert_eq!(parsed, compat);
    }

    #[test]
    fn test_toml_defaults() {
        let compat: PoliciesCompatibility = toml::from_str("non_installed = true").unwrap();
        assert_eq!(compat, PoliciesCompatibility::new(true, true, true));
    }
}
