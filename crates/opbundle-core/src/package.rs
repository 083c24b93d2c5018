//! Operator package (`<name>.package.yaml`)

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::merge::{deep_merged, merge_by_key};

/// A named update channel pointing at a CSV
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub name: String,
    #[serde(rename = "currentCSV", default)]
    pub current_csv: String,
}

/// Package manifest listing the channels of an operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPackage {
    #[serde(default)]
    pub package_name: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
}

impl OperatorPackage {
    /// Parse a package from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_value(value: &JsonValue) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    /// Fold an uploaded package document into this one
    ///
    /// Fields are deep merged; channels are merged by name.
    pub fn merge(&self, uploaded: &JsonValue) -> Result<Self> {
        let current = self.to_value()?;
        let mut merged = deep_merged(&current, uploaded);

        let channels = merge_by_key(
            current.get("channels").unwrap_or(&JsonValue::Null),
            uploaded.get("channels").unwrap_or(&JsonValue::Null),
            "name",
            None,
        );
        match &mut merged {
            JsonValue::Object(map) => {
                map.insert("channels".to_string(), channels);
            }
            _ => {
                return Err(CoreError::InvalidDocument {
                    message: "package must be a mapping".to_string(),
                });
            }
        }

        Self::from_value(&merged)
    }

    /// Point the default channel at the exported CSV
    ///
    /// The channel named by `defaultChannel`, or `fallback_channel` when
    /// none is set, is created when missing.
    pub fn with_current_csv(&self, csv_name: &str, fallback_channel: &str) -> Self {
        let mut next = self.clone();
        let channel_name = next
            .default_channel
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| fallback_channel.to_string());

        match next.channels.iter_mut().find(|c| c.name == channel_name) {
            Some(channel) => channel.current_csv = csv_name.to_string(),
            None => next.channels.push(Channel {
                name: channel_name.clone(),
                current_csv: csv_name.to_string(),
            }),
        }
        next.default_channel = Some(channel_name);
        next
    }

    /// File name of the exported package
    pub fn file_name(&self) -> String {
        format!("{}.package.yaml", self.package_name)
    }
}
