//! Widget configuration: the room to join and how to display it.
//!
//! Hosts hand configuration over as two string attributes. A missing room id
//! is not rejected here; the chart routes it to its `Failed` state. An
//! unrecognised display mode is logged and replaced by the default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const ROOM_ID_ATTRIBUTE: &str = "room-id";
pub const MODE_ATTRIBUTE: &str = "mode";
pub const ROOM_ID_ENV: &str = "CHAT_WIDGET_ROOM_ID";
pub const MODE_ENV: &str = "CHAT_WIDGET_MODE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid widget configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Unknown display mode '{0}'")]
pub struct UnknownMode(pub String);

/// How the widget is presented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum DisplayMode {
    #[default]
    Normal,
    /// No attachments and no audio recording.
    TextOnly,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::TextOnly => "text-only",
        }
    }

    /// Parse `value`, falling back to [`DisplayMode::Normal`] with a warning.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|err: UnknownMode| {
            warn!(error = %err, fallback = Self::Normal.as_str(), "Ignoring display mode");
            Self::Normal
        })
    }
}

impl FromStr for DisplayMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(Self::Normal),
            "text-only" => Ok(Self::TextOnly),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl From<String> for DisplayMode {
    fn from(value: String) -> Self {
        Self::parse_or_default(&value)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads named string attributes from the embedding page.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for [(&str, &str)] {
    fn attribute(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub mode: DisplayMode,
}

impl WidgetConfig {
    pub fn new(room_id: impl Into<String>, mode: DisplayMode) -> Self {
        Self {
            room_id: Some(room_id.into()),
            mode,
        }
    }

    pub fn from_attributes<A: AttributeSource + ?Sized>(source: &A) -> Self {
        Self {
            room_id: source.attribute(ROOM_ID_ATTRIBUTE),
            mode: source
                .attribute(MODE_ATTRIBUTE)
                .map(|mode| DisplayMode::parse_or_default(&mode))
                .unwrap_or_default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Configuration from `CHAT_WIDGET_ROOM_ID` and `CHAT_WIDGET_MODE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(room_id) = std::env::var(ROOM_ID_ENV) {
            self.room_id = Some(room_id);
        }
        if let Ok(mode) = std::env::var(MODE_ENV) {
            self.mode = DisplayMode::parse_or_default(&mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_read_by_name() {
        let attributes = [(ROOM_ID_ATTRIBUTE, "r1"), (MODE_ATTRIBUTE, "text-only")];

        let config = WidgetConfig::from_attributes(&attributes[..]);

        assert_eq!(config, WidgetConfig::new("r1", DisplayMode::TextOnly));
    }

    #[test]
    fn unknown_mode_falls_back_to_normal() {
        let attributes: HashMap<String, String> = [
            (ROOM_ID_ATTRIBUTE.to_string(), "r1".to_string()),
            (MODE_ATTRIBUTE.to_string(), "fullscreen".to_string()),
        ]
        .into_iter()
        .collect();

        let config = WidgetConfig::from_attributes(&attributes);

        assert_eq!(config.mode, DisplayMode::Normal);
        assert_eq!("fullscreen".parse::<DisplayMode>(), Err(UnknownMode("fullscreen".into())));
    }

    #[test]
    fn missing_attributes_are_not_an_error() {
        let none: [(&str, &str); 0] = [];

        let config = WidgetConfig::from_attributes(&none[..]);

        assert_eq!(config.room_id, None);
        assert_eq!(config.mode, DisplayMode::Normal);
    }

    #[test]
    fn json_uses_kebab_case_modes_with_fallback() {
        let config = WidgetConfig::from_json(r#"{"room_id": "r1", "mode": "text-only"}"#).unwrap();
        assert_eq!(config.mode, DisplayMode::TextOnly);

        let config = WidgetConfig::from_json(r#"{"room_id": "r1", "mode": "sideways"}"#).unwrap();
        assert_eq!(config.mode, DisplayMode::Normal);

        let json = serde_json::to_string(&WidgetConfig::new("r1", DisplayMode::TextOnly)).unwrap();
        assert_eq!(json, r#"{"room_id":"r1","mode":"text-only"}"#);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            WidgetConfig::from_json("{room_id"),
            Err(ConfigError::Json(_))
        ));
    }
}
