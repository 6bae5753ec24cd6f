//! Data-source instance settings
//!
//! Read once per instance from the host's settings JSON. The base path and
//! credential pair are opaque here: they only identify the backend to the
//! transport.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Port the relay backend listens on
pub const RELAY_PORT: u16 = 4222;

/// Non-secret options (`jsonData`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DataSourceOptions {
    /// Backend base path (host name of the relay service)
    #[serde(default)]
    pub path: Option<String>,
}

/// Secret options (`secureJsonData`, already decrypted by the host)
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecureSettings {
    /// Project API key
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
    /// Project secret
    #[serde(rename = "secretKey", default)]
    pub secret_key: Option<String>,
}

impl SecureSettings {
    /// Whether both halves of the credential pair are present
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.api_key) && present(&self.secret_key)
    }
}

impl std::fmt::Debug for SecureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SecureSettings")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

/// Settings for one data-source instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataSourceSettings {
    /// Instance identifier, used as the channel namespace
    pub uid: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Non-secret options
    #[serde(rename = "jsonData", default)]
    pub options: DataSourceOptions,

    /// Secret options
    #[serde(rename = "secureJsonData", default)]
    pub secure: SecureSettings,
}

impl DataSourceSettings {
    /// Create settings from parts
    pub fn new(uid: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: String::new(),
            options: DataSourceOptions {
                path: Some(path.into()),
            },
            secure: SecureSettings::default(),
        }
    }

    /// Attach the credential pair
    pub fn with_credentials(mut self, api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.secure = SecureSettings {
            api_key: Some(api_key.into()),
            secret_key: Some(secret_key.into()),
        };
        self
    }

    /// Parse and validate settings JSON
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let settings: DataSourceSettings = serde_json::from_slice(json)?;
        settings.validate()?;

        tracing::debug!(uid = %settings.uid, settings = ?settings, "Loaded data source settings");
        Ok(settings)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.uid.trim().is_empty() {
            return Err(Error::Config("data source uid is empty".into()));
        }
        if self.path().is_empty() {
            return Err(Error::Config("backend path is not configured".into()));
        }
        Ok(())
    }

    /// Backend base path, empty if unset
    pub fn path(&self) -> &str {
        self.options.path.as_deref().map_or("", str::trim)
    }

    /// Relay endpoint URL derived from the base path
    pub fn endpoint(&self) -> String {
        format!("nats://{}:{}", self.path(), RELAY_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &[u8] = br#"{
        "uid": "ds-42",
        "name": "Relay",
        "jsonData": {"path": "relay.example.com"},
        "secureJsonData": {"apiKey": "jwt-token", "secretKey": "seed"}
    }"#;

    #[test]
    fn test_from_json() {
        let settings = DataSourceSettings::from_json(JSON).unwrap();

        assert_eq!(settings.uid, "ds-42");
        assert_eq!(settings.path(), "relay.example.com");
        assert_eq!(settings.endpoint(), "nats://relay.example.com:4222");
        assert!(settings.secure.is_complete());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = DataSourceSettings::from_json(JSON).unwrap();
        let debug = format!("{:?}", settings);

        assert!(!debug.contains("jwt-token"));
        assert!(!debug.contains("seed"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_missing_path() {
        let result = DataSourceSettings::from_json(br#"{"uid": "ds-1"}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_uid() {
        let result = DataSourceSettings::from_json(br#"{"uid": " ", "jsonData": {"path": "h"}}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            DataSourceSettings::from_json(b"{"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_incomplete_credentials() {
        let settings = DataSourceSettings::new("ds", "h");
        assert!(!settings.secure.is_complete());

        let settings = settings.with_credentials("key", "");
        assert!(!settings.secure.is_complete());
    }
}
