//! Raw job payload as accepted by the submission endpoint and carried in
//! queue message bodies

use serde::{Deserialize, Serialize};

use super::reference::ObjectRef;
use crate::error::{Result, ZipperError};

/// Canned ACL applied to the uploaded archive when none is given.
pub const DEFAULT_ACL: &str = "private";

/// Storage class applied to the uploaded archive when none is given.
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Object-store credentials supplied by the submitter.
///
/// `Debug` never prints the secret and masks most of the access key id.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub region: String,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Access key id with everything but the last four characters masked.
    pub fn masked_access_key_id(&self) -> String {
        let visible: String = self
            .access_key_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }

    fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(ZipperError::malformed("credentials.accessKeyId missing"));
        }
        if self.secret_access_key.trim().is_empty() {
            return Err(ZipperError::malformed("credentials.secretAccessKey missing"));
        }
        if self.region.trim().is_empty() {
            return Err(ZipperError::malformed("credentials.region missing"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.masked_access_key_id())
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// One entry of the payload's `notifications` list.
///
/// Only `type` is interpreted here; the remaining fields belong to the
/// handler registered for that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl NotificationSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// String field lookup, `None` when absent or not a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Job payload exactly as submitted.
///
/// `keys` and `destinationKey` are accepted as aliases of `files` and
/// `destination`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default, alias = "keys")]
    pub files: Vec<String>,
    #[serde(default, alias = "destinationKey")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationSpec>,
}

impl JobPayload {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Check required fields and reference syntax without touching the network.
    pub fn validate(&self) -> Result<()> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ZipperError::malformed("credentials missing"))?
            .validate()?;

        if self.files.is_empty() {
            return Err(ZipperError::malformed("files missing"));
        }

        let destination = self.destination.as_deref().unwrap_or("").trim();
        if destination.is_empty() {
            return Err(ZipperError::malformed("destination missing"));
        }

        for file in &self.files {
            ObjectRef::parse(file)?;
        }
        ObjectRef::parse(destination)?;

        Ok(())
    }
}
