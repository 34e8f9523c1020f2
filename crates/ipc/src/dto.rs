//! Request payloads and reply shapes.

use {
    chrono::SecondsFormat,
    passvault_store::{CredentialPatch, CredentialRecord},
    serde::{Deserialize, Serialize},
    zeroize::Zeroizing,
};

/// Reply to the lifecycle channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LifecycleReply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Reply to a credential or status channel that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

/// Build and runtime facts for the UI's about screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub version: String,
    /// Id of the key protector sealing the vault config.
    pub key_protection: String,
    /// True when the config is sealed with the built-in development key.
    pub is_development_env: bool,
}

/// A credential as the UI sees it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDto {
    pub id: String,
    pub username: String,
    pub password: String,
    pub website: Option<String>,
    /// RFC 3339, millisecond precision, UTC.
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for CredentialDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDto")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("website", &self.website)
            .finish_non_exhaustive()
    }
}

impl From<CredentialRecord> for CredentialDto {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            password: record.password,
            website: record.website,
            created_at: record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: record
                .updated_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Master passphrase payload: `{ "password": "..." }` or a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum PassphrasePayload {
    Bare(String),
    Object { password: String },
}

impl PassphrasePayload {
    pub(crate) fn into_secret(self) -> Zeroizing<String> {
        match self {
            Self::Bare(password) | Self::Object { password } => Zeroizing::new(password),
        }
    }
}

/// Record id payload: `{ "id": "..." }` or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdPayload {
    Bare(String),
    Object { id: String },
}

impl IdPayload {
    pub(crate) fn into_id(self) -> String {
        match self {
            Self::Bare(id) | Self::Object { id } => id,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdatePayload {
    pub(crate) id: String,
    #[serde(flatten)]
    pub(crate) patch: CredentialPatch,
}

/// Ids are hyphenated UUIDs, case-insensitive.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 36 && uuid::Uuid::parse_str(id).is_ok()
}
