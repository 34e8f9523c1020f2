//! Credential record types and field validation.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::error::{Result, StoreError};

/// Maximum length of the account label, in characters.
pub const MAX_USERNAME_LEN: usize = 255;
/// Maximum length of the secret value, in characters.
pub const MAX_PASSWORD_LEN: usize = 500;
/// Maximum length of the site reference, in characters.
pub const MAX_WEBSITE_LEN: usize = 500;

/// A stored credential.
///
/// `id`, `created_at` and `updated_at` are assigned by the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: String,
    pub username: String,
    pub password: String,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("website", &self.website)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields supplied by the caller when creating a credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCredential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub website: Option<String>,
}

impl std::fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCredential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("website", &self.website)
            .finish()
    }
}

impl NewCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            website: None,
        }
    }

    #[must_use]
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_website(self.website.as_deref())
    }
}

/// Partial update. `None` leaves a field untouched.
///
/// `website` is tri-state: `None` keeps it, `Some(None)` clears it,
/// `Some(Some(_))` replaces it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, with = "tri_state")]
    pub website: Option<Option<String>>,
}

impl std::fmt::Debug for CredentialPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPatch")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("website", &self.website)
            .finish()
    }
}

impl CredentialPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        if let Some(website) = &self.website {
            validate_website(website.as_deref())?;
        }
        Ok(())
    }

    /// Whether the patch changes no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.website.is_none()
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(StoreError::invalid_field("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(StoreError::invalid_field(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(StoreError::invalid_field("Password cannot be empty"));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(StoreError::invalid_field(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_website(website: Option<&str>) -> Result<()> {
    if let Some(website) = website
        && website.chars().count() > MAX_WEBSITE_LEN
    {
        return Err(StoreError::invalid_field(format!(
            "Website must be at most {MAX_WEBSITE_LEN} characters"
        )));
    }
    Ok(())
}

/// Distinguishes an absent `website` key from an explicit `null`.
mod tri_state {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Option<String>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<String>>, D::Error> {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
