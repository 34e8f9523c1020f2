//! Maps a channel name and JSON payload to a vault call and a JSON reply.

use std::sync::Arc;

use {
    passvault_store::NewCredential,
    passvault_vault::{DevelopmentKey, Vault, VaultError},
    serde::de::DeserializeOwned,
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::{
    channels::Channel,
    dto::{
        AppMetadata, CredentialDto, ErrorReply, IdPayload, LifecycleReply, PassphrasePayload,
        UpdatePayload, is_valid_id,
    },
    generator::{self, GeneratorOptions},
};

const INVALID_ID: &str = "Invalid password ID format";

/// A failure that becomes an error reply.
#[derive(Debug)]
enum Failure {
    /// Shown to the user as-is.
    Message(String),
    Vault(VaultError),
}

impl Failure {
    fn into_message(self) -> String {
        match self {
            Self::Message(message) => message,
            Self::Vault(err) => err.user_message(),
        }
    }
}

impl From<VaultError> for Failure {
    fn from(err: VaultError) -> Self {
        Self::Vault(err)
    }
}

type Outcome = Result<Value, Failure>;

/// Serves the channel contract on top of a shared [`Vault`].
#[derive(Clone)]
pub struct Dispatcher {
    vault: Arc<Vault>,
}

impl Dispatcher {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }

    #[must_use]
    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    /// Handle one request. Never fails: errors become error replies.
    pub async fn dispatch(&self, channel: &str, payload: Value) -> Value {
        let Some(channel) = Channel::parse(channel) else {
            warn!(channel, "unknown ipc channel");
            return error_reply(format!("Unknown channel: {channel}"));
        };
        debug!(%channel, "ipc request");

        let outcome = match channel {
            Channel::InitializeWithPassword => self.initialize(payload).await,
            Channel::VerifyPassword => self.verify(payload).await,
            Channel::IsInitialized => self
                .vault
                .is_initialized()
                .map(Value::Bool)
                .map_err(Failure::from),
            Channel::IsConnected => Ok(Value::Bool(self.vault.is_unlocked().await)),
            Channel::Lock => {
                self.vault.lock().await;
                to_value(LifecycleReply::ok())
            },
            Channel::GetAll => self.get_all().await,
            Channel::GetById => self.get_by_id(payload).await,
            Channel::Create => self.create(payload).await,
            Channel::Update => self.update(payload).await,
            Channel::Delete => self.delete(payload).await,
            Channel::Generate => generate(payload),
            Channel::GetMetadata => self.metadata(),
        };

        match outcome {
            Ok(value) => value,
            Err(failure) => {
                let message = failure.into_message();
                debug!(%channel, error = %message, "ipc request failed");
                if channel.is_lifecycle() {
                    json!(LifecycleReply::failed(message))
                } else {
                    error_reply(message)
                }
            },
        }
    }

    async fn initialize(&self, payload: Value) -> Outcome {
        let secret = parse::<PassphrasePayload>(payload)?.into_secret();
        self.vault.initialize(&secret).await?;
        to_value(LifecycleReply::ok())
    }

    async fn verify(&self, payload: Value) -> Outcome {
        let secret = parse::<PassphrasePayload>(payload)?.into_secret();
        self.vault.unlock(&secret).await?;
        to_value(LifecycleReply::ok())
    }

    fn metadata(&self) -> Outcome {
        let key_protection = self.vault.key_protection();
        to_value(AppMetadata {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            key_protection: key_protection.to_owned(),
            is_development_env: key_protection == DevelopmentKey::ID,
        })
    }

    async fn get_all(&self) -> Outcome {
        let records = self.vault.list_credentials().await?;
        to_value(
            records
                .into_iter()
                .map(CredentialDto::from)
                .collect::<Vec<_>>(),
        )
    }

    async fn get_by_id(&self, payload: Value) -> Outcome {
        let id = valid_id(payload)?;
        let record = self.vault.get_credential(&id).await?;
        to_value(record.map(CredentialDto::from))
    }

    async fn create(&self, payload: Value) -> Outcome {
        let input: NewCredential = parse(payload)?;
        input.validate().map_err(|e| Failure::Message(e.to_string()))?;
        let record = self.vault.create_credential(input).await?;
        to_value(CredentialDto::from(record))
    }

    async fn update(&self, payload: Value) -> Outcome {
        let UpdatePayload { id, patch } = parse(payload)?;
        if !is_valid_id(&id) {
            return Err(Failure::Message(INVALID_ID.into()));
        }
        patch.validate().map_err(|e| Failure::Message(e.to_string()))?;
        let record = self.vault.update_credential(&id, patch).await?;
        to_value(record.map(CredentialDto::from))
    }

    async fn delete(&self, payload: Value) -> Outcome {
        let id = valid_id(payload)?;
        Ok(Value::Bool(self.vault.delete_credential(&id).await?))
    }
}

fn generate(payload: Value) -> Outcome {
    let options: GeneratorOptions = parse(payload)?;
    generator::generate(&options)
        .map(Value::String)
        .map_err(|e| Failure::Message(e.to_string()))
}

fn valid_id(payload: Value) -> Result<String, Failure> {
    let id = parse::<IdPayload>(payload)
        .map_err(|_| Failure::Message(INVALID_ID.into()))?
        .into_id();
    if is_valid_id(&id) {
        Ok(id)
    } else {
        Err(Failure::Message(INVALID_ID.into()))
    }
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, Failure> {
    serde_json::from_value(payload).map_err(|e| Failure::Message(format!("Invalid payload: {e}")))
}

fn to_value(value: impl serde::Serialize) -> Outcome {
    serde_json::to_value(value).map_err(|e| Failure::Message(format!("Invalid reply: {e}")))
}

fn error_reply(message: impl Into<String>) -> Value {
    json!(ErrorReply {
        error: message.into(),
    })
}
