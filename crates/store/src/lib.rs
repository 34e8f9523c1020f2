//! Encrypted-at-rest credential record store.
//!
//! The whole database file is encrypted by SQLCipher at the page level with
//! a key supplied by the caller. Schema changes ship as explicit sqlx
//! migrations under `./migrations`, applied on every open.

mod db;
pub mod error;
pub mod models;
pub mod store;

pub use {
    error::{Result, StoreError},
    models::{
        CredentialPatch, CredentialRecord, MAX_PASSWORD_LEN, MAX_USERNAME_LEN, MAX_WEBSITE_LEN,
        NewCredential,
    },
    store::CredentialStore,
};

/// Run database migrations for the credential store.
///
/// Creates the `credentials` table. Called by [`CredentialStore::create`]
/// and [`CredentialStore::open`]; exposed so tooling can migrate a pool it
/// opened itself.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
