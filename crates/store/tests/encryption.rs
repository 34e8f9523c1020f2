#![allow(clippy::unwrap_used, clippy::expect_used)]

use passvault_store::{CredentialStore, NewCredential, StoreError};

const KEY: [u8; 32] = [0x11; 32];
const OTHER_KEY: [u8; 32] = [0x22; 32];

#[tokio::test]
async fn reopen_with_same_key_sees_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.pmdb");

    let store = CredentialStore::create(&path, &KEY).await.unwrap();
    let created = store
        .create_credential(NewCredential::new("alice", "correct horse"))
        .await
        .unwrap();
    store.close().await;

    let reopened = CredentialStore::open(&path, &KEY).await.unwrap();
    let fetched = reopened.get(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.password, "correct horse");
}

#[tokio::test]
async fn wrong_key_is_distinct_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.pmdb");

    let store = CredentialStore::create(&path, &KEY).await.unwrap();
    store
        .create_credential(NewCredential::new("alice", "pw"))
        .await
        .unwrap();
    store.close().await;

    let wrong = CredentialStore::open(&path, &OTHER_KEY).await;
    assert!(matches!(wrong, Err(StoreError::WrongKey)));

    let missing = CredentialStore::open(&dir.path().join("other.pmdb"), &KEY).await;
    assert!(matches!(missing, Err(StoreError::Missing { .. })));
}

#[tokio::test]
async fn plaintext_never_hits_the_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.pmdb");

    let store = CredentialStore::create(&path, &KEY).await.unwrap();
    store
        .create_credential(NewCredential::new("needle-user", "needle-secret-value"))
        .await
        .unwrap();
    store.close().await;

    let bytes = std::fs::read(&path).unwrap();
    assert!(!bytes.starts_with(b"SQLite format 3"));
    let haystack = String::from_utf8_lossy(&bytes);
    assert!(!haystack.contains("needle-secret-value"));
    assert!(!haystack.contains("needle-user"));
}

#[tokio::test]
async fn create_discards_previous_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.pmdb");

    let store = CredentialStore::create(&path, &KEY).await.unwrap();
    store
        .create_credential(NewCredential::new("old", "pw"))
        .await
        .unwrap();
    store.close().await;

    let fresh = CredentialStore::create(&path, &OTHER_KEY).await.unwrap();
    assert!(fresh.list().await.unwrap().is_empty());
}
