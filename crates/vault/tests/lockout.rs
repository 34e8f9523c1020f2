#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use passvault_store::NewCredential;
use passvault_vault::{KdfParams, ManualClock, Vault, VaultError, VaultPaths, VaultStatus};

const PASSPHRASE: &str = "Str0ngPass!word";

fn vault_with_clock(dir: &std::path::Path, clock: &ManualClock) -> Vault {
    Vault::builder(VaultPaths::in_dir(dir))
        .kdf(KdfParams { iterations: 1_000 })
        .clock(Arc::new(clock.clone()))
        .build()
}

#[tokio::test]
async fn five_failures_lock_out_for_fifteen_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let vault = vault_with_clock(dir.path(), &clock);

    vault.initialize(PASSPHRASE).await.unwrap();
    vault.lock().await;

    for attempt in 1..=4 {
        let err = vault.unlock("wrong").await.unwrap_err();
        assert!(
            matches!(err, VaultError::IncorrectPassphrase),
            "attempt {attempt}: {err:?}"
        );
    }

    // The fifth failure starts the lockout and reports it.
    match vault.unlock("wrong").await {
        Err(VaultError::LockedOut { remaining }) => {
            assert_eq!(remaining, Duration::from_secs(15 * 60));
        },
        other => panic!("expected lockout, got {other:?}"),
    }

    // The correct passphrase is refused while locked out.
    clock.advance(Duration::from_secs(14 * 60));
    let err = vault.unlock(PASSPHRASE).await.unwrap_err();
    assert!(matches!(err, VaultError::LockedOut { .. }));
    assert_eq!(
        err.user_message(),
        "Too many failed attempts. Please try again in 1 minutes."
    );
    assert!(!vault.is_unlocked().await);

    clock.advance(Duration::from_secs(61));
    vault.unlock(PASSPHRASE).await.unwrap();
    assert_eq!(vault.status().await.unwrap(), VaultStatus::Unlocked);
    assert_eq!(vault.failed_attempts().await, 0);
}

#[tokio::test]
async fn first_attempt_after_expiry_starts_a_fresh_count() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let vault = vault_with_clock(dir.path(), &clock);
    vault.initialize(PASSPHRASE).await.unwrap();
    vault.lock().await;

    for _ in 0..5 {
        let _ = vault.unlock("wrong").await;
    }
    clock.advance(Duration::from_secs(15 * 60));

    let err = vault.unlock("still wrong").await.unwrap_err();
    assert!(matches!(err, VaultError::IncorrectPassphrase));
    assert_eq!(vault.failed_attempts().await, 1);
}

#[tokio::test]
async fn restart_forgets_the_lockout_but_keeps_the_data() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();

    let first = vault_with_clock(dir.path(), &clock);
    first.initialize(PASSPHRASE).await.unwrap();
    let created = first
        .create_credential(NewCredential::new("alice", "hunter2").with_website("example.com"))
        .await
        .unwrap();
    first.lock().await;
    for _ in 0..5 {
        let _ = first.unlock("wrong").await;
    }
    assert!(matches!(
        first.unlock(PASSPHRASE).await,
        Err(VaultError::LockedOut { .. })
    ));
    drop(first);

    let second = vault_with_clock(dir.path(), &clock);
    assert_eq!(second.status().await.unwrap(), VaultStatus::Locked);
    second.unlock(PASSPHRASE).await.unwrap();

    let records = second.list_credentials().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, created.id);
    assert_eq!(records[0].website.as_deref(), Some("example.com"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_cannot_race_past_the_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let vault = Arc::new(vault_with_clock(dir.path(), &clock));
    vault.initialize(PASSPHRASE).await.unwrap();
    vault.lock().await;

    let attempts: Vec<_> = (0..12)
        .map(|_| {
            let vault = Arc::clone(&vault);
            tokio::spawn(async move { vault.unlock("wrong").await })
        })
        .collect();

    let (mut incorrect, mut locked_out) = (0, 0);
    for attempt in attempts {
        match attempt.await.unwrap() {
            Err(VaultError::IncorrectPassphrase) => incorrect += 1,
            Err(VaultError::LockedOut { .. }) => locked_out += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(incorrect, 4);
    assert_eq!(locked_out, 8);
    assert_eq!(vault.failed_attempts().await, 5);
    assert!(!vault.is_unlocked().await);
}
