#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    passvault_ipc::{Dispatcher, channels},
    passvault_vault::{KdfParams, ManualClock, Vault, VaultPaths},
    serde_json::{Value, json},
};

const PASSPHRASE: &str = "Str0ngPass!word";

fn dispatcher(dir: &std::path::Path, clock: &ManualClock) -> Dispatcher {
    let vault = Vault::builder(VaultPaths::in_dir(dir))
        .kdf(KdfParams { iterations: 1_000 })
        .clock(Arc::new(clock.clone()))
        .build();
    Dispatcher::new(Arc::new(vault))
}

#[tokio::test]
async fn credential_lifecycle_over_channels() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let d = dispatcher(dir.path(), &clock);

    let reply = d
        .dispatch(
            channels::INITIALIZE_WITH_PASSWORD,
            json!({ "password": PASSPHRASE }),
        )
        .await;
    assert_eq!(reply, json!({ "success": true }));

    let again = d
        .dispatch(channels::INITIALIZE_WITH_PASSWORD, json!(PASSPHRASE))
        .await;
    assert_eq!(
        again,
        json!({ "success": false, "error": "Vault is already initialized" })
    );

    let created = d
        .dispatch(
            channels::CREATE,
            json!({ "username": "alice", "password": "hunter2", "website": "example.com" }),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["username"], "alice");
    assert_eq!(created["website"], "example.com");
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let all = d.dispatch(channels::GET_ALL, Value::Null).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let updated = d
        .dispatch(
            channels::UPDATE,
            json!({ "id": id, "password": "correct horse", "website": null }),
        )
        .await;
    assert_eq!(updated["username"], "alice");
    assert_eq!(updated["password"], "correct horse");
    assert_eq!(updated["website"], Value::Null);

    let fetched = d.dispatch(channels::GET_BY_ID, json!({ "id": id })).await;
    assert_eq!(fetched, updated);

    let missing = "00000000-0000-4000-8000-000000000000";
    assert_eq!(
        d.dispatch(channels::GET_BY_ID, json!(missing)).await,
        Value::Null
    );
    assert_eq!(
        d.dispatch(channels::UPDATE, json!({ "id": missing, "username": "bob" }))
            .await,
        Value::Null
    );
    assert_eq!(
        d.dispatch(channels::DELETE, json!({ "id": missing })).await,
        json!(false)
    );

    assert_eq!(d.dispatch(channels::DELETE, json!(id)).await, json!(true));
    assert_eq!(d.dispatch(channels::GET_ALL, Value::Null).await, json!([]));
}

#[tokio::test]
async fn lock_and_unlock_over_channels() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let d = dispatcher(dir.path(), &clock);

    d.dispatch(channels::INITIALIZE_WITH_PASSWORD, json!(PASSPHRASE))
        .await;
    d.dispatch(
        channels::CREATE,
        json!({ "username": "alice", "password": "hunter2" }),
    )
    .await;

    assert_eq!(
        d.dispatch(channels::LOCK, Value::Null).await,
        json!({ "success": true })
    );
    assert_eq!(d.dispatch(channels::IS_CONNECTED, Value::Null).await, json!(false));
    assert_eq!(
        d.dispatch(channels::GET_ALL, Value::Null).await,
        json!({ "error": "Vault is locked" })
    );

    let wrong = d
        .dispatch(channels::VERIFY_PASSWORD, json!({ "password": "Wr0ngPass!word" }))
        .await;
    assert_eq!(
        wrong,
        json!({ "success": false, "error": "Incorrect master password" })
    );

    let right = d
        .dispatch(channels::VERIFY_PASSWORD, json!({ "password": PASSPHRASE }))
        .await;
    assert_eq!(right, json!({ "success": true }));
    let all = d.dispatch(channels::GET_ALL, Value::Null).await;
    assert_eq!(all[0]["username"], "alice");
}

#[tokio::test]
async fn lockout_is_reported_in_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let d = dispatcher(dir.path(), &clock);

    d.dispatch(channels::INITIALIZE_WITH_PASSWORD, json!(PASSPHRASE))
        .await;
    d.dispatch(channels::LOCK, Value::Null).await;

    for _ in 0..4 {
        d.dispatch(channels::VERIFY_PASSWORD, json!("nope")).await;
    }
    let fifth = d.dispatch(channels::VERIFY_PASSWORD, json!("nope")).await;
    assert_eq!(
        fifth,
        json!({
            "success": false,
            "error": "Too many failed attempts. Please try again in 15 minutes."
        })
    );

    clock.advance(Duration::from_secs(10 * 60));
    let blocked = d.dispatch(channels::VERIFY_PASSWORD, json!(PASSPHRASE)).await;
    assert_eq!(
        blocked["error"],
        "Too many failed attempts. Please try again in 5 minutes."
    );

    clock.advance(Duration::from_secs(5 * 60));
    let open = d.dispatch(channels::VERIFY_PASSWORD, json!(PASSPHRASE)).await;
    assert_eq!(open, json!({ "success": true }));
}

#[tokio::test]
async fn verify_before_initialize_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let reply = dispatcher(dir.path(), &clock)
        .dispatch(channels::VERIFY_PASSWORD, json!(PASSPHRASE))
        .await;
    assert_eq!(
        reply,
        json!({ "success": false, "error": "Vault is not initialized" })
    );
}
