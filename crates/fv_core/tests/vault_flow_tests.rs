//! End-to-end vault flow: unlock, entry round-trips, wrong-passphrase
//! behaviour, lock semantics.

use fv_core::auth::Auth;
use fv_core::vault::{EntryInput, VaultError, VaultService};
use fv_store::{Store, VaultSession};
use tempfile::tempdir;

async fn setup() -> (tempfile::TempDir, Store, VaultService, String) {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("fv.db"), VaultSession::new())
        .await
        .expect("open store");
    let auth = Auth::new(store.clone());
    let user = auth
        .sign_up("alice@example.com", "login-password-1", Some("Alice"))
        .await
        .unwrap();
    let vault = VaultService::new(store.clone());
    (dir, store, vault, user.id)
}

fn entry(title: &str, secret: &str) -> EntryInput {
    EntryInput {
        title: title.into(),
        site_url: Some("https://example.com".into()),
        username: "alice".into(),
        secret: secret.into(),
        notes: Some("backup codes in the drawer".into()),
    }
}

#[tokio::test]
async fn entry_roundtrip_with_session_passphrase() {
    let (_dir, _store, vault, user) = setup().await;

    vault.unlock(&user, "correct-horse").await.unwrap();
    let row = vault.add_entry(&user, entry("GitHub", "hunter2")).await.unwrap();
    assert!(row.strength_score <= 4);

    let revealed = vault.reveal_entry(&user, &row.id).await.unwrap();
    assert_eq!(revealed.secret.as_str(), "hunter2");
    assert_eq!(
        revealed.notes.as_deref().map(String::as_str),
        Some("backup codes in the drawer")
    );
}

#[tokio::test]
async fn wrong_passphrase_is_rejected_at_unlock() {
    let (_dir, _store, vault, user) = setup().await;

    // First unlock initialises the verifier.
    vault.unlock(&user, "correct-horse").await.unwrap();
    vault.add_entry(&user, entry("GitHub", "hunter2")).await.unwrap();
    vault.lock().await;

    // The typo never reaches an entry decrypt: the verifier catches it.
    let err = vault.unlock(&user, "wrong-horse").await.unwrap_err();
    assert!(matches!(err, VaultError::WrongPassphrase));
    assert!(vault.is_locked().await);

    vault.unlock(&user, "correct-horse").await.unwrap();
    let entries = vault.list_entries(&user).await.unwrap();
    let revealed = vault.reveal_entry(&user, &entries[0].id).await.unwrap();
    assert_eq!(revealed.secret.as_str(), "hunter2");
}

#[tokio::test]
async fn verify_passphrase_checks_without_unlocking() {
    let (_dir, _store, vault, user) = setup().await;

    // Uninitialised vault: nothing to verify against yet.
    assert!(!vault.verify_passphrase(&user, "correct-horse").await.unwrap());

    vault.unlock(&user, "correct-horse").await.unwrap();
    vault.lock().await;

    assert!(vault.verify_passphrase(&user, "correct-horse").await.unwrap());
    assert!(!vault.verify_passphrase(&user, "wrong-horse").await.unwrap());
    assert!(vault.is_locked().await);
}

#[tokio::test]
async fn locked_vault_refuses_entry_operations() {
    let (_dir, _store, vault, user) = setup().await;

    let err = vault
        .add_entry(&user, entry("GitHub", "hunter2"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Locked));

    vault.unlock(&user, "correct-horse").await.unwrap();
    let row = vault.add_entry(&user, entry("GitHub", "hunter2")).await.unwrap();

    vault.lock().await;
    assert!(matches!(
        vault.reveal_entry(&user, &row.id).await.unwrap_err(),
        VaultError::Locked
    ));
}

#[tokio::test]
async fn update_reencrypts_with_fresh_nonce() {
    let (_dir, _store, vault, user) = setup().await;
    vault.unlock(&user, "correct-horse").await.unwrap();

    let row = vault.add_entry(&user, entry("GitHub", "hunter2")).await.unwrap();
    let updated = vault
        .update_entry(&user, &row.id, entry("GitHub", "hunter2"))
        .await
        .unwrap();

    // Same plaintext, same key: nonce and ciphertext still change.
    assert_ne!(row.secret_nonce, updated.secret_nonce);
    assert_ne!(row.secret_enc, updated.secret_enc);

    let revealed = vault.reveal_entry(&user, &row.id).await.unwrap();
    assert_eq!(revealed.secret.as_str(), "hunter2");
}

#[tokio::test]
async fn idle_session_auto_locks() {
    let (_dir, _store, vault, user) = setup().await;

    vault.unlock(&user, "correct-horse").await.unwrap();
    vault.set_auto_lock_timeout(1).await;
    let row = vault.add_entry(&user, entry("GitHub", "hunter2")).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(vault.is_locked().await);
    assert!(matches!(
        vault.reveal_entry(&user, &row.id).await.unwrap_err(),
        VaultError::Locked
    ));

    // Re-entering the passphrase restores access.
    vault.unlock(&user, "correct-horse").await.unwrap();
    let revealed = vault.reveal_entry(&user, &row.id).await.unwrap();
    assert_eq!(revealed.secret.as_str(), "hunter2");
}

#[tokio::test]
async fn sign_out_locks_the_vault() {
    let (_dir, store, vault, user) = setup().await;
    let auth = Auth::new(store.clone());

    vault.unlock(&user, "correct-horse").await.unwrap();
    assert!(!vault.is_locked().await);

    let token = match auth
        .sign_in("alice@example.com", "login-password-1")
        .await
        .unwrap()
    {
        fv_core::auth::SignIn::Complete { token, .. } => token,
        _ => unreachable!(),
    };
    auth.sign_out(&token).await.unwrap();
    assert!(vault.is_locked().await);
}
