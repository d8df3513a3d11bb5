//! fv_store — Local database and vault session for Flagvault
//!
//! # Encryption strategy
//! SQLite does NOT natively encrypt. We use application-level encryption:
//! - Vault entry secrets (and notes) are stored as XChaCha20-Poly1305
//!   ciphertext (base64) with the per-entry nonce in its own column (hex);
//!   the two are written together and must be read together.
//! - The vault key is derived from the master passphrase via Argon2id and
//!   held in memory only while the vault session is unlocked.
//! - Non-sensitive metadata (titles, usernames, timestamps, scores,
//!   challenge data) is stored in plaintext to allow efficient queries.
//!
//! # Ownership
//! Every vault-entry and submission query is scoped by the owning user id
//! in SQL. Callers cannot reach another user's rows by handing the store a
//! foreign row id.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.

pub mod ctf;
pub mod db;
pub mod entries;
pub mod error;
pub mod migrations;
pub mod models;
pub mod session;
pub mod users;

pub use db::Store;
pub use error::StoreError;
pub use session::VaultSession;
