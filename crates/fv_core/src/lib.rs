//! fv_core — Domain services for Flagvault
//!
//! Three services over one [`fv_store::Store`]:
//! - [`auth::Auth`] — account registration, sign-in with optional TOTP
//!   second factor, bearer-token sessions, sign-out.
//! - [`vault::VaultService`] — the encrypted credential vault: unlock with
//!   the master passphrase, per-entry encrypt/decrypt, strength scoring.
//! - [`ctf::Ctf`] — flag submission against the append-only submission log
//!   and the leaderboard derived from it.
//!
//! Every failure is a typed, recoverable error; nothing here panics on bad
//! input. The caller (CLI, HTTP layer) maps errors to user-facing messages.

pub mod auth;
pub mod ctf;
pub mod vault;

pub use auth::{Auth, AuthError, SignIn};
pub use ctf::{Ctf, CtfError, LeaderboardEntry};
pub use vault::{VaultError, VaultService};
