//! Credential and session persistence.
//!
//! - [`CredentialStore`] keeps the tracker account in `config.toml`
//! - [`SessionStore`] mirrors the session jar to `session.json`

mod credentials;
mod session_store;

pub use credentials::{CredentialError, CredentialStore, Credentials};
pub use session_store::SessionStore;
