//! Tracker Session Library
//!
//! Keeps an authenticated session with a private tracker alive across runs:
//! persisted cookies are checked on startup and, when rejected, the interactive
//! login flow (multiple-choice captcha, optional second factor) runs again.
//!
//! # Architecture
//!
//! - [`http`] - Transport trait, `reqwest` client and session cookie jar
//! - [`auth`] - Credential and session persistence
//! - [`login`] - Session check and login state machine
//! - [`browse`] - Post-login page fetch
//! - [`history`] - Persisted history pass-through
//! - [`runtime`] - Ties the pieces together for one run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod browse;
pub mod config;
pub mod history;
pub mod http;
pub mod interaction;
pub mod login;
pub mod runtime;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use auth::{CredentialError, CredentialStore, Credentials, SessionStore};
pub use browse::{BrowseReport, browse_website, count_site_links};
pub use config::{ConfigError, Settings, SettingsOverrides};
pub use history::{History, HistoryStore};
pub use http::{
    CookieSet, HttpResponse, RedirectPolicy, ReqwestTransport, SessionJar, SiteEndpoints,
    Transport, TransportError,
};
pub use interaction::{ConsoleInteraction, InteractionError, ScriptedInteraction, UserInteraction};
pub use login::{
    LoginError, LoginOrchestrator, LoginOutcome, SessionContext, SessionStatus, check_session,
};
pub use runtime::{RunError, RunOutcome, run_session, run_with_context};
pub use storage::{DataPaths, StorageError};
