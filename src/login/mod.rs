//! Tracker login: session check, login state machine and page parsing.
//!
//! - [`SessionContext`] - Transport, cookie jar and endpoints for one run
//! - [`check_session`] - Decides whether the current cookies are accepted
//! - [`LoginOrchestrator`] - Captcha, credential and second-factor flow
//! - [`page`] - Markers, warnings and captcha form extraction

mod context;
mod orchestrator;
pub mod page;
mod validator;

pub use context::SessionContext;
pub use orchestrator::{
    LoginError, LoginOrchestrator, LoginOutcome, choose_answer, classify_submission,
};
pub use page::{CaptchaChallenge, CaptchaChoice, PageError};
pub use validator::{SessionStatus, check_session};
