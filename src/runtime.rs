//! Top-level run: restore session, check it, log in if needed, browse, save history.

use tracing::{info, instrument, warn};

use crate::auth::{CredentialError, CredentialStore, SessionStore};
use crate::browse::{BrowseReport, browse_website};
use crate::config::Settings;
use crate::history::HistoryStore;
use crate::http::TransportError;
use crate::interaction::UserInteraction;
use crate::login::{
    LoginError, LoginOrchestrator, LoginOutcome, SessionContext, SessionStatus, check_session,
};
use crate::storage::StorageError;

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The session is authenticated and the post-login steps ran.
    Completed {
        /// Link count from the post-login fetch, when it ran.
        browse: Option<BrowseReport>,
        /// Entries written back to the history file.
        history_entries: usize,
    },
    /// The tracker refused to log this client in.
    Banned(Vec<String>),
}

/// Fatal errors for a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("login failed: {0}")]
    Login(#[from] LoginError),
}

/// Builds the production transport for `settings` and runs a session.
///
/// # Errors
///
/// Returns [`RunError`] for anything that aborts the run. A ban is not an
/// error; it comes back as [`RunOutcome::Banned`].
pub async fn run_session(
    settings: &Settings,
    interaction: &mut dyn UserInteraction,
) -> Result<RunOutcome, RunError> {
    let ctx = SessionContext::connect(&settings.base_url, settings.timeout)?;
    run_with_context(&ctx, settings, interaction).await
}

/// Runs a session over an existing context.
///
/// # Errors
///
/// See [`run_session`].
#[instrument(level = "debug", skip_all, fields(site = %ctx.site().root()))]
pub async fn run_with_context(
    ctx: &SessionContext,
    settings: &Settings,
    interaction: &mut dyn UserInteraction,
) -> Result<RunOutcome, RunError> {
    let credential_store = CredentialStore::new(settings.paths.config_file());
    let session_store = SessionStore::new(settings.paths.session_file());
    let history_store = HistoryStore::new(settings.paths.history_file());

    let session = session_store.load(ctx.jar())?;
    let mut credentials = credential_store.load()?;
    if session.is_none() && credentials.is_none() {
        info!("No session or stored account, asking for credentials");
        credentials = Some(credential_store.prompt_interactive(interaction)?);
    }

    if check_session(ctx).await? == SessionStatus::Invalid {
        info!("Session rejected, logging in");
        session_store.clear(ctx.jar())?;
        let outcome =
            LoginOrchestrator::new(ctx, &credential_store, &session_store, &mut *interaction)
                .login(credentials)
                .await?;
        if let LoginOutcome::Banned(warnings) = outcome {
            warn!(warnings = warnings.len(), "Login banned, stopping");
            interaction.say("-");
            for warning in &warnings {
                interaction.say(warning);
            }
            return Ok(RunOutcome::Banned(warnings));
        }
    } else {
        info!("Stored session accepted");
    }

    let history = history_store.load()?;
    let browse = if settings.browse {
        Some(browse_website(ctx, interaction, settings.browse_pause).await?)
    } else {
        None
    };

    let history_entries = history_store.save(&history)?;
    interaction.say(&format!("Saved {history_entries} history entries"));

    Ok(RunOutcome::Completed {
        browse,
        history_entries,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::auth::Credentials;
    use crate::http::fake::{FakeTransport, RecordedRequest};
    use crate::http::{RedirectPolicy, SessionJar, SiteEndpoints};
    use crate::interaction::ScriptedInteraction;
    use crate::storage::DataPaths;

    const ROOT: &str = "https://tracker.test/";
    const LOGIN: &str = "https://tracker.test/login.php";

    fn settings(dir: &TempDir, browse: bool) -> Settings {
        Settings {
            paths: DataPaths::new(dir.path()),
            base_url: ROOT.parse().unwrap(),
            timeout: Duration::from_secs(5),
            browse_pause: Duration::ZERO,
            browse,
        }
    }

    fn context(
        script: impl FnOnce(FakeTransport) -> FakeTransport,
    ) -> (SessionContext, Arc<Mutex<Vec<RecordedRequest>>>) {
        let site = SiteEndpoints::parse(ROOT).unwrap();
        let jar = Arc::new(SessionJar::new(site.host()));
        let transport = script(FakeTransport::new(Arc::clone(&jar)));
        let requests = transport.requests();
        (SessionContext::new(Box::new(transport), jar, site), requests)
    }

    #[tokio::test]
    async fn test_valid_session_skips_login() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, true);
        SessionStore::new(settings.paths.session_file())
            .save(&[("session".to_string(), "abc".to_string())].into())
            .unwrap();
        let (ctx, requests) = context(|fake| {
            fake.reply(200, ROOT, "home")
                .reply(200, ROOT, r#"<a href="/a">a</a>"#)
        });
        let mut interaction = ScriptedInteraction::default();

        let outcome = run_with_context(&ctx, &settings, &mut interaction)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                browse: Some(BrowseReport { link_count: 1 }),
                history_entries: 0
            }
        );
        assert_eq!(ctx.jar().get("session").as_deref(), Some("abc"));
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].redirects, Some(RedirectPolicy::Manual));
        assert!(interaction.prompts().is_empty());
        assert_eq!(
            interaction.output(),
            ["Found 1 site links", "Saved 0 history entries"]
        );
        assert!(settings.paths.history_file().exists());
    }

    #[tokio::test]
    async fn test_error_page_after_login_still_saves_history() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, true);
        SessionStore::new(settings.paths.session_file())
            .save(&[("session".to_string(), "abc".to_string())].into())
            .unwrap();
        let (ctx, _requests) = context(|fake| {
            fake.reply(200, ROOT, "home")
                .reply(500, ROOT, "<h1>Internal error</h1>")
        });
        let mut interaction = ScriptedInteraction::default();

        let outcome = run_with_context(&ctx, &settings, &mut interaction)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                browse: Some(BrowseReport { link_count: 0 }),
                history_entries: 0
            }
        );
        assert!(settings.paths.history_file().exists());
    }

    #[tokio::test]
    async fn test_invalid_session_is_cleared_before_login() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, false);
        let sessions = SessionStore::new(settings.paths.session_file());
        sessions
            .save(&[("stale".to_string(), "1".to_string())].into())
            .unwrap();
        CredentialStore::new(settings.paths.config_file())
            .save(&Credentials::new("alice", "pw"))
            .unwrap();
        let (ctx, _requests) = context(|fake| {
            fake.reply(302, ROOT, "")
                .reply(200, ROOT, r#"<div id="nav_userinfo"></div>"#)
        });
        let mut interaction = ScriptedInteraction::default();

        let outcome = run_with_context(&ctx, &settings, &mut interaction)
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Completed { browse: None, .. }));
        assert!(ctx.jar().is_empty());
        assert!(sessions.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_run_prompts_for_credentials() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, false);
        let (ctx, _requests) = context(|fake| {
            fake.reply(302, ROOT, "")
                .reply(200, ROOT, r#"<div id="nav_userinfo"></div>"#)
        });
        let mut interaction = ScriptedInteraction::new(["alice", "pw"]);

        run_with_context(&ctx, &settings, &mut interaction)
            .await
            .unwrap();

        assert_eq!(interaction.prompts(), ["Username", "Password"]);
        let stored = CredentialStore::new(settings.paths.config_file())
            .load()
            .unwrap();
        assert_eq!(stored, Some(Credentials::new("alice", "pw")));
    }

    #[tokio::test]
    async fn test_ban_is_reported_and_returned() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, true);
        CredentialStore::new(settings.paths.config_file())
            .save(&Credentials::new("alice", "pw"))
            .unwrap();
        let ban_page = r#"<div id="maincontent">
            <p class="warning">You are banned from logging in.</p>
            <p class="warning">Try again in 6 hours.</p></div>"#;
        let (ctx, requests) = context(|fake| fake.reply(302, ROOT, "").reply(200, LOGIN, ban_page));
        let mut interaction = ScriptedInteraction::default();

        let outcome = run_with_context(&ctx, &settings, &mut interaction)
            .await
            .unwrap();

        let expected = vec![
            "You are banned from logging in.".to_string(),
            "Try again in 6 hours.".to_string(),
        ];
        assert_eq!(outcome, RunOutcome::Banned(expected));
        assert_eq!(requests.lock().unwrap().len(), 2);
        let output = interaction.output();
        assert_eq!(
            &output[output.len() - 3..],
            [
                "-",
                "You are banned from logging in.",
                "Try again in 6 hours."
            ]
        );
        assert!(!settings.paths.history_file().exists());
    }

    #[tokio::test]
    async fn test_session_check_transport_error_aborts() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir, true);
        CredentialStore::new(settings.paths.config_file())
            .save(&Credentials::new("alice", "pw"))
            .unwrap();
        let (ctx, _requests) = context(|fake| fake.fail(TransportError::timeout(ROOT)));
        let mut interaction = ScriptedInteraction::default();

        let result = run_with_context(&ctx, &settings, &mut interaction).await;

        assert!(matches!(
            result,
            Err(RunError::Transport(TransportError::Timeout { .. }))
        ));
    }
}
