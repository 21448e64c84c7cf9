//! Login state machine.
//!
//! One attempt walks: fetch login page → already-authenticated check → ban
//! check → captcha extraction and selection → credential POST → optional
//! second factor → outcome classification. A failed attempt refreshes the
//! credentials and starts over; there is no attempt limit.

use std::io::Write;

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::SessionContext;
use super::page::{
    self, CaptchaChallenge, CaptchaChoice, LoginPageKind, PageError, extract_warnings,
};
use crate::auth::{CredentialError, CredentialStore, Credentials, SessionStore};
use crate::http::{HttpResponse, RedirectPolicy, TransportError};
use crate::interaction::{InteractionError, UserInteraction};
use crate::storage::StorageError;

/// Outcome of a login attempt or of the whole login loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The login page shows the user as signed in.
    AlreadyAuthenticated,
    /// The tracker refuses logins from this client; carries its warnings.
    Banned(Vec<String>),
    /// Credentials were accepted but a one-time code is needed.
    RequiresSecondFactor,
    /// The session is authenticated and persisted.
    Success,
    /// The tracker sent the client back to the login page; carries its warnings.
    Failure(Vec<String>),
}

/// Errors that end the login loop.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// A request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The login page is not shaped as expected.
    #[error("unexpected login page: {0}")]
    MalformedPage(#[from] PageError),

    /// The user could not be prompted.
    #[error(transparent)]
    Interaction(#[from] InteractionError),

    /// Credentials or session could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The captcha image could not be written to a temporary file.
    #[error("failed to stage captcha image: {0}")]
    CaptchaImage(#[source] std::io::Error),
}

impl From<CredentialError> for LoginError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::Storage(error) => Self::Storage(error),
            CredentialError::Interaction(error) => Self::Interaction(error),
        }
    }
}

/// Drives the login protocol against one [`SessionContext`].
pub struct LoginOrchestrator<'a> {
    ctx: &'a SessionContext,
    credential_store: &'a CredentialStore,
    session_store: &'a SessionStore,
    interaction: &'a mut dyn UserInteraction,
}

impl<'a> LoginOrchestrator<'a> {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        ctx: &'a SessionContext,
        credential_store: &'a CredentialStore,
        session_store: &'a SessionStore,
        interaction: &'a mut dyn UserInteraction,
    ) -> Self {
        Self {
            ctx,
            credential_store,
            session_store,
            interaction,
        }
    }

    /// Logs in, retrying with fresh credentials after each rejected attempt.
    ///
    /// Returns [`LoginOutcome::AlreadyAuthenticated`], [`LoginOutcome::Banned`]
    /// or [`LoginOutcome::Success`]. When `credentials` is `None` the user is
    /// prompted before the first attempt.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError`] on transport failures, unexpected page
    /// structure, closed input, or storage failures.
    #[instrument(level = "debug", skip_all)]
    pub async fn login(
        &mut self,
        credentials: Option<Credentials>,
    ) -> Result<LoginOutcome, LoginError> {
        let mut credentials = match credentials {
            Some(credentials) => credentials,
            None => self.refresh_credentials()?,
        };

        let mut attempt: u32 = 1;
        loop {
            info!(attempt, username = %credentials.username, "Starting login attempt");
            match self.attempt(&credentials).await? {
                LoginOutcome::Failure(warnings) => {
                    warn!(attempt, warnings = warnings.len(), "Login rejected");
                    self.interaction.say("-");
                    self.interaction.say("Login failed!");
                    for warning in &warnings {
                        self.interaction.say(warning);
                    }
                    self.interaction.say("-");
                    credentials = self.refresh_credentials()?;
                    attempt += 1;
                }
                outcome => return Ok(outcome),
            }
        }
    }

    /// Runs a single login attempt from the initial page fetch.
    ///
    /// Never returns [`LoginOutcome::RequiresSecondFactor`]; that state is
    /// resolved inside the attempt.
    ///
    /// # Errors
    ///
    /// See [`LoginOrchestrator::login`].
    pub async fn attempt(&mut self, credentials: &Credentials) -> Result<LoginOutcome, LoginError> {
        let ctx = self.ctx;
        self.interaction.say("Logging in ...");
        let login_url = ctx.site().login();

        let login_page = ctx.get(login_url, RedirectPolicy::Follow).await?;
        let body = login_page.text();

        match page::classify_login_page(&body) {
            LoginPageKind::AlreadyAuthenticated => {
                info!("Login page reports an active session");
                self.interaction.say("Already logged in");
                self.interaction.say("-");
                return Ok(LoginOutcome::AlreadyAuthenticated);
            }
            LoginPageKind::Banned => {
                let warnings = extract_warnings(&body);
                warn!(warnings = warnings.len(), "Tracker reports a login ban");
                return Ok(LoginOutcome::Banned(warnings));
            }
            LoginPageKind::LoginForm => {}
        }

        let challenge = page::parse_captcha_challenge(&body, &login_page.url)?;
        let choice = self.solve_captcha(&challenge).await?;

        let form = [
            ("image", challenge.challenge_id.as_str()),
            ("captcha", choice.id.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password()),
            ("keeplogged", "1"),
            ("login", "Login"),
        ];
        let mut response = ctx.post_form(login_url, &form).await?;

        if classify_submission(&response, login_url, true) == LoginOutcome::RequiresSecondFactor {
            response = self.submit_second_factor(login_url).await?;
        }

        let outcome = classify_submission(&response, login_url, false);
        if outcome == LoginOutcome::Success {
            let cookies = ctx.jar().snapshot();
            self.session_store.save(&cookies)?;
            info!(cookies = cookies.len(), "Login succeeded");
            self.interaction.say("✔ Successfully logged in!");
            self.interaction.say("-");
        }
        Ok(outcome)
    }

    /// Shows the captcha and returns the chosen answer.
    ///
    /// The image lives in a temporary file that is removed once an answer is
    /// chosen.
    async fn solve_captcha<'c>(
        &mut self,
        challenge: &'c CaptchaChallenge,
    ) -> Result<&'c CaptchaChoice, LoginError> {
        let ctx = self.ctx;
        let image = ctx.get(&challenge.image_url, RedirectPolicy::Follow).await?;
        let staged = stage_captcha_image(&image.body)?;
        debug!(path = %staged.path().display(), bytes = image.body.len(), "staged captcha image");

        if let Err(error) = self.interaction.open_file(staged.path()) {
            warn!(error = %error, "Could not open captcha image automatically");
            self.interaction
                .say(&format!("Open {} to see the captcha", staged.path().display()));
        }

        for (index, choice) in challenge.choices.iter().enumerate() {
            self.interaction
                .say(&format!("{}) {}", index + 1, choice.label));
        }

        Ok(choose_answer(&mut *self.interaction, challenge)?)
    }

    async fn submit_second_factor(&mut self, login_url: &Url) -> Result<HttpResponse, LoginError> {
        info!("Second factor required");
        let code = self.interaction.prompt("2-factor auth code")?;
        let form = [
            ("act", "authorize"),
            ("login", "Login"),
            ("authkey", code.trim()),
        ];
        Ok(self.ctx.post_form(login_url, &form).await?)
    }

    /// `CredentialRefresh`: asks for a new account and overwrites the stored one.
    fn refresh_credentials(&mut self) -> Result<Credentials, LoginError> {
        Ok(self
            .credential_store
            .prompt_interactive(&mut *self.interaction)?)
    }
}

/// Prompts until the user picks a menu number in `1..=choices.len()`.
///
/// # Errors
///
/// Returns [`InteractionError`] when input ends.
pub fn choose_answer<'c>(
    interaction: &mut dyn UserInteraction,
    challenge: &'c CaptchaChallenge,
) -> Result<&'c CaptchaChoice, InteractionError> {
    loop {
        let number = interaction.prompt_number("Choose captcha answer")?;
        if let Some(choice) = challenge.choice(number) {
            debug!(number, "captcha answer chosen");
            return Ok(choice);
        }
        interaction.say("Bad choice!");
    }
}

/// Classifies the response to a credential or second-factor POST.
///
/// Landing back on the login endpoint means rejection, unless
/// `allow_second_factor` is set and the page asks for a one-time code.
#[must_use]
pub fn classify_submission(
    response: &HttpResponse,
    login_url: &Url,
    allow_second_factor: bool,
) -> LoginOutcome {
    if response.url != *login_url {
        return LoginOutcome::Success;
    }
    let body = response.text();
    if allow_second_factor && page::requires_second_factor(&body) {
        LoginOutcome::RequiresSecondFactor
    } else {
        LoginOutcome::Failure(extract_warnings(&body))
    }
}

fn stage_captcha_image(bytes: &[u8]) -> Result<NamedTempFile, LoginError> {
    let mut file = tempfile::Builder::new()
        .prefix("captcha-")
        .suffix(".jpg")
        .tempfile()
        .map_err(LoginError::CaptchaImage)?;
    file.write_all(bytes).map_err(LoginError::CaptchaImage)?;
    file.flush().map_err(LoginError::CaptchaImage)?;
    Ok(file)
}
