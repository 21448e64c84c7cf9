//! Login page markup: marker checks, warning extraction and the captcha form.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

/// Present in the page chrome only when the session is authenticated.
pub const LOGGED_IN_MARKER: &str = "nav_userinfo";
/// Present on the login page when the client IP is locked out.
pub const BANNED_MARKER: &str = "banned from logging";
/// Present on the login page when a one-time code is required.
pub const SECOND_FACTOR_MARKER: &str = "googleauth";

#[allow(clippy::expect_used)]
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid") // Static selector, safe to panic
}

static WARNING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("#maincontent .warning"));
static LOGIN_FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("#loginform"));
static CHALLENGE_ID_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"input[name="image"]"#));
static IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static ANSWER_LIST_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("#captcha_answer"));
static ANSWER_ITEM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static INPUT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("input"));
static LABEL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("label"));

/// Errors for login pages that do not have the expected structure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    /// `#loginform` is absent.
    #[error("login form (#loginform) not found on login page")]
    MissingLoginForm,

    /// The hidden challenge id input is absent or has no value.
    #[error("captcha challenge id (input[name=image]) missing from login form")]
    MissingChallengeId,

    /// No `<img src>` inside the form.
    #[error("captcha image missing from login form")]
    MissingCaptchaImage,

    /// The image `src` cannot be resolved to a URL.
    #[error("captcha image URL '{src}' cannot be resolved")]
    InvalidCaptchaImage {
        /// Raw `src` attribute.
        src: String,
    },

    /// `#captcha_answer` is absent.
    #[error("captcha answer list (#captcha_answer) missing from login form")]
    MissingAnswerList,

    /// An answer item lacks its input value or label.
    #[error("captcha answer {position} is missing its {field}")]
    IncompleteAnswer {
        /// 1-based item position.
        position: usize,
        /// `"input value"` or `"label"`.
        field: &'static str,
    },

    /// `#captcha_answer` has no items.
    #[error("captcha answer list is empty")]
    NoAnswers,
}

/// What the login page says about the current client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPageKind {
    /// Already signed in; nothing to do.
    AlreadyAuthenticated,
    /// Login is locked out for this client.
    Banned,
    /// Regular login form with captcha.
    LoginForm,
}

/// Classifies a login page body.
///
/// Precedence is fixed: logged-in marker, then ban marker, then form. A page
/// carrying both markers is treated as authenticated.
#[must_use]
pub fn classify_login_page(body: &str) -> LoginPageKind {
    if body.contains(LOGGED_IN_MARKER) {
        LoginPageKind::AlreadyAuthenticated
    } else if body.contains(BANNED_MARKER) {
        LoginPageKind::Banned
    } else {
        LoginPageKind::LoginForm
    }
}

/// Returns true when the body asks for a second-factor code.
#[must_use]
pub fn requires_second_factor(body: &str) -> bool {
    body.contains(SECOND_FACTOR_MARKER)
}

/// Collects the trimmed text of every `.warning` inside `#maincontent`, in
/// document order. Pages without that region yield no warnings.
#[must_use]
pub fn extract_warnings(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let warnings: Vec<String> = document
        .select(&WARNING_SELECTOR)
        .map(|element| element_text(&element).trim().to_string())
        .collect();
    debug!(count = warnings.len(), "extracted site warnings");
    warnings
}

/// One selectable captcha answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChoice {
    /// Value submitted as the `captcha` form field.
    pub id: String,
    /// Text shown to the user.
    pub label: String,
}

/// Captcha parsed from a login form. Valid for a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    /// Value submitted as the `image` form field.
    pub challenge_id: String,
    /// Absolute URL of the captcha image.
    pub image_url: Url,
    /// Answers in page order.
    pub choices: Vec<CaptchaChoice>,
}

impl CaptchaChallenge {
    /// Returns the answer for a 1-based menu number.
    #[must_use]
    pub fn choice(&self, number: i64) -> Option<&CaptchaChoice> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.choices.get(index)
    }
}

/// Parses the captcha challenge out of a login page.
///
/// `page_url` is the URL the page was served from; a relative image `src` is
/// resolved against it.
///
/// # Errors
///
/// Returns [`PageError`] naming the first missing piece of the form.
pub fn parse_captcha_challenge(body: &str, page_url: &Url) -> Result<CaptchaChallenge, PageError> {
    let document = Html::parse_document(body);
    let form = document
        .select(&LOGIN_FORM_SELECTOR)
        .next()
        .ok_or(PageError::MissingLoginForm)?;

    let challenge_id = form
        .select(&CHALLENGE_ID_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .ok_or(PageError::MissingChallengeId)?
        .to_string();

    let src = form
        .select(&IMAGE_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or(PageError::MissingCaptchaImage)?;
    let image_url = page_url
        .join(src.trim())
        .map_err(|_| PageError::InvalidCaptchaImage {
            src: src.to_string(),
        })?;

    let answer_list = form
        .select(&ANSWER_LIST_SELECTOR)
        .next()
        .ok_or(PageError::MissingAnswerList)?;

    let choices = answer_list
        .select(&ANSWER_ITEM_SELECTOR)
        .enumerate()
        .map(|(index, item)| parse_choice(index + 1, &item))
        .collect::<Result<Vec<_>, _>>()?;
    if choices.is_empty() {
        return Err(PageError::NoAnswers);
    }

    trace!(choices = choices.len(), image_url = %image_url, "parsed captcha challenge");
    Ok(CaptchaChallenge {
        challenge_id,
        image_url,
        choices,
    })
}

fn parse_choice(position: usize, item: &ElementRef<'_>) -> Result<CaptchaChoice, PageError> {
    let id = item
        .select(&INPUT_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .ok_or(PageError::IncompleteAnswer {
            position,
            field: "input value",
        })?;
    let label = item
        .select(&LABEL_SELECTOR)
        .next()
        .ok_or(PageError::IncompleteAnswer {
            position,
            field: "label",
        })?;

    Ok(CaptchaChoice {
        id: id.to_string(),
        label: element_text(&label).trim().to_string(),
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}
