//! Post-login action: fetch the tracker root and count site-relative links.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::http::TransportError;
use crate::interaction::UserInteraction;
use crate::login::SessionContext;

/// Matches `href="/..."` attributes, non-greedy up to the closing quote.
#[allow(clippy::expect_used)]
static SITE_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="/.*?""#).expect("site link regex is valid") // Static pattern, safe to panic
});

/// What the post-login fetch saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseReport {
    /// Number of `href="/..."` references on the root page.
    pub link_count: usize,
}

/// Counts site-relative link references in raw HTML.
#[must_use]
pub fn count_site_links(body: &str) -> usize {
    SITE_LINK_PATTERN.find_iter(body).count()
}

/// Fetches the root page with the authenticated session, reports the link
/// count and then waits `pause`.
///
/// Error statuses are not fatal here; whatever page came back is counted.
///
/// # Errors
///
/// Propagates network and timeout [`TransportError`]s.
#[instrument(level = "debug", skip(ctx, interaction), fields(url = %ctx.site().root()))]
pub async fn browse_website(
    ctx: &SessionContext,
    interaction: &mut dyn UserInteraction,
    pause: Duration,
) -> Result<BrowseReport, TransportError> {
    let response = ctx.get_any_status(ctx.site().root()).await?;
    if response.status >= 400 {
        warn!(http_status = response.status, "Tracker root returned an error page");
    }
    let link_count = count_site_links(&response.text());
    info!(link_count, http_status = response.status, final_url = %response.url, "Browsed tracker root");
    interaction.say(&format!("Found {link_count} site links"));

    if !pause.is_zero() {
        debug!(pause_ms = pause.as_millis(), "pausing after browse");
        tokio::time::sleep(pause).await;
    }
    Ok(BrowseReport { link_count })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::fake::FakeTransport;
    use crate::http::{SessionJar, SiteEndpoints};
    use crate::interaction::ScriptedInteraction;

    #[test]
    fn test_count_site_links() {
        let body = r#"<a href="/torrents.php">t</a> <a href="https://elsewhere/">x</a>
            <a href="/forums.php?action=viewforum">f</a><link href="/static/a.css">"#;
        assert_eq!(count_site_links(body), 3);
    }

    #[test]
    fn test_count_is_non_greedy_on_one_line() {
        assert_eq!(count_site_links(r#"href="/a" href="/b""#), 2);
    }

    #[test]
    fn test_count_ignores_single_quotes_and_relative_paths() {
        assert_eq!(count_site_links("href='/a' href=\"b.php\""), 0);
    }

    #[tokio::test]
    async fn test_browse_reports_count() {
        let site = SiteEndpoints::parse("https://tracker.test").unwrap();
        let jar = Arc::new(SessionJar::new(site.host()));
        let transport = FakeTransport::new(Arc::clone(&jar)).reply(
            200,
            "https://tracker.test/",
            r#"<a href="/index.php">home</a><a href="/user.php">me</a>"#,
        );
        let ctx = SessionContext::new(Box::new(transport), jar, site);
        let mut interaction = ScriptedInteraction::default();

        let report = browse_website(&ctx, &mut interaction, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.link_count, 2);
        assert_eq!(interaction.output(), ["Found 2 site links"]);
    }

    #[tokio::test]
    async fn test_browse_counts_links_on_error_status() {
        let site = SiteEndpoints::parse("https://tracker.test").unwrap();
        let jar = Arc::new(SessionJar::new(site.host()));
        let transport = FakeTransport::new(Arc::clone(&jar)).reply(
            500,
            "https://tracker.test/",
            r#"<a href="/index.php">retry</a>"#,
        );
        let ctx = SessionContext::new(Box::new(transport), jar, site);
        let mut interaction = ScriptedInteraction::default();

        let report = browse_website(&ctx, &mut interaction, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.link_count, 1);
        assert_eq!(interaction.output(), ["Found 1 site links"]);
    }

    #[tokio::test]
    async fn test_browse_propagates_transport_error() {
        let site = SiteEndpoints::parse("https://tracker.test").unwrap();
        let jar = Arc::new(SessionJar::new(site.host()));
        let transport = FakeTransport::new(Arc::clone(&jar))
            .fail(TransportError::timeout("https://tracker.test/"));
        let ctx = SessionContext::new(Box::new(transport), jar, site);
        let mut interaction = ScriptedInteraction::default();

        let result = browse_website(&ctx, &mut interaction, Duration::ZERO).await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert!(interaction.output().is_empty());
    }
}
