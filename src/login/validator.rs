use tracing::{debug, instrument};

use super::SessionContext;
use crate::http::{RedirectPolicy, TransportError};

/// Result of the session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The tracker served its root page to this session.
    Valid,
    /// The tracker answered with anything else (usually a redirect to login).
    Invalid,
}

/// Requests the site root without following redirects.
///
/// Exactly `200` means the session is accepted. Transport failures,
/// including 4xx/5xx raised by the transport, are returned unchanged.
///
/// # Errors
///
/// Propagates [`TransportError`].
#[instrument(level = "debug", skip(ctx), fields(url = %ctx.site().root()))]
pub async fn check_session(ctx: &SessionContext) -> Result<SessionStatus, TransportError> {
    let response = ctx.get(ctx.site().root(), RedirectPolicy::Manual).await?;
    let status = if response.status == 200 {
        SessionStatus::Valid
    } else {
        SessionStatus::Invalid
    };
    debug!(http_status = response.status, ?status, "session check finished");
    Ok(status)
}
