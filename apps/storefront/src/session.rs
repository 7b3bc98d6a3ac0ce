//! # Visitor Session Cookie
//!
//! Every request gets a [`SessionId`] in its extensions. A missing or
//! malformed `comptoir_session` cookie is replaced by a fresh id, which is
//! sent back in `Set-Cookie`. A handler that rotates the session (login)
//! sets its own cookie and the layer leaves it alone.

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use comptoir_checkout::SessionId;
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "comptoir_session";

/// Reads the session id from the `Cookie` headers.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

/// Appends the `Set-Cookie` header that hands `session` to the browser.
pub fn set_session_cookie(headers: &mut HeaderMap, session: &SessionId) {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Unusable session cookie"),
    }
}

fn sets_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&format!("{}=", SESSION_COOKIE)))
}

pub async fn session_layer(mut request: Request, next: Next) -> Response {
    let (session, issued) = match session_from_headers(request.headers()) {
        Some(session) => (session, false),
        None => (SessionId::new(), true),
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if issued && !sets_session_cookie(response.headers()) {
        debug!(session = %session, "Issued visitor session");
        set_session_cookie(response.headers_mut(), &session);
    }

    response
}
