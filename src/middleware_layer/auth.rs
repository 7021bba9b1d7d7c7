use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::{Cookie, Cookies};

use crate::{models::session::SessionToken, state::AppState};

/// Extracts the session token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
/// * `name` - The session cookie name.
///
/// # Returns
///
/// An `Option` containing the token, or `None` when the cookie is absent or
/// does not hold a well-formed token.
pub fn extract_session_token(cookies: &Cookies, name: &str) -> Option<SessionToken> {
    let cookie = cookies.get(name)?;
    match cookie.value().parse() {
        Ok(token) => Some(token),
        Err(_) => {
            tracing::debug!("Ignoring malformed {} cookie", name);
            None
        }
    }
}

/// Tells the client to drop its session cookie, if it sent one.
pub fn remove_session_cookie(cookies: &Cookies, name: &str) {
    if cookies.get(name).is_some() {
        let mut session_cookie = Cookie::new(name.to_string(), "");
        session_cookie.set_path("/");
        cookies.remove(session_cookie);
    }
}

/// A middleware that requires a live session.
///
/// On success the caller's [`Profile`](crate::models::user::Profile) is
/// inserted as a request extension. Otherwise the client is sent to the login
/// page with `303 See Other`.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_session_token(&cookies, &state.config.cookie_name);

    match state.auth.require_user(token.as_ref()) {
        Ok(profile) => {
            tracing::debug!("✅ User authenticated: {}", profile.username);
            request.extensions_mut().insert(profile);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!("❌ Rejected unauthenticated request: {}", e);
            remove_session_cookie(&cookies, &state.config.cookie_name);
            e.into_response()
        }
    }
}
