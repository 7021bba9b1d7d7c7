use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    error::Result,
    middleware_layer::auth::{extract_session_token, remove_session_cookie},
    models::user::{CurrentUser, Profile},
    services::auth::{IssuedSession, NewAccount},
    state::AppState,
    validation::auth::{not_blank_if_present, username_chars},
};

/// The request payload for signup.
///
/// Wiped from memory when dropped.
#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct SignupRequest {
    #[garde(length(max = 100), custom(not_blank_if_present))]
    pub firstname: String,
    #[garde(length(max = 100), custom(not_blank_if_present))]
    pub lastname: String,
    #[garde(length(min = 1, max = 64), custom(username_chars))]
    pub username: String,
    #[garde(length(min = 1, max = 128))]
    pub password1: String,
    #[garde(length(max = 128))]
    pub password2: String,
}

/// The request payload for login.
#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct LoginRequest {
    #[garde(length(min = 1, max = 64), custom(username_chars))]
    pub username: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Who the caller is; `null` when anonymous.
#[derive(Serialize)]
pub struct CurrentUserResponse {
    pub user: Option<Profile>,
}

/// Describes a form the client should submit; stands in for an HTML page.
#[derive(Serialize)]
pub struct FormResponse {
    pub action: &'static str,
    pub fields: &'static [&'static str],
}

/// Builds the session cookie.
///
/// `HttpOnly`, `SameSite=Lax`, scoped to `/`, and `Secure` when the service
/// runs behind TLS.
fn session_cookie(name: &str, issued: &IssuedSession, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), issued.token.to_cookie_value());
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(issued.ttl.num_seconds()));
    cookie.set_path("/");
    cookie
}

/// The signup form.
pub async fn signup_form() -> Json<FormResponse> {
    Json(FormResponse {
        action: "/signup",
        fields: &["firstname", "lastname", "username", "password1", "password2"],
    })
}

/// The login form. Clients without a session are redirected here.
pub async fn login_form() -> Json<FormResponse> {
    Json(FormResponse {
        action: "/login",
        fields: &["username", "password"],
    })
}

/// Handles signup.
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SignupRequest>,
) -> Result<Response> {
    payload.validate()?;
    tracing::info!("📝 Signup attempt for: {}", payload.username);

    let issued = state
        .auth
        .signup(NewAccount {
            first: &payload.firstname,
            last: &payload.lastname,
            username: &payload.username,
            password: &payload.password1,
            password_confirmation: &payload.password2,
        })
        .await?;

    cookies.add(session_cookie(
        &state.config.cookie_name,
        &issued,
        state.config.secure_cookies,
    ));
    tracing::info!("✅ Session cookie added for: {}", payload.username);

    let response = AuthResponse {
        success: true,
        message: "Signup successful. Welcome!".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    payload.validate()?;
    tracing::info!("🔐 Login attempt for: {}", payload.username);

    let issued = state.auth.login(&payload.username, &payload.password).await?;

    cookies.add(session_cookie(
        &state.config.cookie_name,
        &issued,
        state.config.secure_cookies,
    ));
    tracing::info!("✅ Session cookie added for: {}", payload.username);

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles logout. Succeeds whether or not a session existed.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    let name = &state.config.cookie_name;
    let token = extract_session_token(&cookies, name);
    state.auth.logout(token.as_ref());
    remove_session_cookie(&cookies, name);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Reports the caller's identity, or `null` for anonymous callers.
#[axum::debug_handler]
pub async fn index(State(state): State<AppState>, cookies: Cookies) -> Json<CurrentUserResponse> {
    let token = extract_session_token(&cookies, &state.config.cookie_name);
    let current = state.auth.resolve_current_user(token.as_ref());
    if current == CurrentUser::Anonymous {
        remove_session_cookie(&cookies, &state.config.cookie_name);
    }

    Json(CurrentUserResponse {
        user: current.profile().cloned(),
    })
}

/// A page only logged-in users may see; sits behind `require_auth`.
#[axum::debug_handler]
pub async fn loggedin(Extension(profile): Extension<Profile>) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: Some(profile),
    })
}
