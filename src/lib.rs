//! Cookie-bound session authentication.
//!
//! Users sign up or log in with a username and password; the server answers
//! with an opaque session token in an `HttpOnly` cookie and resolves that
//! token back to the user on every later request.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod password;
}

pub mod models {
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod auth;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Request bodies here are small forms.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/loggedin", get(handlers::auth::loggedin))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/", get(handlers::auth::index))
        .route(
            "/signup",
            get(handlers::auth::signup_form).post(handlers::auth::signup),
        )
        .route(
            "/login",
            get(handlers::auth::login_form).post(handlers::auth::login),
        )
        .route("/logout", post(handlers::auth::logout))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
