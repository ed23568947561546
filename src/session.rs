//! Per-browser session identity carried in a signed cookie.
//!
//! The cookie only holds an opaque UUID. A missing, unsigned or tampered cookie
//! gets a fresh id, so every request reaching a location handler has a user.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use uuid::Uuid;

use crate::routes::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "user-session";

/// Minimum key length accepted by the cookie signer.
const MIN_KEY_BYTES: usize = 64;

/// Session user id, available to handlers as `Extension<UserId>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Build the cookie signing key from the configured secret.
///
/// Secrets shorter than 64 bytes are rejected in favour of a random key, which
/// invalidates every session on restart.
pub fn signing_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) if secret.len() >= MIN_KEY_BYTES => match Key::try_from(secret.as_bytes()) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Invalid SESSION_SECRET ({}), using a random key", e);
                Key::generate()
            }
        },
        Some(_) => {
            tracing::warn!(
                "SESSION_SECRET shorter than {} bytes, using a random key",
                MIN_KEY_BYTES
            );
            Key::generate()
        }
        None => {
            tracing::info!("No SESSION_SECRET set, sessions will not survive a restart");
            Key::generate()
        }
    }
}

/// Middleware resolving the session user, minting one when needed.
pub async fn user_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    match existing {
        Some(user_id) => {
            request.extensions_mut().insert(UserId(user_id.to_string()));
            next.run(request).await
        }
        None => {
            let user_id = Uuid::new_v4();
            tracing::debug!("Starting new session {}", user_id);

            let max_age_secs = i64::try_from(state.session_max_age.as_secs()).unwrap_or(i64::MAX);
            let cookie = Cookie::build((SESSION_COOKIE, user_id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::seconds(max_age_secs));

            request.extensions_mut().insert(UserId(user_id.to_string()));
            let response = next.run(request).await;
            (jar.add(cookie), response).into_response()
        }
    }
}
