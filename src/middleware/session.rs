// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie handling and request authentication.
//!
//! Sessions are carried in two HttpOnly cookies scoped to the whole site.
//! Neither cookie carries Max-Age, so they live for the browser session.
//! The Secure flag follows the deployment: on whenever the frontend is
//! served over https.

use crate::error::AppError;
use crate::services::VerifiedClaims;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Cookie holding the identity provider's ID token.
pub const ACCESS_COOKIE: &str = "session_access_token";
/// Cookie holding the refresh token for silent renewal.
pub const REFRESH_COOKIE: &str = "session_refresh_token";

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub picture: Option<String>,
}

impl From<VerifiedClaims> for AuthUser {
    fn from(claims: VerifiedClaims) -> Self {
        Self {
            uid: claims.uid,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.display_name,
            picture: claims.picture,
        }
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Add both session cookies to the jar.
pub fn store_session(jar: CookieJar, token: String, refresh_token: String, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, token, secure))
        .add(session_cookie(REFRESH_COOKIE, refresh_token, secure))
}

/// Expire both session cookies, whether or not they were present.
pub fn clear_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE, secure))
        .add(expired_cookie(REFRESH_COOKIE, secure))
}

/// Middleware that requires a verified ID token.
///
/// The token is taken from the access cookie first, then from a Bearer
/// header. A cookie that no longer verifies is expired in the 401 response
/// so the browser stops replaying it.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    // Try cookie first, then header
    let (token, from_cookie) = if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        (cookie.value().to_string(), true)
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => (h[7..].to_string(), false),
            _ => return AppError::Unauthorized.into_response(),
        }
    };

    match state.token_verifier.verify_id_token(&token).await {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser::from(claims));
            next.run(request).await
        }
        Err(AppError::Unauthorized) if from_cookie => {
            // Stale session cookie: expire it along with the rejection
            let secure = state.config.secure_cookies();
            (clear_session(jar, secure), AppError::Unauthorized).into_response()
        }
        Err(err) => err.into_response(),
    }
}
