// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication and session routes.
//!
//! Email/password flows call the identity provider directly. Social
//! sign-in runs a server-side OAuth handshake with a signed state
//! parameter, then exchanges the provider credential for identity tokens.
//! Every successful path ends in `persist_session`, which is the only
//! place session cookies are written.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::session::{clear_session, store_session, REFRESH_COOKIE};
use crate::models::User;
use crate::schemas::{LoginInput, RegisterInput};
use crate::services::VerifiedClaims;
use crate::time_utils::now_rfc3339;
use crate::AppState;

#[cfg(feature = "binding-generation")]
use ts_rs::TS;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state parameter stays acceptable.
const STATE_TTL_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", get(google_authorize))
        .route("/auth/github", get(github_authorize))
        .route("/auth/callback", get(oauth_callback))
        .route("/auth/session", post(session))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Established-session response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    /// True when this sign-in created the user document
    pub is_new_user: bool,
}

/// Verify a token pair and establish the session.
///
/// Nothing is written when verification fails. On success both session
/// cookies are added to the jar and the user document is created on first
/// sight or has its `last_login_at` touched on every later one.
async fn persist_session(
    state: &Arc<AppState>,
    jar: CookieJar,
    token: &str,
    refresh_token: &str,
) -> Result<(CookieJar, VerifiedClaims, bool)> {
    let claims = state.token_verifier.verify_id_token(token).await?;

    let jar = store_session(
        jar,
        token.to_string(),
        refresh_token.to_string(),
        state.config.secure_cookies(),
    );

    let now = now_rfc3339();
    let (user, created) = match state.db.get_user(&claims.uid).await? {
        Some(mut user) => {
            user.last_login_at = now;
            (user, false)
        }
        None => (
            User {
                uid: claims.uid.clone(),
                email: claims.email.clone(),
                display_name: claims.display_name.clone(),
                picture: claims.picture.clone(),
                role: "user".to_string(),
                email_verified: claims.email_verified,
                created_at: now.clone(),
                last_login_at: now,
            },
            true,
        ),
    };

    state.db.upsert_user(&user).await?;

    if created {
        tracing::info!(uid = %user.uid, "User document created");
    }

    Ok((jar, claims, created))
}

fn session_response(claims: VerifiedClaims, created: bool) -> Json<SessionResponse> {
    Json(SessionResponse {
        uid: claims.uid,
        email: claims.email,
        email_verified: claims.email_verified,
        is_new_user: created,
    })
}

/// Create an email/password account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(input): Json<RegisterInput>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    input.validate()?;

    let cred = state.identity.sign_up(&input.email, &input.password).await?;

    // Account exists from here on; cosmetic follow-ups must not undo that
    if let Err(err) = state
        .identity
        .set_display_name(&cred.id_token, &input.name)
        .await
    {
        tracing::warn!(error = %err, "Failed to set display name on new account");
    }

    let continue_url = format!("{}/auth/login", state.config.frontend_url);
    if let Err(err) = state
        .identity
        .send_email_verification(&cred.id_token, &continue_url)
        .await
    {
        tracing::warn!(error = %err, "Failed to send verification email");
    }

    let (jar, claims, created) =
        persist_session(&state, jar, &cred.id_token, &cred.refresh_token).await?;

    Ok((jar, session_response(claims, created)))
}

/// Email/password sign-in.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    input.validate()?;

    let cred = state
        .identity
        .sign_in_with_password(&input.email, &input.password)
        .await?;

    let (jar, claims, created) =
        persist_session(&state, jar, &cred.id_token, &cred.refresh_token).await?;

    Ok((jar, session_response(claims, created)))
}

/// Persist a token pair the client obtained itself.
async fn session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionBody>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let (jar, claims, created) =
        persist_session(&state, jar, &body.token, &body.refresh_token).await?;

    Ok((jar, session_response(claims, created)))
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    token: String,
    #[serde(default)]
    refresh_token: String,
}

/// Exchange the refresh cookie for fresh tokens.
async fn refresh(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let secure = state.config.secure_cookies();

    let Some(refresh_token) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return AppError::Unauthorized.into_response();
    };

    let cred = match state.identity.refresh_session(&refresh_token).await {
        Ok(cred) => cred,
        Err(AppError::Unauthorized) => {
            // Dead refresh token: expire the cookies with the rejection,
            // otherwise the browser keeps replaying it
            return (clear_session(jar, secure), AppError::Unauthorized).into_response();
        }
        Err(err) => return err.into_response(),
    };

    match persist_session(&state, jar, &cred.id_token, &cred.refresh_token).await {
        Ok((jar, claims, created)) => (jar, session_response(claims, created)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Clear both session cookies, whether or not a session exists.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        clear_session(jar, state.config.secure_cookies()),
        StatusCode::NO_CONTENT,
    )
}

/// Start the Google OAuth flow.
async fn google_authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let oauth_state = sign_state(
        "google",
        &state.config.frontend_url,
        &state.config.oauth_state_key,
    )?;
    let callback_url = callback_url_from_headers(&headers);

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         state={}",
        state.config.google_client_id,
        urlencoding::encode(&callback_url),
        urlencoding::encode("openid email profile"),
        oauth_state
    );

    tracing::info!(provider = "google", "Starting OAuth flow");

    Ok(Redirect::temporary(&auth_url))
}

/// Start the GitHub OAuth flow.
async fn github_authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let oauth_state = sign_state(
        "github",
        &state.config.frontend_url,
        &state.config.oauth_state_key,
    )?;
    let callback_url = callback_url_from_headers(&headers);

    let auth_url = format!(
        "https://github.com/login/oauth/authorize?\
         client_id={}&\
         redirect_uri={}&\
         scope={}&\
         state={}",
        state.config.github_client_id,
        urlencoding::encode(&callback_url),
        urlencoding::encode("read:user user:email"),
        oauth_state
    );

    tracing::info!(provider = "github", "Starting OAuth flow");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Shared OAuth callback. The provider is carried in the state parameter.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    // Recover the provider and frontend from the state; fall back to the
    // configured frontend so even a tampered state lands somewhere sane
    let decoded = params
        .state
        .as_deref()
        .and_then(|s| verify_and_decode_state(s, &state.config.oauth_state_key));

    let frontend_url = decoded
        .as_ref()
        .map(|(_, url)| url.clone())
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let failure = Redirect::temporary(&format!("{}/auth/login?error=auth_failed", frontend_url));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth provider returned an error");
        return (jar, failure);
    }

    let Some((provider, _)) = decoded else {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return (jar, failure);
    };

    let Some(code) = params.code else {
        tracing::warn!(provider = %provider, "OAuth callback without a code");
        return (jar, failure);
    };

    // Must match the redirect_uri the authorize step sent
    let callback_url = callback_url_from_headers(&headers);

    let exchanged = match provider.as_str() {
        "google" => {
            state
                .identity
                .sign_in_with_google_code(&code, &callback_url)
                .await
        }
        "github" => {
            state
                .identity
                .sign_in_with_github_code(&code, &callback_url)
                .await
        }
        other => {
            tracing::warn!(provider = %other, "Unknown provider in OAuth state");
            return (jar, failure);
        }
    };

    let cred = match exchanged {
        Ok(cred) => cred,
        Err(err) => {
            tracing::warn!(provider = %provider, error = %err, "OAuth code exchange failed");
            return (jar, failure);
        }
    };

    match persist_session(&state, jar, &cred.id_token, &cred.refresh_token).await {
        Ok((jar, _, _)) => {
            tracing::info!(provider = %provider, uid = %cred.uid, "OAuth sign-in complete");
            let landing = if cred.is_new_user {
                format!("{}/profile/setup", frontend_url)
            } else {
                format!("{}/", frontend_url)
            };
            (jar, Redirect::temporary(&landing))
        }
        Err(err) => {
            tracing::warn!(provider = %provider, error = %err, "Session persistence failed");
            (CookieJar::new(), failure)
        }
    }
}

/// Callback URL on this service, derived from the request's Host header.
fn callback_url_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/callback", scheme, host)
}

/// Build the signed OAuth state: "provider|frontend_url|timestamp_hex|sig".
fn sign_state(provider: &str, frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{}|{:x}", provider, frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));

    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the OAuth state and decode `(provider, frontend_url)` from it.
///
/// Rejects bad signatures and states older than [`STATE_TTL_MS`].
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "provider|frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(4, '|').collect();
    if parts.len() != 4 {
        return None;
    }

    let provider = parts[0];
    let frontend_url = parts[1];
    let timestamp_hex = parts[2];
    let signature_hex = parts[3];

    // Reconstruct payload and verify signature
    let payload = format!("{}|{}|{}", provider, frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_millis();

    if now_ms.saturating_sub(issued_ms) > STATE_TTL_MS {
        tracing::warn!("Expired OAuth state parameter");
        return None;
    }

    Some((provider.to_string(), frontend_url.to_string()))
}
