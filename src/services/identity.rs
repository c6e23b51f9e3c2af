// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider REST client.
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - Social sign-in (authorization-code exchange + IdP credential exchange)
//! - Session refresh via the token endpoint
//! - Verification email and display-name updates
//!
//! Provider error codes are mapped to the application taxonomy here so
//! handlers never see raw upstream payloads.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// Result of a successful credential exchange with the identity provider.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Subject id assigned by the provider
    pub uid: String,
    pub email: Option<String>,
    /// Short-lived ID token, the session bearer credential
    pub id_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Whether this exchange created the account
    pub is_new_user: bool,
}

/// Identity provider API client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: String,
    /// requestUri reported on IdP exchanges, the public frontend origin
    request_uri: String,
    google_client_id: String,
    google_client_secret: String,
    github_client_id: String,
    github_client_secret: String,
}

impl IdentityClient {
    /// Create a new identity client.
    pub fn new(config: &Config) -> Self {
        Self::with_base_urls(config, IDENTITY_BASE_URL, TOKEN_URL)
    }

    /// Create a client against explicit endpoints.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn with_base_urls(config: &Config, base_url: &str, token_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            api_key: config.identity_api_key.clone(),
            request_uri: config.frontend_url.clone(),
            google_client_id: config.google_client_id.clone(),
            google_client_secret: config.google_client_secret.clone(),
            github_client_id: config.github_client_id.clone(),
            github_client_secret: config.github_client_secret.clone(),
        }
    }

    /// Create an email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Credential, AppError> {
        let url = self.endpoint("accounts:signUp");
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response: SignInResponse = self.post_identity_json(&url, &body).await?;
        tracing::info!(uid = %response.local_id, "Account created");

        Ok(Credential {
            uid: response.local_id,
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            is_new_user: true,
        })
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Credential, AppError> {
        let url = self.endpoint("accounts:signInWithPassword");
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response: SignInResponse = self.post_identity_json(&url, &body).await?;

        Ok(Credential {
            uid: response.local_id,
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            is_new_user: false,
        })
    }

    /// Complete a Google sign-in from an authorization code.
    pub async fn sign_in_with_google_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AppError> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.google_client_id.as_str()),
                ("client_secret", self.google_client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Google code exchange failed: {e}")))?;

        let tokens: GoogleTokenResponse = check_provider_json(response).await?;
        let post_body = format!(
            "id_token={}&providerId=google.com",
            urlencoding::encode(&tokens.id_token)
        );
        self.sign_in_with_idp(&post_body).await
    }

    /// Complete a GitHub sign-in from an authorization code.
    pub async fn sign_in_with_github_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AppError> {
        let response = self
            .http
            .post(GITHUB_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("code", code),
                ("client_id", self.github_client_id.as_str()),
                ("client_secret", self.github_client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub code exchange failed: {e}")))?;

        let tokens: GithubTokenResponse = check_provider_json(response).await?;
        let post_body = format!(
            "access_token={}&providerId=github.com",
            urlencoding::encode(&tokens.access_token)
        );
        self.sign_in_with_idp(&post_body).await
    }

    /// Exchange a provider credential for identity tokens.
    async fn sign_in_with_idp(&self, post_body: &str) -> Result<Credential, AppError> {
        let url = self.endpoint("accounts:signInWithIdp");
        let body = serde_json::json!({
            "postBody": post_body,
            "requestUri": self.request_uri,
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });

        let response: IdpSignInResponse = self.post_identity_json(&url, &body).await?;

        Ok(Credential {
            uid: response.local_id,
            email: response.email,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            is_new_user: response.is_new_user.unwrap_or(false),
        })
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Credential, AppError> {
        let url = format!("{}?key={}", self.token_url, self.api_key);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token refresh request failed: {e}")))?;

        let tokens: RefreshResponse = check_identity_json(response).await?;

        Ok(Credential {
            uid: tokens.user_id,
            email: None,
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            is_new_user: false,
        })
    }

    /// Send the address-verification email for a fresh account.
    ///
    /// `continue_url` is where the verification link lands afterwards.
    pub async fn send_email_verification(
        &self,
        id_token: &str,
        continue_url: &str,
    ) -> Result<(), AppError> {
        let url = self.endpoint("accounts:sendOobCode");
        let body = serde_json::json!({
            "requestType": "VERIFY_EMAIL",
            "idToken": id_token,
            "continueUrl": continue_url,
        });

        let _: OobCodeResponse = self.post_identity_json(&url, &body).await?;
        Ok(())
    }

    /// Set the account display name.
    pub async fn set_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<(), AppError> {
        let url = self.endpoint("accounts:update");
        let body = serde_json::json!({
            "idToken": id_token,
            "displayName": display_name,
            "returnSecureToken": false,
        });

        let _: AccountUpdateResponse = self.post_identity_json(&url, &body).await?;
        Ok(())
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}?key={}", self.base_url, method, self.api_key)
    }

    /// POST a JSON body to an identity endpoint and parse the response.
    async fn post_identity_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity request failed: {e}")))?;

        check_identity_json(response).await
    }
}

/// Check an identity-endpoint response, mapping provider error codes.
async fn check_identity_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<IdentityErrorBody>(&body) {
            return Err(map_identity_error(status, &parsed.error.message));
        }

        return Err(AppError::Upstream(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {e}")))
}

/// Check a provider token-endpoint response (Google/GitHub OAuth).
async fn check_provider_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {e}")))
}

/// Map identity-provider error codes to the application taxonomy.
///
/// Codes sometimes arrive with a suffix ("WEAK_PASSWORD : ..."), so match
/// on the first token.
fn map_identity_error(status: StatusCode, message: &str) -> AppError {
    let code = message.split_whitespace().next().unwrap_or(message);
    match code {
        "EMAIL_EXISTS" => AppError::Conflict(
            "This email is already registered. Please try logging in.".to_string(),
        ),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "USER_NOT_FOUND" | "INVALID_ID_TOKEN" | "INVALID_REFRESH_TOKEN" | "TOKEN_EXPIRED" => {
            AppError::Unauthorized
        }
        "WEAK_PASSWORD" => AppError::Validation {
            field: "password",
            message: "Password is too weak".to_string(),
        },
        _ => AppError::Upstream(format!("HTTP {status}: {message}")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdpSignInResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    is_new_user: Option<bool>,
}

/// Token endpoint uses snake_case, unlike the accounts endpoints.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTokenResponse {
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct OobCodeResponse {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct AccountUpdateResponse {
    local_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorDetail {
    message: String,
}
