// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cookie-presence route guard.
//!
//! Decides purely from the request path and whether the access cookie is
//! present. Token verification happens later in `require_session`; this
//! layer only steers browsers away from pages they should not be on.

use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::session::ACCESS_COOKIE;

/// Routing outcome for a request, before any handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request through to routing.
    Allow,
    /// Anonymous request for a protected page.
    RedirectToLogin,
    /// Signed-in request for a sign-in page.
    RedirectToHome,
}

/// Classify a request from its path and cookie presence alone.
pub fn guard_decision(path: &str, cookie_present: bool) -> GuardDecision {
    let protected = path == "/profile" || path.starts_with("/profile/");
    if protected && !cookie_present {
        return GuardDecision::RedirectToLogin;
    }

    if cookie_present && (path == "/auth/login" || path == "/auth/register") {
        return GuardDecision::RedirectToHome;
    }

    GuardDecision::Allow
}

/// Middleware applying [`guard_decision`] to navigations.
///
/// Redirects only make sense for GET navigations; API verbs fall through
/// to the session layer, which answers with JSON errors.
pub async fn route_guard(jar: CookieJar, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let cookie_present = jar.get(ACCESS_COOKIE).is_some();

    match guard_decision(request.uri().path(), cookie_present) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectToLogin => Redirect::temporary("/auth/login").into_response(),
        GuardDecision::RedirectToHome => Redirect::temporary("/").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_paths_require_cookie() {
        assert_eq!(
            guard_decision("/profile", false),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            guard_decision("/profile/abc-123", false),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            guard_decision("/profile/image", false),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_cookie_passes_protected_paths() {
        assert_eq!(guard_decision("/profile", true), GuardDecision::Allow);
        assert_eq!(guard_decision("/profile/abc-123", true), GuardDecision::Allow);
    }

    #[test]
    fn test_signed_in_leaves_auth_pages() {
        assert_eq!(
            guard_decision("/auth/login", true),
            GuardDecision::RedirectToHome
        );
        assert_eq!(
            guard_decision("/auth/register", true),
            GuardDecision::RedirectToHome
        );
    }

    #[test]
    fn test_anonymous_reaches_auth_pages() {
        assert_eq!(guard_decision("/auth/login", false), GuardDecision::Allow);
        assert_eq!(guard_decision("/auth/register", false), GuardDecision::Allow);
    }

    #[test]
    fn test_other_paths_always_allowed() {
        assert_eq!(guard_decision("/", false), GuardDecision::Allow);
        assert_eq!(guard_decision("/", true), GuardDecision::Allow);
        assert_eq!(guard_decision("/health", false), GuardDecision::Allow);
        assert_eq!(guard_decision("/auth/logout", true), GuardDecision::Allow);
        // Similar prefix, different resource
        assert_eq!(guard_decision("/profiles", false), GuardDecision::Allow);
    }
}
