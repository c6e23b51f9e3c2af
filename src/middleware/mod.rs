// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (session auth, route guard, security headers).

pub mod guard;
pub mod security;
pub mod session;

pub use guard::route_guard;
pub use session::{require_session, AuthUser};
