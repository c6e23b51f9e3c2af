// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod media;
pub mod notifier;
pub mod token_verifier;

pub use identity::{Credential, IdentityClient};
pub use media::MediaService;
pub use notifier::Notifier;
pub use token_verifier::{TokenVerifier, VerifiedClaims};
