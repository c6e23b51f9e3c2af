// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! EmberSync: Session and profile backend.
//!
//! This crate provides the backend API that bridges identity-provider
//! tokens into cookie sessions and manages member profiles, including
//! image uploads and change notifications.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schemas;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::FirestoreDb;
use services::{IdentityClient, MediaService, Notifier, TokenVerifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityClient,
    pub token_verifier: Arc<TokenVerifier>,
    pub media: MediaService,
    pub notifier: Notifier,
}
