// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EmberSync API Server
//!
//! Bridges identity-provider tokens into cookie-based sessions and serves
//! member profiles, including image uploads and change notifications.

use embersync::{
    config::Config,
    db::FirestoreDb,
    services::{IdentityClient, MediaService, Notifier, TokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting EmberSync API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // ID token verifier with cached provider keys
    let token_verifier =
        Arc::new(TokenVerifier::new(&config).expect("Failed to initialize token verifier"));

    // Identity provider REST client
    let identity = IdentityClient::new(&config);
    tracing::info!(project = %config.gcp_project_id, "Identity client initialized");

    // Media store for profile images
    let media = MediaService::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    );

    // SMTP notifier for profile-change emails
    let notifier = Notifier::new(
        config.smtp_host.clone(),
        config.smtp_port,
        config.smtp_mail.clone(),
        config.smtp_pass.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        token_verifier,
        media,
        notifier,
    });

    // Build router
    let app = embersync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("embersync=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
