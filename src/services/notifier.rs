// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile-change email notifications.
//!
//! Every successful profile update produces exactly one email to the
//! updated profile's address, listing which of the watched fields changed.
//! An update that changed nothing still sends, with a no-changes body.
//! Delivery failures are reported to the caller, who downgrades them to a
//! warning; notification must never fail an update.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::AppError;
use crate::models::Profile;

/// Subject line for profile update notifications.
pub const UPDATE_SUBJECT: &str = "Profile updated successfully.";

/// A single reported field change.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

#[derive(Clone)]
struct SmtpSettings {
    host: String,
    port: u16,
    credentials: Credentials,
}

/// Email notifier backed by an SMTP relay.
#[derive(Clone)]
pub struct Notifier {
    /// None means offline mock mode
    smtp: Option<SmtpSettings>,
    from_email: String,
}

impl Notifier {
    /// Create a notifier from mail-relay settings.
    ///
    /// The relay username doubles as the sender address.
    pub fn new(host: String, port: u16, mail: String, pass: String) -> Self {
        Self {
            smtp: Some(SmtpSettings {
                host,
                port,
                credentials: Credentials::new(mail.clone(), pass),
            }),
            from_email: mail,
        }
    }

    /// Create a mock notifier for testing (offline mode).
    ///
    /// Sends are logged and succeed without any network traffic.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            smtp: None,
            from_email: "noreply@embersync.test".to_string(),
        }
    }

    /// Send the profile-update notification to the post-update address.
    pub async fn notify_profile_updated(
        &self,
        before: &Profile,
        after: &Profile,
    ) -> Result<(), AppError> {
        let changes = changed_fields(before, after);
        let html = render_update_email(after, &changes);
        let to = after.email.clone();

        // Mock mode (Debug builds only)
        #[cfg(debug_assertions)]
        {
            if self.smtp.is_none() {
                tracing::debug!(to = %to, changes = changes.len(), "Mock profile-update email");
                return Ok(());
            }
        }

        let settings = self
            .smtp
            .as_ref()
            .ok_or_else(|| AppError::Upstream("Mail relay not configured (offline mode)".to_string()))?;

        let email = Message::builder()
            .from(
                format!("EmberSync <{}>", self.from_email)
                    .parse()
                    .map_err(|e| AppError::Upstream(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Upstream(format!("Invalid to address: {e}")))?)
            .subject(UPDATE_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| AppError::Upstream(format!("Failed to build email: {e}")))?;

        let mailer = SmtpTransport::relay(&settings.host)
            .map_err(|e| AppError::Upstream(format!("SMTP relay error: {e}")))?
            .port(settings.port)
            .credentials(settings.credentials.clone())
            .build();

        // SmtpTransport::send is blocking
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AppError::Upstream(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AppError::Upstream(format!("Email task failed: {e}")))??;

        tracing::info!(to = %after.email, changes = changes.len(), "Profile-update email sent");
        Ok(())
    }
}

/// The watched fields, in render order, with absent optionals as "N/A".
fn field_snapshot(profile: &Profile) -> [(&'static str, String); 9] {
    let optional = |value: &Option<String>| match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "N/A".to_string(),
    };

    [
        ("display_name", profile.display_name.clone()),
        ("username", profile.username.clone()),
        ("email", profile.email.clone()),
        ("phone_number", optional(&profile.phone_number)),
        ("description", profile.description.clone()),
        ("degree", profile.degree.clone()),
        ("field", optional(&profile.field)),
        ("institute", profile.institute.clone()),
        ("grade", profile.grade.clone()),
    ]
}

/// Compare the watched fields of two profile snapshots.
pub fn changed_fields(before: &Profile, after: &Profile) -> Vec<FieldChange> {
    field_snapshot(before)
        .into_iter()
        .zip(field_snapshot(after))
        .filter(|((_, before_value), (_, after_value))| before_value != after_value)
        .map(|((field, before_value), (_, after_value))| FieldChange {
            field,
            before: before_value,
            after: after_value,
        })
        .collect()
}

/// Render the notification body.
fn render_update_email(after: &Profile, changes: &[FieldChange]) -> String {
    let changes_html = if changes.is_empty() {
        "No details were changed in your profile.".to_string()
    } else {
        let items: String = changes
            .iter()
            .map(|change| {
                format!(
                    "<li><strong>{}:</strong> changed from \"{}\" to \"{}\"</li>",
                    change.field.to_uppercase(),
                    change.before,
                    change.after
                )
            })
            .collect();
        format!(
            "<p>The following changes were made to your profile:</p><ul>{items}</ul>"
        )
    };

    format!(
        r#"<div style="font-family: sans-serif; padding: 20px;">
  <p>Hello {},</p>
  <p>This is a confirmation that your profile has been successfully updated.</p>
  {changes_html}
  <p>If you did not make this change, please contact support immediately.</p>
</div>"#,
        after.display_name
    )
}
