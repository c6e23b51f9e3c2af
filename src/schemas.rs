// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request payloads and their validation rules.
//!
//! Rules run in declaration order and evaluation stops at the first
//! violation, which is returned tagged with the offending field so the
//! frontend can attach it to the right form control.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::ValidateEmail;

use crate::error::{AppError, Result};

fn violation(field: &'static str, message: impl Into<String>) -> AppError {
    AppError::Validation {
        field,
        message: message.into(),
    }
}

/// Minimum-length rule counting characters, not bytes.
fn require_min(field: &'static str, value: &str, min: usize, message: &str) -> Result<()> {
    if value.chars().count() < min {
        return Err(violation(field, message));
    }
    Ok(())
}

/// Empty and whitespace-only optionals are treated as absent.
fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(field: &'static str, label: &str, value: &str) -> Result<NaiveDate> {
    if value.is_empty() {
        return Err(violation(field, format!("{label} is required")));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| violation(field, format!("{label} must be a valid date (YYYY-MM-DD)")))
}

// ─── Profile ───

/// Raw profile payload as submitted by the frontend form.
///
/// Missing fields deserialize to empty strings so that the per-field rules
/// report them, instead of a shapeless body-rejection error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// A profile payload that passed validation: dates parsed, optionals
/// normalized.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub display_name: String,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub description: String,
    pub image: String,
    pub degree: String,
    pub field: Option<String>,
    pub institute: String,
    pub grade: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProfileInput {
    /// Run the profile rules in order, returning the first violation.
    pub fn validate(&self) -> Result<ProfileFields> {
        require_min(
            "display_name",
            &self.display_name,
            2,
            "Display name must contain at least 2 characters",
        )?;
        require_min(
            "username",
            &self.username,
            2,
            "Username must contain at least 2 characters",
        )?;
        if !self.email.validate_email() {
            return Err(violation("email", "Please enter a valid email address"));
        }
        let phone_number = normalize_optional(&self.phone_number);
        if let Some(phone) = &phone_number {
            if phone.chars().count() != 10 {
                return Err(violation(
                    "phone_number",
                    "Phone number must contain exactly 10 characters",
                ));
            }
        }
        let description_len = self.description.chars().count();
        if description_len < 50 {
            return Err(violation(
                "description",
                "Description must not be less than 50 characters",
            ));
        }
        if description_len > 500 {
            return Err(violation(
                "description",
                "Description must not exceed 500 characters",
            ));
        }
        if self.image.is_empty() {
            return Err(violation("image", "Image is required"));
        }
        require_min("degree", &self.degree, 2, "Degree is required")?;
        // `field` is optional free text, no rule
        require_min("institute", &self.institute, 2, "Institute is required")?;
        require_min("grade", &self.grade, 1, "Grade is required")?;
        let start_date = parse_date("start_date", "Start date", &self.start_date)?;
        let end_date = parse_date("end_date", "End date", &self.end_date)?;
        if start_date >= end_date {
            return Err(violation(
                "end_date",
                "End date must be later than start date",
            ));
        }

        Ok(ProfileFields {
            display_name: self.display_name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            phone_number,
            description: self.description.clone(),
            image: self.image.clone(),
            degree: self.degree.clone(),
            field: normalize_optional(&self.field),
            institute: self.institute.clone(),
            grade: self.grade.clone(),
            start_date,
            end_date,
        })
    }
}

// ─── Auth ───

/// Registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<()> {
        require_min("name", &self.name, 2, "Name is required")?;
        if !self.email.validate_email() {
            return Err(violation("email", "Please enter a valid email address"));
        }
        require_min(
            "password",
            &self.password,
            8,
            "Password must contain at least 8 characters",
        )?;
        let has_lower = self.password.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = self.password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());
        let has_special = self.password.chars().any(|c| c.is_ascii_punctuation());
        if !(has_lower && has_upper && has_digit && has_special) {
            return Err(violation(
                "password",
                "Password must contain uppercase, lowercase, number, and special character",
            ));
        }
        if self.confirm_password != self.password {
            return Err(violation(
                "confirm_password",
                "Password and confirm password must match",
            ));
        }
        Ok(())
    }
}

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<()> {
        if !self.email.validate_email() {
            return Err(violation("email", "Please enter a valid email address"));
        }
        require_min(
            "password",
            &self.password,
            8,
            "Password must contain at least 8 characters",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: AppError) -> &'static str {
        match err {
            AppError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn valid_profile() -> ProfileInput {
        ProfileInput {
            display_name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: Some("0123456789".to_string()),
            description: "a".repeat(60),
            image: "https://cdn.example.com/image/upload/v12/profile_images/ada.png".to_string(),
            degree: "BSc".to_string(),
            field: Some("Mathematics".to_string()),
            institute: "University of London".to_string(),
            grade: "A".to_string(),
            start_date: "2018-09-01".to_string(),
            end_date: "2021-06-30".to_string(),
        }
    }

    #[test]
    fn test_valid_profile_passes() {
        let fields = valid_profile().validate().expect("profile should validate");
        assert_eq!(fields.display_name, "Ada Lovelace");
        assert_eq!(fields.phone_number.as_deref(), Some("0123456789"));
        assert!(fields.start_date < fields.end_date);
    }

    #[test]
    fn test_first_violation_wins() {
        // Both display_name and email are invalid; the earlier rule reports
        let input = ProfileInput {
            display_name: "x".to_string(),
            email: "not-an-email".to_string(),
            ..valid_profile()
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "display_name");
    }

    #[test]
    fn test_email_grammar() {
        let input = ProfileInput {
            email: "missing-at-sign".to_string(),
            ..valid_profile()
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "email");
    }

    #[test]
    fn test_description_boundaries() {
        let too_short = ProfileInput {
            description: "a".repeat(49),
            ..valid_profile()
        };
        assert_eq!(field_of(too_short.validate().unwrap_err()), "description");

        let at_minimum = ProfileInput {
            description: "a".repeat(50),
            ..valid_profile()
        };
        assert!(at_minimum.validate().is_ok());

        let at_maximum = ProfileInput {
            description: "a".repeat(500),
            ..valid_profile()
        };
        assert!(at_maximum.validate().is_ok());

        let too_long = ProfileInput {
            description: "a".repeat(501),
            ..valid_profile()
        };
        assert_eq!(field_of(too_long.validate().unwrap_err()), "description");
    }

    #[test]
    fn test_phone_number_optional_but_exact() {
        let absent = ProfileInput {
            phone_number: None,
            ..valid_profile()
        };
        assert!(absent.validate().is_ok());

        // Empty string is coerced to absent
        let empty = ProfileInput {
            phone_number: Some(String::new()),
            ..valid_profile()
        };
        assert_eq!(empty.validate().unwrap().phone_number, None);

        let short = ProfileInput {
            phone_number: Some("123456789".to_string()),
            ..valid_profile()
        };
        assert_eq!(field_of(short.validate().unwrap_err()), "phone_number");

        let long = ProfileInput {
            phone_number: Some("01234567890".to_string()),
            ..valid_profile()
        };
        assert_eq!(field_of(long.validate().unwrap_err()), "phone_number");
    }

    #[test]
    fn test_image_checked_before_degree() {
        let input = ProfileInput {
            image: String::new(),
            degree: String::new(),
            ..valid_profile()
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "image");
    }

    #[test]
    fn test_date_ordering_reported_on_end_date() {
        let input = ProfileInput {
            start_date: "2024-05-01".to_string(),
            end_date: "2020-01-01".to_string(),
            ..valid_profile()
        };
        let err = input.validate().unwrap_err();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "end_date");
                assert!(message.contains("later than start date"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_dates_rejected() {
        let input = ProfileInput {
            start_date: "2022-01-01".to_string(),
            end_date: "2022-01-01".to_string(),
            ..valid_profile()
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "end_date");
    }

    #[test]
    fn test_unparseable_date() {
        let input = ProfileInput {
            start_date: "January 2020".to_string(),
            ..valid_profile()
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "start_date");
    }

    #[test]
    fn test_register_password_classes() {
        let input = RegisterInput {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "alllowercase1!".to_string(),
            confirm_password: "alllowercase1!".to_string(),
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "password");

        let input = RegisterInput {
            password: "Str0ng!pass".to_string(),
            confirm_password: "Str0ng!pass".to_string(),
            ..input
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_register_confirm_must_match() {
        let input = RegisterInput {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Str0ng!pass".to_string(),
            confirm_password: "Str0ng!pass2".to_string(),
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "confirm_password");
    }

    #[test]
    fn test_login_rules() {
        let input = LoginInput {
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };
        assert_eq!(field_of(input.validate().unwrap_err()), "password");
    }
}
