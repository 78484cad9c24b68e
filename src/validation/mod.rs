//! Input validation module
//!
//! Field bounds are declared on the request types with `validator`; the
//! checks here add what the derive cannot express (trimmed-required text,
//! coordinate ranges, username charset, expiry in the future).

use crate::models::{IssueAdvisory, RegisterUser, ReviewReport, SubmitReport};
use chrono::{DateTime, Utc};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' is invalid ({reason})")]
    Invalid { field: String, reason: String },

    #[error("Field '{field}' is out of range ({min} to {max})")]
    OutOfRange { field: String, min: f64, max: f64 },

    #[error("Invalid username (letters, digits and @.+-_ only)")]
    InvalidUsername,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Expiry must be in the future")]
    ExpiryInPast,

    #[error("Malformed request: {0}")]
    Malformed(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing field in a stable order
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errs)) => ValidationError::Invalid {
                field: field.to_string(),
                reason: errs
                    .first()
                    .map(|e| e.code.to_string())
                    .unwrap_or_else(|| "invalid".to_string()),
            },
            None => ValidationError::Malformed("invalid input".to_string()),
        }
    }
}

/// Validate a report submission
pub fn validate_submit_report(input: &SubmitReport) -> Result<(), ValidationError> {
    input.validate()?;

    require_text("symptoms", &input.symptoms)?;
    require_text("location", &input.location)?;

    if let Some(latitude) = input.latitude {
        check_range("latitude", latitude, -90.0, 90.0)?;
    }
    if let Some(longitude) = input.longitude {
        check_range("longitude", longitude, -180.0, 180.0)?;
    }

    Ok(())
}

/// Validate an official review
pub fn validate_review(input: &ReviewReport) -> Result<(), ValidationError> {
    input.validate()?;
    Ok(())
}

/// Validate a new advisory against the current time
pub fn validate_issue_advisory(
    input: &IssueAdvisory,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    input.validate()?;

    require_text("title", &input.title)?;
    require_text("description", &input.description)?;
    require_text("region", &input.region)?;
    require_text("preventive_measures", &input.preventive_measures)?;

    if let Some(expires_at) = input.expires_at {
        if expires_at <= now {
            return Err(ValidationError::ExpiryInPast);
        }
    }

    Ok(())
}

/// Validate a user registration
pub fn validate_register_user(input: &RegisterUser) -> Result<(), ValidationError> {
    input.validate()?;

    require_text("username", &input.username)?;
    if !is_valid_username(input.username.trim()) {
        return Err(ValidationError::InvalidUsername);
    }

    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Trim optional free text, collapsing blank values to `None`
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AdvisoryPriority, DiseaseType, EnvironmentalCause, ReportStatus, Role,
    };
    use chrono::Duration;

    fn report() -> SubmitReport {
        SubmitReport {
            disease_type: DiseaseType::Respiratory,
            symptoms: "Persistent cough and wheezing".to_string(),
            environmental_cause: EnvironmentalCause::AirPollution,
            location: "Riverside District".to_string(),
            latitude: Some(51.5),
            longitude: Some(-0.12),
            affected_count: 3,
            additional_notes: String::new(),
        }
    }

    fn advisory() -> IssueAdvisory {
        IssueAdvisory {
            title: "Air quality warning".to_string(),
            description: "Smog levels are high".to_string(),
            priority: AdvisoryPriority::High,
            region: "Riverside".to_string(),
            related_cause: EnvironmentalCause::AirPollution,
            preventive_measures: "Stay indoors".to_string(),
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn test_validate_submit_report_valid() {
        assert!(validate_submit_report(&report()).is_ok());
    }

    #[test]
    fn test_validate_submit_report_zero_affected() {
        let input = SubmitReport {
            affected_count: 0,
            ..report()
        };
        assert!(matches!(
            validate_submit_report(&input),
            Err(ValidationError::Invalid { ref field, .. }) if field == "affected_count"
        ));
    }

    #[test]
    fn test_validate_submit_report_blank_location() {
        let input = SubmitReport {
            location: "   ".to_string(),
            ..report()
        };
        assert!(matches!(
            validate_submit_report(&input),
            Err(ValidationError::Required { ref field }) if field == "location"
        ));
    }

    #[test]
    fn test_validate_submit_report_location_too_long() {
        let input = SubmitReport {
            location: "x".repeat(201),
            ..report()
        };
        assert!(matches!(
            validate_submit_report(&input),
            Err(ValidationError::Invalid { ref field, .. }) if field == "location"
        ));
    }

    #[test]
    fn test_validate_submit_report_coordinates_out_of_range() {
        let input = SubmitReport {
            latitude: Some(91.0),
            ..report()
        };
        assert!(matches!(
            validate_submit_report(&input),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "latitude"
        ));

        let input = SubmitReport {
            longitude: Some(f64::NAN),
            ..report()
        };
        assert!(matches!(
            validate_submit_report(&input),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "longitude"
        ));
    }

    #[test]
    fn test_validate_submit_report_single_coordinate_allowed() {
        let input = SubmitReport {
            longitude: None,
            ..report()
        };
        assert!(validate_submit_report(&input).is_ok());
    }

    #[test]
    fn test_validate_review_notes_too_long() {
        let input = ReviewReport {
            status: ReportStatus::Verified,
            official_notes: Some("n".repeat(5001)),
        };
        assert!(validate_review(&input).is_err());

        let input = ReviewReport {
            status: ReportStatus::Verified,
            official_notes: None,
        };
        assert!(validate_review(&input).is_ok());
    }

    #[test]
    fn test_validate_issue_advisory_valid() {
        assert!(validate_issue_advisory(&advisory(), Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_issue_advisory_blank_region() {
        let input = IssueAdvisory {
            region: " ".to_string(),
            ..advisory()
        };
        assert!(matches!(
            validate_issue_advisory(&input, Utc::now()),
            Err(ValidationError::Required { ref field }) if field == "region"
        ));
    }

    #[test]
    fn test_validate_issue_advisory_expiry() {
        let now = Utc::now();
        let past = IssueAdvisory {
            expires_at: Some(now - Duration::hours(1)),
            ..advisory()
        };
        assert!(matches!(
            validate_issue_advisory(&past, now),
            Err(ValidationError::ExpiryInPast)
        ));

        let future = IssueAdvisory {
            expires_at: Some(now + Duration::days(7)),
            ..advisory()
        };
        assert!(validate_issue_advisory(&future, now).is_ok());
    }

    #[test]
    fn test_validate_register_user() {
        let valid = RegisterUser {
            username: "dr.okafor+ops".to_string(),
            email: Some("okafor@health.example.org".to_string()),
            role: Role::Official,
            organization: Some("District Health Office".to_string()),
            phone: None,
        };
        assert!(validate_register_user(&valid).is_ok());

        let bad_name = RegisterUser {
            username: "has space".to_string(),
            ..valid.clone()
        };
        assert!(matches!(
            validate_register_user(&bad_name),
            Err(ValidationError::InvalidUsername)
        ));

        let bad_email = RegisterUser {
            email: Some("not-an-email".to_string()),
            ..valid
        };
        assert!(matches!(
            validate_register_user(&bad_email),
            Err(ValidationError::Invalid { ref field, .. }) if field == "email"
        ));
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  ICT  ")), Some("ICT".to_string()));
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(None), None);
    }
}
