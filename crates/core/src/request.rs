//! Generation request submitted by the user.
//!
//! Field constraints mirror the input form of the landing-page service:
//! name-like fields need at least 2 characters and free-text fields at
//! least 10. Lengths are measured in characters, not bytes, so Japanese
//! input validates the same way it is displayed.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Minimum length for name-like fields.
pub const MIN_NAME_LEN: u64 = 2;
/// Minimum length for free-text fields.
pub const MIN_TEXT_LEN: u64 = 10;

/// Business inputs for one landing-page generation.
///
/// Immutable once submitted: the controller takes it by value and the
/// backend keeps its own copy for retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[validate(length(min = 2, message = "serviceName must be at least 2 characters"))]
    pub service_name: String,

    #[validate(length(min = 2, message = "serviceType must be at least 2 characters"))]
    pub service_type: String,

    #[validate(length(min = 2, message = "targetAudience must be at least 2 characters"))]
    pub target_audience: String,

    #[validate(length(min = 10, message = "features must be at least 10 characters"))]
    pub features: String,

    #[validate(length(min = 10, message = "testimonials must be at least 10 characters"))]
    pub testimonials: String,

    #[validate(length(min = 2, message = "companyName must be at least 2 characters"))]
    pub company_name: String,
}

/// Declaration order of the request fields, used to report violations
/// deterministically.
const FIELD_ORDER: &[&str] = &[
    "service_name",
    "service_type",
    "target_audience",
    "features",
    "testimonials",
    "company_name",
];

impl GenerationRequest {
    /// Trim surrounding whitespace from every field.
    ///
    /// Form input often carries stray newlines; the length checks should
    /// apply to the visible text.
    pub fn normalized(self) -> Self {
        Self {
            service_name: self.service_name.trim().to_string(),
            service_type: self.service_type.trim().to_string(),
            target_audience: self.target_audience.trim().to_string(),
            features: self.features.trim().to_string(),
            testimonials: self.testimonials.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
        }
    }

    /// Check every field constraint.
    ///
    /// Returns [`CoreError::Validation`] listing all violations in field
    /// order, joined by `"; "`.
    pub fn check(&self) -> Result<(), CoreError> {
        let errors = match self.validate() {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };

        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| {
            let field: &str = field.as_ref();
            FIELD_ORDER
                .iter()
                .position(|known| *known == field)
                .unwrap_or(FIELD_ORDER.len())
        });

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", AsRef::<str>::as_ref(field)),
                })
            })
            .collect();

        Err(CoreError::Validation(messages.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn easy_speak() -> GenerationRequest {
        GenerationRequest {
            service_name: "EasySpeak".into(),
            service_type: "オンライン英会話スクール".into(),
            target_audience: "社会人向け".into(),
            features: "24時間対応、パーソナルカリキュラム".into(),
            testimonials: "講師情報、お客様の声".into(),
            company_name: "株式会社アブソリュート".into(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(easy_speak().check().is_ok());
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        // 10 characters, 30 bytes.
        let mut req = easy_speak();
        req.testimonials = "講師情報お客様の声！".into();
        assert_eq!(req.testimonials.chars().count(), 10);
        assert!(req.check().is_ok());
    }

    #[test]
    fn short_name_is_rejected() {
        let mut req = easy_speak();
        req.service_name = "E".into();
        assert_matches!(
            req.check(),
            Err(CoreError::Validation(msg)) if msg == "serviceName must be at least 2 characters"
        );
    }

    #[test]
    fn violations_are_reported_in_field_order() {
        let mut req = easy_speak();
        req.company_name = String::new();
        req.features = "short".into();
        req.service_type = "x".into();

        let err = req.check().unwrap_err().to_string();
        assert_eq!(
            err,
            "Validation failed: serviceType must be at least 2 characters; \
             features must be at least 10 characters; \
             companyName must be at least 2 characters"
        );
    }

    #[test]
    fn normalized_trims_before_validation() {
        let mut req = easy_speak();
        req.service_name = "  A \n".into();
        assert!(req.clone().check().is_ok());
        assert!(req.normalized().check().is_err());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(easy_speak()).unwrap();
        assert_eq!(json["serviceName"], "EasySpeak");
        assert_eq!(json["companyName"], "株式会社アブソリュート");
        assert!(json.get("service_name").is_none());
    }
}
