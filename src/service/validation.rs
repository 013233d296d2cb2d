//! Request field validation from per-operation rules.

use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 ().-]{5,19}$";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Phone,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub format: Option<Format>,
    pub max_length: Option<usize>,
    /// Format mismatches are logged and let through.
    pub advisory: bool,
}

impl FieldRule {
    pub const fn required(name: &'static str) -> Self {
        FieldRule {
            name,
            required: true,
            format: None,
            max_length: None,
            advisory: false,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        FieldRule {
            name,
            required: false,
            format: None,
            max_length: None,
            advisory: false,
        }
    }

    pub const fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub const fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against rules. Required fields must be present and non-empty;
    /// empty optional fields skip their format checks.
    pub fn validate(body: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
        for rule in rules {
            let text = body.get(rule.name).and_then(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            let text = text.filter(|s| !s.is_empty());
            match text {
                None if rule.required => {
                    return Err(AppError::Validation(format!("{} is required", rule.name)));
                }
                None => {}
                Some(s) => validate_field(rule, &s)?,
            }
        }
        Ok(())
    }
}

fn validate_field(rule: &FieldRule, s: &str) -> Result<(), AppError> {
    if let Some(max) = rule.max_length {
        if s.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                rule.name, max
            )));
        }
    }
    let (pattern, what) = match rule.format {
        Some(Format::Email) => (EMAIL_PATTERN, "email"),
        Some(Format::Phone) => (PHONE_PATTERN, "phone number"),
        None => return Ok(()),
    };
    let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", rule.name)))?;
    if !re.is_match(s) {
        if rule.advisory {
            tracing::warn!(field = rule.name, "value is not a valid {}; keeping it", what);
            return Ok(());
        }
        return Err(AppError::Validation(format!("{} must be a valid {}", rule.name, what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &[FieldRule] = &[
        FieldRule::required("name").max_length(10),
        FieldRule::optional("email").format(Format::Email),
        FieldRule::optional("phone").format(Format::Phone),
    ];

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_complete_and_sparse_bodies() {
        let full = body(json!({"name": "Ana", "email": "ana@example.com", "phone": "+1 (555) 010-2030"}));
        assert!(RequestValidator::validate(&full, RULES).is_ok());
        let sparse = body(json!({"name": "Ana", "email": "", "phone": ""}));
        assert!(RequestValidator::validate(&sparse, RULES).is_ok());
    }

    #[test]
    fn blank_required_field_fails() {
        let err = RequestValidator::validate(&body(json!({"name": "  "})), RULES).unwrap_err();
        assert_eq!(err.to_string(), "validation: name is required");
    }

    #[test]
    fn formats_and_lengths_are_checked() {
        assert!(RequestValidator::validate(&body(json!({"name": "Ana", "email": "ana@"})), RULES).is_err());
        assert!(RequestValidator::validate(&body(json!({"name": "Ana", "phone": "call me"})), RULES).is_err());
        assert!(RequestValidator::validate(&body(json!({"name": "Anastasia Long"})), RULES).is_err());
    }

    #[test]
    fn advisory_format_lets_value_through_but_keeps_length() {
        let rules = &[FieldRule::optional("phone").format(Format::Phone).max_length(5).advisory()];
        assert!(RequestValidator::validate(&body(json!({"phone": "n/a"})), rules).is_ok());
        assert!(RequestValidator::validate(&body(json!({"phone": "unknown"})), rules).is_err());
    }
}
