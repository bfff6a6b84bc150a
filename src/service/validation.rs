//! Mutation payload validation from catalog rules.

use crate::config::ValidationRule;
use crate::error::StoreError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create payload. All required fields must be present and non-empty.
    pub fn validate(body: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), StoreError> {
        for (col, rule) in sorted(rules) {
            let val = body.get(col);
            if rule.required == Some(true) && is_blank(val) {
                return Err(StoreError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for updates). Required is enforced only for
    /// fields being cleared.
    pub fn validate_partial(
        body: &Map<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), StoreError> {
        for (col, rule) in sorted(rules) {
            let Some(v) = body.get(col) else { continue };
            if rule.required == Some(true) && is_blank(Some(v)) {
                return Err(StoreError::Validation(format!("{} is required", col)));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }
}

/// Deterministic order so the first reported error is stable.
fn sorted(rules: &HashMap<String, ValidationRule>) -> Vec<(&str, &ValidationRule)> {
    let mut out: Vec<(&str, &ValidationRule)> = rules.iter().map(|(k, v)| (k.as_str(), v)).collect();
    out.sort_by(|a, b| a.0.cmp(b.0));
    out
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), StoreError> {
    if is_blank(Some(v)) {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| StoreError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(StoreError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let names: Vec<String> = allowed.iter().map(display_value).collect();
            return Err(StoreError::Validation(format!(
                "{} must be one of: {}",
                col,
                names.join(", ")
            )));
        }
    }
    // Form inputs often arrive as numeric strings.
    let number = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    if let Some(min) = rule.minimum {
        match number {
            Some(n) if n < min => {
                return Err(StoreError::Validation(format!("{} must be at least {}", col, min)));
            }
            None => return Err(StoreError::Validation(format!("{} must be a number", col))),
            _ => {}
        }
    }
    if let Some(max) = rule.maximum {
        match number {
            Some(n) if n > max => {
                return Err(StoreError::Validation(format!("{} must be at most {}", col, max)));
            }
            None => return Err(StoreError::Validation(format!("{} must be a number", col))),
            _ => {}
        }
    }
    Ok(())
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), StoreError> {
    match format.to_lowercase().as_str() {
        "email" => {
            if let Some(s) = v.as_str() {
                let valid = s
                    .split_once('@')
                    .map(|(user, domain)| !user.is_empty() && domain.contains('.') && !domain.starts_with('.'))
                    .unwrap_or(false);
                if !valid {
                    return Err(StoreError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s).is_err() {
                    return Err(StoreError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve};
    use serde_json::json;

    fn rules(entity: &str) -> HashMap<String, ValidationRule> {
        let model = resolve(&default_catalog()).expect("resolve");
        model.entity(entity).expect("entity").validation.clone()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn create_requires_fields() {
        let err = RequestValidator::validate(&obj(json!({"name": "Acme"})), &rules("cities")).unwrap_err();
        assert_eq!(err, StoreError::Validation("country is required".into()));
        assert!(RequestValidator::validate(&obj(json!({"name": "Acme", "country": "FR"})), &rules("cities")).is_ok());
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let err = RequestValidator::validate(&obj(json!({"name": "  ", "country": "FR"})), &rules("cities")).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn status_must_be_allowed() {
        let err = RequestValidator::validate_partial(&obj(json!({"status": "parked"})), &rules("buses")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "status must be one of: available, in_service, maintenance, retired"
        );
    }

    #[test]
    fn numeric_strings_are_checked() {
        let r = rules("tickets");
        assert!(RequestValidator::validate_partial(&obj(json!({"price": "12.50"})), &r).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"price": "-1"})), &r).is_err());
        assert!(RequestValidator::validate_partial(&obj(json!({"price": "free"})), &r).is_err());
    }

    #[test]
    fn partial_skips_absent_required_fields() {
        assert!(RequestValidator::validate_partial(&obj(json!({"country": "DE"})), &rules("cities")).is_ok());
    }

    #[test]
    fn email_format() {
        let r = rules("drivers");
        assert!(RequestValidator::validate_partial(&obj(json!({"email": "a@b.co"})), &r).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"email": "nope"})), &r).is_err());
    }
}
