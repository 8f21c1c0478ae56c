//! Declarative request validation.
//!
//! A schema is a table of [`FieldSpec`]s; [`validate`] walks a JSON object
//! against it, collects every failing field and returns the accepted fields
//! normalized (strings trimmed, numeric strings parsed, dates in RFC 3339).

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Number, Value};

use crate::entities::{Category, Location, Supplier, Unit};
use crate::errors::FieldError;

/// How a field's value is checked.
#[derive(Clone, Copy)]
pub enum Rule {
    /// Trimmed string of at most `max` characters.
    Text { max: usize },
    /// Finite number `>= 0`; numeric strings are accepted.
    NonNegative,
    /// One of a closed set of strings, matched exactly.
    OneOf(fn() -> Vec<String>),
    /// ISO 8601 date or timestamp strictly after "now".
    FutureDate,
    /// Boolean, or the strings "true"/"false".
    Flag,
}

#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Must be present on create; may never be cleared.
    pub required: bool,
    pub rule: Rule,
    pub required_message: &'static str,
    pub invalid_message: &'static str,
}

/// Whether absent required fields are an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Create,
    Patch,
}

const FUTURE_DATE_MESSAGE: &str = "Expiry date must be in the future";
const TEXT_TYPE_MESSAGE: &str = "Must be a text value";

pub const ITEM_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        required: true,
        rule: Rule::Text { max: 100 },
        required_message: "Item name is required",
        invalid_message: "Item name cannot exceed 100 characters",
    },
    FieldSpec {
        name: "quantity",
        required: true,
        rule: Rule::NonNegative,
        required_message: "Quantity is required",
        invalid_message: "Quantity must be a positive number",
    },
    FieldSpec {
        name: "unit",
        required: true,
        rule: Rule::OneOf(Unit::allowed_values),
        required_message: "Unit is required",
        invalid_message: "Invalid unit",
    },
    FieldSpec {
        name: "minStock",
        required: false,
        rule: Rule::NonNegative,
        required_message: "Minimum stock is required",
        invalid_message: "Minimum stock must be a positive number",
    },
    FieldSpec {
        name: "supplier",
        required: true,
        rule: Rule::OneOf(Supplier::allowed_values),
        required_message: "Supplier is required",
        invalid_message: "Invalid supplier",
    },
    FieldSpec {
        name: "category",
        required: false,
        rule: Rule::OneOf(Category::allowed_values),
        required_message: "Category is required",
        invalid_message: "Invalid category",
    },
    FieldSpec {
        name: "location",
        required: false,
        rule: Rule::OneOf(Location::allowed_values),
        required_message: "Location is required",
        invalid_message: "Invalid location",
    },
    FieldSpec {
        name: "costPerUnit",
        required: false,
        rule: Rule::NonNegative,
        required_message: "Cost per unit is required",
        invalid_message: "Cost per unit must be a positive number",
    },
    FieldSpec {
        name: "expiryDate",
        required: false,
        rule: Rule::FutureDate,
        required_message: "Expiry date is required",
        invalid_message: "Invalid expiry date format",
    },
    FieldSpec {
        name: "notes",
        required: false,
        rule: Rule::Text { max: 500 },
        required_message: "Notes are required",
        invalid_message: "Notes cannot exceed 500 characters",
    },
    FieldSpec {
        name: "isNightly",
        required: false,
        rule: Rule::Flag,
        required_message: "isNightly is required",
        invalid_message: "isNightly must be true or false",
    },
];

/// Validates `payload` against `schema`.
///
/// Fields not named in the schema are dropped. On success the returned map
/// holds only the fields that were present, with normalized values; an
/// optional field sent as `null` (or a blank string) is kept as `null` so
/// callers can clear it.
pub fn validate(
    schema: &[FieldSpec],
    payload: &Value,
    mode: Mode,
    now: DateTime<Utc>,
) -> Result<Map<String, Value>, Vec<FieldError>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![FieldError::new(
            "body",
            "Request body must be a JSON object",
        )]);
    };

    let mut accepted = Map::new();
    let mut errors = Vec::new();

    for spec in schema {
        match object.get(spec.name) {
            None => {
                if spec.required && mode == Mode::Create {
                    errors.push(FieldError::new(spec.name, spec.required_message));
                }
            }
            Some(raw) if is_blank(raw) => {
                if spec.required {
                    errors.push(FieldError::new(spec.name, spec.required_message));
                } else {
                    accepted.insert(spec.name.to_string(), Value::Null);
                }
            }
            Some(raw) => match check(spec, raw, now) {
                Ok(value) => {
                    accepted.insert(spec.name.to_string(), value);
                }
                Err(message) => errors.push(FieldError::new(spec.name, message)),
            },
        }
    }

    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check(spec: &FieldSpec, raw: &Value, now: DateTime<Utc>) -> Result<Value, &'static str> {
    match spec.rule {
        Rule::Text { max } => {
            let text = raw.as_str().ok_or(TEXT_TYPE_MESSAGE)?.trim();
            if text.chars().count() > max {
                return Err(spec.invalid_message);
            }
            Ok(Value::String(text.to_string()))
        }
        Rule::NonNegative => {
            let number = parse_number(raw).ok_or(spec.invalid_message)?;
            if number < 0.0 {
                return Err(spec.invalid_message);
            }
            Number::from_f64(number)
                .map(Value::Number)
                .ok_or(spec.invalid_message)
        }
        Rule::OneOf(allowed) => {
            let text = raw.as_str().ok_or(spec.invalid_message)?;
            if allowed().iter().any(|candidate| candidate == text) {
                Ok(Value::String(text.to_string()))
            } else {
                Err(spec.invalid_message)
            }
        }
        Rule::FutureDate => {
            let date = raw
                .as_str()
                .and_then(parse_date)
                .ok_or(spec.invalid_message)?;
            if date <= now {
                return Err(FUTURE_DATE_MESSAGE);
            }
            Ok(Value::String(date.to_rfc3339()))
        }
        Rule::Flag => match raw {
            Value::Bool(flag) => Ok(Value::Bool(*flag)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(spec.invalid_message),
        },
    }
}

/// Accepts JSON numbers and numeric strings; rejects NaN and infinities.
pub fn parse_number(raw: &Value) -> Option<f64> {
    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use serde_json::json;

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn create_reports_every_missing_required_field() {
        let errors = validate(ITEM_SCHEMA, &json!({}), Mode::Create, Utc::now()).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "quantity", "unit", "supplier"]);
        assert_eq!(errors[0].message, "Item name is required");
    }

    #[test]
    fn patch_ignores_absent_required_fields() {
        let accepted =
            validate(ITEM_SCHEMA, &json!({"quantity": "4.5"}), Mode::Patch, Utc::now()).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted["quantity"], json!(4.5));
    }

    #[test]
    fn non_string_text_is_a_type_error_not_a_length_error() {
        let errors = validate(ITEM_SCHEMA, &json!({"name": 42}), Mode::Patch, Utc::now())
            .unwrap_err();
        assert_eq!(fields(&errors), vec!["name"]);
        assert_eq!(errors[0].message, "Must be a text value");

        let long = "x".repeat(101);
        let errors = validate(ITEM_SCHEMA, &json!({"name": long}), Mode::Patch, Utc::now())
            .unwrap_err();
        assert_eq!(errors[0].message, "Item name cannot exceed 100 characters");
    }

    #[test]
    fn collects_all_invalid_fields_at_once() {
        let payload = json!({
            "name": "   ",
            "quantity": -1,
            "unit": "bushel",
            "supplier": "Sysco",
            "category": "freezer",
            "costPerUnit": "abc",
        });
        let errors = validate(ITEM_SCHEMA, &payload, Mode::Create, Utc::now()).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["name", "quantity", "unit", "category", "costPerUnit"]
        );
    }

    #[test]
    fn normalizes_accepted_values() {
        let now = Utc::now();
        let payload = json!({
            "name": "  Ranch  ",
            "quantity": 3,
            "unit": "L",
            "supplier": "GFS",
            "notes": "",
            "isNightly": "true",
            "unknown": "dropped",
        });
        let accepted = validate(ITEM_SCHEMA, &payload, Mode::Create, now).unwrap();
        assert_eq!(accepted["name"], json!("Ranch"));
        assert_eq!(accepted["notes"], Value::Null);
        assert_eq!(accepted["isNightly"], json!(true));
        assert!(!accepted.contains_key("unknown"));
    }

    #[test]
    fn expiry_must_be_strictly_future() {
        let now = Utc::now();
        let past = (now - Duration::days(1)).to_rfc3339();
        let errors = validate(
            ITEM_SCHEMA,
            &json!({"expiryDate": past}),
            Mode::Patch,
            now,
        )
        .unwrap_err();
        assert_eq!(errors[0].message, "Expiry date must be in the future");

        let errors = validate(
            ITEM_SCHEMA,
            &json!({"expiryDate": "next tuesday"}),
            Mode::Patch,
            now,
        )
        .unwrap_err();
        assert_eq!(errors[0].message, "Invalid expiry date format");

        let future = (now + Duration::days(3)).to_rfc3339();
        assert!(validate(ITEM_SCHEMA, &json!({"expiryDate": future}), Mode::Patch, now).is_ok());
    }

    #[rstest]
    #[case(json!(0), Some(0.0))]
    #[case(json!(2.5), Some(2.5))]
    #[case(json!(" 12 "), Some(12.0))]
    #[case(json!("NaN"), None)]
    #[case(json!("twelve"), None)]
    #[case(json!(true), None)]
    fn number_parsing(#[case] raw: Value, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(&raw), expected);
    }

    #[test]
    fn bare_dates_are_midnight_utc() {
        let parsed = parse_date("2031-05-04").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2031-05-04T00:00:00+00:00");
    }

    #[test]
    fn non_object_body_is_rejected() {
        let errors = validate(ITEM_SCHEMA, &json!([1, 2]), Mode::Create, Utc::now()).unwrap_err();
        assert_eq!(fields(&errors), vec!["body"]);
    }
}
