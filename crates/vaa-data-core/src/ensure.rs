//! Lossless coercion of untyped values. Every helper returns `None` (the missing value)
//! instead of failing when the input cannot be interpreted.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};

use crate::object::{Id, Image};

/// Strings pass through and numbers are written out.
#[must_use]
pub fn ensure_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number_to_string(number)),
        _ => None,
    }
}

/// Non-blank strings only.
#[must_use]
pub fn ensure_id(value: &Value) -> Option<Id> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

#[must_use]
pub fn ensure_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) if !text.trim().is_empty() => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Booleans, or the numbers 0 and 1.
#[must_use]
pub fn ensure_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 0.0 => Some(false),
            Some(n) if (n - 1.0).abs() < f64::EPSILON => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Date strings (`YYYY-MM-DD` or RFC 3339) or milliseconds since the Unix epoch.
#[must_use]
pub fn ensure_date(value: &Value) -> Option<Date> {
    match value {
        Value::String(text) => parse_date(text),
        Value::Number(number) => {
            let millis = number.as_i64()?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .ok()
                .map(OffsetDateTime::date)
        }
        _ => None,
    }
}

#[must_use]
pub fn parse_date(text: &str) -> Option<Date> {
    let text = text.trim();
    if text.contains('T') {
        return OffsetDateTime::parse(text, &Rfc3339).ok().map(OffsetDateTime::date);
    }
    let mut parts = text.splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// An object with at least a string `url`.
#[must_use]
pub fn ensure_image(value: &Value) -> Option<Image> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// All items MUST be valid, otherwise the whole array is missing.
pub fn ensure_array<T, F>(value: &Value, ensure_item: F) -> Option<Vec<T>>
where
    F: Fn(&Value) -> Option<T>,
{
    value.as_array()?.iter().map(ensure_item).collect()
}

#[must_use]
pub fn ensure_unique<T: PartialEq>(items: Vec<T>) -> Option<Vec<T>> {
    is_unique(&items).then_some(items)
}

#[must_use]
pub fn is_unique<T: PartialEq>(items: &[T]) -> bool {
    items.iter().enumerate().all(|(index, item)| !items[..index].contains(item))
}

fn number_to_string(number: &serde_json::Number) -> String {
    if number.is_i64() || number.is_u64() {
        return number.to_string();
    }
    number.as_f64().map_or_else(|| number.to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn literals() -> Vec<Value> {
        vec![Value::Null, json!({}), json!([]), json!(true)]
    }

    fn mk_date(year: i32, month: Month, day: u8) -> Date {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => date,
            Err(err) => panic!("invalid fixture date: {err}"),
        }
    }

    #[test]
    fn strings_accept_text_and_numbers() {
        assert_eq!(ensure_string(&json!("valid string")), Some("valid string".to_string()));
        assert_eq!(ensure_string(&json!(123)), Some("123".to_string()));
        assert_eq!(ensure_string(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(ensure_string(&json!(2.0)), Some("2".to_string()));
        for value in literals() {
            assert_eq!(ensure_string(&value), None, "{value}");
        }
    }

    #[test]
    fn ids_must_not_be_blank() {
        assert_eq!(ensure_id(&json!("valid Id")), Some("valid Id".to_string()));
        assert_eq!(ensure_id(&json!("")), None);
        assert_eq!(ensure_id(&json!("   ")), None);
        assert_eq!(ensure_id(&json!(5)), None);
    }

    #[test]
    fn numbers_accept_numeric_strings_only() {
        assert_eq!(ensure_number(&json!(123)), Some(123.0));
        assert_eq!(ensure_number(&json!("123")), Some(123.0));
        assert_eq!(ensure_number(&json!(" 4.5 ")), Some(4.5));
        assert_eq!(ensure_number(&json!("abc")), None);
        assert_eq!(ensure_number(&json!("")), None);
        assert_eq!(ensure_number(&json!("NaN")), None);
        for value in literals() {
            assert_eq!(ensure_number(&value), None, "{value}");
        }
    }

    #[test]
    fn booleans_accept_zero_and_one() {
        assert_eq!(ensure_boolean(&json!(true)), Some(true));
        assert_eq!(ensure_boolean(&json!(false)), Some(false));
        assert_eq!(ensure_boolean(&json!(1)), Some(true));
        assert_eq!(ensure_boolean(&json!(0)), Some(false));
        assert_eq!(ensure_boolean(&json!(2)), None);
        assert_eq!(ensure_boolean(&json!("true")), None);
        assert_eq!(ensure_boolean(&Value::Null), None);
    }

    #[test]
    fn images_require_a_url() {
        let image = json!({ "url": "https://example.com/a.jpg", "alt": "A" });
        assert_eq!(
            ensure_image(&image),
            Some(Image {
                url: "https://example.com/a.jpg".to_string(),
                url_dark: None,
                alt: Some("A".to_string()),
            })
        );
        assert_eq!(ensure_image(&json!({ "alt": "A" })), None);
        assert_eq!(ensure_image(&json!("https://example.com/a.jpg")), None);
        for value in literals() {
            assert_eq!(ensure_image(&value), None, "{value}");
        }
    }

    #[test]
    fn dates_parse_iso_strings_and_timestamps() {
        assert_eq!(ensure_date(&json!("2023-10-05")), Some(mk_date(2023, Month::October, 5)));
        assert_eq!(ensure_date(&json!("100-01-01")), Some(mk_date(100, Month::January, 1)));
        assert_eq!(
            ensure_date(&json!("2023-10-05T12:30:00Z")),
            Some(mk_date(2023, Month::October, 5))
        );
        assert_eq!(ensure_date(&json!(86_400_000)), Some(mk_date(1970, Month::January, 2)));
        assert_eq!(ensure_date(&json!("2023-02-30")), None);
        assert_eq!(ensure_date(&json!("not a date")), None);
        for value in literals() {
            assert_eq!(ensure_date(&value), None, "{value}");
        }
    }

    #[test]
    fn arrays_are_missing_if_any_item_is_invalid() {
        assert_eq!(ensure_array(&json!({ "key": "value" }), ensure_string), None);
        assert_eq!(ensure_array(&json!([]), ensure_string), Some(Vec::new()));
        assert_eq!(ensure_array(&json!([1, "x", 3]), ensure_number), None);
        assert_eq!(ensure_array(&json!([1, "2", 3]), ensure_number), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(ensure_array(&Value::Null, ensure_number), None);
    }

    #[test]
    fn uniqueness_rejects_duplicates() {
        assert_eq!(ensure_unique(vec!["a", "b"]), Some(vec!["a", "b"]));
        assert_eq!(ensure_unique(vec!["a", "b", "a"]), None);
        assert!(is_unique::<u8>(&[]));
    }
}
