//! JSON helpers for the IMD array feeds
//!
//! The feeds encode every value as a string, but numbers and nulls show up
//! often enough that string fields are read leniently.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Read a scalar as a string; missing and null become empty
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!("expected a scalar, found {}", other))),
    }
}

/// Decode a non-empty JSON array of rows
pub fn decode_rows<T: DeserializeOwned>(feed: &str, body: &[u8]) -> AppResult<Vec<T>> {
    let rows: Vec<T> = serde_json::from_slice(body)
        .map_err(|e| AppError::Decode(format!("{} payload: {}", feed, e)))?;
    if rows.is_empty() {
        return Err(AppError::Decode(format!("{} payload is an empty array", feed)));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
        id: String,
    }

    #[test]
    fn test_lenient_string_accepts_scalars() {
        let rows: Vec<Row> =
            decode_rows("test", br#"[{"ID":"NDL"},{"ID":42},{"ID":null},{}]"#).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["NDL", "42", "", ""]);
    }

    #[test]
    fn test_empty_array_is_decode_error() {
        let err = decode_rows::<Row>("test", b"[]").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_envelope_must_be_an_array() {
        assert!(matches!(
            decode_rows::<Row>("test", br#"{"ID":"NDL"}"#),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(
            decode_rows::<Row>("test", b"<html>"),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_nested_values_are_rejected() {
        assert!(decode_rows::<Row>("test", br#"[{"ID":{"a":1}}]"#).is_err());
    }
}
