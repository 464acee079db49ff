// Page and cursor types

use serde::{Deserialize, Deserializer, Serialize};

/// Server-issued continuation marker
///
/// Opaque: compared by value, sent back verbatim, never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(serde_json::Value);

impl Cursor {
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// One chunk of an ordered result stream
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    /// `None` is the only end-of-stream signal
    pub next_cursor: Option<Cursor>,
}

/// Parameters for a single page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub subject_id: String,
    pub page_size: u32,
    pub cursor: Option<Cursor>,
}

/// Accept an int64 as a JSON number or as a decimal string (protobuf JSON)
pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(i64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Counted {
        #[serde(deserialize_with = "deserialize_count")]
        total: i64,
    }

    #[test]
    fn test_count_as_number_or_string() {
        let c: Counted = serde_json::from_value(json!({"total": 40})).unwrap();
        assert_eq!(c.total, 40);

        let c: Counted = serde_json::from_value(json!({"total": "40"})).unwrap();
        assert_eq!(c.total, 40);

        assert!(serde_json::from_value::<Counted>(json!({"total": "forty"})).is_err());
    }

    #[test]
    fn test_cursor_is_passed_through_verbatim() {
        let raw = json!({"date": {"seconds": "1700000000"}, "id": "tx-30"});
        let cursor: Cursor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&cursor).unwrap(), raw);
        assert_eq!(cursor, Cursor::from_value(raw));
    }
}
