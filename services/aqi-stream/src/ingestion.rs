//! Batch decoding for inbound feed messages
//!
//! Turns one text frame into validated batch items. Decoding is fail-soft:
//! a bad entry is logged, recorded in [`DecodedBatch::rejected`] and skipped
//! while the remaining entries still go through. Only a frame that is not a
//! JSON array at all is rejected as a whole.

use serde_json::Value;
use tracing::{debug, warn};
use types::errors::ReadingError;
use types::ids::CityId;
use types::numeric::Aqi;

use crate::events::{BatchItem, RawReading};

/// Errors that can occur while decoding a feed message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    #[error("message is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("message is not a batch: expected JSON array, got {0}")]
    NotABatch(&'static str),

    #[error("item {index} is not an object: got {found}")]
    NotAnObject { index: usize, found: &'static str },

    #[error("item {index} rejected: {source}")]
    InvalidItem {
        index: usize,
        #[source]
        source: ReadingError,
    },
}

/// Result of decoding one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Entries that passed validation, in message order.
    pub items: Vec<BatchItem>,
    /// Entries that were skipped, with the reason.
    pub rejected: Vec<IngestionError>,
}

impl DecodedBatch {
    /// Total entries seen in the message.
    pub fn total(&self) -> usize {
        self.items.len() + self.rejected.len()
    }
}

/// Decode one text frame into a batch.
///
/// Returns `Err` only when the frame as a whole is unusable.
pub fn decode_message(text: &str) -> Result<DecodedBatch, IngestionError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| IngestionError::InvalidJson(e.to_string()))?;

    let entries = match value {
        Value::Array(entries) => entries,
        other => return Err(IngestionError::NotABatch(json_type(&other))),
    };

    let mut batch = DecodedBatch {
        items: Vec::with_capacity(entries.len()),
        rejected: Vec::new(),
    };

    for (index, entry) in entries.into_iter().enumerate() {
        match decode_item(index, entry) {
            Ok(item) => {
                debug!(index, city = %item.city, aqi = %item.value, "Item accepted");
                batch.items.push(item);
            }
            Err(err) => {
                warn!(index, error = %err, "Skipping malformed batch item");
                batch.rejected.push(err);
            }
        }
    }

    Ok(batch)
}

/// Validate a single batch entry.
pub fn decode_item(index: usize, entry: Value) -> Result<BatchItem, IngestionError> {
    if !entry.is_object() {
        return Err(IngestionError::NotAnObject {
            index,
            found: json_type(&entry),
        });
    }

    let invalid = |source: ReadingError| IngestionError::InvalidItem { index, source };

    // A field of the wrong JSON type (e.g. `"aqi": true`) fails here.
    let raw: RawReading = serde_json::from_value(entry)
        .map_err(|e| invalid(ReadingError::Malformed(e.to_string())))?;

    let city = raw.city.ok_or(ReadingError::MissingField("city")).map_err(invalid)?;
    let aqi = raw.aqi.ok_or(ReadingError::MissingField("aqi")).map_err(invalid)?;

    let city = CityId::try_new(city).map_err(invalid)?;
    let value = Aqi::parse(&aqi.as_text()).map_err(invalid)?;

    Ok(BatchItem::new(city, value))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_simple_batch() {
        let batch =
            decode_message(r#"[{"city":"Delhi","aqi":"150"},{"city":"Mumbai","aqi":88.5}]"#)
                .unwrap();

        assert_eq!(batch.items.len(), 2);
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.items[0].city.as_str(), "Delhi");
        assert_eq!(batch.items[0].value.to_string(), "150");
        assert_eq!(batch.items[1].value.to_string(), "88.5");
    }

    #[test]
    fn test_decode_keeps_message_order() {
        let batch = decode_message(
            r#"[{"city":"C","aqi":"1"},{"city":"A","aqi":"2"},{"city":"B","aqi":"3"}]"#,
        )
        .unwrap();
        let cities: Vec<&str> = batch.items.iter().map(|i| i.city.as_str()).collect();
        assert_eq!(cities, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let batch = decode_message(
            r#"[
                {"city":"Delhi","aqi":"150"},
                {"aqi":"10"},
                {"city":"Pune"},
                {"city":"","aqi":"5"},
                {"city":"Agra","aqi":"n/a"},
                {"city":"Goa","aqi":true},
                42,
                {"city":"Bhopal","aqi":"99.1"}
            ]"#,
        )
        .unwrap();

        let cities: Vec<&str> = batch.items.iter().map(|i| i.city.as_str()).collect();
        assert_eq!(cities, vec!["Delhi", "Bhopal"]);
        assert_eq!(batch.rejected.len(), 6);
        assert_eq!(batch.total(), 8);

        assert_eq!(
            batch.rejected[0],
            IngestionError::InvalidItem {
                index: 1,
                source: ReadingError::MissingField("city"),
            }
        );
        assert_eq!(
            batch.rejected[1],
            IngestionError::InvalidItem {
                index: 2,
                source: ReadingError::MissingField("aqi"),
            }
        );
        assert_eq!(
            batch.rejected[2],
            IngestionError::InvalidItem {
                index: 3,
                source: ReadingError::EmptyCity,
            }
        );
        assert_eq!(
            batch.rejected[3],
            IngestionError::InvalidItem {
                index: 4,
                source: ReadingError::NonNumeric("n/a".to_string()),
            }
        );
        assert_eq!(
            batch.rejected[5],
            IngestionError::NotAnObject {
                index: 6,
                found: "number",
            }
        );
    }

    #[test]
    fn test_null_fields_are_missing() {
        let batch = decode_message(r#"[{"city":"Delhi","aqi":null}]"#).unwrap();
        assert!(batch.items.is_empty());
        assert_eq!(
            batch.rejected[0],
            IngestionError::InvalidItem {
                index: 0,
                source: ReadingError::MissingField("aqi"),
            }
        );
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = decode_message("not json").unwrap_err();
        assert!(matches!(err, IngestionError::InvalidJson(_)));
    }

    #[test]
    fn test_non_array_rejected() {
        let err = decode_message(r#"{"city":"Delhi","aqi":"150"}"#).unwrap_err();
        assert_eq!(err, IngestionError::NotABatch("object"));
    }

    #[test]
    fn test_empty_array_is_empty_batch() {
        let batch = decode_message("[]").unwrap();
        assert_eq!(batch, DecodedBatch::default());
    }
}
