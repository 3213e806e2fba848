/// Event serialization for Redis Streams
///
/// Stream entries are flat string maps, so each event becomes:
///
/// ```text
/// kind: "commented"
/// payload: "{\"kind\":\"commented\",\"task_id\":7,...}"
/// ts: "2024-11-07T12:00:00+00:00"
/// ```
///
/// `kind` duplicates the payload tag so consumers can filter without parsing
/// JSON; a mismatch between the two is rejected.

use super::NotificationEvent;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializationError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid field value
    #[error("Invalid field value for {field}: {error}")]
    InvalidValue { field: String, error: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Timestamp parsing error
    #[error("Timestamp error: {0}")]
    TimestampError(String),
}

/// A decoded stream entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    /// When the event was published
    pub ts: DateTime<Utc>,
    pub event: NotificationEvent,
}

/// Serializes an event to stream field-value pairs, stamped with the current time
pub fn serialize_event(
    event: &NotificationEvent,
) -> Result<HashMap<String, String>, SerializationError> {
    serialize_event_at(event, Utc::now())
}

/// Serializes an event with an explicit timestamp
pub fn serialize_event_at(
    event: &NotificationEvent,
    ts: DateTime<Utc>,
) -> Result<HashMap<String, String>, SerializationError> {
    let mut fields = HashMap::new();
    fields.insert("kind".to_string(), event.kind().to_string());
    fields.insert("payload".to_string(), serde_json::to_string(event)?);
    fields.insert("ts".to_string(), ts.to_rfc3339());
    Ok(fields)
}

/// Deserializes stream field-value pairs back into an event
pub fn deserialize_event(
    fields: &HashMap<String, String>,
) -> Result<EventEnvelope, SerializationError> {
    let kind = fields
        .get("kind")
        .ok_or_else(|| SerializationError::MissingField("kind".to_string()))?;

    let payload = fields
        .get("payload")
        .ok_or_else(|| SerializationError::MissingField("payload".to_string()))?;

    let ts_str = fields
        .get("ts")
        .ok_or_else(|| SerializationError::MissingField("ts".to_string()))?;

    let ts = DateTime::parse_from_rfc3339(ts_str)
        .map_err(|e| SerializationError::TimestampError(e.to_string()))?
        .with_timezone(&Utc);

    let event: NotificationEvent = serde_json::from_str(payload)?;

    if event.kind() != kind {
        return Err(SerializationError::InvalidValue {
            field: "kind".to_string(),
            error: format!("stream says {}, payload says {}", kind, event.kind()),
        });
    }

    Ok(EventEnvelope { ts, event })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commented() -> NotificationEvent {
        NotificationEvent::Commented {
            task_id: 7,
            task_title: "Fix login".to_string(),
            executor_email: "exec@example.com".to_string(),
            commenter_name: "Ann Lee".to_string(),
            comment_text: "Looks good\nship it".to_string(),
        }
    }

    #[test]
    fn test_serialize_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 11, 7, 12, 0, 0).unwrap();
        let fields = serialize_event_at(&commented(), ts).unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["kind"], "commented");
        assert_eq!(fields["ts"], "2024-11-07T12:00:00+00:00");
        assert!(fields["payload"].contains("\"commenter_name\":\"Ann Lee\""));
    }

    #[test]
    fn test_deserialize_restores_event_and_ts() {
        let ts = Utc.with_ymd_and_hms(2024, 11, 7, 12, 0, 0).unwrap();
        let fields = serialize_event_at(&commented(), ts).unwrap();
        let envelope = deserialize_event(&fields).unwrap();

        assert_eq!(envelope.event, commented());
        assert_eq!(envelope.ts, ts);
    }

    #[test]
    fn test_deserialize_missing_field() {
        let mut fields = serialize_event(&commented()).unwrap();
        fields.remove("payload");

        match deserialize_event(&fields) {
            Err(SerializationError::MissingField(field)) => assert_eq!(field, "payload"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_rejects_kind_mismatch() {
        let mut fields = serialize_event(&commented()).unwrap();
        fields.insert("kind".to_string(), "assigned".to_string());

        assert!(matches!(
            deserialize_event(&fields),
            Err(SerializationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deserialize_bad_timestamp() {
        let mut fields = serialize_event(&commented()).unwrap();
        fields.insert("ts".to_string(), "yesterday".to_string());

        assert!(matches!(
            deserialize_event(&fields),
            Err(SerializationError::TimestampError(_))
        ));
    }
}
