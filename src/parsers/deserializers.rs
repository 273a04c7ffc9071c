use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

/// Custom deserializer for timestamp that accepts both integers (ms) and RFC3339 strings
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => {
            // Assume it's a Unix timestamp in milliseconds
            let ms = n.as_i64().ok_or_else(|| Error::custom("invalid timestamp"))?;
            DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| Error::custom("timestamp out of range"))
        }
        Value::String(s) => {
            // Parse as RFC3339
            s.parse::<DateTime<Utc>>()
                .map_err(|e| Error::custom(format!("invalid RFC3339 timestamp: {}", e)))
        }
        _ => Err(Error::custom("timestamp must be a number or string")),
    }
}

/// Custom deserializer for session IDs that validates UUID format
pub fn deserialize_session_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    // Validate that it's not empty
    if s.is_empty() {
        return Err(Error::custom("session ID cannot be empty"));
    }

    // Validate that it's a valid UUID
    Uuid::parse_str(&s)
        .map_err(|e| Error::custom(format!("invalid UUID format for session ID: {}", e)))?;

    Ok(s)
}
