//! Data frames delivered by live channels
//!
//! A frame is a named set of columns. Payloads are passed through untouched:
//! the relay envelope's `message` object becomes the single row of the
//! `value` column.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransportError;

/// Name given to frames decoded from relay envelopes
pub const RESPONSE_FRAME: &str = "response";

/// A single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column values
    pub values: Vec<Value>,
}

impl Field {
    /// Create a column
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A frame of columnar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    /// Frame name
    pub name: String,
    /// Columns
    pub fields: Vec<Field>,
}

/// Wire envelope published on relay subjects
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    start: Option<f64>,
    message: Option<Value>,
}

impl DataFrame {
    /// Create an empty frame
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a column
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a column by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of rows (length of the first column)
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a relay envelope `{"start": <number>, "message": {...}}`
    ///
    /// `start` is optional; when present it becomes a `time` column.
    pub fn from_envelope(payload: &[u8]) -> Result<Self, TransportError> {
        let envelope: Envelope = serde_json::from_slice(payload)
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let message = match envelope.message {
            Some(message @ Value::Object(_)) => message,
            Some(_) => {
                return Err(TransportError::Decode(
                    "envelope message is not an object".into(),
                ))
            }
            None => return Err(TransportError::Decode("envelope has no message".into())),
        };

        let mut frame = DataFrame::new(RESPONSE_FRAME);
        if let Some(start) = envelope.start {
            frame = frame.with_field(Field::new("time", vec![Value::from(start)]));
        }
        Ok(frame.with_field(Field::new("value", vec![message])))
    }
}
