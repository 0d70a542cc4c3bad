//! Annotation records produced by the annotation widget.
//!
//! The client never interprets region geometry. Everything except the id is
//! carried as an opaque JSON object and sent back to the service untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for an annotation, assigned by the widget.
pub type AnnotationId = String;

/// A user-drawn region on an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Widget-assigned identifier, unique within one image.
    pub id: AnnotationId,
    /// Remaining fields (target selector, bodies, ...), passed through as-is.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Annotation {
    /// Create an annotation with no payload beyond its id.
    pub fn new(id: impl Into<AnnotationId>) -> Self {
        Self {
            id: id.into(),
            data: Map::new(),
        }
    }

    /// Attach an opaque payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Build an annotation from a raw widget payload.
    ///
    /// Returns `None` if the payload is not an object or has no string `id`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut data) = value else {
            return None;
        };
        let id = match data.remove("id")? {
            Value::String(id) => id,
            _ => return None,
        };
        Some(Self { id, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_is_passed_through() {
        let raw = json!({
            "id": "#a1",
            "type": "Annotation",
            "target": { "selector": { "value": "xywh=pixel:10,20,30,40" } }
        });
        let annotation: Annotation = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(annotation.id, "#a1");
        assert_eq!(annotation.data["type"], "Annotation");

        let back = serde_json::to_value(&annotation).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_from_value_requires_string_id() {
        assert!(Annotation::from_value(json!({ "id": "x" })).is_some());
        assert!(Annotation::from_value(json!({ "id": 7 })).is_none());
        assert!(Annotation::from_value(json!({ "body": [] })).is_none());
        assert!(Annotation::from_value(json!("a1")).is_none());
    }
}
