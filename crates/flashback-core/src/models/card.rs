use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single flashcard. Identity is positional within its deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, deserialize_with = "face_text")]
    pub front: String,
    #[serde(default, deserialize_with = "face_text")]
    pub back: String,
    /// Any other fields the source sent along.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            extra: Map::new(),
        }
    }

    /// Text of the face currently shown.
    pub fn face(&self, flipped: bool) -> &str {
        if flipped {
            &self.back
        } else {
            &self.front
        }
    }
}

/// Face text from a loosely typed cell: null is blank, scalars print as text.
fn face_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Normalize a deck payload.
///
/// Accepts either a bare array of cards or an object carrying an `items`
/// array. Any other shape yields an empty deck. Returns an error only when a
/// recognised array holds entries that are not card objects.
pub fn normalize_deck(data: Value) -> Result<Vec<Card>, serde_json::Error> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };
    serde_json::from_value(Value::Array(items))
}
