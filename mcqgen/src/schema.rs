//! The response schema exemplar shown to the model.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{GeneratorError, Result};

/// The exemplar shipped with the crate: three placeholder questions.
pub const BUILTIN_RESPONSE_JSON: &str = include_str!("../resources/response.json");

/// One question in the expected model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqItem {
    /// Question text.
    pub mcq: String,
    /// Option letter to option text.
    pub options: BTreeMap<String, String>,
    /// Letter of the correct option.
    pub correct: String,
}

/// An ordered mapping from question number to [`McqItem`].
///
/// Keys are kept in numeric order (`"2"` before `"10"`); keys that are not
/// integers follow, sorted as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    items: Vec<(String, McqItem)>,
}

impl ResponseSchema {
    /// Build a schema from key/item pairs.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Schema`] when `items` is empty.
    pub fn new(items: impl IntoIterator<Item = (String, McqItem)>) -> Result<Self> {
        let mut items: Vec<(String, McqItem)> = items.into_iter().collect();
        if items.is_empty() {
            return Err(GeneratorError::Schema("schema has no example questions".into()));
        }
        items.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        Ok(Self { items })
    }

    /// The built-in exemplar.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RESPONSE_JSON)
    }

    /// Parse a JSON object of numbered questions.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: BTreeMap<String, McqItem> =
            serde_json::from_str(json).map_err(|e| GeneratorError::Schema(e.to_string()))?;
        Self::new(parsed)
    }

    /// Read and parse a JSON exemplar from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GeneratorError::Schema(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn items(&self) -> &[(String, McqItem)] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serialise with four-space indentation for embedding in a prompt.
    pub fn to_prompt_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer).map_err(|e| GeneratorError::Schema(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| GeneratorError::Schema(e.to_string()))
    }
}

impl Serialize for ResponseSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (key, item) in &self.items {
            map.serialize_entry(key, item)?;
        }
        map.end()
    }
}

/// Order question keys: integers ascending, then everything else as text.
pub(crate) fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
