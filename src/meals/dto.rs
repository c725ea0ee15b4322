use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortOrder {
    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }

    /// `ORDER BY` clause for this order. Only static fragments, never user text.
    pub(crate) fn sql(&self) -> &'static str {
        match (self.key, self.ascending) {
            (SortKey::Name, true) => "name COLLATE NOCASE ASC, id ASC",
            (SortKey::Name, false) => "name COLLATE NOCASE DESC, id DESC",
            (SortKey::Date, true) => "date ASC, id ASC",
            (SortKey::Date, false) => "date DESC, id DESC",
        }
    }
}

impl Default for SortOrder {
    /// Newest first.
    fn default() -> Self {
        Self::new(SortKey::Date, false)
    }
}

/// Image bytes handed over by a picker (camera or photo library).
#[derive(Debug, Clone)]
pub struct ImagePicked {
    pub body: Bytes,
    pub content_type: String,
}

impl ImagePicked {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }
}
