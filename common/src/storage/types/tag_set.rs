use serde::{Serialize, Serializer};
use url::form_urlencoded;

use super::document_metadata::DocumentMetadata;
use crate::utils::slug::slugify;

const UNKNOWN_EFFECTIVE_DATE: &str = "unknown";

/// Ordered key/value tags attached to a stored document for backend-side filtering.
///
/// Values are kept raw; [`TagSet::encode`] is the only place they are escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: Vec<(String, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tag. Blank values are dropped.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.entries.push((key.into(), value));
    }

    pub fn push_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Builds the searchable tags for a document: jurisdiction and type, effective date
    /// (or `unknown`), state slug and regulation section when present.
    pub fn for_document(metadata: &DocumentMetadata) -> Self {
        let mut tags = Self::new();
        tags.push("jurisdiction", metadata.jurisdiction.as_str());
        tags.push("document-type", metadata.document_type.as_str());
        tags.push(
            "effective-date",
            metadata.effective_date.map_or_else(
                || UNKNOWN_EFFECTIVE_DATE.to_string(),
                |d| d.format("%Y-%m-%d").to_string(),
            ),
        );
        tags.push_opt("state", metadata.state.as_deref().map(slugify));
        tags.push_opt("regulation-section", metadata.regulation_section.clone());
        tags
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes the tags as `key=value&key=value` using URL form encoding.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.entries.iter())
            .finish()
    }

    /// Converts to the object store's tag type, which applies the same encoding when
    /// sending the tagging header.
    pub fn to_object_tags(&self) -> object_store::TagSet {
        let mut tags = object_store::TagSet::default();
        for (key, value) in self.iter() {
            tags.push(key, value);
        }
        tags
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
