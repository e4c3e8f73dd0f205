pub mod document_metadata;
pub mod storage_key;
pub mod tag_set;

use serde::{Deserialize, Deserializer};

/// Reads an optional string field, treating blank strings (as sent by HTML forms) as absent.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
