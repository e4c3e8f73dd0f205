use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::document_metadata::{DocumentMetadata, Jurisdiction};
use crate::{error::AppError, utils::slug::slugify};

const EMPTY_TITLE_SLUG: &str = "document";
const UNKNOWN_STATE_SLUG: &str = "unknown";

/// Object-store location of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Derives the canonical key
    /// `{federal|states/<state>}/<document type>/<title>-<YYYY-MM-DD>.pdf`.
    ///
    /// The result depends only on the jurisdiction, state, document type, title and
    /// `date`, so two uploads of the same title on the same day share a key and the
    /// later one overwrites the earlier.
    pub fn derive(metadata: &DocumentMetadata, date: NaiveDate) -> Self {
        let mut title_slug = slugify(&metadata.title);
        if title_slug.is_empty() {
            title_slug = EMPTY_TITLE_SLUG.to_string();
        }
        let file_name = format!("{title_slug}-{}.pdf", date.format("%Y-%m-%d"));

        let key = match metadata.jurisdiction {
            Jurisdiction::Federal => {
                format!("federal/{}/{file_name}", metadata.document_type)
            }
            Jurisdiction::State => {
                let state_slug = metadata
                    .state
                    .as_deref()
                    .map(slugify)
                    .filter(|slug| !slug.is_empty())
                    .unwrap_or_else(|| UNKNOWN_STATE_SLUG.to_string());
                format!("states/{state_slug}/{}/{file_name}", metadata.document_type)
            }
        };

        Self(key)
    }

    /// Derives the key using the current UTC calendar date.
    pub fn derive_today(metadata: &DocumentMetadata) -> Self {
        Self::derive(metadata, Utc::now().date_naive())
    }

    /// Accepts a caller-supplied key if it is a safe relative object path.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(AppError::Validation("Storage key is empty".into()));
        }
        if key.starts_with('/') {
            return Err(AppError::Validation(
                "Storage key must be a relative path".into(),
            ));
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(AppError::Validation(format!(
                "Storage key '{key}' contains an empty or relative segment"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::document_metadata::DocumentType;

    fn metadata(
        jurisdiction: Jurisdiction,
        state: Option<&str>,
        document_type: DocumentType,
        title: &str,
    ) -> DocumentMetadata {
        DocumentMetadata {
            jurisdiction,
            state: state.map(str::to_string),
            document_type,
            title: title.to_string(),
            effective_date: None,
            regulation_section: None,
            description: None,
            uploaded_at: None,
            original_filename: None,
            file_size: None,
            mime_type: None,
        }
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    #[test]
    fn state_guidance_scenario() {
        let meta = metadata(
            Jurisdiction::State,
            Some("California"),
            DocumentType::Guidance,
            "Guidance on X!!",
        );
        assert_eq!(
            StorageKey::derive(&meta, march_first()).as_str(),
            "states/california/guidance/guidance-on-x-2024-03-01.pdf"
        );
    }

    #[test]
    fn federal_keys_use_federal_prefix() {
        for (document_type, expected) in [
            (
                DocumentType::Regulations,
                "federal/regulations/clean-air-act-2024-03-01.pdf",
            ),
            (
                DocumentType::Addendums,
                "federal/addendums/clean-air-act-2024-03-01.pdf",
            ),
        ] {
            let meta = metadata(Jurisdiction::Federal, None, document_type, "Clean Air Act");
            assert_eq!(StorageKey::derive(&meta, march_first()).as_str(), expected);
        }
    }

    #[test]
    fn multi_word_states_are_slugged() {
        let meta = metadata(
            Jurisdiction::State,
            Some("New  Hampshire"),
            DocumentType::Implementation,
            "State Plan (2024)",
        );
        assert_eq!(
            StorageKey::derive(&meta, march_first()).as_str(),
            "states/new-hampshire/implementation/state-plan-2024-2024-03-01.pdf"
        );
    }

    #[test]
    fn derivation_is_deterministic_per_day() {
        let meta = metadata(
            Jurisdiction::Federal,
            None,
            DocumentType::Regulations,
            "Same Title",
        );
        assert_eq!(
            StorageKey::derive(&meta, march_first()),
            StorageKey::derive(&meta, march_first())
        );
        let next_day = NaiveDate::from_ymd_opt(2024, 3, 2).expect("valid date");
        assert_ne!(
            StorageKey::derive(&meta, march_first()),
            StorageKey::derive(&meta, next_day)
        );
    }

    #[test]
    fn derive_today_matches_explicit_date() {
        let meta = metadata(Jurisdiction::Federal, None, DocumentType::Regulations, "T");
        let today = Utc::now().date_naive();
        let key = StorageKey::derive_today(&meta);
        // A midnight rollover between the two calls is the only way these differ.
        if Utc::now().date_naive() == today {
            assert_eq!(key, StorageKey::derive(&meta, today));
        }
    }

    #[test]
    fn title_without_alphanumerics_gets_placeholder() {
        let meta = metadata(Jurisdiction::Federal, None, DocumentType::Addendums, "!!!");
        assert_eq!(
            StorageKey::derive(&meta, march_first()).as_str(),
            "federal/addendums/document-2024-03-01.pdf"
        );
    }

    #[test]
    fn parse_accepts_relative_paths() {
        let key = StorageKey::parse("states/ohio/guidance/a-2024-03-01.pdf").expect("valid");
        assert_eq!(key.to_string(), "states/ohio/guidance/a-2024-03-01.pdf");
    }

    #[test]
    fn parse_rejects_unsafe_paths() {
        for raw in ["", "   ", "/federal/x.pdf", "federal//x.pdf", "../x.pdf", "a/./b", "a/"] {
            assert!(
                matches!(StorageKey::parse(raw), Err(AppError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }
}
