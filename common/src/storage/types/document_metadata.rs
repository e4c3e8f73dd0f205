use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::blank_as_none;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jurisdiction {
    Federal,
    State,
}

impl Jurisdiction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::State => "state",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Regulations,
    Addendums,
    Implementation,
    Guidance,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regulations => "regulations",
            Self::Addendums => "addendums",
            Self::Implementation => "implementation",
            Self::Guidance => "guidance",
        }
    }

    /// Document types a curator may choose for the given jurisdiction.
    pub fn allowed_for(jurisdiction: Jurisdiction) -> &'static [DocumentType] {
        match jurisdiction {
            Jurisdiction::Federal => &[Self::Regulations, Self::Addendums],
            Jurisdiction::State => &[Self::Implementation, Self::Guidance],
        }
    }

    pub fn is_allowed_for(self, jurisdiction: Jurisdiction) -> bool {
        Self::allowed_for(jurisdiction).contains(&self)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing an uploaded regulatory document.
///
/// The first block of fields is supplied by the curator; `uploaded_at`,
/// `original_filename`, `file_size` and `mime_type` are appended at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub jurisdiction: Jurisdiction,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<String>,
    pub document_type: DocumentType,
    pub title: String,
    #[serde(
        default,
        deserialize_with = "blank_date_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub effective_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub regulation_section: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer)?
        .map(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(de::Error::custom))
        .transpose()
}

/// Details of the received file, used to complete the system-appended fields.
#[derive(Debug, Clone)]
pub struct UploadDetails {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
    pub received_at: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Parses the metadata JSON submitted alongside an upload and checks its invariants.
    pub fn parse_json(raw: &str) -> Result<Self, AppError> {
        let metadata: Self = serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("Invalid metadata: {e}")))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Document title is required".into()));
        }

        match (self.jurisdiction, &self.state) {
            (Jurisdiction::State, None) => {
                return Err(AppError::Validation(
                    "A state is required for state-level documents".into(),
                ))
            }
            (Jurisdiction::Federal, Some(_)) => {
                return Err(AppError::Validation(
                    "Federal documents must not name a state".into(),
                ))
            }
            _ => {}
        }

        if !self.document_type.is_allowed_for(self.jurisdiction) {
            return Err(AppError::Validation(format!(
                "Document type '{}' is not valid for {} documents",
                self.document_type, self.jurisdiction
            )));
        }

        Ok(())
    }

    /// Fills the system-appended fields that the client left out. The size always
    /// reflects the bytes actually received.
    #[must_use]
    pub fn with_upload_details(mut self, details: UploadDetails, key: &str) -> Self {
        if self.original_filename.is_none() {
            self.original_filename = details
                .file_name
                .filter(|name| !name.trim().is_empty())
                .or_else(|| key.rsplit('/').next().map(str::to_string));
        }
        if self.mime_type.is_none() {
            self.mime_type = details.content_type.or_else(|| {
                self.original_filename.as_deref().map(|name| {
                    mime_guess::from_path(name)
                        .first_or(mime::APPLICATION_OCTET_STREAM)
                        .to_string()
                })
            });
        }
        self.uploaded_at.get_or_insert(details.received_at);
        self.file_size = Some(details.size);
        self
    }

    /// Per-field custom metadata stored next to the object. Optional fields are
    /// written as empty strings so every object carries the same set of keys.
    pub fn object_metadata(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "original-filename",
                self.original_filename.clone().unwrap_or_default(),
            ),
            ("document-title", self.title.clone()),
            ("jurisdiction", self.jurisdiction.to_string()),
            ("document-type", self.document_type.to_string()),
            (
                "effective-date",
                self.effective_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            (
                "regulation-section",
                self.regulation_section.clone().unwrap_or_default(),
            ),
            ("state", self.state.clone().unwrap_or_default()),
            (
                "uploaded-at",
                self.uploaded_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ),
            (
                "file-size",
                self.file_size.map(|s| s.to_string()).unwrap_or_default(),
            ),
        ]
    }
}
