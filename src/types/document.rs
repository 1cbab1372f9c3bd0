//! Document records and the structured summary derived at upload time

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted uploaded document and its derived metadata.
///
/// Immutable after creation except for soft-deactivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Derived unique filename ("{original_name}-{millis}")
    pub filename: String,
    /// Original filename as uploaded by the user
    pub original_name: String,
    /// MIME type as uploaded
    pub mime_type: String,
    /// Model-derived title
    pub title: Option<String>,
    /// Model-derived summary
    pub summary: Option<String>,
    /// Model-derived keywords
    pub keywords: Vec<String>,
    /// Vector-index entry id; doubles as the per-document retrieval filter key
    pub vector_id: String,
    /// Truncated excerpt of the extracted text
    pub extracted_text: Option<String>,
    /// Soft-deactivation flag
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Display title: derived title when present, original filename otherwise.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.original_name)
    }
}

/// Structured summary produced by the chat model at upload time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Document title
    pub title: String,
    /// Short summary
    pub summary: String,
    /// Keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Section breakdown
    #[serde(default)]
    pub sections: Vec<StructuredSection>,
}

/// One section of a structured document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSection {
    /// Section heading
    pub heading: String,
    /// Section content
    pub content: String,
}

impl DocumentStructure {
    /// Fallback structure used when the model's output cannot be parsed:
    /// title from the filename, summary from the leading text.
    pub fn fallback(filename: &str, raw_text: &str) -> Self {
        Self {
            title: filename.to_string(),
            summary: crate::types::truncate_chars(raw_text.trim(), 200),
            keywords: Vec::new(),
            sections: Vec::new(),
        }
    }
}
