//! Document repository
//!
//! CRUD over uploaded documents with keyword search and whitelisted sorting.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Db;
use crate::types::query::DocumentSearchParams;
use crate::types::Document;

/// Fields captured at upload time, before the row exists
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub vector_id: String,
    pub extracted_text: Option<String>,
}

/// Store for uploaded documents
#[derive(Clone)]
pub struct DocumentStore {
    db: Db,
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get("id")?;
    let keywords: Option<String> = row.get("keywords")?;
    Ok(Document {
        id: id.parse().unwrap_or_default(),
        filename: row.get("filename")?,
        original_name: row.get("original_name")?,
        mime_type: row.get("mime_type")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        keywords: keywords
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        vector_id: row.get("vector_id")?,
        extracted_text: row.get("extracted_text")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl DocumentStore {
    /// Create a store over the shared database handle
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Persist a new document record.
    pub fn create(&self, new: NewDocument) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            filename: new.filename,
            original_name: new.original_name,
            mime_type: new.mime_type,
            title: new.title,
            summary: new.summary,
            keywords: new.keywords,
            vector_id: new.vector_id,
            extracted_text: new.extracted_text,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO documents (
                    id, filename, original_name, mime_type, title, summary,
                    keywords, vector_id, extracted_text, is_active, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)
                "#,
                params![
                    document.id.to_string(),
                    document.filename,
                    document.original_name,
                    document.mime_type,
                    document.title,
                    document.summary,
                    document.keywords.join(","),
                    document.vector_id,
                    document.extracted_text,
                    document.created_at,
                    document.updated_at,
                ],
            )
        })?;

        tracing::debug!("Created document {} ('{}')", document.id, document.original_name);
        Ok(document)
    }

    /// Look up an active document by id.
    pub fn get_active(&self, id: Uuid) -> Result<Document> {
        let found = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM documents WHERE id = ?1 AND is_active = 1",
                params![id.to_string()],
                row_to_document,
            )
            .optional()
        })?;

        found.ok_or_else(|| Error::not_found(format!("Document {} not found", id)))
    }

    /// List active documents, optionally filtered by a keyword substring
    /// across name, title, summary, extracted text, and keywords, sorted by
    /// a whitelisted column.
    pub fn search(&self, search: &DocumentSearchParams) -> Result<Vec<Document>> {
        // Sort column and direction come from enums, never raw input
        let order_clause = format!(
            "ORDER BY {} {}",
            search.sort_by.column(),
            search.sort_order.keyword()
        );

        match search.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(keyword) => {
                let pattern = format!("%{}%", keyword);
                self.db.with_conn(|conn| {
                    let mut stmt = conn.prepare(&format!(
                        r#"
                        SELECT * FROM documents
                        WHERE is_active = 1 AND (
                            filename LIKE ?1
                            OR original_name LIKE ?1
                            OR title LIKE ?1
                            OR summary LIKE ?1
                            OR extracted_text LIKE ?1
                            OR keywords LIKE ?1
                        )
                        {}
                        "#,
                        order_clause
                    ))?;
                    let rows = stmt.query_map(params![pattern], row_to_document)?;
                    rows.collect()
                })
            }
            None => self.db.with_conn(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT * FROM documents WHERE is_active = 1 {}",
                    order_clause
                ))?;
                let rows = stmt.query_map([], row_to_document)?;
                rows.collect()
            }),
        }
    }

    /// Soft-deactivate a document.
    pub fn deactivate(&self, id: Uuid) -> Result<()> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE documents SET is_active = 0, updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), id.to_string()],
            )
        })?;

        if updated == 0 {
            return Err(Error::not_found(format!("Document {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::query::{SortField, SortOrder};

    fn store() -> DocumentStore {
        DocumentStore::new(Db::in_memory().unwrap())
    }

    fn sample(name: &str, title: &str, keywords: &[&str]) -> NewDocument {
        NewDocument {
            filename: format!("{}-123", name),
            original_name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            title: Some(title.to_string()),
            summary: Some(format!("Summary of {}", title)),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            vector_id: format!("{}-123", name),
            extracted_text: Some("lorem ipsum".to_string()),
        }
    }

    #[test]
    fn create_and_get_roundtrip() {
        let store = store();
        let doc = store
            .create(sample("report.pdf", "Quarterly Report", &["finance", "q3"]))
            .unwrap();

        let fetched = store.get_active(doc.id).unwrap();
        assert_eq!(fetched.original_name, "report.pdf");
        assert_eq!(fetched.keywords, vec!["finance", "q3"]);
        assert_eq!(fetched.vector_id, doc.vector_id);
        assert!(fetched.is_active);
    }

    #[test]
    fn unknown_or_deactivated_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get_active(Uuid::new_v4()).unwrap_err(),
            Error::NotFound(_)
        ));

        let doc = store.create(sample("a.pdf", "A", &[])).unwrap();
        store.deactivate(doc.id).unwrap();
        assert!(matches!(
            store.get_active(doc.id).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn keyword_search_matches_across_fields() {
        let store = store();
        store
            .create(sample("report.pdf", "Quarterly Report", &["finance"]))
            .unwrap();
        store
            .create(sample("notes.txt", "Meeting Notes", &["planning"]))
            .unwrap();

        let by_title = store
            .search(&DocumentSearchParams {
                keyword: Some("Quarterly".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].original_name, "report.pdf");

        let by_keyword = store
            .search(&DocumentSearchParams {
                keyword: Some("planning".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_keyword.len(), 1);
        assert_eq!(by_keyword[0].original_name, "notes.txt");

        let none = store
            .search(&DocumentSearchParams {
                keyword: Some("nonexistent".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn sorting_by_name() {
        let store = store();
        store.create(sample("b.pdf", "B", &[])).unwrap();
        store.create(sample("a.pdf", "A", &[])).unwrap();

        let docs = store
            .search(&DocumentSearchParams {
                keyword: None,
                sort_by: SortField::OriginalName,
                sort_order: SortOrder::Asc,
            })
            .unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.original_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn search_excludes_deactivated() {
        let store = store();
        let doc = store.create(sample("a.pdf", "A", &[])).unwrap();
        store.deactivate(doc.id).unwrap();

        let docs = store.search(&DocumentSearchParams::default()).unwrap();
        assert!(docs.is_empty());
    }
}
