//! JSON file event catalog.
//!
//! The file holds an array of event records:
//!
//! ```json
//! [
//!   {
//!     "event_key": "evt-1",
//!     "product_name": "City Museum",
//!     "show_name": "Morning tour",
//!     "starts_at": "2026-01-01T10:00:00Z"
//!   }
//! ]
//! ```
//!
//! `event_key` may be missing or blank; such records are listed but never
//! refreshed.

use seatwatch_core::catalog::{CatalogError, CatalogResult, EventCatalog, EventRecord};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Catalog read from a JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    /// Creates a catalog for `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the catalog reads
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> CatalogResult {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CatalogError::SourceUnavailable(format!("{}: {e}", self.path.display()))
        })?;

        let records: Vec<EventRecord> = serde_json::from_str(&contents).map_err(|e| {
            CatalogError::SourceUnavailable(format!("{}: {e}", self.path.display()))
        })?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "Read catalog file");
        Ok(records)
    }
}

impl EventCatalog for JsonFileCatalog {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = CatalogResult> + Send + '_>> {
        Box::pin(self.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| unreachable!("{e}"));
        file.write_all(contents.as_bytes())
            .unwrap_or_else(|e| unreachable!("{e}"));
        file
    }

    #[tokio::test]
    async fn test_reads_records_in_file_order() {
        let file = write_catalog(
            r#"[
                {"event_key": "evt-2", "product_name": "Museum", "show_name": "Late",
                 "starts_at": "2026-01-01T18:00:00Z"},
                {"product_name": "Museum", "show_name": "No key",
                 "starts_at": "2026-01-01T19:00:00Z"}
            ]"#,
        );

        let records = JsonFileCatalog::new(file.path()).fetch().await.unwrap_or_default();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_key.as_deref(), Some("evt-2"));
        assert_eq!(records[0].starts_at_display(), "2026-01-01 18:00");
        assert_eq!(records[1].key(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("{e}"));
        let catalog = JsonFileCatalog::new(dir.path().join("missing.json"));

        assert!(matches!(
            catalog.fetch().await,
            Err(CatalogError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_unavailable() {
        let file = write_catalog(r#"{"not": "a list"}"#);

        assert!(matches!(
            JsonFileCatalog::new(file.path()).fetch().await,
            Err(CatalogError::SourceUnavailable(_))
        ));
    }
}
