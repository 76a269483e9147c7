//! Reading incident record exports from disk.
//!
//! The portal exports either one flat array of records or an object keyed
//! by collection name (`pending_report`, `lost_pet`, ...). Both shapes are
//! accepted; keyed exports are flattened with each record stamped with its
//! collection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stray_watch_incident_models::{IncidentCategory, IncidentRecord, merge_sources};
use thiserror::Error;

/// Errors that can occur while loading a records file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file couldn't be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file isn't a records export.
    #[error("Failed to parse incident records: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Flat(Vec<IncidentRecord>),
    ByCategory(BTreeMap<IncidentCategory, Vec<IncidentRecord>>),
}

/// Parses a records export from a JSON string.
///
/// # Errors
///
/// Returns [`LoadError::Json`] if the document is neither a record array
/// nor an object of record arrays keyed by collection.
pub fn parse_records(json: &str) -> Result<Vec<IncidentRecord>, LoadError> {
    let records = match serde_json::from_str(json)? {
        RecordsFile::Flat(records) => records,
        RecordsFile::ByCategory(by_category) => {
            let sources: Vec<_> = by_category.into_iter().collect();
            merge_sources(&sources)
        }
    };
    Ok(records)
}

/// Reads and parses a records export.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file can't be read, otherwise the same
/// errors as [`parse_records`].
pub fn load_records(path: &Path) -> Result<Vec<IncidentRecord>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&contents)?;
    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
