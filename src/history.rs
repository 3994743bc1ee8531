use crate::catalog::Catalog;
use crate::core::GroupResolution;
use crate::error::CatalogError;
use crate::models::Visibility;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error on history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid history index {index}; {len} record(s) available")]
    InvalidIndex { index: usize, len: usize },

    #[error("Failed to restore group {duplicate_id}: {source}")]
    Undo {
        duplicate_id: String,
        #[source]
        source: CatalogError,
    },
}

/// One group's applied resolution, as appended to the history file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResolutionRecord {
    pub timestamp: String,
    pub duplicate_id: String,
    pub blessed_prefix: String,
    pub keeper: String,
    pub archived: Vec<String>,
    pub restored: Vec<String>,
}

impl ResolutionRecord {
    pub fn from_resolution(resolution: &GroupResolution) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            duplicate_id: resolution.duplicate_id.clone(),
            blessed_prefix: resolution.blessed_prefix.clone(),
            keeper: resolution.keeper.clone(),
            archived: resolution.archived.clone(),
            restored: resolution.restored.clone(),
        }
    }

    /// Put the group back the way it was before this resolution.
    pub fn undo<C: Catalog + ?Sized>(&self, catalog: &C) -> Result<(), CatalogError> {
        if !self.archived.is_empty() {
            catalog.update_visibility(&self.archived, Visibility::Timeline)?;
        }
        if !self.restored.is_empty() {
            catalog.update_visibility(&self.restored, Visibility::Archive)?;
        }
        Ok(())
    }
}

/// Append-only JSON-lines log of resolutions, one record per line.
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub fn append(&self, resolutions: &[GroupResolution]) -> Result<usize, HistoryError> {
        if resolutions.is_empty() {
            return Ok(0);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        for resolution in resolutions {
            let record = ResolutionRecord::from_resolution(resolution);
            writeln!(out, "{}", serde_json::to_string(&record)?).map_err(|e| self.io_error(e))?;
        }
        Ok(resolutions.len())
    }

    /// All readable records in file order. A missing file is an empty history.
    pub fn records(&self) -> Result<Vec<ResolutionRecord>, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ResolutionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(err) => warn!("Skipping malformed history entry {}: {}", i, err),
            }
        }
        Ok(records)
    }

    /// Indices selected for restore: every record, one record, or the latest.
    pub fn select(
        &self,
        records: &[ResolutionRecord],
        index: Option<usize>,
        all: bool,
    ) -> Result<Vec<usize>, HistoryError> {
        if all {
            return Ok((0..records.len()).collect());
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let index = index.unwrap_or(records.len() - 1);
        if index >= records.len() {
            return Err(HistoryError::InvalidIndex {
                index,
                len: records.len(),
            });
        }
        Ok(vec![index])
    }

    /// Undo the `selected` records against `catalog`, newest first.
    ///
    /// The file only loses those records when `commit` is set; dry runs and
    /// snapshot catalogs never reach the server, so their records must survive.
    pub fn restore<C: Catalog + ?Sized>(
        &self,
        catalog: &C,
        records: Vec<ResolutionRecord>,
        selected: &[usize],
        commit: bool,
    ) -> Result<usize, HistoryError> {
        for &i in selected.iter().rev() {
            let Some(record) = records.get(i) else {
                return Err(HistoryError::InvalidIndex {
                    index: i,
                    len: records.len(),
                });
            };
            info!(
                "Restoring group {} from record {}",
                record.duplicate_id, record.timestamp
            );
            record.undo(catalog).map_err(|source| HistoryError::Undo {
                duplicate_id: record.duplicate_id.clone(),
                source,
            })?;
        }

        if commit {
            self.remove(records, selected)?;
        }
        Ok(selected.len())
    }

    /// Rewrite the file without the records at `removed`.
    pub fn remove(
        &self,
        records: Vec<ResolutionRecord>,
        removed: &[usize],
    ) -> Result<(), HistoryError> {
        let mut content = String::new();
        for (i, record) in records.into_iter().enumerate() {
            if removed.contains(&i) {
                continue;
            }
            content.push_str(&serde_json::to_string(&record)?);
            content.push('\n');
        }
        fs::write(&self.path, content).map_err(|e| self.io_error(e))
    }
}
