//! Day-keyed, per-category tabular output files.
//!
//! Layout: `<base>/excel_output_<YYYY-MM-DD>/<category>_output.csv`. Each batch
//! is appended to whatever the file already holds, followed by two blank
//! spacer rows, and the result replaces the file through a rename so readers
//! never see a half-written store.

pub mod table;

pub use table::{cell_text, Table};

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use log::debug;

use crate::aggregate::{CategorizedBatch, FlatRow};
use crate::classify::Category;
use crate::error::StoreError;

/// Blank rows written after every batch.
pub const SPACER_ROWS: usize = 2;

pub const STORE_EXTENSION: &str = "csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    /// Data rows from this batch, spacer excluded.
    pub appended_rows: usize,
    /// Rows in the file after the write, spacers included.
    pub total_rows: usize,
    pub columns: usize,
}

/// Per-category outcome of one batch write.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(Category, Result<WriteSummary, StoreError>)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (Category, &WriteSummary)> {
        self.results
            .iter()
            .filter_map(|(category, result)| result.as_ref().ok().map(|s| (*category, s)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (Category, &StoreError)> {
        self.results
            .iter()
            .filter_map(|(category, result)| result.as_ref().err().map(|e| (*category, e)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

pub struct OutputStore {
    base_directory: PathBuf,
    /// One lock per category, held across the day lookup and the write;
    /// concurrent workers for the same category take turns.
    category_locks: [Mutex<()>; Category::ALL.len()],
}

impl OutputStore {
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Self {
        Self {
            base_directory: base_directory.as_ref().to_path_buf(),
            category_locks: Default::default(),
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn day_directory(&self, day: NaiveDate) -> PathBuf {
        self.base_directory
            .join(format!("excel_output_{}", day.format("%Y-%m-%d")))
    }

    pub fn store_path(&self, category: Category, day: NaiveDate) -> PathBuf {
        self.day_directory(day)
            .join(format!("{}_output.{}", category.as_str(), STORE_EXTENSION))
    }

    /// Writes every non-empty category of the batch. A failure in one
    /// category does not stop the others.
    pub fn write_batch(&self, batch: &CategorizedBatch, day: NaiveDate) -> BatchReport {
        let results = batch
            .iter()
            .map(|(category, rows)| (category, self.append(category, rows, day)))
            .collect();
        BatchReport { results }
    }

    pub fn append(
        &self,
        category: Category,
        rows: &[FlatRow],
        day: NaiveDate,
    ) -> Result<WriteSummary, StoreError> {
        let _guard = self.category_locks[category as usize]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let directory = self.day_directory(day);
        ensure_directory(&directory)?;
        let path = self.store_path(category, day);

        let mut table = if path.exists() {
            Table::read(&path).map_err(|e| StoreError::ReadExisting {
                path: path.clone(),
                source: e,
            })?
        } else {
            Table::new()
        };

        let existing_rows = table.row_count();
        table.append_rows(rows);
        table.append_blank_rows(SPACER_ROWS);

        replace_atomically(&directory, &path, |file| table.write_csv(file))?;

        debug!(
            "Appended {} rows to {} ({} existing)",
            rows.len(),
            path.display(),
            existing_rows
        );

        Ok(WriteSummary {
            path,
            appended_rows: rows.len(),
            total_rows: table.row_count(),
            columns: table.headers().len(),
        })
    }
}

fn ensure_directory(path: &Path) -> Result<(), StoreError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StoreError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Stages the new contents next to `path` and renames them into place. The
/// target keeps its permissions; a new file gets the same mode a plain create
/// would give it.
fn replace_atomically<F>(directory: &Path, path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut File) -> Result<(), csv::Error>,
{
    let write_error = |e: std::io::Error| StoreError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    let existing_permissions = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(write_error(e)),
    };

    // Opened through `OpenOptions` rather than tempfile's default so the
    // process umask applies instead of a fixed 0600.
    let mut staged = tempfile::Builder::new()
        .prefix(".docwatch-")
        .suffix(".tmp")
        .make_in(directory, |staged_path| {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(staged_path)
        })
        .map_err(write_error)?;

    if let Some(permissions) = existing_permissions {
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(write_error)?;
    }

    write(staged.as_file_mut()).map_err(|e| StoreError::Encode {
        path: path.to_path_buf(),
        source: e,
    })?;

    staged.as_file().sync_all().map_err(write_error)?;

    staged.persist(path).map_err(|e| StoreError::Replace {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
