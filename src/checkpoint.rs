//! Append-only CSV ledger of completed work.
//!
//! Every row is keyed by its first column. Reopening an existing file reports
//! the keys already written as `recovered`, which lets an interrupted job skip
//! work it has already done. Rows are never rewritten or reordered.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HarvestError, Result};

pub struct CheckpointWriter {
    path: PathBuf,
    columns: Vec<String>,
    recovered: HashSet<String>,
    written: HashSet<String>,
    writer: Option<csv::Writer<File>>,
}

impl CheckpointWriter {
    /// Open `path` for appending, creating it with a header row of `columns`
    /// if it does not exist yet.
    pub fn open(path: impl AsRef<Path>, columns: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();

        let recovered = if path.exists() {
            recover(&path, &columns)?
        } else {
            None
        };
        let need_header = recovered.is_none();

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if need_header {
            writer.write_record(&columns)?;
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }

        let recovered = recovered.unwrap_or_default();
        debug!(path = %path.display(), recovered = recovered.len(), "checkpoint opened");
        Ok(Self {
            path,
            columns,
            recovered,
            written: HashSet::new(),
            writer: Some(writer),
        })
    }

    /// Keys present in the file when it was opened.
    pub fn recovered(&self) -> &HashSet<String> {
        &self.recovered
    }

    /// Whether `key` was recovered or has been written since opening.
    pub fn contains(&self, key: &str) -> bool {
        self.recovered.contains(key) || self.written.contains(key)
    }

    /// Append one row and sync it to disk before returning.
    pub fn write(&mut self, key: &str, values: &[&str]) -> Result<()> {
        if values.len() + 1 != self.columns.len() {
            return Err(HarvestError::RowWidth {
                key: key.to_string(),
                expected: self.columns.len(),
                found: values.len() + 1,
            });
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| HarvestError::CheckpointClosed {
                path: self.path.clone(),
            })?;

        writer.write_record(std::iter::once(key).chain(values.iter().copied()))?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        self.written.insert(key.to_string());
        Ok(())
    }

    /// Release the file handle. Calling this more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(
                path = %self.path.display(),
                written = self.written.len(),
                "checkpoint closed"
            );
        }
        Ok(())
    }
}

impl Drop for CheckpointWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "Failed to close checkpoint");
        }
    }
}

/// Read the keys of an existing checkpoint. Returns `None` when the file holds
/// no complete header and must be started over.
///
/// A final row that was interrupted mid-write is cut off so appending resumes
/// on a clean record boundary. Such a row lacks its trailing newline, stops
/// inside a quoted field, or has too few columns.
fn recover(path: &Path, columns: &[String]) -> Result<Option<HashSet<String>>> {
    let bytes = std::fs::read(path)?;
    if !bytes.contains(&b'\n') {
        if !bytes.is_empty() {
            warn!(path = %path.display(), "Discarding incomplete checkpoint header");
        }
        File::options().write(true).open(path)?.set_len(0)?;
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let found: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if found != columns {
        return Err(HarvestError::CheckpointSchema {
            path: path.to_path_buf(),
            expected: columns.to_vec(),
            found,
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let start = record.position().map(|p| p.byte()).unwrap_or(0);
        let key = record.get(0).unwrap_or_default().to_string();
        rows.push((key, start, record.len()));
    }

    if let Some((key, start, width)) = rows.last() {
        let tail = &bytes[*start as usize..];
        let open_quote = tail.iter().filter(|&&b| b == b'"').count() % 2 == 1;
        if !tail.ends_with(b"\n") || open_quote || *width < columns.len() {
            warn!(path = %path.display(), key = %key, "Discarding incomplete checkpoint row");
            File::options().write(true).open(path)?.set_len(*start)?;
            rows.pop();
        }
    }

    let mut recovered = HashSet::with_capacity(rows.len());
    for (key, _, width) in rows {
        if width != columns.len() {
            return Err(HarvestError::RowWidth {
                key,
                expected: columns.len(),
                found: width,
            });
        }
        recovered.insert(key);
    }
    Ok(Some(recovered))
}
