pub mod corpus;
pub mod progress;
pub mod truth;
pub mod types;
pub mod verify;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// File names of the artifacts written into an output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// Use `dir` for output, creating it if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self::new(dir))
    }

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw question records, archived as downloaded.
    pub fn truth_json(&self) -> PathBuf {
        self.dir.join("truth.json")
    }

    pub fn truth_csv(&self) -> PathBuf {
        self.dir.join("truth.csv")
    }

    pub fn truth_non_corpus_csv(&self) -> PathBuf {
        self.dir.join("truth.non_corpus.csv")
    }

    /// Intermediate ledger, removed once the corpus is complete.
    pub fn pau_ids_csv(&self) -> PathBuf {
        self.dir.join("pau_ids.csv")
    }

    pub fn corpus_csv(&self) -> PathBuf {
        self.dir.join("corpus.csv")
    }
}

pub(crate) fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Write a complete table, replacing any existing file. The table is written
/// to a sibling temp file first, so `path` holds either the old or the new
/// table in full.
pub(crate) fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let temp = temp_sibling(path);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(&temp)?);
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

/// Write `value` as pretty JSON, replacing `path` the same way as [`write_table`].
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let temp = temp_sibling(path);
    let mut writer = BufWriter::new(File::create(&temp)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
