use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use harvest_logging::harvest_warn;
use harvester_core::UrlStatus;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const LINKS_TABLE: &str = "links.csv";
pub const EMAILS_TABLE: &str = "emails.csv";
pub const VALID_TABLE: &str = "valid_emails.csv";
pub const PROCESSED_TABLE: &str = "processed_emails.csv";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkRow {
    url: String,
    status: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct EmailRow {
    email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VerdictRow {
    email: String,
    score: u32,
}

/// The CSV tables of one harvest, all living in one directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    writer: AtomicFileWriter,
}

impl DataDir {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        ensure_output_dir(&root)?;
        Ok(Self {
            writer: AtomicFileWriter::new(root.clone()),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    /// Frontier rows `(url, status)`; a missing table is empty.
    pub fn load_frontier(&self) -> Result<Vec<(String, UrlStatus)>, PersistError> {
        let rows: Vec<LinkRow> = read_rows(&self.path(LINKS_TABLE))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match UrlStatus::from_flag(row.status) {
                Some(status) if !row.url.trim().is_empty() => Some((row.url, status)),
                _ => {
                    harvest_warn!("Skipping frontier row {:?} with status {}", row.url, row.status);
                    None
                }
            })
            .collect())
    }

    /// Rewrite the whole frontier table.
    pub fn save_frontier<'a, I>(&self, rows: I) -> Result<PathBuf, PersistError>
    where
        I: IntoIterator<Item = (&'a str, UrlStatus)>,
    {
        let rows = rows.into_iter().map(|(url, status)| LinkRow {
            url: url.to_string(),
            status: status.as_flag(),
        });
        self.write_table(LINKS_TABLE, rows)
    }

    /// Harvested addresses; a missing table is empty.
    pub fn load_emails(&self) -> Result<Vec<String>, PersistError> {
        self.load_address_table(EMAILS_TABLE)
    }

    /// Open the harvested-address table for incremental appends.
    pub fn email_appender(&self) -> Result<EmailAppender, PersistError> {
        EmailAppender::open(&self.path(EMAILS_TABLE))
    }

    pub fn load_processed(&self) -> Result<Vec<String>, PersistError> {
        self.load_address_table(PROCESSED_TABLE)
    }

    pub fn save_processed<'a, I>(&self, addresses: I) -> Result<PathBuf, PersistError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let rows = addresses.into_iter().map(|email| EmailRow {
            email: email.to_string(),
        });
        self.write_table(PROCESSED_TABLE, rows)
    }

    pub fn load_valid(&self) -> Result<Vec<(String, u32)>, PersistError> {
        let rows: Vec<VerdictRow> = read_rows(&self.path(VALID_TABLE))?;
        Ok(rows.into_iter().map(|row| (row.email, row.score)).collect())
    }

    pub fn save_valid<'a, I>(&self, verdicts: I) -> Result<PathBuf, PersistError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let rows = verdicts.into_iter().map(|(email, score)| VerdictRow {
            email: email.to_string(),
            score,
        });
        self.write_table(VALID_TABLE, rows)
    }

    fn load_address_table(&self, table: &str) -> Result<Vec<String>, PersistError> {
        let rows: Vec<EmailRow> = read_rows(&self.path(table))?;
        Ok(rows
            .into_iter()
            .map(|row| row.email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect())
    }

    fn write_table<T, I>(&self, table: &str, rows: I) -> Result<PathBuf, PersistError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let content = writer
            .into_inner()
            .map_err(|err| PersistError::Io(io::Error::other(err.to_string())))?;
        self.writer.write(table, &content)
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize::<T>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(err) => harvest_warn!("Skipping row {} of {:?}: {}", index + 1, path, err),
        }
    }
    Ok(rows)
}

/// Append-only writer for the harvested-address table.
///
/// The header row is written only when the file is new or empty.
pub struct EmailAppender {
    writer: csv::Writer<File>,
}

impl EmailAppender {
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(["email"])?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    pub fn append(&mut self, address: &str) -> Result<(), PersistError> {
        self.writer.write_record([address])?;
        self.writer.flush()?;
        Ok(())
    }
}
