//! Rotating JSONL file writer

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::types::CycleRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// Writes [`CycleRecord`]s as JSON lines.
///
/// A new file is started after `max_records_per_file` records; only the
/// newest `max_files_to_keep` telemetry files are kept in the directory.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    sequence: u64,
}

impl TelemetryLogger {
    /// Creates the logger and its directory. No file is opened until the
    /// first record.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            current_path: None,
            records_in_file: 0,
            sequence: 0,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
        )
    }

    /// Appends one record, rotating first if the current file is full.
    ///
    /// Output is buffered; it reaches the disk on rotation, [`flush`] or drop.
    ///
    /// [`flush`]: TelemetryLogger::flush
    ///
    /// # Errors
    ///
    /// Returns error on serialization or I/O failure
    pub fn write(&mut self, record: &CycleRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Flushes the open file, if any.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let (path, file) = loop {
            let name = format!(
                "{}{}_{:04}.{}",
                FILE_PREFIX, stamp, self.sequence, FILE_EXTENSION
            );
            self.sequence += 1;

            let path = self.dir.join(name);
            // Never truncate a file left by an earlier run
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        };
        info!("Telemetry file opened: {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune();
        Ok(())
    }

    /// Deletes the oldest telemetry files beyond the retention limit.
    ///
    /// Age is taken from the modification time; the open file always counts
    /// as the newest and is never removed.
    fn prune(&self) {
        let files = match telemetry_files(&self.dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list telemetry directory: {}", e);
                return;
            }
        };

        let current = self.current_path.as_deref();
        let mut older: Vec<(SystemTime, PathBuf)> = files
            .into_iter()
            .filter(|path| Some(path.as_path()) != current)
            .map(|path| (modified_time(&path), path))
            .collect();

        let keep = self.max_files_to_keep.saturating_sub(1);
        if older.len() <= keep {
            return;
        }

        older.sort();
        let excess = older.len() - keep;
        for (_, path) in older.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry file {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

fn modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Telemetry files in `dir`, in directory order.
pub fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_telemetry = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(FILE_PREFIX))
            && path.extension().is_some_and(|ext| ext == FILE_EXTENSION);
        if is_telemetry {
            files.push(path);
        }
    }
    Ok(files)
}
