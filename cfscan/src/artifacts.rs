//! Durable scan outputs: append-only logs, the progress snapshot and the
//! reference response blob. Every file is created fresh per run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::Error;

/// Prefix used when none is given: `cf_<YYYYMMDD_HHMMSS>`.
pub fn default_prefix() -> String {
    format!("cf_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

pub struct Artifacts {
    pub errors: Arc<AppendLog>,
    pub found: Arc<AppendLog>,
    pub checked: Arc<AppendLog>,
    pub progress: Arc<SnapshotFile>,
    reference_path: PathBuf,
}

impl Artifacts {
    pub fn create(dir: &Path, prefix: &str) -> Result<Self, Error> {
        let path = |suffix: &str| dir.join(format!("{prefix}_{suffix}"));

        let reference_path = path("looking_for_response");
        create_file(&reference_path)?;

        Ok(Artifacts {
            errors: Arc::new(AppendLog::create(path("errors.csv"))?),
            found: Arc::new(AppendLog::create(path("found_ips.csv"))?),
            checked: Arc::new(AppendLog::create(path("checked_ips.csv"))?),
            progress: Arc::new(SnapshotFile::create(path("progress.json"))?),
            reference_path,
        })
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    pub fn write_reference(&self, body: &[u8]) -> Result<(), Error> {
        std::fs::write(&self.reference_path, body).map_err(|source| Error::CreateFile {
            path: self.reference_path.clone(),
            source,
        })
    }
}

fn create_file(path: &Path) -> Result<File, Error> {
    File::create(path).map_err(|source| Error::CreateFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Append-only line log shared by many tasks.
///
/// Each line goes out in a single `write_all` while the lock is held, so
/// concurrent appends never interleave. Write failures are logged and
/// otherwise ignored.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AppendLog {
    pub fn create(path: PathBuf) -> Result<Self, Error> {
        create_file(&path)?;
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| Error::CreateFile {
                path: path.clone(),
                source,
            })?;

        Ok(AppendLog {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_line(&self, line: &str) {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(_) => {
                debug!("{}: lock poisoned, dropping line", self.path.display());
                return;
            }
        };
        if let Err(err) = file.write_all(buf.as_bytes()) {
            debug!("{}: append failed: {}", self.path.display(), err);
        }
    }

    pub fn sync(&self) {
        if let Ok(file) = self.file.lock() {
            if let Err(err) = file.sync_data() {
                debug!("{}: sync failed: {}", self.path.display(), err);
            }
        }
    }
}

/// A file that is replaced as a whole on every write.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn create(path: PathBuf) -> Result<Self, Error> {
        create_file(&path)?;
        Ok(SnapshotFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes to a temp file next to the target, then renames it over the
    /// target. Readers see either the old or the new content, never a mix.
    pub fn overwrite(&self, content: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content)?;
        tmp.as_file_mut().sync_data()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

/// `target, "message"` with embedded quotes and line breaks escaped, so
/// every record stays on one line.
pub fn csv_error_line(target: &str, message: &str) -> String {
    let message = message
        .replace('"', r#"\""#)
        .replace('\r', r"\r")
        .replace('\n', r"\n");
    format!(r#"{}, "{}""#, target, message)
}
