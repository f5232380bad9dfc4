//! Storage service for uploaded files.
//!
//! Uploads are streamed into a staging directory first and only appear in
//! the served upload directory once complete:
//!
//! ```text
//! uploads.tmp/             # in-flight uploads, never served
//! └── {uuid}.part
//! uploads/                 # published files, served at /uploads
//! └── 1700000000000_My_Clip__1.MOV
//! ```
//!
//! Publishing hard-links the staged file under its generated name. Linking
//! fails instead of replacing an existing file, so two uploads that land on
//! the same name never overwrite each other; the later one is retried with
//! the next millisecond. When the staging and upload directories sit on
//! different filesystems the link fails with a cross-device error, and the
//! staged data is copied into a freshly created (never pre-existing) file
//! instead.

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::models::StoredFile;
use crate::services::admission::{self, basename};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How many consecutive milliseconds are tried before giving up on a name
const MAX_PUBLISH_ATTEMPTS: i64 = 16;

/// Service for managing uploaded files on local disk
#[derive(Debug, Clone)]
pub struct StorageService {
    /// Path to the published uploads directory
    upload_dir: PathBuf,
    /// Path to the staging directory
    temp_dir: PathBuf,
}

impl StorageService {
    /// Create a new storage service and initialize directories
    ///
    /// # Errors
    /// Returns error if directories cannot be created
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let service = Self {
            upload_dir: absolute(&config.upload_dir)?,
            temp_dir: absolute(&config.temp_dir)?,
        };

        service.init_directories().await?;

        info!(
            uploads = %service.upload_dir.display(),
            temp = %service.temp_dir.display(),
            "Storage service initialized"
        );

        Ok(service)
    }

    /// Initialize storage directories
    async fn init_directories(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.temp_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
                debug!(path = %dir.display(), "Created storage directory");
            }
        }
        Ok(())
    }

    /// Directory published files live in
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Open a new staging file for an incoming upload
    pub async fn create_staged(&self) -> Result<StagedFile> {
        let path = self.temp_dir.join(format!("{}.part", Uuid::new_v4()));

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        debug!(path = %path.display(), "Opened staging file");

        Ok(StagedFile {
            path,
            file,
            written: 0,
        })
    }

    /// Move a completed staging file into the upload directory.
    ///
    /// The final name is `admission::generate_name(original_name, ts)`,
    /// starting at `timestamp_ms` and moving forward one millisecond for
    /// each name already taken.
    pub async fn publish(
        &self,
        staged: StagedFile,
        original_name: &str,
        timestamp_ms: i64,
    ) -> Result<StoredFile> {
        let (staged_path, size) = staged.finish().await?;

        let result = self.link_unique(&staged_path, original_name, timestamp_ms).await;
        remove_quietly(&staged_path).await;

        let (filename, path) = result?;

        info!(filename = %filename, size = size, "Stored upload");

        Ok(StoredFile {
            filename,
            size,
            path,
        })
    }

    async fn link_unique(
        &self,
        staged_path: &Path,
        original_name: &str,
        timestamp_ms: i64,
    ) -> Result<(String, PathBuf)> {
        for offset in 0..MAX_PUBLISH_ATTEMPTS {
            let filename = admission::generate_name(original_name, timestamp_ms + offset);
            let target = self.upload_dir.join(&filename);

            match place_new(staged_path, &target).await {
                Ok(()) => return Ok((filename, target)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(filename = %filename, "Generated name already taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(format!(
            "No free name for upload after {} attempts",
            MAX_PUBLISH_ATTEMPTS
        )))
    }

    // =========================================================================
    // Published files
    // =========================================================================

    /// Resolve a client-supplied name to a path inside the upload directory.
    ///
    /// Directory components are discarded. Returns `None` if nothing is left.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        basename(name).map(|base| self.upload_dir.join(base))
    }

    /// Find a published file by name, trying `extensions` when the exact
    /// name does not exist (`clip` -> `clip.mp4`, `clip.webm`, ...)
    pub async fn find(&self, name: &str, extensions: &[String]) -> Option<PathBuf> {
        let path = self.resolve(name)?;

        if is_file(&path).await {
            return Some(path);
        }

        for ext in extensions {
            let mut candidate = path.clone().into_os_string();
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);

            if is_file(&candidate).await {
                return Some(candidate);
            }
        }

        None
    }

    /// Delete a published file by name
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no such file exists
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name).ok_or(AppError::NotFound)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Deleted upload");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// An upload being written to the staging directory.
///
/// Dropping a `StagedFile` without publishing it leaves the partial file in
/// the staging directory; call [`StagedFile::discard`] on failure paths.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: fs::File,
    written: u64,
}

impl StagedFile {
    /// Append a chunk of upload data
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Remove the staging file
    pub async fn discard(self) {
        let Self { path, file, .. } = self;
        drop(file);
        remove_quietly(&path).await;
        debug!(path = %path.display(), "Discarded staging file");
    }

    async fn sync(&mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }

    async fn finish(mut self) -> Result<(PathBuf, u64)> {
        let synced = self.sync().await;
        if let Err(e) = synced {
            self.discard().await;
            return Err(e.into());
        }
        Ok((self.path, self.written))
    }
}

/// Make `staged` available as `target`, failing if `target` exists
async fn place_new(staged: &Path, target: &Path) -> std::io::Result<()> {
    match fs::hard_link(staged, target).await {
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(target = %target.display(), "Staging on another filesystem, copying");
            copy_new(staged, target).await
        }
        linked => linked,
    }
}

async fn copy_new(source: &Path, target: &Path) -> std::io::Result<()> {
    let mut dest = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await?;

    let copied = async {
        let mut src = fs::File::open(source).await?;
        tokio::io::copy(&mut src, &mut dest).await?;
        dest.sync_all().await
    }
    .await;

    if copied.is_err() {
        drop(dest);
        remove_quietly(target).await;
    }
    copied
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove staging file");
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
