//! Local project packaging.
//!
//! Turns a project directory into a single ZIP archive on temporary storage
//! so it can be uploaded in one multipart request. The archive is owned by a
//! [`PackagedArchive`] guard that deletes the file exactly once, either via
//! [`PackagedArchive::release`] or on drop.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// DEFLATE level used for every entry (maximum ratio).
const COMPRESSION_LEVEL: i64 = 9;

/// Creates project archives under a staging directory.
#[derive(Debug, Clone)]
pub struct Packager {
    staging_dir: PathBuf,
}

impl Default for Packager {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Packager {
    /// Packager writing archives into `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Archive every entry under `project_dir`, preserving relative paths.
    ///
    /// Resolves once the archive is flushed and closed. On failure the
    /// partial file is removed before the error is returned. The caller must
    /// have checked that `project_dir` is a directory.
    pub async fn package(&self, project_dir: &Path) -> Result<PackagedArchive, ArchiveError> {
        let source = project_dir.to_path_buf();
        // Guard the path before any byte is written: an error, a panic in the
        // blocking task, or a dropped future all remove the partial file.
        let archive = PackagedArchive::new(self.archive_path_for(project_dir));
        let target = archive.path().to_path_buf();

        let entries = tokio::task::spawn_blocking(move || write_archive(&source, &target))
            .await
            .map_err(|e| ArchiveError::Join(e.to_string()))??;

        tracing::debug!(archive = %archive.path().display(), entries, "project archive written");
        Ok(archive)
    }

    /// Unique archive path: `<basename>-<unix millis>-<random>.zip`.
    fn archive_path_for(&self, project_dir: &Path) -> PathBuf {
        let base = project_dir
            .file_name()
            .map(|n| sanitize_file_stem(&n.to_string_lossy()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "project".to_string());
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        self.staging_dir
            .join(format!("{base}-{millis}-{}.zip", &nonce[..8]))
    }
}

/// Exclusive handle on a temporary archive file.
#[derive(Debug)]
pub struct PackagedArchive {
    path: PathBuf,
    armed: bool,
}

impl PackagedArchive {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the archive now. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(archive = %self.path.display(), "archive removed"),
            Err(e) => log_cleanup_failure(&self.path, &e),
        }
    }
}

impl Drop for PackagedArchive {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            if let Err(e) = std::fs::remove_file(&self.path) {
                log_cleanup_failure(&self.path, &e);
            }
        }
    }
}

fn log_cleanup_failure(path: &Path, err: &io::Error) {
    if err.kind() != io::ErrorKind::NotFound {
        tracing::warn!(archive = %path.display(), "failed to clean up archive: {err}");
    }
}

/// Total size in bytes of regular files under `dir`.
pub fn project_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn write_archive(source: &Path, target: &Path) -> Result<usize, ArchiveError> {
    let file = File::create(target).map_err(|e| ArchiveError::Create {
        path: target.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    // The staging dir may sit inside the project; never archive ourselves.
    let own_archive = target.canonicalize().ok();

    let mut entries = 0;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| ArchiveError::Walk {
            path: source.to_path_buf(),
            source: e,
        })?;
        let Some(name) = entry_name(source, entry.path()) else {
            continue;
        };
        if entry.file_name() == target.file_name().unwrap_or_default()
            && entry.path().canonicalize().ok() == own_archive
        {
            continue;
        }

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name.as_str(), options)?;
            let mut input = File::open(entry.path()).map_err(|e| ArchiveError::Entry {
                entry: name.clone(),
                source: e,
            })?;
            io::copy(&mut input, &mut zip).map_err(|e| ArchiveError::Entry {
                entry: name.clone(),
                source: e,
            })?;
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }
        entries += 1;
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer).map_err(|e| ArchiveError::Create {
        path: target.to_path_buf(),
        source: e,
    })?;
    Ok(entries)
}

/// Archive entry name: path relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}
