//! File enumeration -- turns scan roots into an ordered stream of candidates
//!
//! [`FileIterator`] walks every root in the order given. Directory entries
//! are visited sorted by file name, so two runs over the same tree always
//! produce the same sequence. Entries that cannot be read are yielded as
//! [`Entry::Skipped`] instead of ending the walk: unreadable directories,
//! broken symlinks, and candidate files that fail to open.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use parsec_core::error::ConfigError;
use parsec_core::types::SourcePath;

/// One item produced by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A candidate source file
    File(SourcePath),
    /// A path that could not be read
    Skipped { path: PathBuf, reason: String },
}

/// Lazy, single-pass iterator over the source files below a set of roots.
pub struct FileIterator {
    roots: std::vec::IntoIter<PathBuf>,
    extensions: Vec<String>,
    current: Option<walkdir::IntoIter>,
}

impl FileIterator {
    /// Creates an iterator over `roots`, keeping files whose extension is in
    /// `extensions`.
    ///
    /// Extensions match case-insensitively; a leading dot is ignored.
    /// A file named directly as a root is always yielded.
    pub fn new<I, P>(roots: I, extensions: &[String]) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots: Vec<PathBuf> = roots.into_iter().map(Into::into).collect();
        if roots.iter().any(|root| root.as_os_str().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "paths".to_owned(),
                reason: "scan paths must not be empty".to_owned(),
            });
        }

        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .collect();
        if extensions.is_empty() || extensions.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidValue {
                field: "scan.extensions".to_owned(),
                reason: "at least one non-empty extension is required".to_owned(),
            });
        }

        Ok(Self {
            roots: roots.into_iter(),
            extensions,
            current: None,
        })
    }

    /// Normalized extensions this iterator accepts.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

fn skipped(path: PathBuf, reason: String) -> Entry {
    warn!(path = %path.display(), reason = %reason, "skipping unreadable path");
    Entry::Skipped { path, reason }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

impl Iterator for FileIterator {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            if let Some(walker) = self.current.as_mut() {
                match walker.next() {
                    Some(Ok(entry)) => {
                        if entry.file_type().is_symlink() {
                            // not followed, but a dangling link is reported
                            if let Err(err) = fs::metadata(entry.path()) {
                                return Some(skipped(entry.into_path(), err.to_string()));
                            }
                            continue;
                        }
                        if !entry.file_type().is_file() {
                            continue;
                        }
                        if entry.depth() == 0 || has_extension(entry.path(), &self.extensions) {
                            if let Err(err) = File::open(entry.path()) {
                                return Some(skipped(entry.into_path(), err.to_string()));
                            }
                            return Some(Entry::File(SourcePath::new(entry.into_path())));
                        }
                    }
                    Some(Err(err)) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                        let reason = match err.io_error() {
                            Some(io_err) => io_err.to_string(),
                            None => err.to_string(),
                        };
                        return Some(skipped(path, reason));
                    }
                    None => self.current = None,
                }
                continue;
            }

            let root = self.roots.next()?;
            self.current = Some(
                WalkDir::new(root)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            );
        }
    }
}
