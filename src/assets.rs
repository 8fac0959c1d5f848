//! Artifact discovery and loading.
//!
//! Candidates are resolved from file-name glob patterns against the output
//! directory, then filtered down to files that exist when the run starts. The
//! resulting order is the upload order.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Artifact patterns, in upload order: Linux packages, archive, macOS disk
/// image, Windows installer.
pub const ASSET_PATTERNS: &[&str] = &[
    "./dist/*.deb",
    "./dist/*.rpm",
    "./dist/*.zip",
    "./dist/*.dmg",
    "./dist/*.exe",
];

/// Content type used when the extension is not recognised.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset pattern {pattern:?}: no file name component")]
    EmptyPattern { pattern: String },

    #[error("failed to list {}: {source}", dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read asset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file-name glob. `*` matches any run of characters, `?` exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPattern {
    file_pattern: String,
}

impl AssetPattern {
    /// Parses a pattern such as `./dist/*.deb`.
    ///
    /// Only the final path segment is kept; the directory is supplied
    /// separately when resolving.
    pub fn parse(pattern: &str) -> Result<Self, AssetError> {
        let file_pattern = pattern.rsplit('/').next().unwrap_or_default();
        if file_pattern.is_empty() {
            return Err(AssetError::EmptyPattern {
                pattern: pattern.to_string(),
            });
        }
        Ok(AssetPattern {
            file_pattern: file_pattern.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.file_pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        let pattern: Vec<char> = self.file_pattern.chars().collect();
        let name: Vec<char> = name.chars().collect();
        wildcard_match(&pattern, &name)
    }
}

/// Iterative wildcard matching with single-star backtracking.
fn wildcard_match(pattern: &[char], name: &[char]) -> bool {
    let (mut p, mut n) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_n = 0;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_n = n;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_n += 1;
            n = star_n;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

/// Resolves `patterns` against the regular files in `dir`.
///
/// Each pattern contributes its matches sorted by name; pattern order is
/// preserved. A file matched by two patterns is listed twice. A missing
/// directory yields no candidates.
pub fn resolve_candidates(dir: &Path, patterns: &[&str]) -> Result<Vec<String>, AssetError> {
    let patterns = patterns
        .iter()
        .map(|p| AssetPattern::parse(p))
        .collect::<Result<Vec<_>, _>>()?;

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Output directory does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(AssetError::ReadDir {
                dir: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AssetError::ReadDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(name) => warn!(file = ?name, "Skipping file with non-UTF-8 name"),
        }
    }
    files.sort();

    let mut candidates = Vec::new();
    for pattern in &patterns {
        candidates.extend(files.iter().filter(|f| pattern.matches(f)).cloned());
    }
    Ok(candidates)
}

/// Keeps the candidates that exist under `dir`, in their original order.
pub fn filter_existing(dir: &Path, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|name| dir.join(name.as_str()).exists())
        .cloned()
        .collect()
}

/// Guesses a MIME type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return FALLBACK_CONTENT_TYPE,
    };

    match ext.as_str() {
        "deb" => "application/vnd.debian.binary-package",
        "rpm" => "application/x-redhat-package-manager",
        "zip" => "application/zip",
        "dmg" => "application/x-apple-diskimage",
        "exe" => "application/vnd.microsoft.portable-executable",
        "msi" => "application/x-msdownload",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "xz" => "application/x-xz",
        "appimage" => "application/vnd.appimage",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// An artifact read from disk, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub name: String,
    pub content_type: &'static str,
    pub size: u64,
    pub data: Vec<u8>,
}

impl AssetFile {
    /// Reads `dir/name` in full. `size` is the length of the bytes read.
    pub async fn load(dir: &Path, name: &str) -> Result<Self, AssetError> {
        let path = dir.join(name);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| AssetError::Read {
                path: path.clone(),
                source,
            })?;

        Ok(AssetFile {
            name: name.to_string(),
            content_type: content_type_for(&path),
            size: data.len() as u64,
            data,
        })
    }
}
