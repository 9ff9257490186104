//! Markdown files — export, list and read `<title>.md` in a documents directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::info;

use crate::error::ErrorCode;

const DOCUMENTS_FOLDER: &str = "PlotContinuum";
const MARKDOWN_EXT: &str = "md";
const UNSAFE_TITLE_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("markdown file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ErrorCode for FileError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_FILE_NOT_FOUND",
            Self::Io { .. } => "E_FILE_IO",
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FileError + '_ {
    move |source| FileError::Io { path: path.to_path_buf(), source }
}

/// A Markdown file found in the documents directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownFile {
    pub title: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// `~/Documents/PlotContinuum` on macOS and Windows, `~/PlotContinuum` elsewhere.
#[must_use]
pub fn default_documents_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        Some(home.join("Documents").join(DOCUMENTS_FOLDER))
    } else {
        Some(home.join(DOCUMENTS_FOLDER))
    }
}

/// Replace characters that are unsafe in file names with `-`.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if UNSAFE_TITLE_CHARS.contains(&c) || c.is_control() { '-' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Path of the Markdown file for `title` inside `dir`.
#[must_use]
pub fn markdown_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.{MARKDOWN_EXT}", sanitize_title(title)))
}

/// Write `content` byte for byte to `<title>.md`, creating `dir` if needed.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the directory or file cannot be written.
pub fn export_markdown(dir: &Path, title: &str, content: &str) -> Result<PathBuf, FileError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = markdown_path(dir, title);
    std::fs::write(&path, content.as_bytes()).map_err(io_err(&path))?;
    info!(path = %path.display(), bytes = content.len(), "files: exported markdown");
    Ok(path)
}

/// Markdown files in `dir`, newest first. A missing directory lists as empty.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the directory or a file's metadata cannot be read.
pub fn list_markdown(dir: &Path) -> Result<Vec<MarkdownFile>, FileError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(dir)(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(MARKDOWN_EXT) {
            continue;
        }
        let Some(title) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
            continue;
        };
        let meta = entry.metadata().map_err(io_err(&path))?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().map_err(io_err(&path))?;
        files.push(MarkdownFile { title, path, modified });
    }
    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.title.cmp(&b.title)));
    Ok(files)
}

/// Read `<title>.md` from `dir`.
///
/// # Errors
///
/// Returns [`FileError::NotFound`] if the file does not exist.
pub fn read_markdown(dir: &Path, title: &str) -> Result<String, FileError> {
    let path = markdown_path(dir, title);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(FileError::NotFound(path)),
        Err(e) => Err(FileError::Io { path, source: e }),
    }
}

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;
