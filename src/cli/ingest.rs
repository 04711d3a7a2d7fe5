//! Document discovery for `via ingest`.
//!
//! Plain-text input only: text extraction from PDFs happens upstream. A form
//! feed in a file marks a page break, the way `pdftotext` writes them.

use crate::types::ExtractedDocument;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Page separator in extracted text files.
pub const PAGE_BREAK: char = '\x0C';

/// A file to ingest and the source id it is indexed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    /// File on disk.
    pub path: PathBuf,
    /// Path relative to the directory argument it was found under, with `/`
    /// separators. The bare file name for files named on the command line.
    pub source_id: String,
}

/// Expand files and directories into the list of `.txt` files to ingest,
/// sorted by source id. Directories are walked recursively; explicitly
/// named files are taken whatever their extension.
///
/// Two different files that would share a source id are an error, since the
/// second would otherwise be skipped as already indexed.
pub fn collect_documents(paths: &[PathBuf]) -> io::Result<Vec<DocumentFile>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, path, &mut files)?;
        } else if path.is_file() {
            let source_id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            files.push(DocumentFile {
                path: path.clone(),
                source_id,
            });
        } else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
    }

    files.sort_by(|a, b| a.source_id.cmp(&b.source_id).then_with(|| a.path.cmp(&b.path)));
    let mut paths = HashSet::new();
    files.retain(|file| paths.insert(file.path.clone()));

    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for file in &files {
        if let Some(other) = seen.insert(file.source_id.as_str(), file.path.as_path()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} and {} would both be indexed as '{}'",
                    other.display(),
                    file.path.display(),
                    file.source_id
                ),
            ));
        }
    }
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<DocumentFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, files)?;
        } else if is_text_file(&path) {
            let source_id = relative_id(root, &path);
            files.push(DocumentFile { path, source_id });
        }
    }
    Ok(())
}

fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("txt"))
}

/// Read a text file as an extracted document under its source id. Form
/// feeds split pages.
pub fn read_document(file: &DocumentFile) -> io::Result<ExtractedDocument> {
    let text = fs::read_to_string(&file.path)?;
    let source_id = file.source_id.clone();

    if text.contains(PAGE_BREAK) {
        Ok(ExtractedDocument::from_pages(source_id, text.split(PAGE_BREAK)))
    } else {
        Ok(ExtractedDocument::new(source_id, text))
    }
}
