//! Document discovery and text extraction.
//!
//! Both sit outside the ranking engine; the builder only sees the traits.
//! The file-system implementations cover plain-text documents and reject
//! binary office formats with an extraction error.

use crate::error::{CoreError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const INDEXABLE_EXTENSIONS: &[&str] = &["txt", "doc", "docx", "pdf"];

/// A readable document that passed the source predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub document_id: String,
    pub path: PathBuf,
}

impl DocumentHandle {
    pub fn new(document_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { document_id: document_id.into(), path: path.into() }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.document_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub content_type: String,
}

pub trait DocumentSource: Send + Sync {
    fn list(&self, root: &Path, predicate: &dyn Fn(&Path) -> bool) -> Result<Vec<DocumentHandle>>;
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, handle: &DocumentHandle) -> Result<ExtractedText>;
}

/// Default predicate: `.txt`, `.doc`, `.docx` and `.pdf`, case-insensitive.
pub fn is_indexable(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| INDEXABLE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Content type guessed from the file extension.
pub fn detect_content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt") | Some("text") | Some("md") => "text/plain",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Recursive directory walk. Document ids are paths relative to the root,
/// joined with `/`, and come back sorted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDocumentSource;

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

impl DocumentSource for FsDocumentSource {
    fn list(&self, root: &Path, predicate: &dyn Fn(&Path) -> bool) -> Result<Vec<DocumentHandle>> {
        if !root.is_dir() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data directory {} does not exist", root.display()),
            )));
        }
        let mut handles = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)).filter_map(|e| e.ok()) {
            let p = entry.path();
            if !entry.file_type().is_file() || !predicate(p) {
                continue;
            }
            if fs::File::open(p).is_err() {
                tracing::debug!(path = %p.display(), "skipping unreadable file");
                continue;
            }
            let rel = p.strip_prefix(root).unwrap_or(p);
            let document_id = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            handles.push(DocumentHandle::new(document_id, p));
        }
        handles.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(handles)
    }
}

/// Reads UTF-8 text files. Binary formats are reported as extraction errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, handle: &DocumentHandle) -> Result<ExtractedText> {
        let content_type = detect_content_type(&handle.path);
        if content_type != "text/plain" {
            return Err(CoreError::Extraction {
                path: handle.path.clone(),
                reason: format!("unsupported content type {content_type}"),
            });
        }
        let bytes = fs::read(&handle.path)
            .map_err(|e| CoreError::Extraction { path: handle.path.clone(), reason: e.to_string() })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| CoreError::Extraction { path: handle.path.clone(), reason: e.to_string() })?;
        Ok(ExtractedText { text, content_type: content_type.to_string() })
    }
}
