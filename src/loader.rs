//! Turns uploaded files into `Document`s.
//!
//! Plain text is decoded lossily as UTF-8; PDFs go through `pdf-extract`
//! (feature `pdf`). A file whose text cannot be extracted still becomes a
//! document, with empty text, so it is ranked rather than dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ranking::preprocess::normalize_text;
use crate::ranking::Document;

/// Declared or detected format of an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Text,
    Pdf,
}

/// A raw file as handed over by the user.
#[derive(Clone, Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Declared type; detected from content and extension when `None`
    pub kind: Option<SourceKind>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pdf extraction failed: {0}")]
    Pdf(String),

    #[error("pdf support is not compiled in (enable the `pdf` feature)")]
    PdfUnsupported,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Read a file from disk.
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let bytes = std::fs::read(path).map_err(|source| LoaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }
}

/// Detect the format from magic bytes, then from the extension.
pub fn detect_kind(filename: &str, bytes: &[u8]) -> SourceKind {
    if infer::get(bytes).is_some_and(|t| t.mime_type() == "application/pdf") {
        return SourceKind::Pdf;
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => SourceKind::Pdf,
        _ => SourceKind::Text,
    }
}

/// File name component of `filename`, used as the display name.
pub fn display_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| filename.to_string())
}

/// Extract raw text from a blob of the given kind.
pub fn extract_text(kind: SourceKind, bytes: &[u8]) -> Result<String, LoaderError> {
    match kind {
        SourceKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        SourceKind::Pdf => extract_pdf(bytes),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String, LoaderError> {
    // pdf-extract panics on some malformed inputs
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(LoaderError::Pdf(e.to_string())),
        Err(_) => Err(LoaderError::Pdf("extractor panicked on malformed input".to_string())),
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String, LoaderError> {
    Err(LoaderError::PdfUnsupported)
}

/// Convert uploads to documents, in input order.
///
/// Never fails: unreadable uploads become documents with empty text.
/// Repeated display names get a ` (2)`, ` (3)`, ... suffix.
pub fn load_documents(uploads: Vec<Upload>) -> Vec<Document> {
    let extracted: Vec<(String, String)> = uploads
        .into_par_iter()
        .map(|upload| {
            let name = display_name(&upload.filename);
            let kind = upload
                .kind
                .unwrap_or_else(|| detect_kind(&upload.filename, &upload.bytes));

            let text = match extract_text(kind, &upload.bytes) {
                Ok(text) => normalize_text(&text),
                Err(e) => {
                    log::warn!("{}: {}; ranking it with empty text", name, e);
                    String::new()
                }
            };

            if text.is_empty() {
                log::warn!("{}: no text extracted", name);
            }

            (name, text)
        })
        .collect();

    let mut used: HashSet<String> = HashSet::with_capacity(extracted.len());
    extracted
        .into_iter()
        .map(|(name, text)| {
            let unique = unique_name(&name, &used);
            used.insert(unique.clone());
            Document::new(unique, text)
        })
        .collect()
}

/// Read `paths` from disk and convert them to documents.
///
/// Fails if a file cannot be read at all; extraction failures are handled
/// as in `load_documents`.
pub fn load_paths(paths: &[PathBuf]) -> Result<Vec<Document>, LoaderError> {
    let uploads = paths
        .iter()
        .map(|path| Upload::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(load_documents(uploads))
}

fn unique_name(name: &str, used: &HashSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", name, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
