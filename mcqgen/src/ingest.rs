//! Turning uploaded bytes into chunks.
//!
//! The parsers read from disk, so every upload is written to a named
//! temporary file first. The file is removed before [`DocumentIngestor::ingest`]
//! returns, whether loading succeeded or not.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mcqgen_rag::{Chunk, Chunker, Document, RagConfig, RecursiveChunker};
use tracing::{debug, error, info};

use crate::error::{GeneratorError, Result};

/// The upload formats the ingestor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Txt,
}

impl FileKind {
    /// Parse an extension such as `pdf`, `.TXT` or `Pdf`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::UnsupportedFileType`] for anything but `pdf` and `txt`.
    pub fn from_extension(extension: &str) -> Result<Self> {
        let bare = extension.trim().trim_start_matches('.');
        if bare.eq_ignore_ascii_case("pdf") {
            Ok(Self::Pdf)
        } else if bare.eq_ignore_ascii_case("txt") {
            Ok(Self::Txt)
        } else {
            Err(GeneratorError::UnsupportedFileType { extension: bare.to_string() })
        }
    }

    /// Detect the kind from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    /// Canonical lowercase extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Failure type for [`DocumentLoader`] implementations.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Reads a file on disk into pre-chunk documents.
pub trait DocumentLoader: Send + Sync {
    /// Load `path`, which holds an upload of the given kind. `source` is the
    /// upload's name and should be recorded in document ids and metadata.
    fn load(&self, path: &Path, kind: FileKind, source: &str) -> std::result::Result<Vec<Document>, LoadError>;
}

/// Loads PDFs with `lopdf`, one document per page, and text files as a
/// single UTF-8 document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDocumentLoader;

impl FsDocumentLoader {
    fn load_pdf(path: &Path, source: &str) -> std::result::Result<Vec<Document>, LoadError> {
        let pdf = lopdf::Document::load(path).map_err(|e| format!("cannot parse PDF: {e}"))?;
        let mut documents = Vec::new();
        for page in pdf.get_pages().into_keys() {
            let text = pdf
                .extract_text(&[page])
                .map_err(|e| format!("cannot extract text from page {page}: {e}"))?;
            documents.push(
                Document::new(format!("{source}#{page}"), text)
                    .with_page(page)
                    .with_metadata("source", source),
            );
        }
        Ok(documents)
    }

    fn load_txt(path: &Path, source: &str) -> std::result::Result<Vec<Document>, LoadError> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)?;
        Ok(vec![Document::new(source, text).with_metadata("source", source)])
    }
}

impl DocumentLoader for FsDocumentLoader {
    fn load(&self, path: &Path, kind: FileKind, source: &str) -> std::result::Result<Vec<Document>, LoadError> {
        match kind {
            FileKind::Pdf => Self::load_pdf(path, source),
            FileKind::Txt => Self::load_txt(path, source),
        }
    }
}

/// Writes uploads to a temporary file, loads them and splits them into chunks.
#[derive(Clone)]
pub struct DocumentIngestor {
    loader: Arc<dyn DocumentLoader>,
    chunker: RecursiveChunker,
    temp_dir: Option<PathBuf>,
}

impl fmt::Debug for DocumentIngestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentIngestor")
            .field("chunker", &self.chunker)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentIngestor {
    fn default() -> Self {
        Self::new(RecursiveChunker::default())
    }
}

impl DocumentIngestor {
    /// An ingestor using [`FsDocumentLoader`] and the system temp directory.
    pub fn new(chunker: RecursiveChunker) -> Self {
        Self { loader: Arc::new(FsDocumentLoader), chunker, temp_dir: None }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(RecursiveChunker::from_config(config))
    }

    /// Replace the loader.
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Create temporary files inside `dir` instead of the system default.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Ingest an upload identified only by its declared extension.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::UnsupportedFileType`] before anything touches disk
    /// - [`GeneratorError::Ingestion`] when writing or parsing fails
    pub fn ingest(&self, bytes: &[u8], extension: &str) -> Result<Vec<Chunk>> {
        let kind = FileKind::from_extension(extension)?;
        self.ingest_as(&format!("upload.{}", kind.extension()), kind, bytes)
    }

    /// Ingest an upload, taking its kind from `file_name`.
    pub fn ingest_named(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Chunk>> {
        let kind = FileKind::from_file_name(file_name)?;
        self.ingest_as(file_name, kind, bytes)
    }

    fn ingest_as(&self, source: &str, kind: FileKind, bytes: &[u8]) -> Result<Vec<Chunk>> {
        let fail = |message: String| {
            error!(file = source, kind = %kind, error = %message, "ingestion failed");
            GeneratorError::Ingestion { file: source.to_string(), message }
        };

        let suffix = format!(".{}", kind.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("mcqgen-").suffix(&suffix);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| fail(format!("cannot create temporary file: {e}")))?;

        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|e| fail(format!("cannot write temporary file: {e}")))?;
        debug!(file = source, path = %file.path().display(), bytes = bytes.len(), "upload written");

        // On error the temporary file is dropped, which deletes it.
        let documents = self.loader.load(file.path(), kind, source).map_err(|e| fail(e.to_string()))?;
        file.close().map_err(|e| fail(format!("cannot remove temporary file: {e}")))?;

        let chunks = self.chunker.chunk_all(&documents);
        info!(
            file = source,
            kind = %kind,
            document_count = documents.len(),
            chunk_count = chunks.len(),
            "upload ingested"
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(FileKind::from_extension("PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_extension(".txt").unwrap(), FileKind::Txt);
        assert_eq!(FileKind::from_file_name("Notes.Final.TXT").unwrap(), FileKind::Txt);
    }

    #[test]
    fn other_extensions_are_rejected() {
        for ext in ["docx", "", "pdf.exe", "md"] {
            assert!(matches!(
                FileKind::from_extension(ext),
                Err(GeneratorError::UnsupportedFileType { .. })
            ));
        }
        assert!(matches!(
            FileKind::from_file_name("README"),
            Err(GeneratorError::UnsupportedFileType { ref extension }) if extension.is_empty()
        ));
    }

    #[test]
    fn text_upload_becomes_one_document() {
        let chunks = DocumentIngestor::default().ingest_named("notes.txt", b"Mitochondria make ATP.").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, "notes.txt");
        assert_eq!(chunks[0].text, "Mitochondria make ATP.");
        assert_eq!(chunks[0].metadata.get("source").map(String::as_str), Some("notes.txt"));
    }

    #[test]
    fn garbage_pdf_is_an_ingestion_error() {
        let err = DocumentIngestor::default().ingest(b"definitely not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, GeneratorError::Ingestion { .. }));
    }
}
