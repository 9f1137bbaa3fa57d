use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mcqgen::{DocumentIngestor, DocumentLoader, FileKind, FsDocumentLoader, GeneratorError, LoadError};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use mcqgen_rag::{Document, RecursiveChunker};
use proptest::prelude::*;

/// Records each call and what was on disk at the time, then fails or
/// delegates to the real loader.
#[derive(Default)]
struct ProbeLoader {
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    fail: bool,
}

impl ProbeLoader {
    fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }
}

impl DocumentLoader for ProbeLoader {
    fn load(&self, path: &Path, kind: FileKind, source: &str) -> Result<Vec<Document>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(path)?;
        self.seen.lock().unwrap().push((path.to_path_buf(), bytes));
        if self.fail {
            return Err("induced parser failure".into());
        }
        FsDocumentLoader.load(path, kind, source)
    }
}

fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// A PDF with one line of Courier text on each page.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut pdf = lopdf::Document::with_version("1.5");
    let pages_id = pdf.new_object_id();
    let font_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn unsupported_extension_never_reaches_the_loader() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(ProbeLoader::default());
    let ingestor = DocumentIngestor::default().with_loader(loader.clone()).with_temp_dir(dir.path());

    let err = ingestor.ingest(b"PK\x03\x04 word document", "docx").unwrap_err();
    assert!(matches!(err, GeneratorError::UnsupportedFileType { ref extension } if extension == "docx"));

    let err = ingestor.ingest_named("slides.pptx", b"...").unwrap_err();
    assert!(matches!(err, GeneratorError::UnsupportedFileType { .. }));

    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn temp_file_is_removed_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(ProbeLoader::default());
    let ingestor = DocumentIngestor::default().with_loader(loader.clone()).with_temp_dir(dir.path());

    let chunks = ingestor.ingest(b"The mitochondria is the powerhouse of the cell.", "txt").unwrap();
    assert_eq!(chunks.len(), 1);

    let seen = loader.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (path, bytes) = &seen[0];
    assert!(path.starts_with(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));
    assert_eq!(bytes.as_slice(), b"The mitochondria is the powerhouse of the cell.");
    assert!(!path.exists());
    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn temp_file_is_removed_after_loader_failure() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(ProbeLoader::failing());
    let ingestor = DocumentIngestor::default().with_loader(loader.clone()).with_temp_dir(dir.path());

    let err = ingestor.ingest(b"%PDF-1.4 truncated", "pdf").unwrap_err();
    match err {
        GeneratorError::Ingestion { message, .. } => assert!(message.contains("induced parser failure")),
        other => panic!("expected ingestion error, got {other:?}"),
    }

    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn invalid_pdf_and_utf8_are_ingestion_errors_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let ingestor = DocumentIngestor::default().with_temp_dir(dir.path());

    assert!(matches!(ingestor.ingest(b"not a pdf", "pdf"), Err(GeneratorError::Ingestion { .. })));
    assert!(matches!(ingestor.ingest(&[0xff, 0xfe, 0x00, 0xc3], "txt"), Err(GeneratorError::Ingestion { .. })));
    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn pdf_pages_become_separate_documents() {
    let dir = tempfile::tempdir().unwrap();
    let ingestor = DocumentIngestor::default().with_temp_dir(dir.path());
    let bytes = pdf_with_pages(&["Mitochondria make ATP.", "Ribosomes build proteins."]);

    let chunks = ingestor.ingest_named("cells.pdf", &bytes).unwrap();
    assert_eq!(chunks.len(), 2);

    assert_eq!(chunks[0].id, "cells.pdf#1_0");
    assert_eq!(chunks[0].document_id, "cells.pdf#1");
    assert_eq!(chunks[0].page, Some(1));
    assert!(chunks[0].text.contains("Mitochondria make ATP."));

    assert_eq!(chunks[1].id, "cells.pdf#2_0");
    assert_eq!(chunks[1].document_id, "cells.pdf#2");
    assert_eq!(chunks[1].page, Some(2));
    assert!(chunks[1].text.contains("Ribosomes build proteins."));

    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn long_text_is_chunked_with_back_references() {
    let paragraph = "Cells divide by mitosis. ".repeat(20);
    let text = vec![paragraph; 6].join("\n\n");
    let ingestor = DocumentIngestor::new(RecursiveChunker::new(1000, 20));

    let chunks = ingestor.ingest_named("biology.txt", text.as_bytes()).unwrap();
    assert!(chunks.len() > 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.document_id, "biology.txt");
        assert_eq!(chunk.id, format!("biology.txt_{i}"));
        assert!(chunk.text.chars().count() <= 1000);
        assert_eq!(&text[chunk.start_index..chunk.start_index + chunk.text.len()], chunk.text);
    }
}

#[test]
fn whitespace_only_text_yields_no_chunks() {
    let chunks = DocumentIngestor::default().ingest(b"  \n\n \t ", "txt").unwrap();
    assert!(chunks.is_empty());
}

proptest! {
    #[test]
    fn only_pdf_and_txt_are_accepted(ext in "[a-zA-Z0-9]{0,6}") {
        let result = FileKind::from_extension(&ext);
        let lower = ext.to_ascii_lowercase();
        if lower == "pdf" || lower == "txt" {
            prop_assert!(result.is_ok());
        } else {
            let is_unsupported = matches!(result, Err(GeneratorError::UnsupportedFileType { .. }));
            prop_assert!(is_unsupported);
        }
    }
}
