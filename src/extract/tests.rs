use super::decode_utf8_ignoring_errors as decode_utf8_ignoring_errors_impl;
use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn document_kind_from_extension() {
    assert_eq!(
        DocumentKind::from_path(Path::new("notes.txt")),
        Some(DocumentKind::Text)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("README.MD")),
        Some(DocumentKind::Markdown)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("manual.Pdf")),
        Some(DocumentKind::Pdf)
    );
    assert_eq!(DocumentKind::from_path(Path::new("image.png")), None);
    assert_eq!(DocumentKind::from_path(Path::new("Makefile")), None);
}

#[test]
fn invalid_utf8_bytes_are_dropped() {
    let bytes = b"caf\xc3\xa9 \xff\xfebar";
    assert_eq!(decode_utf8_ignoring_errors_impl(bytes), "café bar");
}

#[tokio::test]
async fn reads_text_and_markdown() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let txt = temp_dir.path().join("a.txt");
    let md = temp_dir.path().join("b.md");
    fs::write(&txt, "plain text").expect("should write txt");
    fs::write(&md, "# Title\n\nBody").expect("should write md");

    assert_eq!(extract_text(&txt).await.as_deref(), Some("plain text"));
    assert_eq!(extract_text(&md).await.as_deref(), Some("# Title\n\nBody"));
}

#[tokio::test]
async fn unsupported_extension_is_skipped() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("data.csv");
    fs::write(&path, "a,b,c").expect("should write csv");

    assert_eq!(extract_text(&path).await, None);
}

#[tokio::test]
async fn corrupt_pdf_yields_empty_text() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.pdf");
    fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").expect("should write pdf");

    assert_eq!(extract_text(&path).await.as_deref(), Some(""));
}

#[tokio::test]
async fn missing_file_yields_empty_text() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("gone.txt");

    assert_eq!(extract_text(&path).await.as_deref(), Some(""));
}
