use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Resolves `path` into the list of documents to ingest. A file must carry a
/// supported extension; a directory contributes every supported file below
/// it, in path order.
pub fn collect_documents(path: &Path, exts: &[String]) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        if !is_supported(path, exts) {
            return Err(Error::UnsupportedExtension(extension_label(path)));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if is_supported(entry.path(), exts) {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping unsupported file");
        }
    }
    if files.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} contains no files with a supported extension ({})",
            path.display(),
            exts.join(", ")
        )));
    }
    Ok(files)
}

/// Reads the text of one document, extracting it first for PDFs.
pub async fn load_document(path: &Path) -> Result<String> {
    let display = path.display().to_string();
    if extension_label(path) == ".pdf" {
        let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
            path: display.clone(),
            source,
        })?;
        // Extraction is CPU bound and panics on some malformed files.
        let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| Error::Pdf {
                path: display.clone(),
                message: if e.is_panic() {
                    "extractor panicked on malformed input".to_string()
                } else {
                    e.to_string()
                },
            })?;
        return extracted.map_err(|e| Error::Pdf {
            path: display,
            message: e.to_string(),
        });
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Io { path: display, source })
}

fn is_supported(path: &Path, exts: &[String]) -> bool {
    let ext = extension_label(path);
    exts.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec![".txt".to_string(), ".pdf".to_string()]
    }

    #[test]
    fn missing_path_is_reported() {
        let err = collect_documents(Path::new("/definitely/not/here.txt"), &exts()).expect_err("missing");
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("rules.docx");
        std::fs::write(&file, "x").expect("write");
        let err = collect_documents(&file, &exts()).expect_err("unsupported");
        assert!(matches!(err, Error::UnsupportedExtension(ref e) if e == ".docx"));
    }

    #[test]
    fn extension_match_ignores_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("RULES.TXT");
        std::fs::write(&file, "x").expect("write");
        assert_eq!(collect_documents(&file, &exts()).expect("supported"), vec![file]);
    }

    #[test]
    fn directories_yield_supported_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        for name in ["b.txt", "a.txt", "notes.md", "nested/c.txt"] {
            std::fs::write(dir.path().join(name), "x").expect("write");
        }
        let files = collect_documents(dir.path(), &exts()).expect("collect");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).expect("under dir").to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "nested/c.txt"]);
    }

    #[test]
    fn directory_without_documents_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("notes.md"), "x").expect("write");
        assert!(matches!(collect_documents(dir.path(), &exts()), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn text_files_are_read_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("rules.txt");
        std::fs::write(&file, "Pawns move forward.\n\nCastling.").expect("write");
        assert_eq!(load_document(&file).await.expect("read"), "Pawns move forward.\n\nCastling.");
    }

    #[tokio::test]
    async fn broken_pdf_is_an_extraction_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("rules.pdf");
        std::fs::write(&file, "not really a pdf").expect("write");
        assert!(matches!(load_document(&file).await, Err(Error::Pdf { .. })));
    }

    #[tokio::test]
    async fn truncated_pdf_reports_an_error_instead_of_aborting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("rules.pdf");
        std::fs::write(&file, b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF")
            .expect("write");
        let err = load_document(&file).await.expect_err("truncated");
        assert!(matches!(err, Error::Pdf { ref path, .. } if path.ends_with("rules.pdf")));
    }
}
