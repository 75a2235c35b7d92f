use crate::error::IngestError;
use crate::models::UploadRequest;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort_unstable();
    files
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Checks that `path` opens as a PDF with at least one page.
/// `plan_folder_upload` skips files that fail instead of uploading them.
pub fn preflight_pdf(path: &Path) -> Result<(), IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    if document.get_pages().is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf has no pages: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Reads the file and packages it for the content endpoint: base64 payload,
/// sha256 checksum, and a client-generated id the service echoes back.
pub fn prepare_upload(
    path: &Path,
    labels: HashMap<String, String>,
) -> Result<UploadRequest, IngestError> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

    Ok(UploadRequest {
        id: Uuid::new_v4().to_string(),
        file_name: file_name.to_string(),
        mime_type: mime_type_for(path).to_string(),
        checksum_sha256: digest_bytes(&bytes),
        content_base64: STANDARD.encode(bytes),
        labels,
    })
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        _ => "application/octet-stream",
    }
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct UploadPlan {
    pub requests: Vec<UploadRequest>,
    pub skipped: Vec<SkippedFile>,
}

/// Walks the folder and prepares an upload for every readable PDF. Broken
/// files are reported and skipped rather than aborting the batch; only a
/// folder with no PDFs at all is an error.
pub fn plan_folder_upload(
    folder: &Path,
    labels: &HashMap<String, String>,
) -> Result<UploadPlan, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::NoPdfFiles(folder.display().to_string()));
    }

    let mut requests = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        let outcome = preflight_pdf(&path).and_then(|_| prepare_upload(&path, labels.clone()));
        match outcome {
            Ok(request) => requests.push(request),
            Err(error) => skipped.push(SkippedFile {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(UploadPlan { requests, skipped })
}
