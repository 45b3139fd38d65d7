// Upload staging
// Copies user files into the uploads directory and ingests each staged copy


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::extract::{DocumentKind, SUPPORTED_EXTENSIONS};
use crate::indexer::Indexer;
use crate::{KbError, Result};

/// Result of staging and ingesting a set of files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    /// File names of the staged copies, in input order
    pub saved: Vec<String>,
    /// Chunks stored across all staged copies
    pub chunks_added: usize,
}

/// Stage `paths` under `uploads_dir` and ingest every copy.
///
/// Every extension is checked before anything is copied, so an unsupported
/// file leaves the uploads directory untouched.
#[inline]
pub async fn upload_files(
    indexer: &Indexer,
    paths: &[PathBuf],
    uploads_dir: &Path,
) -> Result<UploadReport> {
    for path in paths {
        check_extension(path)?;
    }

    tokio::fs::create_dir_all(uploads_dir).await?;

    let mut report = UploadReport::default();
    for path in paths {
        let destination = staging_path(uploads_dir, path)?;
        tokio::fs::copy(path, &destination).await?;
        debug!("Staged {} as {}", path.display(), destination.display());

        report.chunks_added += indexer.add_path(&destination).await?;
        report.saved.push(
            destination
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    }

    info!(
        "Uploaded {} files, {} chunks added",
        report.saved.len(),
        report.chunks_added
    );
    Ok(report)
}

fn check_extension(path: &Path) -> Result<()> {
    if DocumentKind::from_path(path).is_some() {
        return Ok(());
    }

    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let allowed: Vec<String> = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect();

    Err(KbError::Validation(format!(
        "Unsupported file type: {:?}. Allowed: {}",
        extension,
        allowed.join(", ")
    )))
}

/// First free name for `source` inside `dir`: the base name, then `<stem>_<n><ext>`
#[inline]
pub fn staging_path(dir: &Path, source: &Path) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        KbError::Validation(format!("Not a file path: {}", source.display()))
    })?;

    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1_usize;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, n, suffix));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}
