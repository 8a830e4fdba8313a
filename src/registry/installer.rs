//! Model download and cache management.

use super::types::{FileInfo, ModelEntry};
use crate::config::models_dir;
use crate::error::{Error, Result};
use crate::inference::ModelFiles;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Download a file, rendering a progress bar unless suppressed.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::DownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

    if !response.status().is_success() {
        return Err(Error::DownloadFailed {
            url: url.to_string(),
            source: format!("HTTP {}", response.status()).into(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = progress_bar(total_size, dest, show_progress)?;

    let mut file = File::create(dest).await.map_err(Error::Io)?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::DownloadFailed {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        file.write_all(&chunk).await.map_err(Error::Io)?;

        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message("Download complete");

    Ok(())
}

/// Progress bar for one download; hidden when progress output is suppressed.
fn progress_bar(total_size: u64, dest: &Path, show: bool) -> Result<ProgressBar> {
    if !show {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{bar:40.cyan/blue} {percent}% ({bytes}/{total_bytes})")
            .map_err(|e| Error::Internal {
                message: format!("Failed to create progress bar: {e}"),
            })?
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(format!(
        "Downloading {}...",
        dest.file_name().map_or_else(
            || std::borrow::Cow::Borrowed("file"),
            |n| n.to_string_lossy()
        )
    ));

    Ok(pb)
}

/// Compute the SHA-256 checksum of a file as a lowercase hex string.
pub fn file_checksum(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(Error::Io)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(Error::Io)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify a downloaded file against its registry checksum, when one exists.
fn verify_checksum(path: &Path, info: &FileInfo) -> Result<()> {
    let Some(expected) = &info.sha256 else {
        return Ok(());
    };

    let actual = file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.clone(),
            actual,
        })
    }
}

/// Ensure one component is present and verified, downloading it if needed.
async fn ensure_component(
    client: &Client,
    dir: &Path,
    info: &FileInfo,
    show_progress: bool,
) -> Result<PathBuf> {
    let dest = dir.join(&info.filename);

    if dest.is_file() {
        match verify_checksum(&dest, info) {
            Ok(()) => {
                debug!("using cached {}", dest.display());
                return Ok(dest);
            }
            Err(Error::ChecksumMismatch { .. }) => {
                info!("cached {} failed verification, re-downloading", dest.display());
            }
            Err(e) => return Err(e),
        }
    }

    download_file(client, &info.url, &dest, show_progress).await?;
    verify_checksum(&dest, info)?;
    Ok(dest)
}

/// Ensure every component of a model is present in the local cache.
///
/// Components that are already cached and pass checksum verification are not
/// downloaded again, so this is cheap after the first run.
pub async fn ensure_model(entry: &ModelEntry, show_progress: bool) -> Result<ModelFiles> {
    let dir = models_dir()?.join(&entry.id);
    std::fs::create_dir_all(&dir).map_err(Error::Io)?;

    let client = Client::builder()
        .connect_timeout(std::time::Duration::from_secs(30))
        .timeout(std::time::Duration::from_secs(600))
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create HTTP client: {e}"),
        })?;

    let detector = ensure_component(&client, &dir, &entry.files.detector, show_progress).await?;
    let classifier =
        ensure_component(&client, &dir, &entry.files.classifier, show_progress).await?;
    let labels = ensure_component(&client, &dir, &entry.files.labels, show_progress).await?;

    let geofence = match &entry.files.geofence {
        Some(info) => Some(ensure_component(&client, &dir, info, show_progress).await?),
        None => None,
    };

    Ok(ModelFiles {
        detector,
        classifier,
        labels,
        geofence,
    })
}
