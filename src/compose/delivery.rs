use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Saves composed tracks into a local directory so they can be served
/// after the remote URL expires.
pub struct TrackDelivery {
    client: reqwest::Client,
    audio_dir: PathBuf,
}

impl TrackDelivery {
    pub fn new(audio_dir: PathBuf, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, audio_dir })
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// File name a task's track is stored under. Characters outside
    /// `[A-Za-z0-9-]` are written as `_XX` hex bytes, so distinct task ids
    /// never share a file.
    pub fn file_name(task_id: &str, format: &str) -> String {
        let mut safe_id = String::with_capacity(task_id.len());
        for byte in task_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                safe_id.push(byte as char);
            } else {
                safe_id.push_str(&format!("_{:02X}", byte));
            }
        }
        format!("{}.{}", safe_id, format)
    }

    /// Downloads `track_url` into the audio directory under
    /// [`file_name`](Self::file_name).
    pub async fn deliver(&self, task_id: &str, track_url: &str, format: &str) -> Result<PathBuf> {
        let file_name = Self::file_name(task_id, format);
        let dest = self.audio_dir.join(&file_name);

        let response = self
            .client
            .get(track_url)
            .send()
            .await
            .context("Failed to connect for download")?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status: {}", response.status());
        }

        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .context("Failed to create audio directory")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        // Written beside the destination and renamed, so a failed write never
        // leaves a partial track behind.
        let tmp_path = self.audio_dir.join(format!(".{}.part", file_name));
        if let Err(e) = write_file(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &dest).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e)
                .with_context(|| format!("Failed to move track into place at {:?}", dest));
        }

        info!(
            "Delivered track {} to {:?} ({:#})",
            task_id,
            dest,
            byte_unit::Byte::from(bytes.len())
        );
        Ok(dest)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(bytes)
        .await
        .context("Failed to write to file")?;
    file.flush().await.context("Failed to flush file")?;
    Ok(())
}
