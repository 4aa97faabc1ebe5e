// 📷 Photo Uploads - staging and self-contained encoding
//
// Uploaded files land in the staging directory first, then get read back,
// embedded as a `data:<mime>;base64,<payload>` URI and deleted. Entries
// therefore never point at the filesystem and responses render without a
// second fetch.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A photo as received from the client, before staging
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Browsers send an empty file part when no file was picked
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Image MIME type from the declared content type, falling back to the
    /// file extension. `None` means this is not an image we accept.
    pub fn image_mime(&self) -> Option<String> {
        if let Some(declared) = self.content_type.as_deref() {
            let declared = declared.trim().to_ascii_lowercase();
            if declared.starts_with("image/") {
                return Some(declared);
            }
            if declared != "application/octet-stream" && !declared.is_empty() {
                return None;
            }
        }

        let extension = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        let mime = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            "bmp" => "image/bmp",
            _ => return None,
        };
        Some(mime.to_string())
    }
}

// ============================================================================
// STAGING
// ============================================================================

/// Writes uploads into a staging directory under unique names
#[derive(Debug, Clone)]
pub struct UploadStager {
    dir: PathBuf,
}

impl UploadStager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stage(&self, upload: &PhotoUpload, mime: &str) -> Result<StagedUpload> {
        let extension = mime.rsplit('/').next().unwrap_or("bin");
        let path = self
            .dir
            .join(format!("{}.{}", uuid::Uuid::new_v4(), extension));

        fs::write(&path, &upload.bytes)
            .with_context(|| format!("Failed to stage upload at {}", path.display()))?;

        Ok(StagedUpload {
            path,
            mime: mime.to_string(),
        })
    }
}

/// A staged upload file. Removed once converted, or on drop.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    mime: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the staged file, encode it and discard the file
    pub fn into_data_uri(self) -> Result<String> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read staged upload {}", self.path.display()))?;
        // the file itself goes away when `self` drops
        Ok(encode_data_uri(&self.mime, &bytes))
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staged upload {}: {}", self.path.display(), e);
            }
        }
    }
}

// ============================================================================
// DATA URIs
// ============================================================================

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a `data:` URI back into its MIME type and raw bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Not a data URI"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| anyhow!("Data URI is not base64 encoded"))?;

    let bytes = STANDARD.decode(payload).context("Invalid base64 payload")?;
    Ok((mime.to_string(), bytes))
}
