//! Export and share collaborators.

use crate::compositor::Compositor;
use crate::data_uri::DataUri;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Prefix of exported file names.
pub const EXPORT_PREFIX: &str = "sundascape-200px";
/// File name used for shared images.
pub const SHARE_FILE_NAME: &str = "sundascape.png";
/// Title attached to shared images.
pub const SHARE_TITLE: &str = "SundaScape AI";
/// Caption attached to shared images.
pub const SHARE_TEXT: &str = "Tingali abdi nuju aya di lokasi ieu!";

/// Returns `sundascape-200px-<unix millis>.png` for the given instant.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("{EXPORT_PREFIX}-{}.png", at.timestamp_millis())
}

/// Renders `image` with the optional watermark `logo` and writes it as PNG into `dir`.
///
/// Both arguments are data URIs. The file only appears once the PNG has been
/// fully encoded and written; on any failure no file is left behind.
pub async fn export_png(
    compositor: &Compositor,
    image: &str,
    logo: Option<&str>,
    dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let base = DataUri::parse(image)?.into_data();
    let logo = logo.map(DataUri::parse).transpose()?.map(DataUri::into_data);
    let watermarked = logo.is_some();

    let png = compositor.render_png_async(base, logo).await?;

    let path = dir.as_ref().join(export_file_name(Utc::now()));
    write_atomic(&path, &png).await?;

    tracing::info!(path = %path.display(), bytes = png.len(), watermarked, "exported image");
    Ok(path)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, data).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

/// A shareable file plus its caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    /// File name presented to the share target.
    pub file_name: String,
    /// MIME type of `data`.
    pub mime_type: String,
    /// Share title.
    pub title: String,
    /// Share caption.
    pub text: String,
    /// PNG bytes.
    pub data: Vec<u8>,
}

/// A platform share capability.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Hands the payload to the platform.
    async fn share(&self, payload: SharePayload) -> Result<()>;
}

/// Packages `image` (a data URI) as a PNG share payload.
pub async fn share_payload(compositor: &Compositor, image: &str) -> Result<SharePayload> {
    let data = DataUri::parse(image)?.into_data();
    let png = compositor.render_png_async(data, None).await?;
    Ok(SharePayload {
        file_name: SHARE_FILE_NAME.to_string(),
        mime_type: "image/png".to_string(),
        title: SHARE_TITLE.to_string(),
        text: SHARE_TEXT.to_string(),
        data: png,
    })
}

/// Shares `image` through `target`, if one is available.
///
/// Sharing is best effort: a missing target is a silent no-op and failures
/// are logged, never surfaced. Returns true if the target accepted the image.
pub async fn share_image(
    compositor: &Compositor,
    image: &str,
    target: Option<&dyn ShareTarget>,
) -> bool {
    let Some(target) = target else {
        return false;
    };

    let payload = match share_payload(compositor, image).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("could not prepare image for sharing: {e}");
            return false;
        }
    };

    match target.share(payload).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("share failed: {e}");
            false
        }
    }
}
