//! Processor-ready image cache.
//!
//! Source images live in table-store attachment storage at full resolution.
//! Browsers and the payment processor both get a reduced-resolution PNG
//! re-encode, produced once per title and cached on disk in a temporary
//! directory for the process lifetime.

use std::path::PathBuf;

use anyhow::Context;
use printworks_store::TableStore;

use crate::error::AppError;

/// Disk-backed cache of resized PNGs keyed by title.
pub struct ImageCache {
    dir: tempfile::TempDir,
    store: TableStore,
    scale: f32,
}

impl ImageCache {
    /// Create the cache directory.
    ///
    /// # Errors
    ///
    /// Fails when the temporary directory cannot be created.
    pub fn new(store: TableStore, scale: f32) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir().context("could not create image cache directory")?;
        Ok(Self { dir, store, scale })
    }

    fn cache_path(&self, title: &str) -> PathBuf {
        self.dir.path().join(format!("{title}.png"))
    }

    /// The reduced-resolution PNG for `title`, fetching and re-encoding the
    /// source at `source_path` on first use.
    ///
    /// # Errors
    ///
    /// 404 when the source file is gone upstream; a generic 500 for
    /// transport or decode failures.
    pub async fn resized(&self, title: &str, source_path: &str) -> Result<Vec<u8>, AppError> {
        let cached = self.cache_path(title);
        if let Ok(bytes) = tokio::fs::read(&cached).await {
            return Ok(bytes);
        }

        let raw = self.store.fetch_file(source_path).await?;
        let scale = self.scale;
        let png = tokio::task::spawn_blocking(move || scale_png(&raw, scale))
            .await
            .map_err(|e| {
                AppError::internal("image re-encode task failed").with_source(anyhow::Error::new(e))
            })??;

        // A failed cache write only costs a re-encode on the next request.
        if let Err(error) = tokio::fs::write(&cached, &png).await {
            tracing::warn!(%error, title, "could not cache resized image");
        }
        tracing::debug!(title, bytes = png.len(), "re-encoded source image");
        Ok(png)
    }
}

fn scale_png(raw: &[u8], scale: f32) -> Result<Vec<u8>, AppError> {
    let source = image::load_from_memory(raw)
        .map_err(|e| AppError::internal("unreadable source image").with_source(anyhow::Error::new(e)))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let width = ((source.width() as f32 * scale) as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let height = ((source.height() as f32 * scale) as u32).max(1);

    let resized = source.resize_exact(width, height, image::imageops::FilterType::Lanczos3);
    let mut buffer = Vec::new();
    resized
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .map_err(|e| AppError::internal("could not encode PNG").with_source(anyhow::Error::new(e)))?;
    Ok(buffer)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn scale_png_shrinks_by_the_configured_factor() {
        let source = sample_png(10, 20);
        let scaled = scale_png(&source, 0.5).unwrap();

        let decoded = image::load_from_memory(&scaled).unwrap();
        assert_eq!(decoded.width(), 5);
        assert_eq!(decoded.height(), 10);
    }

    #[test]
    fn scale_png_never_collapses_to_zero_pixels() {
        let source = sample_png(2, 2);
        let scaled = scale_png(&source, 0.1).unwrap();

        let decoded = image::load_from_memory(&scaled).unwrap();
        assert_eq!(decoded.width(), 1);
        assert_eq!(decoded.height(), 1);
    }

    #[test]
    fn scale_png_rejects_garbage() {
        assert!(scale_png(&[0, 1, 2, 3], 0.5).is_err());
    }
}
