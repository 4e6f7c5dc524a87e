//! Image streaming.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::decode_title;
use crate::error::AppError;
use crate::state::SharedState;

/// `GET /images/{title}` — a processor-ready reduced-resolution PNG of an
/// artwork or icon, re-encoded once and served from the disk cache after.
pub async fn hosted_image(
    State(state): State<SharedState>,
    Path(raw_title): Path<String>,
) -> Result<Response, AppError> {
    let title = decode_title(&raw_title);

    if let Some(artwork) = state.catalog.artwork_by_title(&title).await? {
        let source = artwork
            .signed_path
            .clone()
            .unwrap_or_else(|| artwork.path.clone());
        let png = state.images.resized(&artwork.title, &source).await?;
        return Ok(png_response(png));
    }

    let icons = state.catalog.icons().await?;
    if let Some(icon) = icons.iter().find(|icon| icon.title == title) {
        let source = icon
            .signed_path
            .clone()
            .unwrap_or_else(|| icon.path.clone());
        let png = state.images.resized(&icon.title, &source).await?;
        return Ok(png_response(png));
    }

    Err(AppError::not_found("image", &title))
}

fn png_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}
