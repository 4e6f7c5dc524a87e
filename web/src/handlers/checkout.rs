//! Hosted-payment-page handoff.

use std::future::Future;
use std::pin::Pin;

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use printworks_checkout::{ImageSource, ProductImage, build_line_items};

use super::session_from_jar;
use crate::error::AppError;
use crate::state::{AppState, SharedState};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted payment page the browser should navigate to.
    pub url: String,
}

/// Adapter giving the synchronizer processor-ready product images from the
/// catalog and the resized-image cache.
struct CatalogImages<'a> {
    state: &'a AppState,
}

impl ImageSource for CatalogImages<'_> {
    fn product_image<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProductImage>> + Send + 'a>> {
        Box::pin(async move {
            let artwork = self
                .state
                .catalog
                .artwork_by_title(title)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no artwork titled {title:?}"))?;
            let source = artwork
                .signed_path
                .clone()
                .unwrap_or_else(|| artwork.path.clone());
            let bytes = self.state.images.resized(&artwork.title, &source).await?;
            Ok(ProductImage {
                file_name: format!("{title}.png"),
                bytes,
            })
        })
    }
}

/// `POST /checkout/session` — reconcile the cart against the processor
/// catalog and create the hosted payment page.
///
/// An empty or missing cart is "nothing to check out" (400). Any processor
/// failure aborts the whole synchronization and surfaces as a generic 500.
pub async fn create_checkout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session_id =
        session_from_jar(&jar).ok_or_else(|| AppError::bad_request("nothing to check out"))?;
    let record = state
        .sessions
        .load(session_id)
        .await?
        .ok_or_else(|| AppError::bad_request("nothing to check out"))?;
    if record.state.cart.is_empty() {
        return Err(AppError::bad_request("nothing to check out"));
    }

    let images = CatalogImages {
        state: state.as_ref(),
    };
    let line_items = build_line_items(state.processor.as_ref(), &images, &record.state.cart).await?;
    if line_items.is_empty() {
        return Err(AppError::bad_request("nothing to check out"));
    }

    let link = state.processor.create_payment_link(&line_items).await?;
    tracing::info!(
        session_id = %session_id,
        lines = line_items.len(),
        "created hosted payment page"
    );
    Ok(Json(CheckoutResponse { url: link.url }))
}
