//! Checkout synchronization: cart lines → hosted-payment-page line items.
//!
//! For every cart line the synchronizer finds or creates a processor price
//! whose unit amount matches the cart's derived unit amount, preferring in
//! order: the product's current default price, any existing price of that
//! product (archived ones are woken up), and only then a freshly minted
//! price. Titles with no processor product at all get an image upload and a
//! product create.
//!
//! The first processor error aborts the whole pass; nothing is rolled back.

use std::future::Future;
use std::pin::Pin;

use printworks_store::{Cart, CartItem};

use crate::error::{ProcessorError, SyncError};
use crate::processor::{LineItem, PaymentProcessor, ProcessorProduct};

/// A processor-ready product image.
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Source of product images for titles that need a processor product
/// created. The web layer implements this over its resized-image cache.
pub trait ImageSource: Send + Sync {
    /// Resolve the image for `title`.
    ///
    /// # Errors
    ///
    /// Returns an error when the title has no image or the fetch fails.
    fn product_image<'a>(
        &'a self,
        title: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProductImage>> + Send + 'a>>;
}

/// Derived unit amount for one cart line, in the processor's minor
/// currency unit.
///
/// Line prices are produced by the one pricing function, so the division is
/// exact in practice; a remainder means a legacy row slipped through and is
/// logged rather than silently truncated.
fn unit_amount_cents(item: &CartItem) -> i64 {
    let quantity = i64::from(item.quantity.max(1));
    if item.price % quantity != 0 {
        tracing::warn!(
            title = %item.title,
            price = item.price,
            quantity,
            "line price does not divide evenly by quantity; remainder dropped"
        );
    }
    (item.price / quantity) * 100
}

/// Reconcile `cart` against the processor catalog and return the line items
/// for a hosted payment page.
///
/// An empty cart yields an empty list, which callers must treat as
/// "nothing to check out".
///
/// # Errors
///
/// Any processor failure aborts the synchronization; an unresolvable
/// artwork image fails with [`SyncError::Image`].
pub async fn build_line_items(
    processor: &dyn PaymentProcessor,
    images: &dyn ImageSource,
    cart: &Cart,
) -> Result<Vec<LineItem>, SyncError> {
    if cart.is_empty() {
        return Ok(Vec::new());
    }

    let products = processor.list_products().await?;
    let mut line_items = Vec::with_capacity(cart.len());
    for item in cart.items() {
        let unit_amount = unit_amount_cents(item);
        let price_id = match products.iter().find(|p| p.name == item.title) {
            Some(product) => reconcile_price(processor, product, unit_amount).await?,
            None => create_product(processor, images, item, unit_amount).await?,
        };
        line_items.push(LineItem {
            price: price_id,
            quantity: item.quantity,
        });
    }
    Ok(line_items)
}

/// Find or mint a price of `unit_amount` on an existing product and make it
/// the default.
async fn reconcile_price(
    processor: &dyn PaymentProcessor,
    product: &ProcessorProduct,
    unit_amount: i64,
) -> Result<String, SyncError> {
    let Some(default_price_id) = product.default_price.as_deref() else {
        // A product without a default price should not exist in this
        // catalog; repair it in place.
        let created = processor.create_price(&product.id, unit_amount).await?;
        processor.set_default_price(&product.id, &created.id).await?;
        tracing::warn!(product = %product.id, "product had no default price; minted one");
        return Ok(created.id);
    };

    let default_price = processor.retrieve_price(default_price_id).await?;
    if default_price.unit_amount == unit_amount {
        return Ok(default_price.id);
    }

    // The unit price moved. Reuse any existing price with the right amount,
    // waking archived ones, before minting a new price; either way the old
    // default is archived.
    let prices = processor.list_prices(&product.id).await?;
    let replacement = match prices
        .iter()
        .find(|p| p.unit_amount == unit_amount && p.id != default_price.id)
    {
        Some(existing) => {
            if !existing.active {
                processor.unarchive_price(&existing.id).await?;
            }
            existing.id.clone()
        }
        None => processor.create_price(&product.id, unit_amount).await?.id,
    };
    processor.set_default_price(&product.id, &replacement).await?;
    processor.archive_price(&default_price.id).await?;
    tracing::info!(
        product = %product.id,
        unit_amount,
        price = %replacement,
        "rotated default price"
    );
    Ok(replacement)
}

/// Upload the artwork image and create a processor product for a title the
/// processor has never seen.
async fn create_product(
    processor: &dyn PaymentProcessor,
    images: &dyn ImageSource,
    item: &CartItem,
    unit_amount: i64,
) -> Result<String, SyncError> {
    let image = images
        .product_image(&item.title)
        .await
        .map_err(|e| SyncError::Image {
            title: item.title.clone(),
            message: e.to_string(),
        })?;
    let file = processor.upload_file(&image.file_name, image.bytes).await?;
    let link = processor.create_file_link(&file.id).await?;
    let product = processor
        .create_product(&item.title, unit_amount, &link.url)
        .await?;
    tracing::info!(title = %item.title, product = %product.id, "created processor product");
    product.default_price.ok_or_else(|| {
        SyncError::Processor(ProcessorError::ParseFailed(
            "created product has no default price".to_string(),
        ))
    })
}
