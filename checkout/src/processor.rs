//! Payment-processor seam: catalog types, the `PaymentProcessor` trait, and
//! a recording mock for tests.
//!
//! The trait methods return boxed futures so the processor can live behind
//! `Arc<dyn PaymentProcessor>` in the application state, with the real REST
//! client and the mock swapped freely.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::ProcessorError;

/// Result alias for processor calls.
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Boxed future alias keeping the trait object-safe.
pub type ProcessorFuture<'a, T> = Pin<Box<dyn Future<Output = ProcessorResult<T>> + Send + 'a>>;

/// A product in the processor's catalog. `name` carries the artwork title
/// and is the only join key between the two systems.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorProduct {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Default price id, set for every product this system creates.
    pub default_price: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A price attached to a processor product. `unit_amount` is in the
/// processor's minor currency unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorPrice {
    pub id: String,
    pub product: String,
    pub unit_amount: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A file uploaded to processor-hosted storage.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorFile {
    pub id: String,
}

/// A public link to a processor-hosted file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileLink {
    pub id: String,
    pub url: String,
}

/// A hosted payment page.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

/// One hosted-payment-page line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Processor price id.
    pub price: String,
    pub quantity: u32,
}

fn default_true() -> bool {
    true
}

/// Abstraction over the payment processor's catalog and payment-link API.
pub trait PaymentProcessor: Send + Sync {
    /// List active products — one paginated call, capped at 100.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn list_products(&self) -> ProcessorFuture<'_, Vec<ProcessorProduct>>;

    /// List every price of a product, archived prices included.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn list_prices<'a>(&'a self, product_id: &'a str) -> ProcessorFuture<'a, Vec<ProcessorPrice>>;

    /// Fetch one price by id.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn retrieve_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ProcessorPrice>;

    /// Create a product with default price data and a hosted image.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn create_product<'a>(
        &'a self,
        name: &'a str,
        unit_amount: i64,
        image_url: &'a str,
    ) -> ProcessorFuture<'a, ProcessorProduct>;

    /// Mint a new price for a product.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn create_price<'a>(
        &'a self,
        product_id: &'a str,
        unit_amount: i64,
    ) -> ProcessorFuture<'a, ProcessorPrice>;

    /// Point a product's default price at `price_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn set_default_price<'a>(
        &'a self,
        product_id: &'a str,
        price_id: &'a str,
    ) -> ProcessorFuture<'a, ()>;

    /// Deactivate a price.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn archive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()>;

    /// Reactivate an archived price.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn unarchive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()>;

    /// Upload an image to processor-hosted storage.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn upload_file<'a>(
        &'a self,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> ProcessorFuture<'a, ProcessorFile>;

    /// Create a public link for an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn create_file_link<'a>(&'a self, file_id: &'a str) -> ProcessorFuture<'a, FileLink>;

    /// Create a hosted payment page for the given line items.
    ///
    /// # Errors
    ///
    /// Returns an error when the processor call fails.
    fn create_payment_link<'a>(
        &'a self,
        line_items: &'a [LineItem],
    ) -> ProcessorFuture<'a, PaymentLink>;
}

/// Recording in-memory processor for synchronizer and handler tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone, Default)]
pub struct MockProcessor {
    inner: std::sync::Arc<tokio::sync::Mutex<MockInner>>,
}

#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
struct MockInner {
    products: Vec<ProcessorProduct>,
    prices: Vec<ProcessorPrice>,
    uploads: Vec<String>,
    created_products: u32,
    created_prices: u32,
    payment_links: Vec<Vec<LineItem>>,
    next_id: u32,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockInner {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MockProcessor {
    /// An empty processor catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one active product with an active default price at
    /// `unit_amount`, returning `(product_id, price_id)`.
    pub async fn seed_product(&self, name: &str, unit_amount: i64) -> (String, String) {
        let mut inner = self.inner.lock().await;
        let product_id = inner.next("prod");
        let price_id = inner.next("price");
        inner.prices.push(ProcessorPrice {
            id: price_id.clone(),
            product: product_id.clone(),
            unit_amount,
            active: true,
        });
        inner.products.push(ProcessorProduct {
            id: product_id.clone(),
            name: name.to_string(),
            active: true,
            default_price: Some(price_id.clone()),
            images: Vec::new(),
        });
        (product_id, price_id)
    }

    /// Seed an extra (possibly archived) price on an existing product.
    pub async fn seed_price(&self, product_id: &str, unit_amount: i64, active: bool) -> String {
        let mut inner = self.inner.lock().await;
        let price_id = inner.next("price");
        inner.prices.push(ProcessorPrice {
            id: price_id.clone(),
            product: product_id.to_string(),
            unit_amount,
            active,
        });
        price_id
    }

    /// File names uploaded so far.
    pub async fn uploads(&self) -> Vec<String> {
        self.inner.lock().await.uploads.clone()
    }

    /// Number of products created through the trait.
    pub async fn created_products(&self) -> u32 {
        self.inner.lock().await.created_products
    }

    /// Number of prices created through the trait (seeds excluded).
    pub async fn created_prices(&self) -> u32 {
        self.inner.lock().await.created_prices
    }

    /// Line-item lists passed to `create_payment_link`.
    pub async fn payment_links(&self) -> Vec<Vec<LineItem>> {
        self.inner.lock().await.payment_links.clone()
    }

    /// Current default price id of a product.
    pub async fn default_price(&self, product_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .products
            .iter()
            .find(|p| p.id == product_id)
            .and_then(|p| p.default_price.clone())
    }

    /// Whether a price is currently active.
    pub async fn price_active(&self, price_id: &str) -> Option<bool> {
        let inner = self.inner.lock().await;
        inner.prices.iter().find(|p| p.id == price_id).map(|p| p.active)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl PaymentProcessor for MockProcessor {
    fn list_products(&self) -> ProcessorFuture<'_, Vec<ProcessorProduct>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .products
                .iter()
                .filter(|p| p.active)
                .take(100)
                .cloned()
                .collect())
        })
    }

    fn list_prices<'a>(&'a self, product_id: &'a str) -> ProcessorFuture<'a, Vec<ProcessorPrice>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .prices
                .iter()
                .filter(|p| p.product == product_id)
                .cloned()
                .collect())
        })
    }

    fn retrieve_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ProcessorPrice> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            inner
                .prices
                .iter()
                .find(|p| p.id == price_id)
                .cloned()
                .ok_or_else(|| ProcessorError::Api {
                    status: 404,
                    message: format!("no such price: {price_id}"),
                })
        })
    }

    fn create_product<'a>(
        &'a self,
        name: &'a str,
        unit_amount: i64,
        image_url: &'a str,
    ) -> ProcessorFuture<'a, ProcessorProduct> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let product_id = inner.next("prod");
            let price_id = inner.next("price");
            inner.prices.push(ProcessorPrice {
                id: price_id.clone(),
                product: product_id.clone(),
                unit_amount,
                active: true,
            });
            let product = ProcessorProduct {
                id: product_id,
                name: name.to_string(),
                active: true,
                default_price: Some(price_id),
                images: vec![image_url.to_string()],
            };
            inner.products.push(product.clone());
            inner.created_products += 1;
            Ok(product)
        })
    }

    fn create_price<'a>(
        &'a self,
        product_id: &'a str,
        unit_amount: i64,
    ) -> ProcessorFuture<'a, ProcessorPrice> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let price_id = inner.next("price");
            let price = ProcessorPrice {
                id: price_id,
                product: product_id.to_string(),
                unit_amount,
                active: true,
            };
            inner.prices.push(price.clone());
            inner.created_prices += 1;
            Ok(price)
        })
    }

    fn set_default_price<'a>(
        &'a self,
        product_id: &'a str,
        price_id: &'a str,
    ) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if let Some(product) = inner.products.iter_mut().find(|p| p.id == product_id) {
                product.default_price = Some(price_id.to_string());
            }
            Ok(())
        })
    }

    fn archive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if let Some(price) = inner.prices.iter_mut().find(|p| p.id == price_id) {
                price.active = false;
            }
            Ok(())
        })
    }

    fn unarchive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if let Some(price) = inner.prices.iter_mut().find(|p| p.id == price_id) {
                price.active = true;
            }
            Ok(())
        })
    }

    fn upload_file<'a>(
        &'a self,
        file_name: &'a str,
        _bytes: Vec<u8>,
    ) -> ProcessorFuture<'a, ProcessorFile> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.uploads.push(file_name.to_string());
            let id = inner.next("file");
            Ok(ProcessorFile { id })
        })
    }

    fn create_file_link<'a>(&'a self, file_id: &'a str) -> ProcessorFuture<'a, FileLink> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let id = inner.next("link");
            Ok(FileLink {
                id,
                url: format!("https://files.processor.test/{file_id}"),
            })
        })
    }

    fn create_payment_link<'a>(
        &'a self,
        line_items: &'a [LineItem],
    ) -> ProcessorFuture<'a, PaymentLink> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.payment_links.push(line_items.to_vec());
            let id = inner.next("plink");
            Ok(PaymentLink {
                url: format!("https://pay.processor.test/{id}"),
                id,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_seeds_are_listed_as_active_products() {
        let mock = MockProcessor::new();
        let (product_id, price_id) = mock.seed_product("Sunset", 22500).await;

        let products = mock.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, product_id);
        assert_eq!(products[0].default_price.as_deref(), Some(price_id.as_str()));

        let price = mock.retrieve_price(&price_id).await.unwrap();
        assert_eq!(price.unit_amount, 22500);
    }

    #[tokio::test]
    async fn mock_archival_toggles_price_state() {
        let mock = MockProcessor::new();
        let (product_id, price_id) = mock.seed_product("Sunset", 22500).await;

        mock.archive_price(&price_id).await.unwrap();
        assert_eq!(mock.price_active(&price_id).await, Some(false));
        mock.unarchive_price(&price_id).await.unwrap();
        assert_eq!(mock.price_active(&price_id).await, Some(true));

        let prices = mock.list_prices(&product_id).await.unwrap();
        assert_eq!(prices.len(), 1);
    }
}
