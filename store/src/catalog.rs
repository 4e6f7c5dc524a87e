//! Catalog records and the timestamp-gated snapshot cache.
//!
//! Artwork and icon rows arrive with their image reference packed into a
//! JSON-encoded `img` column; this module decodes them into domain records
//! and keeps a snapshot that is rebuilt only when the upstream `updated_at`
//! timestamps change. The snapshot lives behind an `RwLock` owned by the
//! application state — there are no module-level caches.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::TableStore;
use crate::error::{Result, StoreError};
use crate::rows::{ArtworkRow, IconRow, ImageRef};

/// The one canonical pricing function: line price for `quantity` units.
///
/// Every price in a cart flows through here. Nothing else multiplies,
/// divides, or hard-codes a unit price.
#[must_use]
pub fn price_for(unit_price: i64, quantity: u32) -> i64 {
    unit_price * i64::from(quantity)
}

/// Artwork record, translated from its table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    /// Upstream row id.
    pub id: i64,
    /// Unique title; the cart and the payment processor both key on it.
    pub title: String,
    /// Storage path of the source image.
    pub path: String,
    /// Pre-signed fetch path, when present.
    pub signed_path: Option<String>,
    /// Unit price in whole currency units.
    pub unit_price: i64,
    /// Upstream modification stamp, compared verbatim for cache refresh.
    pub updated_at: Option<String>,
}

impl Artwork {
    fn from_row(row: ArtworkRow) -> Result<Self> {
        let image = first_image(&row.img, &row.img_label)?;
        let unit_price = row.price.trim().parse::<i64>().map_err(|_| {
            StoreError::Decode(format!(
                "artwork {:?} has non-numeric price {:?}",
                row.img_label, row.price
            ))
        })?;
        Ok(Self {
            id: row.id,
            title: row.img_label,
            path: image.path,
            signed_path: image.signed_path,
            unit_price,
            updated_at: row.updated_at,
        })
    }
}

/// Icon record (site chrome: logo, menu, cart glyphs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub signed_path: Option<String>,
}

impl Icon {
    fn from_row(row: IconRow) -> Result<Self> {
        let image = first_image(&row.img, &row.img_label)?;
        Ok(Self {
            id: row.id,
            title: row.img_label,
            path: image.path,
            signed_path: image.signed_path,
        })
    }
}

fn first_image(img_column: &str, label: &str) -> Result<ImageRef> {
    let images: Vec<ImageRef> = serde_json::from_str(img_column)
        .map_err(|e| StoreError::Decode(format!("img column of {label:?}: {e}")))?;
    images
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Decode(format!("{label:?} has no image attachment")))
}

/// Snapshot cache over the artwork and icon tables.
///
/// Artwork reads always revalidate against the upstream rows, but the
/// decoded snapshot is only rebuilt when a row's `updated_at` differs from
/// the cached copy. Icons change at deployment cadence and are fetched once.
pub struct CatalogCache {
    store: TableStore,
    artwork_table: String,
    icon_table: String,
    artworks: RwLock<Option<Arc<Vec<Artwork>>>>,
    icons: RwLock<Option<Arc<Vec<Icon>>>>,
}

impl CatalogCache {
    /// Create an empty cache over the given tables.
    #[must_use]
    pub fn new(store: TableStore, artwork_table: impl Into<String>, icon_table: impl Into<String>) -> Self {
        Self {
            store,
            artwork_table: artwork_table.into(),
            icon_table: icon_table.into(),
            artworks: RwLock::new(None),
            icons: RwLock::new(None),
        }
    }

    /// Current artwork list.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; a decode failure on any row fails the
    /// whole refresh (the catalog is small and curated).
    pub async fn artworks(&self) -> Result<Arc<Vec<Artwork>>> {
        let rows: Vec<ArtworkRow> = self.store.list_rows(&self.artwork_table).await?;

        {
            let cached = self.artworks.read().await;
            if let Some(snapshot) = cached.as_ref() {
                if timestamps_match(snapshot, &rows) {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        let fresh: Arc<Vec<Artwork>> = Arc::new(
            rows.into_iter()
                .map(Artwork::from_row)
                .collect::<Result<Vec<_>>>()?,
        );
        tracing::debug!(artworks = fresh.len(), "catalog snapshot refreshed");
        *self.artworks.write().await = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Icon list, fetched once and kept for the process lifetime.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the first fetch.
    pub async fn icons(&self) -> Result<Arc<Vec<Icon>>> {
        {
            let cached = self.icons.read().await;
            if let Some(snapshot) = cached.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }
        let rows: Vec<IconRow> = self.store.list_rows(&self.icon_table).await?;
        let fresh: Arc<Vec<Icon>> = Arc::new(
            rows.into_iter()
                .map(Icon::from_row)
                .collect::<Result<Vec<_>>>()?,
        );
        *self.icons.write().await = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Look up one artwork by exact title.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the snapshot refresh.
    pub async fn artwork_by_title(&self, title: &str) -> Result<Option<Artwork>> {
        let artworks = self.artworks().await?;
        Ok(artworks.iter().find(|a| a.title == title).cloned())
    }

    /// Unit price for a title, if the title exists.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors from the snapshot refresh.
    pub async fn unit_price(&self, title: &str) -> Result<Option<i64>> {
        Ok(self.artwork_by_title(title).await?.map(|a| a.unit_price))
    }
}

fn timestamps_match(cached: &[Artwork], rows: &[ArtworkRow]) -> bool {
    cached.len() == rows.len()
        && cached
            .iter()
            .zip(rows)
            .all(|(artwork, row)| artwork.id == row.id && artwork.updated_at == row.updated_at)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artwork_body(updated_at: &str, price: &str) -> serde_json::Value {
        serde_json::json!({
            "list": [{
                "Id": 1,
                "img_label": "Sunset",
                "img": "[{\"path\": \"download/sunset.png\", \"signedPath\": \"dltemp/a/sunset.png\"}]",
                "price": price,
                "updated_at": updated_at
            }]
        })
    }

    #[test]
    fn price_for_is_linear_in_quantity() {
        assert_eq!(price_for(225, 1), 225);
        assert_eq!(price_for(225, 2), 450);
        assert_eq!(price_for(0, 10), 0);
    }

    #[tokio::test]
    async fn snapshot_is_reused_while_timestamps_are_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/art/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artwork_body("2024-06-01", "225")))
            .mount(&server)
            .await;

        let cache = CatalogCache::new(TableStore::new(server.uri(), "t"), "art", "icons");
        let first = cache.artworks().await.unwrap();
        let second = cache.artworks().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first[0].unit_price, 225);
    }

    #[tokio::test]
    async fn snapshot_is_rebuilt_when_a_timestamp_moves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/art/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artwork_body("2024-06-01", "225")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/art/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artwork_body("2024-06-02", "250")))
            .mount(&server)
            .await;

        let cache = CatalogCache::new(TableStore::new(server.uri(), "t"), "art", "icons");
        let first = cache.artworks().await.unwrap();
        assert_eq!(first[0].unit_price, 225);
        let second = cache.artworks().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second[0].unit_price, 250);
    }

    #[tokio::test]
    async fn artwork_lookup_is_exact_on_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/art/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(artwork_body("2024-06-01", "225")))
            .mount(&server)
            .await;

        let cache = CatalogCache::new(TableStore::new(server.uri(), "t"), "art", "icons");
        assert!(cache.artwork_by_title("Sunset").await.unwrap().is_some());
        assert!(cache.artwork_by_title("sunset").await.unwrap().is_none());
        assert_eq!(cache.unit_price("Sunset").await.unwrap(), Some(225));
    }
}
