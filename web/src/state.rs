//! Application state shared across all HTTP handlers.

use std::sync::Arc;

use printworks_checkout::{PaymentProcessor, StripeClient};
use printworks_store::{CatalogCache, SessionStore, TableSessionStore, TableStore};

use crate::config::Config;
use crate::images::ImageCache;
use crate::templates;

/// Everything a handler needs, constructed once at startup.
pub struct AppState {
    pub config: Config,
    pub store: TableStore,
    pub catalog: CatalogCache,
    pub sessions: Arc<dyn SessionStore>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub images: ImageCache,
    pub templates: minijinja::Environment<'static>,
}

/// Shared handle passed to the router.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the production state: table-backed sessions and the real
    /// processor client.
    ///
    /// # Errors
    ///
    /// Fails when the image cache directory or template environment cannot
    /// be built.
    pub fn new(config: Config) -> anyhow::Result<SharedState> {
        let store = TableStore::new(&config.table_store_url, &config.table_store_token);
        let sessions: Arc<dyn SessionStore> = Arc::new(TableSessionStore::new(
            store.clone(),
            &config.sessions_table,
            config.session_ttl,
        ));
        let processor: Arc<dyn PaymentProcessor> =
            Arc::new(StripeClient::new(&config.processor_secret_key));
        Self::from_parts(config, store, sessions, processor)
    }

    /// Build the state from explicit collaborators (tests swap in the
    /// in-memory session store and the mock processor here).
    ///
    /// # Errors
    ///
    /// Fails when the image cache directory or template environment cannot
    /// be built.
    pub fn from_parts(
        config: Config,
        store: TableStore,
        sessions: Arc<dyn SessionStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> anyhow::Result<SharedState> {
        let catalog = CatalogCache::new(store.clone(), &config.artwork_table, &config.icon_table);
        let images = ImageCache::new(store.clone(), config.image_scale)?;
        let templates = templates::environment()?;
        Ok(Arc::new(Self {
            config,
            store,
            catalog,
            sessions,
            processor,
            images,
            templates,
        }))
    }
}
