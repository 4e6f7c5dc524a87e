//! Session records and the session-store seam.
//!
//! A session is one table-store row keyed by an opaque token from the
//! visitor's cookie. The row's `cookies` column carries the JSON session
//! payload: the cart under `img_quantity_list` plus the portal `logged_in`
//! flag. Rows expire a fixed interval after creation; expiry is enforced on
//! read, so the background sweep is advisory cleanup only.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::client::TableStore;
use crate::error::{Result, StoreError};
use crate::rows::SessionRow;

/// Opaque session token carried in the visitor's cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from its cookie representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-visitor state persisted in one session row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The visitor's cart.
    #[serde(rename = "img_quantity_list", default)]
    pub cart: Cart,
    /// Set after a successful portal login.
    #[serde(default)]
    pub logged_in: bool,
}

impl SessionState {
    /// State holding just a cart.
    #[must_use]
    pub fn with_cart(cart: Cart) -> Self {
        Self {
            cart,
            logged_in: false,
        }
    }
}

/// A session row joined with its decoded state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Upstream row id.
    pub row_id: i64,
    pub session_id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether this session's fixed TTL has elapsed at `now`.
    #[must_use]
    pub fn expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Boxed future alias keeping the store seams object-safe.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Session persistence seam.
///
/// Implementations write whole sessions — there is no partial update and no
/// optimistic concurrency on the rows, so concurrent mutations of one
/// session are last-writer-wins.
pub trait SessionStore: Send + Sync {
    /// Load a session.
    ///
    /// A row past its TTL is reported as absent even when the sweep has not
    /// removed it yet.
    ///
    /// # Errors
    ///
    /// Returns gateway errors; a missing row is `Ok(None)`, not an error.
    fn load(&self, session_id: SessionId) -> StoreFuture<'_, Option<SessionRecord>>;

    /// Create or rewrite the row for this session.
    ///
    /// # Errors
    ///
    /// Returns gateway errors.
    fn save(&self, session_id: SessionId, state: &SessionState) -> StoreFuture<'_, ()>;

    /// Delete the row, if present. Deleting an absent session is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns gateway errors.
    fn delete(&self, session_id: SessionId) -> StoreFuture<'_, ()>;

    /// Every persisted session, expired rows included (sweep input).
    ///
    /// # Errors
    ///
    /// Returns gateway errors.
    fn list_all(&self) -> StoreFuture<'_, Vec<SessionRecord>>;
}

/// Session store backed by a table-store sessions table.
#[derive(Clone)]
pub struct TableSessionStore {
    store: TableStore,
    table: String,
    ttl: Duration,
}

impl TableSessionStore {
    /// Create a store over `table` with the given session TTL.
    #[must_use]
    pub fn new(store: TableStore, table: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            table: table.into(),
            ttl,
        }
    }

    async fn find(&self, session_id: SessionId) -> Result<Option<SessionRecord>> {
        let rows: Vec<SessionRow> = self.store.list_rows(&self.table).await?;
        let wanted = session_id.to_string();
        for row in rows {
            if row.sessionids == wanted {
                return decode_record(row).map(Some);
            }
        }
        Ok(None)
    }
}

fn decode_record(row: SessionRow) -> Result<SessionRecord> {
    let session_id = SessionId::parse(&row.sessionids)
        .ok_or_else(|| StoreError::Decode(format!("bad session token {:?}", row.sessionids)))?;
    // The JSON column is occasionally stored as a string by the upstream UI.
    let state: SessionState = match &row.cookies {
        serde_json::Value::String(raw) => serde_json::from_str(raw)
            .map_err(|e| StoreError::Decode(format!("session {session_id} payload: {e}")))?,
        value => serde_json::from_value(value.clone())
            .map_err(|e| StoreError::Decode(format!("session {session_id} payload: {e}")))?,
    };
    Ok(SessionRecord {
        row_id: row.id,
        session_id,
        state,
        created_at: row.created_at,
    })
}

impl SessionStore for TableSessionStore {
    fn load(&self, session_id: SessionId) -> StoreFuture<'_, Option<SessionRecord>> {
        Box::pin(async move {
            let record = self.find(session_id).await?;
            Ok(record.filter(|r| !r.expired(self.ttl, Utc::now())))
        })
    }

    fn save(&self, session_id: SessionId, state: &SessionState) -> StoreFuture<'_, ()> {
        let payload = serde_json::to_value(state).unwrap_or_default();
        Box::pin(async move {
            if let Some(existing) = self.find(session_id).await? {
                self.store
                    .update_row(
                        &self.table,
                        &serde_json::json!({
                            "Id": existing.row_id,
                            "sessionids": session_id.to_string(),
                            "cookies": payload,
                        }),
                    )
                    .await?;
                tracing::debug!(session_id = %session_id, "rewrote session row");
            } else {
                self.store
                    .create_row(
                        &self.table,
                        &serde_json::json!({
                            "sessionids": session_id.to_string(),
                            "cookies": payload,
                            "created_at": Utc::now(),
                        }),
                    )
                    .await?;
                tracing::info!(session_id = %session_id, "created session row");
            }
            Ok(())
        })
    }

    fn delete(&self, session_id: SessionId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if let Some(existing) = self.find(session_id).await? {
                self.store.delete_row(&self.table, existing.row_id).await?;
                tracing::info!(session_id = %session_id, "deleted session row");
            }
            Ok(())
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<SessionRecord>> {
        Box::pin(async move {
            let rows: Vec<SessionRow> = self.store.list_rows(&self.table).await?;
            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                match decode_record(row) {
                    Ok(record) => records.push(record),
                    // A malformed row must not wedge the sweep.
                    Err(error) => tracing::warn!(%error, "skipping undecodable session row"),
                }
            }
            Ok(records)
        })
    }
}

/// In-memory session store for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: std::sync::Arc<tokio::sync::Mutex<MemoryInner>>,
    ttl: Duration,
}

#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
struct MemoryInner {
    records: Vec<SessionRecord>,
    next_row_id: i64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemorySessionStore {
    /// Create an empty store with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: std::sync::Arc::default(),
            ttl,
        }
    }

    /// Backdate a session's creation time (test hook for expiry paths).
    pub async fn backdate(&self, session_id: SessionId, created_at: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner
            .records
            .iter_mut()
            .find(|r| r.session_id == session_id)
        {
            record.created_at = created_at;
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: SessionId) -> StoreFuture<'_, Option<SessionRecord>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .records
                .iter()
                .find(|r| r.session_id == session_id)
                .filter(|r| !r.expired(self.ttl, Utc::now()))
                .cloned())
        })
    }

    fn save(&self, session_id: SessionId, state: &SessionState) -> StoreFuture<'_, ()> {
        let state = state.clone();
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if let Some(record) = inner
                .records
                .iter_mut()
                .find(|r| r.session_id == session_id)
            {
                record.state = state;
            } else {
                inner.next_row_id += 1;
                let row_id = inner.next_row_id;
                inner.records.push(SessionRecord {
                    row_id,
                    session_id,
                    state,
                    created_at: Utc::now(),
                });
            }
            Ok(())
        })
    }

    fn delete(&self, session_id: SessionId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.records.retain(|r| r.session_id != session_id);
            Ok(())
        })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<SessionRecord>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner.records.clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cart_with(title: &str, quantity: u32, price: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add(title, quantity, price / i64::from(quantity)).unwrap();
        cart
    }

    fn session_list_body(token: &str, created_at: &str) -> serde_json::Value {
        serde_json::json!({
            "list": [{
                "Id": 11,
                "sessionids": token,
                "cookies": {
                    "img_quantity_list": [{"title": "Sunset", "quantity": 2, "price": 450}],
                    "logged_in": false
                },
                "created_at": created_at
            }]
        })
    }

    #[tokio::test]
    async fn load_returns_a_live_session() {
        let server = MockServer::start().await;
        let id = SessionId::new();
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/sessions/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_list_body(
                &id.to_string(),
                &Utc::now().to_rfc3339(),
            )))
            .mount(&server)
            .await;

        let store = TableSessionStore::new(
            TableStore::new(server.uri(), "t"),
            "sessions",
            Duration::minutes(15),
        );
        let record = store.load(id).await.unwrap().unwrap();
        assert_eq!(record.row_id, 11);
        assert_eq!(record.state.cart.total_quantity(), 2);
        assert!(!record.state.logged_in);
    }

    #[tokio::test]
    async fn load_treats_an_expired_row_as_absent() {
        let server = MockServer::start().await;
        let id = SessionId::new();
        let stale = (Utc::now() - Duration::minutes(20)).to_rfc3339();
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/sessions/records"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(session_list_body(&id.to_string(), &stale)),
            )
            .mount(&server)
            .await;

        let store = TableSessionStore::new(
            TableStore::new(server.uri(), "t"),
            "sessions",
            Duration::minutes(15),
        );
        assert!(store.load(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_a_row_for_a_new_session() {
        let server = MockServer::start().await;
        let id = SessionId::new();
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/sessions/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/tables/sessions/records"))
            .and(body_partial_json(serde_json::json!({
                "sessionids": id.to_string(),
                "cookies": {
                    "img_quantity_list": [{"title": "Sunset", "quantity": 2, "price": 450}]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Id": 5 })))
            .expect(1)
            .mount(&server)
            .await;

        let store = TableSessionStore::new(
            TableStore::new(server.uri(), "t"),
            "sessions",
            Duration::minutes(15),
        );
        let state = SessionState::with_cart(cart_with("Sunset", 2, 450));
        store.save(id, &state).await.unwrap();
    }

    #[tokio::test]
    async fn save_rewrites_an_existing_row() {
        let server = MockServer::start().await;
        let id = SessionId::new();
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/sessions/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_list_body(
                &id.to_string(),
                &Utc::now().to_rfc3339(),
            )))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/v2/tables/sessions/records"))
            .and(body_partial_json(serde_json::json!({ "Id": 11 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Id": 11 })))
            .expect(1)
            .mount(&server)
            .await;

        let store = TableSessionStore::new(
            TableStore::new(server.uri(), "t"),
            "sessions",
            Duration::minutes(15),
        );
        let state = SessionState::with_cart(cart_with("Sunset", 3, 675));
        store.save(id, &state).await.unwrap();
    }

    #[tokio::test]
    async fn delete_is_a_no_op_for_unknown_sessions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tables/sessions/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })))
            .mount(&server)
            .await;

        let store = TableSessionStore::new(
            TableStore::new(server.uri(), "t"),
            "sessions",
            Duration::minutes(15),
        );
        store.delete(SessionId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_round_trips_state() {
        let store = MemorySessionStore::new(Duration::minutes(15));
        let id = SessionId::new();
        let state = SessionState::with_cart(cart_with("Sunset", 2, 450));

        store.save(id, &state).await.unwrap();
        let record = store.load(id).await.unwrap().unwrap();
        assert_eq!(record.state, state);

        store.delete(id).await.unwrap();
        assert!(store.load(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_hides_expired_sessions() {
        let store = MemorySessionStore::new(Duration::minutes(15));
        let id = SessionId::new();
        store.save(id, &SessionState::default()).await.unwrap();
        store.backdate(id, Utc::now() - Duration::minutes(16)).await;

        assert!(store.load(id).await.unwrap().is_none());
        // Still visible to the sweep.
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
