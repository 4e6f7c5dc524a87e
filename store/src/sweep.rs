//! Periodic deletion of expired session rows.
//!
//! One perpetual task lists every session row each interval and deletes the
//! rows whose TTL has elapsed — a coarse linear scan, acceptable while the
//! sessions table stays small. The sweep shares no state with request
//! handlers; [`crate::session::SessionStore::load`] re-checks the TTL on
//! every read, so a row outliving its expiry by up to one interval is only
//! ever garbage, never a live session.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::error::Result;
use crate::session::SessionStore;

/// Run the expiry sweep forever.
///
/// Pass failures are logged and the loop keeps going.
pub async fn run(sessions: Arc<dyn SessionStore>, ttl: Duration, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match sweep_once(sessions.as_ref(), ttl).await {
            Ok(0) => {}
            Ok(deleted) => tracing::info!(deleted, "session sweep pass finished"),
            Err(error) => tracing::error!(%error, "session sweep pass failed"),
        }
    }
}

/// A single sweep pass. Returns the number of sessions deleted.
///
/// # Errors
///
/// Returns the first gateway error; remaining rows are retried on the next
/// pass.
pub async fn sweep_once(sessions: &dyn SessionStore, ttl: Duration) -> Result<usize> {
    let now = Utc::now();
    let mut deleted = 0;
    for record in sessions.list_all().await? {
        if record.expired(ttl, now) {
            sessions.delete(record.session_id).await?;
            tracing::info!(session_id = %record.session_id, "deleted expired session");
            deleted += 1;
        }
    }
    Ok(deleted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, SessionId, SessionState};

    #[tokio::test]
    async fn sweep_deletes_only_expired_sessions() {
        let ttl = Duration::minutes(15);
        let store = MemorySessionStore::new(ttl);

        let fresh = SessionId::new();
        let stale = SessionId::new();
        store.save(fresh, &SessionState::default()).await.unwrap();
        store.save(stale, &SessionState::default()).await.unwrap();
        store.backdate(stale, Utc::now() - Duration::minutes(16)).await;

        let deleted = sweep_once(&store, ttl).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].session_id, fresh);
    }

    #[tokio::test]
    async fn sweep_is_a_no_op_on_an_empty_table() {
        let ttl = Duration::minutes(15);
        let store = MemorySessionStore::new(ttl);
        assert_eq!(sweep_once(&store, ttl).await.unwrap(), 0);
    }
}
