//! Session bootstrap.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use printworks_store::SessionId;

use super::{session_cookie, session_from_jar};
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub session_id: String,
    /// True when this request minted the token.
    pub fresh: bool,
}

/// `GET /session/bootstrap` — hand the browser a session token without
/// creating a row; the row appears on the first cart mutation.
pub async fn bootstrap(
    State(_state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<BootstrapResponse>), AppError> {
    if let Some(session_id) = session_from_jar(&jar) {
        return Ok((
            jar,
            Json(BootstrapResponse {
                session_id: session_id.to_string(),
                fresh: false,
            }),
        ));
    }
    let session_id = SessionId::new();
    tracing::debug!(session_id = %session_id, "issued session token");
    Ok((
        jar.add(session_cookie(session_id)),
        Json(BootstrapResponse {
            session_id: session_id.to_string(),
            fresh: true,
        }),
    ))
}
