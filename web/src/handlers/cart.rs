//! JSON cart API.
//!
//! Mutations are read-modify-write against the session row: load the cart,
//! reconcile the requested change, persist the whole cart back. The session
//! row (and cookie) is created on the first mutating request and deleted as
//! soon as the cart empties.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use printworks_store::{SessionId, SessionState};

use super::{clear_session_cookie, session_cookie, session_from_jar};
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub title: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct TotalBody {
    #[serde(rename = "totalPrice")]
    pub total_price: i64,
}

#[derive(Debug, Serialize)]
pub struct QuantityResponse {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TotalResponse {
    #[serde(rename = "totalPrice")]
    pub total_price: i64,
}

/// `POST /cart/items` — add `quantity` units of a title, creating the
/// session on first use.
pub async fn add_item(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(body): Json<AddItem>,
) -> Result<(CookieJar, Json<QuantityResponse>), AppError> {
    let unit_price = state
        .catalog
        .unit_price(&body.title)
        .await?
        .ok_or_else(|| AppError::not_found("artwork", &body.title))?;

    let (session_id, mut session_state, jar) = match session_from_jar(&jar) {
        Some(id) => {
            let session_state = state
                .sessions
                .load(id)
                .await?
                .map(|record| record.state)
                .unwrap_or_default();
            (id, session_state, jar)
        }
        None => {
            let id = SessionId::new();
            (id, SessionState::default(), jar.add(session_cookie(id)))
        }
    };

    session_state.cart.add(&body.title, body.quantity, unit_price)?;
    state.sessions.save(session_id, &session_state).await?;

    let quantity = session_state.cart.total_quantity();
    tracing::info!(
        session_id = %session_id,
        title = %body.title,
        added = body.quantity,
        total = quantity,
        "added to cart"
    );
    Ok((jar, Json(QuantityResponse { quantity })))
}

/// `POST /cart/increase` — bump one line by a single unit.
pub async fn increase(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(body): Json<TitleBody>,
) -> Result<Json<PriceResponse>, AppError> {
    let (session_id, mut record) = require_session(&state, &jar).await?;
    let unit_price = state
        .catalog
        .unit_price(&body.title)
        .await?
        .ok_or_else(|| AppError::not_found("artwork", &body.title))?;

    let price = record.cart.increase(&body.title, unit_price)?;
    state.sessions.save(session_id, &record).await?;
    Ok(Json(PriceResponse { price }))
}

/// `POST /cart/decrease` — drop one line by a single unit; the line goes
/// away at zero, and an emptied cart deletes the session row and cookie.
pub async fn decrease(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(body): Json<TitleBody>,
) -> Result<(CookieJar, Json<PriceResponse>), AppError> {
    let (session_id, mut record) = require_session(&state, &jar).await?;
    let unit_price = state
        .catalog
        .unit_price(&body.title)
        .await?
        .ok_or_else(|| AppError::not_found("artwork", &body.title))?;

    let price = record.cart.decrease(&body.title, unit_price)?;
    let jar = persist_or_clear(&state, session_id, record, jar).await?;
    Ok((jar, Json(PriceResponse { price })))
}

/// `POST /cart/delete` — remove a line regardless of quantity.
pub async fn delete_item(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(body): Json<TitleBody>,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let (session_id, mut record) = require_session(&state, &jar).await?;
    record.cart.remove(&body.title)?;
    let jar = persist_or_clear(&state, session_id, record, jar).await?;
    tracing::info!(session_id = %session_id, title = %body.title, "removed from cart");
    Ok((
        jar,
        Json(MessageResponse {
            message: "Item removed from cart",
        }),
    ))
}

/// `GET /cart/quantity` — sum of line quantities; zero with no session.
pub async fn quantity(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Json<QuantityResponse>, AppError> {
    let quantity = match session_from_jar(&jar) {
        Some(id) => state
            .sessions
            .load(id)
            .await?
            .map(|record| record.state.cart.total_quantity())
            .unwrap_or(0),
        None => 0,
    };
    Ok(Json(QuantityResponse { quantity }))
}

/// `POST /cart/validate_total` — confirm a client-computed total against
/// the persisted cart before checkout.
pub async fn validate_total(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(body): Json<TotalBody>,
) -> Result<Json<TotalResponse>, AppError> {
    let (_, record) = require_session(&state, &jar).await?;
    let total_price = record.cart.total_price();
    if total_price != body.total_price {
        tracing::warn!(
            claimed = body.total_price,
            actual = total_price,
            "total price mismatch"
        );
        return Err(AppError::bad_request("Total price does not match"));
    }
    Ok(Json(TotalResponse { total_price }))
}

/// Resolve the request's session or answer 400.
async fn require_session(
    state: &SharedState,
    jar: &CookieJar,
) -> Result<(SessionId, SessionState), AppError> {
    let session_id =
        session_from_jar(jar).ok_or_else(|| AppError::bad_request("no active session"))?;
    let record = state
        .sessions
        .load(session_id)
        .await?
        .ok_or_else(|| AppError::bad_request("no active session"))?;
    Ok((session_id, record.state))
}

/// Save the session, or delete it (row and cookie) when the cart emptied.
async fn persist_or_clear(
    state: &SharedState,
    session_id: SessionId,
    record: SessionState,
    jar: CookieJar,
) -> Result<CookieJar, AppError> {
    if record.cart.is_empty() {
        state.sessions.delete(session_id).await?;
        tracing::info!(session_id = %session_id, "cart emptied; session deleted");
        return Ok(clear_session_cookie(jar));
    }
    state.sessions.save(session_id, &record).await?;
    Ok(jar)
}
