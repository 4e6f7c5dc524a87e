//! Mailing-list signup.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use printworks_store::rows::SubscriberRow;

use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
}

/// `POST /subscribe` — add an email to the mailing-list table, once.
pub async fn subscribe(
    State(state): State<SharedState>,
    Json(body): Json<SubscribeBody>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email address is required"));
    }

    let existing: Vec<SubscriberRow> = state
        .store
        .list_rows(&state.config.subscribers_table)
        .await?;
    if existing
        .iter()
        .any(|row| row.email.eq_ignore_ascii_case(email))
    {
        return Ok(Json(SubscribeResponse {
            message: "Email already subscribed",
        }));
    }

    state
        .store
        .create_row(
            &state.config.subscribers_table,
            &serde_json::json!({ "email": email }),
        )
        .await?;
    tracing::info!(email = %email, "new mailing-list subscriber");
    Ok(Json(SubscribeResponse {
        message: "Email subscribed successfully",
    }))
}
