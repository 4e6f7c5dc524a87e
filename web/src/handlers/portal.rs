//! Admin portal: login, logout, and artwork uploads.
//!
//! The portal flag lives in the same session row as the cart, mirroring the
//! rest of the session model. Credentials come from configuration; there is
//! no user table.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Deserialize;

use printworks_store::SessionId;
use printworks_store::rows::{ArtworkRow, ImageRef};

use super::{clear_session_cookie, decode_title, session_cookie, session_from_jar};
use crate::error::{AppError, PageError};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `GET /portal` — the login page.
pub async fn login_page(State(state): State<SharedState>) -> Result<Html<String>, PageError> {
    Ok(crate::templates::render(
        &state.templates,
        "login.html",
        context! {},
    )?)
}

/// `POST /portal/login` — check credentials and mark the session.
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Redirect), AppError> {
    if credentials.username != state.config.admin_username
        || credentials.password != state.config.admin_password
    {
        tracing::warn!(username = %credentials.username, "rejected portal login");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let (session_id, jar) = match session_from_jar(&jar) {
        Some(id) => (id, jar),
        None => {
            let id = SessionId::new();
            (id, jar.add(session_cookie(id)))
        }
    };
    let mut session_state = state
        .sessions
        .load(session_id)
        .await?
        .map(|record| record.state)
        .unwrap_or_default();
    session_state.logged_in = true;
    state.sessions.save(session_id, &session_state).await?;

    tracing::info!(session_id = %session_id, "portal login");
    Ok((jar, Redirect::to("/portal/admin")))
}

/// `POST /portal/logout` — drop the session row and cookie.
pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(session_id) = session_from_jar(&jar) {
        state.sessions.delete(session_id).await?;
        tracing::info!(session_id = %session_id, "portal logout");
    }
    Ok((clear_session_cookie(jar), Redirect::to("/")))
}

/// `GET /portal/admin` — the upload console; bounces to `/portal` when not
/// logged in.
pub async fn admin_page(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Response, PageError> {
    if !is_logged_in(&state, &jar).await? {
        return Ok(Redirect::to("/portal").into_response());
    }
    let html = crate::templates::render(&state.templates, "portal.html", context! {})?;
    Ok(html.into_response())
}

/// `POST /portal/images` — upload a new artwork (multipart `title`,
/// `price`, `file`).
pub async fn add_image(
    State(state): State<SharedState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &jar).await?;
    let upload = read_upload(multipart).await?;
    let title = upload.title.clone();

    let stored = store_image(&state, &upload).await?;
    state
        .store
        .create_row(
            &state.config.artwork_table,
            &serde_json::json!({
                "img_label": title,
                "price": upload.price.unwrap_or_else(|| "0".to_string()),
                "img": serde_json::to_string(&[stored]).unwrap_or_default(),
            }),
        )
        .await?;

    tracing::info!(title = %title, "added artwork");
    Ok(Json(serde_json::json!({ "message": "Image added successfully" })))
}

/// `PUT /portal/images/{title}` — swap an existing artwork's image (and
/// optionally retitle it).
pub async fn swap_image(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(raw_title): Path<String>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &jar).await?;
    let title = decode_title(&raw_title);

    let rows: Vec<ArtworkRow> = state.store.list_rows(&state.config.artwork_table).await?;
    let row = rows
        .iter()
        .find(|row| row.img_label.to_lowercase().contains(&title.to_lowercase()))
        .ok_or_else(|| AppError::not_found("artwork", &title))?;

    let upload = read_upload(multipart).await?;
    let new_title = if upload.title.is_empty() {
        row.img_label.clone()
    } else {
        upload.title.clone()
    };

    let stored = store_image(&state, &upload).await?;
    state
        .store
        .update_row(
            &state.config.artwork_table,
            &serde_json::json!({
                "Id": row.id,
                "img_label": new_title,
                "img": serde_json::to_string(&[stored]).unwrap_or_default(),
            }),
        )
        .await?;

    tracing::info!(from = %row.img_label, to = %new_title, "swapped artwork image");
    Ok(Json(serde_json::json!({ "message": "Image swapped successfully" })))
}

struct Upload {
    title: String,
    price: Option<String>,
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut title = String::new();
    let mut price = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("malformed upload: {e}")))?;
            }
            "price" => {
                price = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::bad_request(format!("malformed upload: {e}")))?,
                );
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "upload.png".to_string());
                let mime = field
                    .content_type()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "image/png".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("malformed upload: {e}")))?
                    .to_vec();
                file = Some((file_name, mime, bytes));
            }
            _ => {}
        }
    }

    let (file_name, mime, bytes) =
        file.ok_or_else(|| AppError::bad_request("upload is missing a file"))?;
    Ok(Upload {
        title,
        price,
        file_name,
        mime,
        bytes,
    })
}

async fn store_image(state: &SharedState, upload: &Upload) -> Result<ImageRef, AppError> {
    let uploaded = state
        .store
        .upload_attachment(&upload.file_name, upload.bytes.clone(), &upload.mime)
        .await?;
    Ok(ImageRef {
        path: uploaded.path,
        signed_path: uploaded.signed_path,
        title: Some(upload.file_name.clone()),
        mimetype: Some(upload.mime.clone()),
    })
}

async fn is_logged_in(state: &SharedState, jar: &CookieJar) -> Result<bool, AppError> {
    let Some(session_id) = session_from_jar(jar) else {
        return Ok(false);
    };
    Ok(state
        .sessions
        .load(session_id)
        .await?
        .map(|record| record.state.logged_in)
        .unwrap_or(false))
}

async fn require_admin(state: &SharedState, jar: &CookieJar) -> Result<(), AppError> {
    if is_logged_in(state, jar).await? {
        Ok(())
    } else {
        Err(AppError::unauthorized("portal login required"))
    }
}
