//! HTML pages: gallery, product, cart, and checkout summary.

use axum::extract::{Path, State};
use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Serialize;

use printworks_store::{Artwork, Cart};

use super::{decode_title, encode_title, session_from_jar};
use crate::error::{AppError, PageError};
use crate::state::SharedState;
use crate::templates::render;

#[derive(Debug, Serialize)]
struct ArtworkCard {
    title: String,
    image_url: String,
    link: String,
    price: i64,
}

impl ArtworkCard {
    fn from_artwork(artwork: &Artwork) -> Self {
        let slug = encode_title(&artwork.title);
        Self {
            title: artwork.title.clone(),
            image_url: format!("/images/{slug}"),
            link: format!("/shop/{slug}"),
            price: artwork.unit_price,
        }
    }
}

#[derive(Debug, Serialize)]
struct CartLine {
    title: String,
    image_url: String,
    quantity: u32,
    price: i64,
}

/// `GET /` — the gallery.
pub async fn home(State(state): State<SharedState>) -> Result<Html<String>, PageError> {
    let artworks = state.catalog.artworks().await?;
    let cards: Vec<ArtworkCard> = artworks.iter().map(ArtworkCard::from_artwork).collect();
    Ok(render(
        &state.templates,
        "index.html",
        context! { artworks => cards },
    )?)
}

/// `GET /shop/{title}` — one artwork.
pub async fn product(
    State(state): State<SharedState>,
    Path(raw_title): Path<String>,
) -> Result<Html<String>, PageError> {
    let title = decode_title(&raw_title);
    let artwork = state
        .catalog
        .artwork_by_title(&title)
        .await?
        .ok_or_else(|| AppError::not_found("artwork", &title))?;

    Ok(render(
        &state.templates,
        "shop.html",
        context! { artwork => ArtworkCard::from_artwork(&artwork) },
    )?)
}

/// `GET /cart` — the cart page. Stale lines (titles gone upstream,
/// case-insensitive duplicates) are pruned and the pruned cart persisted
/// before rendering.
pub async fn cart_page(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Html<String>, PageError> {
    let cart = pruned_cart(&state, &jar).await?;
    let lines = cart_lines(&cart);
    Ok(render(
        &state.templates,
        "cart.html",
        context! {
            items => lines,
            total_quantity => cart.total_quantity(),
            total_price => cart.total_price(),
        },
    )?)
}

/// `GET /checkout` — order summary feeding the hosted-payment handoff.
pub async fn checkout_page(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<Html<String>, PageError> {
    let cart = pruned_cart(&state, &jar).await?;
    let lines = cart_lines(&cart);
    Ok(render(
        &state.templates,
        "checkout.html",
        context! {
            items => lines,
            total_quantity => cart.total_quantity(),
            total_price => cart.total_price(),
        },
    )?)
}

fn cart_lines(cart: &Cart) -> Vec<CartLine> {
    cart.items()
        .iter()
        .map(|item| CartLine {
            title: item.title.clone(),
            image_url: format!("/images/{}", encode_title(&item.title)),
            quantity: item.quantity,
            price: item.price,
        })
        .collect()
}

/// Load the session cart and reconcile it against the current catalog.
async fn pruned_cart(state: &SharedState, jar: &CookieJar) -> Result<Cart, AppError> {
    let Some(session_id) = session_from_jar(jar) else {
        return Ok(Cart::new());
    };
    let Some(record) = state.sessions.load(session_id).await? else {
        return Ok(Cart::new());
    };

    let artworks = state.catalog.artworks().await?;
    let mut session_state = record.state;
    let removed = session_state
        .cart
        .prune(|title| artworks.iter().any(|a| a.title == title));
    if removed > 0 {
        tracing::info!(session_id = %session_id, removed, "pruned stale cart lines");
        if session_state.cart.is_empty() && !session_state.logged_in {
            state.sessions.delete(session_id).await?;
        } else {
            state.sessions.save(session_id, &session_state).await?;
        }
    }
    Ok(session_state.cart)
}
