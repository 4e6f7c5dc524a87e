//! HTTP request handlers, organized by surface: HTML pages, the JSON cart
//! API, checkout, the session bootstrap, the product feed, image streaming,
//! the admin portal, and the mailing list.

pub mod cart;
pub mod checkout;
pub mod feed;
pub mod images;
pub mod pages;
pub mod portal;
pub mod session;
pub mod subscribe;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use printworks_store::SessionId;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Titles appear in URLs with `+` standing in for spaces.
pub(crate) fn encode_title(title: &str) -> String {
    title.replace(' ', "+")
}

pub(crate) fn decode_title(raw: &str) -> String {
    raw.replace('+', " ")
}

pub(crate) fn session_cookie(session_id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// The session id from the request cookie, if one is present and parses.
pub(crate) fn session_from_jar(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()))
}

/// Queue removal of the session cookie (path must match the set cookie).
pub(crate) fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    jar.remove(removal)
}
