//! Google-Shopping-compatible product feed.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use printworks_store::Artwork;

use super::encode_title;
use crate::error::AppError;
use crate::state::SharedState;

/// `GET /feed/google` — the catalog as a Google Shopping RSS feed.
pub async fn google_feed(State(state): State<SharedState>) -> Result<Response, AppError> {
    let artworks = state.catalog.artworks().await?;
    let xml = render_feed(&state.config.public_base_url, &artworks)?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

fn render_feed(base_url: &str, artworks: &[Artwork]) -> Result<String, AppError> {
    let mut writer = Writer::new(Vec::new());
    let err = |e: &dyn std::fmt::Display| AppError::internal(format!("feed rendering failed: {e}"));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(|e| err(&e))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:g", "http://base.google.com/ns/1.0"));
    writer.write_event(Event::Start(rss)).map_err(|e| err(&e))?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .map_err(|e| err(&e))?;

    write_text(&mut writer, "title", "Printworks")?;
    write_text(&mut writer, "link", base_url)?;
    write_text(&mut writer, "description", "Art prints")?;

    for artwork in artworks {
        let slug = encode_title(&artwork.title);
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .map_err(|e| err(&e))?;
        write_text(&mut writer, "g:id", &artwork.id.to_string())?;
        write_text(&mut writer, "g:title", &artwork.title)?;
        write_text(&mut writer, "g:link", &format!("{base_url}/shop/{slug}"))?;
        write_text(&mut writer, "g:image_link", &format!("{base_url}/images/{slug}"))?;
        write_text(&mut writer, "g:price", &format!("{}.00 USD", artwork.unit_price))?;
        write_text(&mut writer, "g:availability", "in stock")?;
        write_text(&mut writer, "g:condition", "new")?;
        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .map_err(|e| err(&e))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .map_err(|e| err(&e))?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .map_err(|e| err(&e))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| AppError::internal(format!("feed rendering failed: {e}")))
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), AppError> {
    let err = |e: &dyn std::fmt::Display| AppError::internal(format!("feed rendering failed: {e}"));
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|e| err(&e))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| err(&e))?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| err(&e))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn artwork(id: i64, title: &str, unit_price: i64) -> Artwork {
        Artwork {
            id,
            title: title.to_string(),
            path: format!("download/{title}.png"),
            signed_path: None,
            unit_price,
            updated_at: None,
        }
    }

    #[test]
    fn feed_lists_every_artwork_with_google_fields() {
        let xml = render_feed(
            "https://prints.example",
            &[artwork(1, "Sunset", 225), artwork(2, "Golden Hour", 300)],
        )
        .unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("xmlns:g=\"http://base.google.com/ns/1.0\""));
        assert!(xml.contains("<g:title>Sunset</g:title>"));
        assert!(xml.contains("<g:price>225.00 USD</g:price>"));
        assert!(xml.contains("<g:link>https://prints.example/shop/Golden+Hour</g:link>"));
        assert!(xml.contains("<g:availability>in stock</g:availability>"));
        assert_eq!(xml.matches("<item>").count(), 2);
    }

    #[test]
    fn feed_escapes_markup_in_titles() {
        let xml = render_feed("https://prints.example", &[artwork(1, "Sun & Sea", 225)]).unwrap();
        assert!(xml.contains("Sun &amp; Sea"));
    }
}
