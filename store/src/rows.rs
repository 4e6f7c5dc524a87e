//! Wire-level row types for the table-store tables.
//!
//! Field names mirror the upstream columns exactly (`img_label`, `img`,
//! `sessionids`, …) so the rows round-trip without translation layers. The
//! `img` column is a JSON-encoded array of attachment objects stored as a
//! string by the spreadsheet UI; [`crate::catalog`] decodes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One attachment reference inside a row's `img` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Storage path of the uploaded file.
    pub path: String,
    /// Pre-signed fetch path, when the upstream issued one.
    #[serde(rename = "signedPath", skip_serializing_if = "Option::is_none")]
    pub signed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

/// Artwork table row.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtworkRow {
    #[serde(rename = "Id")]
    pub id: i64,
    pub img_label: String,
    /// JSON-encoded array of [`ImageRef`].
    pub img: String,
    /// Unit price in whole currency units, stored as text upstream.
    pub price: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Icon table row (site chrome images; no price).
#[derive(Debug, Clone, Deserialize)]
pub struct IconRow {
    #[serde(rename = "Id")]
    pub id: i64,
    pub img_label: String,
    /// JSON-encoded array of [`ImageRef`].
    pub img: String,
}

/// Deployment key/value row.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRow {
    pub envvar: String,
    pub envval: String,
}

/// Session table row. The `cookies` column holds the JSON session payload
/// (`img_quantity_list` plus the portal `logged_in` flag).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRow {
    #[serde(rename = "Id")]
    pub id: i64,
    pub sessionids: String,
    pub cookies: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Mailing-list subscriber row.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriberRow {
    #[serde(rename = "Id")]
    pub id: i64,
    pub email: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn artwork_row_decodes_upstream_shape() {
        let row: ArtworkRow = serde_json::from_value(serde_json::json!({
            "Id": 7,
            "img_label": "Sunset",
            "img": "[{\"path\": \"download/sunset.png\", \"signedPath\": \"dltemp/abc/sunset.png\"}]",
            "price": "225",
            "created_at": "2024-05-01 10:00:00+00:00",
            "updated_at": "2024-06-01 10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.img_label, "Sunset");
        assert_eq!(row.price, "225");

        let images: Vec<ImageRef> = serde_json::from_str(&row.img).unwrap();
        assert_eq!(images[0].path, "download/sunset.png");
        assert_eq!(images[0].signed_path.as_deref(), Some("dltemp/abc/sunset.png"));
    }

    #[test]
    fn session_row_decodes_json_cookies() {
        let row: SessionRow = serde_json::from_value(serde_json::json!({
            "Id": 3,
            "sessionids": "0b9f4c1e-8f54-4f8e-9d6a-0f3f6a6a2a11",
            "cookies": {"img_quantity_list": [], "logged_in": false},
            "created_at": "2024-06-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.id, 3);
        assert!(row.cookies.get("img_quantity_list").is_some());
    }
}
