//! Stripe implementation of the [`PaymentProcessor`] seam.
//!
//! Stripe's API takes form-encoded bodies with bracketed keys for nested
//! fields (`default_price_data[unit_amount]`, `line_items[0][price]`) and
//! answers JSON with list envelopes of the shape `{"data": [...]}`. File
//! uploads go to a separate files host.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ProcessorError;
use crate::processor::{
    FileLink, LineItem, PaymentLink, PaymentProcessor, ProcessorFile, ProcessorFuture,
    ProcessorPrice, ProcessorProduct, ProcessorResult,
};

const API_URL: &str = "https://api.stripe.com/v1";
const FILES_URL: &str = "https://files.stripe.com/v1";

/// Products fetched per listing call; one page covers the whole catalog.
const PRODUCT_LIST_LIMIT: u32 = 100;

#[derive(Debug, serde::Deserialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_url: String,
    files_url: String,
}

impl StripeClient {
    /// Create a client authenticating with `secret_key`.
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            api_url: API_URL.to_string(),
            files_url: FILES_URL.to_string(),
        }
    }

    /// Point the client at different hosts (tests).
    #[must_use]
    pub fn with_urls(mut self, api_url: impl Into<String>, files_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.files_url = files_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProcessorResult<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await
            .map_err(|e| ProcessorError::RequestFailed(e.to_string()))?;
        decode(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> ProcessorResult<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| ProcessorError::RequestFailed(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ProcessorResult<T> {
    match response.status() {
        status if status.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| ProcessorError::ParseFailed(e.to_string())),
        StatusCode::UNAUTHORIZED => Err(ProcessorError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(ProcessorError::RateLimited),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(ProcessorError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

fn owned(pairs: &[(&str, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

impl PaymentProcessor for StripeClient {
    fn list_products(&self) -> ProcessorFuture<'_, Vec<ProcessorProduct>> {
        Box::pin(async move {
            let envelope: ListEnvelope<ProcessorProduct> = self
                .get_json(
                    "/products",
                    &[
                        ("active", "true".to_string()),
                        ("limit", PRODUCT_LIST_LIMIT.to_string()),
                    ],
                )
                .await?;
            Ok(envelope.data)
        })
    }

    fn list_prices<'a>(&'a self, product_id: &'a str) -> ProcessorFuture<'a, Vec<ProcessorPrice>> {
        Box::pin(async move {
            let envelope: ListEnvelope<ProcessorPrice> = self
                .get_json(
                    "/prices",
                    &[
                        ("product", product_id.to_string()),
                        ("limit", PRODUCT_LIST_LIMIT.to_string()),
                    ],
                )
                .await?;
            Ok(envelope.data)
        })
    }

    fn retrieve_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ProcessorPrice> {
        Box::pin(async move { self.get_json(&format!("/prices/{price_id}"), &[]).await })
    }

    fn create_product<'a>(
        &'a self,
        name: &'a str,
        unit_amount: i64,
        image_url: &'a str,
    ) -> ProcessorFuture<'a, ProcessorProduct> {
        Box::pin(async move {
            let form = owned(&[
                ("name", name.to_string()),
                ("tax_code", "txcd_99999999".to_string()),
                ("shippable", "true".to_string()),
                ("images[0]", image_url.to_string()),
                ("default_price_data[currency]", "usd".to_string()),
                ("default_price_data[unit_amount]", unit_amount.to_string()),
                ("default_price_data[tax_behavior]", "exclusive".to_string()),
            ]);
            self.post_form("/products", &form).await
        })
    }

    fn create_price<'a>(
        &'a self,
        product_id: &'a str,
        unit_amount: i64,
    ) -> ProcessorFuture<'a, ProcessorPrice> {
        Box::pin(async move {
            let form = owned(&[
                ("product", product_id.to_string()),
                ("unit_amount", unit_amount.to_string()),
                ("currency", "usd".to_string()),
            ]);
            self.post_form("/prices", &form).await
        })
    }

    fn set_default_price<'a>(
        &'a self,
        product_id: &'a str,
        price_id: &'a str,
    ) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let form = owned(&[("default_price", price_id.to_string())]);
            let _: ProcessorProduct = self
                .post_form(&format!("/products/{product_id}"), &form)
                .await?;
            Ok(())
        })
    }

    fn archive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let form = owned(&[("active", "false".to_string())]);
            let _: ProcessorPrice = self.post_form(&format!("/prices/{price_id}"), &form).await?;
            Ok(())
        })
    }

    fn unarchive_price<'a>(&'a self, price_id: &'a str) -> ProcessorFuture<'a, ()> {
        Box::pin(async move {
            let form = owned(&[("active", "true".to_string())]);
            let _: ProcessorPrice = self.post_form(&format!("/prices/{price_id}"), &form).await?;
            Ok(())
        })
    }

    fn upload_file<'a>(
        &'a self,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> ProcessorFuture<'a, ProcessorFile> {
        Box::pin(async move {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str("image/png")
                .map_err(|e| ProcessorError::RequestFailed(e.to_string()))?;
            let form = reqwest::multipart::Form::new()
                .text("purpose", "product_image")
                .part("file", part);

            let response = self
                .client
                .post(format!("{}/files", self.files_url))
                .bearer_auth(&self.secret_key)
                .multipart(form)
                .send()
                .await
                .map_err(|e| ProcessorError::RequestFailed(e.to_string()))?;
            decode(response).await
        })
    }

    fn create_file_link<'a>(&'a self, file_id: &'a str) -> ProcessorFuture<'a, FileLink> {
        Box::pin(async move {
            let form = owned(&[("file", file_id.to_string())]);
            self.post_form("/file_links", &form).await
        })
    }

    fn create_payment_link<'a>(
        &'a self,
        line_items: &'a [LineItem],
    ) -> ProcessorFuture<'a, PaymentLink> {
        Box::pin(async move {
            let mut form = Vec::with_capacity(line_items.len() * 2);
            for (index, item) in line_items.iter().enumerate() {
                form.push((format!("line_items[{index}][price]"), item.price.clone()));
                form.push((
                    format!("line_items[{index}][quantity]"),
                    item.quantity.to_string(),
                ));
            }
            self.post_form("/payment_links", &form).await
        })
    }
}
