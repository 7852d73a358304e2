//! Network collaborator: catalog, lot detail and order submission.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::LotId,
    error::ApiError,
    protocol::{ListResponse, LotDetail, LotSummary, OrderConfirmation, OrderRequest},
};
use tracing::debug;
use url::Url;

use crate::lot::LotItem;

#[async_trait]
pub trait AuctionApi: Send + Sync {
    async fn get_lot_list(&self) -> Result<Vec<LotItem>>;
    async fn get_lot_item(&self, id: &LotId) -> Result<LotDetail>;
    async fn order_lots(&self, order: &OrderRequest) -> Result<OrderConfirmation>;
}

pub struct HttpAuctionApi {
    http: Client,
    api_url: Url,
    cdn_url: String,
}

impl HttpAuctionApi {
    pub fn new(api_url: &str, cdn_url: impl Into<String>) -> Result<Self> {
        Self::with_client(Client::new(), api_url, cdn_url)
    }

    pub fn with_client(http: Client, api_url: &str, cdn_url: impl Into<String>) -> Result<Self> {
        let mut api_url =
            Url::parse(api_url).with_context(|| format!("invalid API url '{api_url}'"))?;
        // Url::join replaces the last segment unless the base ends in '/'.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self {
            http,
            api_url,
            cdn_url: cdn_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .with_context(|| format!("failed to build endpoint url for '{path}'"))
    }

    fn image_url(&self, image: &str) -> String {
        if image.starts_with("http://") || image.starts_with("https://") {
            return image.to_string();
        }
        format!(
            "{}/{}",
            self.cdn_url.trim_end_matches('/'),
            image.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl AuctionApi for HttpAuctionApi {
    async fn get_lot_list(&self) -> Result<Vec<LotItem>> {
        let response = self.http.get(self.endpoint("lot")?).send().await?;
        let list: ListResponse<LotSummary> = read_json(response, "lot list").await?;
        debug!(total = list.total, received = list.items.len(), "fetched lot list");
        Ok(list
            .items
            .into_iter()
            .map(|mut summary| {
                summary.image = self.image_url(&summary.image);
                LotItem::from_summary(summary)
            })
            .collect())
    }

    async fn get_lot_item(&self, id: &LotId) -> Result<LotDetail> {
        let url = self.endpoint(&format!("lot/{id}"))?;
        let response = self.http.get(url).send().await?;
        read_json(response, "lot detail").await
    }

    async fn order_lots(&self, order: &OrderRequest) -> Result<OrderConfirmation> {
        let response = self
            .http
            .post(self.endpoint("order")?)
            .json(order)
            .send()
            .await?;
        read_json(response, "order").await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
            return Err(api_error.with_status(status.as_u16()))
                .with_context(|| format!("{what} request failed with status {status}"));
        }
        return Err(anyhow!("{what} request failed with status {status}: {body}"));
    }
    response
        .json()
        .await
        .with_context(|| format!("failed to decode {what} response"))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
