//! Typed HTTP client for the card API.
//!
//! Mirrors the browser fetch helpers: listing, search and single-card lookup.
//! Card text served by the API keeps the literal `\n` escapes found in the
//! source data; [`CardClient::fetch_card`] turns them into real newlines.

use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::models::{Card, CardPage};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    BaseUrl(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("card API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Replace literal two-character `\n` sequences with newlines.
pub fn normalize_card_text(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Client bound to one card API base URL.
#[derive(Debug, Clone)]
pub struct CardClient {
    base_url: Url,
    http: reqwest::Client,
}

impl CardClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|err| ClientError::BaseUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }
        Ok(Self { base_url, http })
    }

    /// Build `<base>/api/card/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "card"])
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_all_cards(&self, page: u32, limit: u32) -> Result<CardPage, ClientError> {
        let url = self.endpoint(&["all", &page.to_string(), &limit.to_string()])?;
        let response = error_for_status(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Fetch one card, returning `None` when the API answers 404.
    pub async fn fetch_card(&self, uuid: &str) -> Result<Option<Card>, ClientError> {
        let url = self.endpoint(&[uuid])?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let mut card: Card = error_for_status(response).await?.json().await?;
        card.text = card.text.as_deref().map(normalize_card_text);
        Ok(Some(card))
    }

    pub async fn search_cards(
        &self,
        name: &str,
        page: u32,
        limit: u32,
    ) -> Result<CardPage, ClientError> {
        let url = self.endpoint(&["search", name, &page.to_string(), &limit.to_string()])?;
        let response = error_for_status(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}
