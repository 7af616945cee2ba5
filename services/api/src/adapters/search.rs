//! services/api/src/adapters/search.rs
//!
//! Adapters for the two search providers used to turn `SEARCH:` queries into
//! concrete links. Both implement the `SearchService` port from the `core` crate.
//!
//! A provider without credentials still implements the port; every call fails
//! with `PortError::Configuration` and the resolver falls back to a results page.

use async_trait::async_trait;
use pathora_core::ports::{PortError, PortResult, SearchHit, SearchService};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const GOOGLE_APIS_BASE: &str = "https://www.googleapis.com";

fn provider_error(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("search request failed: {}", e))
}

//=========================================================================================
// YouTube Data API
//=========================================================================================

#[derive(Deserialize)]
struct YouTubeSearchResponse {
    #[serde(default)]
    items: Vec<YouTubeItem>,
}

#[derive(Deserialize)]
struct YouTubeItem {
    id: YouTubeItemId,
    snippet: Option<YouTubeSnippet>,
}

#[derive(Deserialize)]
struct YouTubeItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct YouTubeSnippet {
    title: Option<String>,
}

/// Finds videos through the YouTube Data API v3 `search` endpoint.
#[derive(Clone)]
pub struct YouTubeSearchAdapter {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeSearchAdapter {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: GOOGLE_APIS_BASE.to_string(),
        }
    }

    /// Points the adapter at another host, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchService for YouTubeSearchAdapter {
    async fn search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Configuration("YOUTUBE_API_KEY is not set".to_string()))?;

        let max_results = limit.to_string();
        let response = self
            .http
            .get(format!("{}/youtube/v3/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?;

        let body: YouTubeSearchResponse = response.json().await.map_err(provider_error)?;
        let hits: Vec<SearchHit> = body
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(SearchHit {
                    title: item.snippet.and_then(|s| s.title),
                    link: format!("https://www.youtube.com/watch?v={}", video_id),
                })
            })
            .take(limit as usize)
            .collect();

        debug!("YouTube search for '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }
}

//=========================================================================================
// Google Custom Search JSON API
//=========================================================================================

#[derive(Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Deserialize)]
struct CustomSearchItem {
    title: Option<String>,
    link: Option<String>,
}

/// Finds web pages through a Google Programmable Search engine.
#[derive(Clone)]
pub struct GoogleSearchAdapter {
    http: Client,
    credentials: Option<(String, String)>,
    base_url: String,
}

impl GoogleSearchAdapter {
    /// `credentials` is the API key and the search engine id.
    pub fn new(http: Client, credentials: Option<(String, String)>) -> Self {
        Self {
            http,
            credentials,
            base_url: GOOGLE_APIS_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchService for GoogleSearchAdapter {
    async fn search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>> {
        let (api_key, engine_id) = self.credentials.as_ref().ok_or_else(|| {
            PortError::Configuration("Google search credentials are not set".to_string())
        })?;

        // The API caps `num` at 10.
        let num = limit.clamp(1, 10).to_string();
        let response = self
            .http
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?;

        let body: CustomSearchResponse = response.json().await.map_err(provider_error)?;
        let hits: Vec<SearchHit> = body
            .items
            .into_iter()
            .filter_map(|item| {
                Some(SearchHit {
                    title: item.title,
                    link: item.link?,
                })
            })
            .take(limit as usize)
            .collect();

        debug!("Web search for '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }
}
