//! Library of Congress JSON API client.
//!
//! Search results are paged; each page names the URL of the next one in
//! `pagination.next`. The client walks those links from the collection's
//! first page until the API stops returning a link or the page limit is hit.
//!
//! # Architecture
//!
//! - [`PageSource`]: fetches and decodes one page given its URL
//! - [`HttpPageSource`]: the `reqwest` implementation used at runtime
//! - [`fetch_collection`]: the paging loop, generic over any [`PageSource`]
//!
//! Requests are not retried. A transport error, a non-200 status or an
//! undecodable body ends the fetch with an error.

use crate::error::{EtlError, Result};
use crate::models::LocPage;
use crate::utils::truncate_for_log;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};
use url::Url;

/// Something that can produce a decoded results page for a URL.
pub trait PageSource {
    async fn fetch_page(&self, url: &str) -> Result<LocPage>;
}

/// Fetches pages over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<LocPage> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!(%url, status = status.as_u16(), "Request failed");
            return Err(EtlError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = body.len(), "Fetched page");
        serde_json::from_str(&body).map_err(|e| {
            error!(%url, error = %e, body = %truncate_for_log(&body, 300), "Page is not valid JSON");
            EtlError::Json(e)
        })
    }
}

/// URL of the first results page for `collection`, e.g.
/// `https://www.loc.gov/newspapers/?fo=json`.
pub fn first_page_url(api_base: &str, collection: &str) -> Result<String> {
    let base = Url::parse(api_base)
        .map_err(|e| EtlError::Config(format!("api_base {:?}: {}", api_base, e)))?;
    let path = format!("{}/", urlencoding::encode(collection));
    let mut url = base
        .join(&path)
        .map_err(|e| EtlError::Config(format!("collection {:?}: {}", collection, e)))?;
    url.set_query(Some("fo=json"));
    Ok(url.to_string())
}

/// Follow `pagination.next` from `start_url`, collecting every result record.
///
/// At most `max_pages` pages are requested, with `delay` between requests.
#[instrument(level = "info", skip(source, delay))]
pub async fn fetch_collection<S: PageSource>(
    source: &S,
    start_url: &str,
    max_pages: usize,
    delay: Duration,
) -> Result<Vec<Value>> {
    info!(max_pages, "Starting API fetch");
    let mut url = Some(start_url.to_string());
    let mut records = Vec::new();

    for page in 1..=max_pages {
        let Some(current) = url.take() else {
            break;
        };
        if page > 1 && !delay.is_zero() {
            sleep(delay).await;
        }

        info!(page, url = %current, "Fetching page");
        let LocPage {
            results,
            pagination,
        } = source.fetch_page(&current).await?;
        info!(page, count = results.len(), "Retrieved results");
        records.extend(results);

        url = pagination.next.filter(|next| !next.is_empty());
        if url.is_none() {
            info!(page, "No more pages returned by API");
        }
    }

    info!(total = records.len(), "API fetch complete");
    Ok(records)
}
