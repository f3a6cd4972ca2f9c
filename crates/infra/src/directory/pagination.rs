//! Cursor pagination over the directory's collection endpoints

use dirmirror_core::FetchProgress;
use dirmirror_domain::{MirrorError, RemoteRecord, Result};
use reqwest::{Method, Response};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::link::next_link;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// One decoded page of a collection.
#[derive(Debug, Default)]
pub struct Page {
    pub records: Vec<RemoteRecord>,
    pub next: Option<Url>,
}

/// Follows `rel="next"` links until the collection is exhausted.
#[derive(Clone)]
pub struct PaginatedFetcher {
    http: HttpClient,
}

impl PaginatedFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Read every page of `url` and return the records in arrival order.
    ///
    /// `query` is only sent with the first request; next links already carry
    /// the cursor and the original filter. After each page `progress` gets
    /// the cumulative page and record counts.
    ///
    /// # Errors
    /// Any failure on any page returns the error and drops what was read.
    #[instrument(skip(self, url, query, progress), fields(url = %url))]
    pub async fn fetch_all(
        &self,
        url: Url,
        query: &[(&str, &str)],
        progress: Option<&dyn FetchProgress>,
    ) -> Result<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut pages = 0usize;
        let mut page = self.fetch_page(url, query).await?;

        loop {
            pages += 1;
            records.append(&mut page.records);
            debug!(pages, records = records.len(), "collection page read");
            if let Some(progress) = progress {
                progress.on_page(pages, records.len());
            }

            match page.next.take() {
                Some(next) => page = self.fetch_page(next, &[]).await?,
                None => break,
            }
        }

        Ok(records)
    }

    /// Request a single page.
    ///
    /// # Errors
    /// Returns `MirrorError::RemoteUnavailable` for transport failures,
    /// non-2xx answers and bodies that are neither an array nor an object.
    pub async fn fetch_page(&self, url: Url, query: &[(&str, &str)]) -> Result<Page> {
        let mut request = self.http.request(Method::GET, url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.http.send_expecting_success(request).await?;
        let next = next_link(response.headers(), response.url())?;
        let records = decode_records(response).await?;

        Ok(Page { records, next })
    }
}

/// Decode a response body into records.
///
/// An array is a page; a single object is a page of one; an empty body or
/// `null` is an empty page.
pub async fn decode_records(response: Response) -> Result<Vec<RemoteRecord>> {
    let body = response.bytes().await.map_err(|e| MirrorError::from(InfraError::from(e)))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_slice(&body).map_err(|e| MirrorError::from(InfraError::from(e)))?;

    match value {
        Value::Array(items) => Ok(items.into_iter().map(RemoteRecord::new).collect()),
        Value::Object(_) => Ok(vec![RemoteRecord::new(value)]),
        Value::Null => Ok(Vec::new()),
        other => Err(MirrorError::RemoteUnavailable(format!(
            "expected a JSON array or object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
