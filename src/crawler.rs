use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use tracing::{info, warn};

use crate::model::SummaryRecord;
use crate::parser::listing;
use crate::text::build_list_url;

// The upstream site rejects bare clients, so requests carry a browser UA
// and a referer.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";
const REFERER_URL: &str = "https://www.kaa.org.tw/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for listing and detail fetches.
pub fn build_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// GET a page and return its body. Non-2xx statuses are errors.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request failed: {url}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("failed to fetch {url}: {status}");
    }

    response
        .text()
        .await
        .with_context(|| format!("failed to read body: {url}"))
}

/// Everything a full listing crawl produced.
pub struct ListingCrawl {
    pub records: Vec<SummaryRecord>,
    pub reported_total: Option<u64>,
}

/// Walk the paginated listing from page 1 until the last reported page or
/// the page cap. The reported page count is refreshed from every page that
/// parses; a page that fails to fetch or parse is logged and skipped, so one
/// bad page never aborts the crawl.
pub async fn crawl_listing(client: &Client, page_cap: Option<u64>) -> ListingCrawl {
    let mut records = Vec::new();
    let mut reported_total = None;
    let mut total_pages: u64 = 1;
    let mut page: u64 = 1;

    while page <= total_pages {
        if let Some(cap) = page_cap {
            if page > cap {
                info!("Reached page cap ({cap}), stopping early");
                break;
            }
        }

        let url = build_list_url(page);
        let parsed = match fetch_page(client, &url).await {
            Ok(html) => listing::parse_list(&html),
            Err(err) => Err(err),
        };

        let list_page = match parsed {
            Ok(list_page) => list_page,
            Err(err) => {
                warn!("Skipping listing page {page}: {err:#}");
                page += 1;
                continue;
            }
        };

        if reported_total.is_none() {
            if let Some(total) = list_page.pagination.total_records {
                info!(
                    "Listing summary: {total} records across {} pages",
                    list_page.pagination.total_pages
                );
                reported_total = Some(total);
            }
        }

        total_pages = list_page.pagination.total_pages.max(1);
        info!(
            "Parsed page {page}/{total_pages} ({} records)",
            list_page.records.len()
        );
        records.extend(list_page.records);
        page += 1;
    }

    ListingCrawl {
        records,
        reported_total,
    }
}
