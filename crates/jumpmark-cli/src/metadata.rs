//! Page title fetching
//!
//! Fetches the destination's title when `add` is run without `--title`.

use anyhow::Result;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

/// Fetch the title of the page at `url`
///
/// Returns `None` on any failure (graceful degradation).
pub async fn fetch_title(url: &str) -> Option<String> {
    match fetch_title_inner(url).await {
        Ok(title) => title,
        Err(e) => {
            debug!("Title fetch for {} failed: {}", url, e);
            None
        }
    }
}

/// Inner fetch function that can fail
async fn fetch_title_inner(url: &str) -> Result<Option<String>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT))
        .user_agent(concat!("Mozilla/5.0 (compatible; Jumpmark/", env!("CARGO_PKG_VERSION"), ")"))
        .build()?;

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Ok(None);
    }

    let html = response.text().await?;
    Ok(parse_title(&html))
}

/// Extract a title from HTML
///
/// Prefers `og:title`, then `twitter:title`, then the `<title>` element.
fn parse_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(og_title) = extract_meta_content(&document, "og:title") {
        return Some(og_title);
    }

    if let Some(twitter_title) = extract_meta_content(&document, "twitter:title") {
        return Some(twitter_title);
    }

    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extract content from a meta tag by property or name
fn extract_meta_content(document: &Html, property: &str) -> Option<String> {
    ["property", "name"].iter().find_map(|attr| {
        let selector = Selector::parse(&format!(r#"meta[{}="{}"]"#, attr, property)).ok()?;
        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string)
    })
}
