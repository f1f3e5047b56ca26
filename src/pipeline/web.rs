//! Web-page extraction: fetch a URL and keep only its visible prose.
//!
//! The fetch sends a browser-identifying `User-Agent` because a default
//! library UA gets bot-blocked by a surprising share of educational sites.
//! Extraction keeps text inside heading (`h1`–`h6`) and paragraph tags only,
//! which structurally excludes scripts, styles, `<head>` metadata, and
//! comment nodes; elements carrying UI-chrome classes (dropdown titles,
//! buttons, nav titles) are dropped on top of that.

use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// CSS classes marking UI chrome whose text is not page content.
const CHROME_CLASSES: [&str; 3] = ["dropdown-title", "btn", "nav__title"];

/// Fetch a page and return its visible text, heading/paragraph elements
/// joined with newlines in document order.
pub async fn fetch_visible_text(
    url: &str,
    config: &StudyGuideConfig,
) -> Result<String, StudyGenError> {
    info!("fetching page: {url}");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|e| StudyGenError::Internal(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| StudyGenError::SourceUnreachable {
            source_name: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(StudyGenError::SourceUnreachable {
            source_name: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| StudyGenError::SourceUnreachable {
            source_name: url.to_string(),
            reason: e.to_string(),
        })?;

    let text = visible_text(&body);
    debug!("page yielded {} chars of visible text", text.len());
    Ok(text)
}

/// Extract visible text from an HTML document.
///
/// Selecting only content-bearing tags means non-visible elements
/// (style/script/head/title/meta, comments) never enter the result; the
/// chrome-class check removes navigation noise that *is* rendered but isn't
/// content.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    // The selector list is static; parse failure would be a programming error.
    let selector = Selector::parse("h1, h2, h3, h4, h5, h6, p")
        .expect("static content selector must parse");

    let mut lines: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if has_chrome_class(&element) {
            continue;
        }
        let text: String = element.text().collect::<Vec<_>>().join("");
        let text = text.trim();
        if !text.is_empty() {
            lines.push(text.to_string());
        }
    }
    lines.join("\n")
}

fn has_chrome_class(element: &scraper::ElementRef<'_>) -> bool {
    element
        .value()
        .classes()
        .any(|c| CHROME_CLASSES.contains(&c))
}
