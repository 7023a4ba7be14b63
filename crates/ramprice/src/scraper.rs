use std::time::Duration;

use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, InvalidHeaderValue};
use scraper::{Html, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid cookie header: {0}")]
    InvalidCookie(#[from] InvalidHeaderValue),
    #[error("No listing content found at {0}")]
    MissingContent(String),
}

// Post body containers, most specific first.
const CONTENT_SELECTORS: [&str; 5] = [
    "div.se-main-container",
    "div.ContentRenderer",
    "#postViewArea",
    "article",
    "body",
];

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
}

impl WebScraper {
    pub fn new(cookie: Option<&str>) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Downloads a listing post and returns its body as plain text, one
    /// paragraph per line.
    pub async fn fetch_listing_text(&self, url: &str) -> Result<String, ScraperError> {
        log::info!("Fetching listing from {}...", url);

        let html = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        extract_listing_text(&html).ok_or_else(|| ScraperError::MissingContent(url.to_string()))
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls the post body out of a listing page.
///
/// Paragraph-like elements become one line each so inline markup inside a
/// price line does not split it. Returns `None` when no text is found.
pub fn extract_listing_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let line_sel = Selector::parse("p, li, h1, h2, h3, h4").ok()?;

    let container = CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|sel| document.select(&sel).next())?;

    let mut lines: Vec<String> = container
        .select(&line_sel)
        .map(|e| normalize_whitespace(&e.text().collect::<String>()))
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        lines = container
            .text()
            .flat_map(str::lines)
            .map(normalize_whitespace)
            .filter(|line| !line.is_empty())
            .collect();
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_listing;

    #[test]
    fn test_extract_paragraphs_from_editor_container() {
        let html = r#"
            <html><body>
              <div class="nav">카페 메뉴</div>
              <div class="se-main-container">
                <p class="se-text-paragraph"><span>■ 데스크탑</span> <b>DDR4</b></p>
                <p class="se-text-paragraph"><span>삼성 8G</span><span> PC4-25600 - </span><span>49,000원</span></p>
                <p class="se-text-paragraph">   </p>
              </div>
            </body></html>
        "#;

        let text = extract_listing_text(html).expect("Should find content");

        assert_eq!(text, "■ 데스크탑 DDR4\n삼성 8G PC4-25600 - 49,000원");
        assert_eq!(parse_listing(&text).values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_extract_falls_back_to_text_lines() {
        let html = "<html><body><article>노트북 DDR5\n삼성 D5 16G 5600 - 58,000원</article></body></html>";

        let text = extract_listing_text(html).expect("Should find content");

        assert_eq!(text, "노트북 DDR5\n삼성 D5 16G 5600 - 58,000원");
    }

    #[test]
    fn test_extract_empty_page() {
        assert!(extract_listing_text("<html><body>   </body></html>").is_none());
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        assert!(matches!(
            WebScraper::new(Some("session=abc\n")),
            Err(ScraperError::InvalidCookie(_))
        ));
    }
}
