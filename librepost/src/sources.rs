//! Content sources
//!
//! A [`SourceFetcher`] turns a source name into recent raw messages. The
//! built-in [`TelegramChannelScraper`] reads the public web preview of a
//! channel, so no bot membership or API key is needed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::config::SourcesConfig;
use crate::error::{RepostError, Result};

/// One message pulled from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub source: String,
    pub text: String,
    /// Unix seconds
    pub timestamp: i64,
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Recent messages of `source`, oldest first
    async fn fetch_recent(&self, source: &str) -> Result<Vec<RawMessage>>;
}

/// Reduce `@name`, `t.me/name`, `https://t.me/s/name` and friends to `name`.
///
/// Returns `None` when what is left is not a valid channel username.
pub fn normalize_channel(raw: &str) -> Option<String> {
    let mut name = raw.trim();
    for prefix in ["https://", "http://"] {
        name = name.strip_prefix(prefix).unwrap_or(name);
    }
    for prefix in ["www.", "t.me/s/", "t.me/", "telegram.me/", "@"] {
        name = name.strip_prefix(prefix).unwrap_or(name);
    }
    let name = name.split(['/', '?', '#']).next().unwrap_or_default();

    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| name.to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RepostError::Source(format!("invalid selector '{}': {}", css, e)))
}

/// Text of a message block, keeping line breaks
fn message_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        if let Some(t) = node.value().as_text() {
            text.push_str(t);
        } else if node.value().as_element().is_some_and(|e| e.name() == "br") {
            text.push('\n');
        }
    }
    text.trim().to_string()
}

/// Extract the last `limit` text messages from a channel preview page
pub fn parse_channel_page(source: &str, html: &str, limit: usize) -> Result<Vec<RawMessage>> {
    let document = Html::parse_document(html);
    let message_sel = selector(".tgme_widget_message")?;
    let text_sel = selector(".tgme_widget_message_text")?;
    let time_sel = selector("time[datetime]")?;

    let mut messages: Vec<RawMessage> = document
        .select(&message_sel)
        .filter_map(|message| {
            let text = message.select(&text_sel).next().map(message_text)?;
            if text.is_empty() {
                return None;
            }
            let timestamp = message
                .select(&time_sel)
                .next()
                .and_then(|t| t.value().attr("datetime"))
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.timestamp())
                .unwrap_or_else(|| Utc::now().timestamp());
            Some(RawMessage {
                source: source.to_string(),
                text,
                timestamp,
            })
        })
        .collect();

    // The preview lists messages oldest first; keep the newest `limit`
    let skip = messages.len().saturating_sub(limit);
    messages.drain(..skip);
    Ok(messages)
}

/// Reads `<base_url>/<channel>` public previews
pub struct TelegramChannelScraper {
    client: reqwest::Client,
    base_url: String,
    fetch_limit: usize,
}

impl TelegramChannelScraper {
    pub fn new(client: reqwest::Client, config: &SourcesConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fetch_limit: config.fetch_limit,
        }
    }
}

#[async_trait]
impl SourceFetcher for TelegramChannelScraper {
    async fn fetch_recent(&self, source: &str) -> Result<Vec<RawMessage>> {
        let channel = normalize_channel(source)
            .ok_or_else(|| RepostError::InvalidInput(format!("'{}' is not a channel name", source)))?;
        let url = format!("{}/{}", self.base_url, channel);
        debug!("Fetching channel preview {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RepostError::Source(format!("could not reach {}: {}", url, e.without_url())))?;

        if !response.status().is_success() {
            return Err(RepostError::Source(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| RepostError::Source(e.without_url().to_string()))?;

        let messages = parse_channel_page(&channel, &html, self.fetch_limit)?;
        debug!("Channel {}: {} message(s)", channel, messages.len());
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="tgme_widget_message" data-post="news/1">
          <div class="tgme_widget_message_text">First<br>line two</div>
          <a class="tgme_widget_message_date"><time datetime="2024-05-01T10:00:00+00:00">10:00</time></a>
        </div>
        <div class="tgme_widget_message" data-post="news/2">
          <div class="tgme_widget_message_photo_wrap"></div>
        </div>
        <div class="tgme_widget_message" data-post="news/3">
          <div class="tgme_widget_message_text">Second</div>
          <a class="tgme_widget_message_date"><time datetime="2024-05-01T11:00:00+00:00">11:00</time></a>
        </div>
        <div class="tgme_widget_message" data-post="news/4">
          <div class="tgme_widget_message_text">Third</div>
          <a class="tgme_widget_message_date"><time datetime="2024-05-01T12:00:00+00:00">12:00</time></a>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_normalize_channel_forms() {
        assert_eq!(normalize_channel("@news").as_deref(), Some("news"));
        assert_eq!(normalize_channel("t.me/news").as_deref(), Some("news"));
        assert_eq!(normalize_channel("https://t.me/news").as_deref(), Some("news"));
        assert_eq!(normalize_channel("https://t.me/s/news_daily/").as_deref(), Some("news_daily"));
        assert_eq!(normalize_channel("  news  ").as_deref(), Some("news"));
        assert_eq!(normalize_channel("@"), None);
        assert_eq!(normalize_channel("bad name"), None);
    }

    #[test]
    fn test_parse_skips_media_only_messages() {
        let messages = parse_channel_page("news", PAGE, 10).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "First\nline two");
        assert_eq!(messages[0].timestamp, 1_714_557_600);
        assert!(messages.iter().all(|m| m.source == "news"));
    }

    #[test]
    fn test_parse_keeps_newest_in_order() {
        let messages = parse_channel_page("news", PAGE, 2).unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Second", "Third"]);
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_channel_page("news", "<html></html>", 3).unwrap().is_empty());
    }
}
