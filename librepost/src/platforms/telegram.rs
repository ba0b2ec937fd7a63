//! Telegram Bot API adapter
//!
//! Posts to a chat or channel through `sendMessage` / `sendPhoto`. Captions
//! longer than the configured limit are not sent as captions: the API
//! rejects them, so the photo goes out bare and the full text follows as a
//! separate message.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::error::PlatformError;
use crate::platforms::PlatformAdapter;
use crate::types::{Credentials, ImagePayload, PlatformKind};

/// Envelope every Bot API method responds with
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<SentMessage>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub struct TelegramAdapter {
    client: reqwest::Client,
    api_base: String,
    caption_limit: usize,
}

/// Whether `text` fits in a photo caption of at most `limit` characters
pub fn fits_caption(text: &str, limit: usize) -> bool {
    text.chars().count() <= limit
}

fn map_api_error(code: i64, description: String) -> PlatformError {
    let message = match code {
        401 => format!(
            "{}. Suggestion: the bot token was rejected; create a new one with @BotFather.",
            description
        ),
        403 => format!(
            "{}. Suggestion: add the bot to the chat and, for channels, make it an administrator.",
            description
        ),
        _ => description,
    };
    PlatformError::Upstream { code, message }
}

impl TelegramAdapter {
    pub fn new(client: reqwest::Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            caption_limit: config.caption_limit,
        }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, token, method)
    }

    /// Send a prepared request and unwrap the Bot API envelope
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<i64, PlatformError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiResponse = serde_json::from_str(&body).map_err(|_| {
            PlatformError::Upstream {
                code: i64::from(status.as_u16()),
                message: format!("Unexpected response from Telegram (HTTP {})", status),
            }
        })?;

        if !envelope.ok {
            return Err(map_api_error(
                envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                envelope
                    .description
                    .unwrap_or_else(|| "Telegram rejected the request".to_string()),
            ));
        }

        envelope
            .result
            .map(|m| m.message_id)
            .ok_or_else(|| PlatformError::Upstream {
                code: i64::from(status.as_u16()),
                message: "Telegram response did not include a message".to_string(),
            })
    }

    async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<i64, PlatformError> {
        tracing::debug!("Telegram sendMessage: {} characters", text.chars().count());
        let request = self
            .client
            .post(self.method_url(token, "sendMessage"))
            .json(&json!({ "chat_id": chat_id, "text": text }));
        self.execute(request).await
    }

    async fn send_photo(
        &self,
        token: &str,
        chat_id: &str,
        image: &ImagePayload,
        caption: Option<&str>,
    ) -> Result<i64, PlatformError> {
        tracing::debug!("Telegram sendPhoto (caption: {})", caption.is_some());
        let url = self.method_url(token, "sendPhoto");

        let request = match image {
            ImagePayload::Remote(photo_url) => {
                let mut body = json!({ "chat_id": chat_id, "photo": photo_url });
                if let Some(caption) = caption {
                    body["caption"] = json!(caption);
                }
                self.client.post(url).json(&body)
            }
            ImagePayload::Inline(inline) => {
                let part = Part::bytes(inline.bytes.clone())
                    .file_name(inline.file_name())
                    .mime_str(inline.mime_type.as_str())?;
                let mut form = Form::new()
                    .text("chat_id", chat_id.to_string())
                    .part("photo", part);
                if let Some(caption) = caption {
                    form = form.text("caption", caption.to_string());
                }
                self.client.post(url).multipart(form)
            }
        };

        self.execute(request).await
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> PlatformKind {
        PlatformKind::Telegram
    }

    async fn publish(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        credentials: &Credentials,
    ) -> Result<String, PlatformError> {
        let Credentials::Telegram(creds) = credentials else {
            return Err(PlatformError::Credential(
                "account credentials are not Telegram bot credentials".to_string(),
            ));
        };

        let token = creds.bot_token.expose_secret().trim();
        let chat_id = creds.chat_id.trim();
        if token.is_empty() || chat_id.is_empty() {
            return Err(PlatformError::Credential(
                "Telegram bot token and chat id are required".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(PlatformError::Validation("Text cannot be empty".to_string()));
        }

        let message_id = match image {
            Some(image) if fits_caption(text, self.caption_limit) => {
                self.send_photo(token, chat_id, image, Some(text)).await?
            }
            Some(image) => {
                tracing::debug!(
                    "Text exceeds the {} character caption limit, sending it separately",
                    self.caption_limit
                );
                self.send_photo(token, chat_id, image, None).await?;
                self.send_message(token, chat_id, text).await?
            }
            None => self.send_message(token, chat_id, text).await?,
        };

        Ok(message_id.to_string())
    }
}
