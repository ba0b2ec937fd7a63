//! Core types for Repost

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlatformError;

// ============================================================================
// Platforms and credentials
// ============================================================================

/// Destination platforms an account can point at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Telegram,
    Vk,
    Instagram,
    Facebook,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Vk => "vk",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "telegram" | "tg" => Ok(Self::Telegram),
            "vk" | "vkontakte" => Ok(Self::Vk),
            "instagram" => Ok(Self::Instagram),
            "facebook" => Ok(Self::Facebook),
            other => Err(format!(
                "Unknown platform '{}'. Valid options: telegram, vk, instagram, facebook",
                other
            )),
        }
    }
}

/// Serde helpers that expose a secret only at the storage boundary
mod secret_serde {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SecretString, D::Error> {
        String::deserialize(d).map(SecretString::from)
    }
}

mod secret_map_serde {
    use std::collections::BTreeMap;

    use secrecy::{ExposeSecret, SecretString};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        fields: &BTreeMap<String, SecretString>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(fields.len()))?;
        for (key, value) in fields {
            map.serialize_entry(key, value.expose_secret())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, SecretString>, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, SecretString::from(v)))
            .collect())
    }
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

fn require_field(platform: PlatformKind, field: &str, value: &str) -> Result<(), PlatformError> {
    if value.trim().is_empty() {
        return Err(PlatformError::Credential(format!(
            "{} account is missing required field '{}'",
            platform, field
        )));
    }
    Ok(())
}

/// Bot API credentials for a Telegram chat or channel
#[derive(Debug, Serialize, Deserialize)]
pub struct TelegramCredentials {
    #[serde(with = "secret_serde")]
    pub bot_token: SecretString,
    pub chat_id: String,
}

impl Clone for TelegramCredentials {
    fn clone(&self) -> Self {
        Self {
            bot_token: clone_secret(&self.bot_token),
            chat_id: self.chat_id.clone(),
        }
    }
}

/// Access token plus the wall owner (user or community) to post on
#[derive(Debug, Serialize, Deserialize)]
pub struct VkCredentials {
    #[serde(with = "secret_serde")]
    pub access_token: SecretString,
    pub owner_id: String,
    /// Treat a bare positive owner id as a community
    #[serde(default)]
    pub community: bool,
}

impl Clone for VkCredentials {
    fn clone(&self) -> Self {
        Self {
            access_token: clone_secret(&self.access_token),
            owner_id: self.owner_id.clone(),
            community: self.community,
        }
    }
}

/// Free-form credentials for platforms that have no adapter yet
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OpaqueCredentials {
    #[serde(with = "secret_map_serde", default)]
    pub fields: BTreeMap<String, SecretString>,
}

impl Clone for OpaqueCredentials {
    fn clone(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), clone_secret(v)))
                .collect(),
        }
    }
}

/// Credential bundle, one variant per platform family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Credentials {
    Telegram(TelegramCredentials),
    Vk(VkCredentials),
    Opaque(OpaqueCredentials),
    /// A stored bundle that no longer decodes, with a secret-free reason
    #[serde(skip)]
    Unreadable(String),
}

impl Credentials {
    pub fn telegram(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::Telegram(TelegramCredentials {
            bot_token: SecretString::from(bot_token.into()),
            chat_id: chat_id.into(),
        })
    }

    pub fn vk(access_token: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::Vk(VkCredentials {
            access_token: SecretString::from(access_token.into()),
            owner_id: owner_id.into(),
            community: false,
        })
    }

    /// VK credentials for a community wall given without a sign or prefix
    pub fn vk_community(access_token: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::Vk(VkCredentials {
            access_token: SecretString::from(access_token.into()),
            owner_id: owner_id.into(),
            community: true,
        })
    }

    /// Whether this bundle can belong to an account on `platform`
    pub fn fits(&self, platform: PlatformKind) -> bool {
        match self {
            Self::Telegram(_) => platform == PlatformKind::Telegram,
            Self::Vk(_) => platform == PlatformKind::Vk,
            Self::Opaque(_) => !matches!(platform, PlatformKind::Telegram | PlatformKind::Vk),
            Self::Unreadable(_) => false,
        }
    }

    /// Check the bundle is complete for `platform`.
    ///
    /// Run when an account is created or edited; adapters repeat the
    /// blank-field checks at publish time because stored rows can be
    /// edited out of band.
    pub fn validate(&self, platform: PlatformKind) -> Result<(), PlatformError> {
        if let Self::Unreadable(reason) = self {
            return Err(PlatformError::Credential(reason.clone()));
        }
        if !self.fits(platform) {
            return Err(PlatformError::Credential(format!(
                "credentials do not match platform '{}'",
                platform
            )));
        }

        match self {
            Self::Telegram(creds) => {
                require_field(platform, "bot_token", creds.bot_token.expose_secret())?;
                require_field(platform, "chat_id", &creds.chat_id)
            }
            Self::Vk(creds) => {
                require_field(platform, "access_token", creds.access_token.expose_secret())?;
                require_field(platform, "owner_id", &creds.owner_id)?;
                crate::platforms::vk::OwnerId::parse_with_hint(&creds.owner_id, creds.community)
                    .map(|_| ())
            }
            Self::Opaque(_) | Self::Unreadable(_) => Ok(()),
        }
    }
}

/// A configured destination a user can publish to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub platform: PlatformKind,
    pub name: String,
    pub credentials: Credentials,
    pub is_active: bool,
    pub created_at: i64,
}

impl Account {
    pub fn new(user_id: &str, platform: PlatformKind, name: &str, credentials: Credentials) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            platform,
            name: name.to_string(),
            credentials,
            is_active: true,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
    Posted,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "posted" => Ok(Self::Posted),
            other => Err(format!("unknown article status '{}'", other)),
        }
    }
}

/// One stylistic rewrite of an article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewriteVariant {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub user_id: String,
    pub source: String,
    pub original_text: String,
    pub timestamp: i64,
    pub status: ArticleStatus,
    pub variants: Vec<RewriteVariant>,
    pub selected_variant: Option<usize>,
    pub generated_image: Option<String>,
    pub platforms: Vec<PlatformKind>,
}

impl Article {
    pub fn new(user_id: &str, source: &str, original_text: String, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source: source.to_string(),
            original_text,
            timestamp,
            status: ArticleStatus::Pending,
            variants: Vec::new(),
            selected_variant: None,
            generated_image: None,
            platforms: Vec::new(),
        }
    }

    /// Content of the selected rewrite, if any
    pub fn postable_text(&self) -> Option<&str> {
        self.selected_variant
            .and_then(|i| self.variants.get(i))
            .map(|v| v.content.as_str())
    }
}

// ============================================================================
// Publish results and history
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Success,
    Failed,
    PendingIntegration,
    /// Already delivered earlier; only produced when the duplicate guard is on
    Skipped,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::PendingIntegration => "pending_integration",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "pending_integration" => Ok(Self::PendingIntegration),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown publish status '{}'", other)),
        }
    }
}

/// Outcome of one dispatch attempt for one account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishResult {
    pub account_id: String,
    pub platform: PlatformKind,
    pub account_name: String,
    pub status: PublishStatus,
    pub error_message: Option<String>,
    pub platform_post_id: Option<String>,
}

impl PublishResult {
    pub fn success(account: &Account, platform_post_id: String) -> Self {
        Self::with_status(account, PublishStatus::Success, None, Some(platform_post_id))
    }

    pub fn failed(account: &Account, error: &PlatformError) -> Self {
        Self::with_status(account, PublishStatus::Failed, Some(error.to_string()), None)
    }

    pub fn pending_integration(account: &Account) -> Self {
        let message = format!(
            "Publishing to {} is not integrated yet; account '{}' was not posted to",
            account.platform, account.name
        );
        Self::with_status(account, PublishStatus::PendingIntegration, Some(message), None)
    }

    pub fn skipped(account: &Account, article_id: &str) -> Self {
        let message = format!(
            "Article {} was already delivered to account '{}'",
            article_id, account.name
        );
        Self::with_status(account, PublishStatus::Skipped, Some(message), None)
    }

    fn with_status(
        account: &Account,
        status: PublishStatus,
        error_message: Option<String>,
        platform_post_id: Option<String>,
    ) -> Self {
        Self {
            account_id: account.id.clone(),
            platform: account.platform,
            account_name: account.name.clone(),
            status,
            error_message,
            platform_post_id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}

/// Persisted audit entry of one publish attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub id: Option<i64>,
    pub user_id: String,
    pub article_id: String,
    pub account_id: String,
    pub platform: PlatformKind,
    pub status: PublishStatus,
    pub error_log: Option<String>,
    pub created_at: i64,
}

impl HistoryRecord {
    pub fn from_result(user_id: &str, article_id: &str, result: &PublishResult) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            account_id: result.account_id.clone(),
            platform: result.platform,
            status: result.status,
            error_log: result.error_message.clone(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

// ============================================================================
// Images
// ============================================================================

/// Supported image MIME types for attachments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse MIME type from a MIME string (e.g., "image/jpeg")
    pub fn from_mime_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded image bytes carried inline with the request
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: ImageMimeType,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn file_name(&self) -> String {
        format!("image.{}", self.mime_type.extension())
    }

    /// Encode as a `data:` URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type.as_str(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Image accompanying a dispatch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Inline(InlineImage),
    Remote(String),
}

impl ImagePayload {
    /// Interpret a raw image reference.
    ///
    /// Accepts `data:image/<type>;base64,<payload>` and `http(s)://` URLs.
    /// Returns `None` for anything else, including data URLs whose payload
    /// does not decode.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(Self::Remote(raw.to_string()));
        }

        let rest = raw.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let mime_type = ImageMimeType::from_mime_str(mime)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?;
        if bytes.is_empty() {
            return None;
        }

        Some(Self::Inline(InlineImage { mime_type, bytes }))
    }
}
