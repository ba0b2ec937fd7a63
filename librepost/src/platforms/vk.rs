//! VK wall adapter
//!
//! VK tells user walls and community walls apart by the sign of the owner
//! id: communities are negative. Users type ids in many shapes (`123`,
//! `-123`, `club123`, `public123`, `id123`), so [`OwnerId::parse`]
//! normalizes them before any API call.
//!
//! Photos take three calls before they can be attached to a post:
//!
//! 1. `photos.getWallUploadServer` returns a one-off upload URL
//! 2. the image is POSTed there as multipart; the reply is `(server, photo, hash)`
//! 3. `photos.saveWallPhoto` turns that triple into `photo<owner>_<id>`
//!
//! A failure anywhere in that chain downgrades the post to text only.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::VkConfig;
use crate::error::PlatformError;
use crate::platforms::PlatformAdapter;
use crate::types::{Credentials, ImagePayload, InlineImage, PlatformKind};

/// Error codes meaning the token lacks rights for the wall
const PERMISSION_CODES: [i64; 5] = [5, 7, 15, 27, 214];

/// Error codes meaning a parameter (in practice the owner id) is wrong
const BAD_PARAMETER_CODES: [i64; 2] = [100, 113];

/// Prefixes users paste from profile URLs
const COMMUNITY_PREFIXES: [&str; 2] = ["public", "club"];
const USER_PREFIX: &str = "id";

/// A normalized wall owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId {
    /// Signed id as the API expects it: negative for communities
    pub id: i64,
    pub is_group: bool,
}

fn strip_prefix_ignore_case<'a>(raw: &'a str, prefix: &str) -> Option<&'a str> {
    raw.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &raw[prefix.len()..])
}

impl OwnerId {
    /// Normalize a free-form owner id.
    ///
    /// The owner is a community when the number is negative, the input
    /// contains a minus sign, starts with `club`/`public`, or `community`
    /// says so. Communities always come out negative.
    pub fn parse_with_hint(raw: &str, community: bool) -> Result<Self, PlatformError> {
        let trimmed = raw.trim();

        let mut has_community_prefix = false;
        let mut digits = trimmed;
        for prefix in COMMUNITY_PREFIXES {
            if let Some(rest) = strip_prefix_ignore_case(trimmed, prefix) {
                has_community_prefix = true;
                digits = rest;
                break;
            }
        }
        if !has_community_prefix {
            if let Some(rest) = strip_prefix_ignore_case(trimmed, USER_PREFIX) {
                digits = rest;
            }
        }

        let parsed: i64 = digits.trim().parse().map_err(|_| {
            PlatformError::Credential(format!("VK owner id must be numeric (got '{}')", trimmed))
        })?;
        // i64::MIN has no positive counterpart for `group_id`
        if parsed == 0 || parsed == i64::MIN {
            return Err(PlatformError::Credential(format!(
                "VK owner id must be numeric and non-zero (got '{}')",
                trimmed
            )));
        }

        let is_group = community || parsed < 0 || trimmed.contains('-') || has_community_prefix;
        let id = if is_group && parsed > 0 { -parsed } else { parsed };

        Ok(Self { id, is_group })
    }

    pub fn parse(raw: &str) -> Result<Self, PlatformError> {
        Self::parse_with_hint(raw, false)
    }

    /// Positive community id for the `group_id` parameter
    pub fn group_id(&self) -> Option<i64> {
        self.is_group.then(|| self.id.abs())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct UploadServer {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedPhoto {
    server: i64,
    photo: String,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SavedPhoto {
    id: i64,
    owner_id: i64,
}

#[derive(Debug, Deserialize)]
struct WallPost {
    post_id: i64,
}

/// Turn an API error on `wall.post` into actionable guidance
fn map_wall_error(error: ApiError) -> PlatformError {
    let message = if PERMISSION_CODES.contains(&error.error_code) {
        format!(
            "VK denied access: {}. Check that the access token has the 'wall' and 'photos' \
             scopes and that the account is an administrator of the community.",
            error.error_msg
        )
    } else if BAD_PARAMETER_CODES.contains(&error.error_code) {
        format!(
            "VK rejected the parameters: {}. Check the owner id; communities need a \
             leading minus or a club/public prefix.",
            error.error_msg
        )
    } else {
        error.error_msg
    };

    PlatformError::Upstream {
        code: error.error_code,
        message,
    }
}

fn network_error(err: reqwest::Error) -> PlatformError {
    PlatformError::Network(format!("Could not reach VK: {}", err.without_url()))
}

pub struct VkAdapter {
    client: reqwest::Client,
    api_base: String,
    api_version: String,
}

impl VkAdapter {
    pub fn new(client: reqwest::Client, config: &VkConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        }
    }

    /// Call an API method; the inner `Err` is VK's own error object
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<Result<T, ApiError>, PlatformError> {
        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("access_token", token.to_string()));
        form.push(("v", self.api_version.clone()));

        let envelope: Envelope<T> = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .form(&form)
            .send()
            .await
            .map_err(network_error)?
            .json()
            .await
            .map_err(network_error)?;

        match (envelope.response, envelope.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(response), None) => Ok(Ok(response)),
            (None, None) => Err(PlatformError::Network(format!(
                "VK returned an empty response for {}",
                method
            ))),
        }
    }

    /// Call a method where any VK error is just a failure
    async fn call_plain<T: DeserializeOwned>(
        &self,
        method: &str,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        self.call(method, token, params)
            .await?
            .map_err(|e| PlatformError::Upstream {
                code: e.error_code,
                message: format!("{}: {}", method, e.error_msg),
            })
    }

    /// Run the three-step upload and return the attachment id
    async fn upload_photo(
        &self,
        token: &str,
        owner: OwnerId,
        image: &InlineImage,
    ) -> Result<String, PlatformError> {
        let scope: Vec<(&str, String)> = owner
            .group_id()
            .map(|gid| vec![("group_id", gid.to_string())])
            .unwrap_or_default();

        let server: UploadServer = self
            .call_plain("photos.getWallUploadServer", token, &scope)
            .await?;

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name())
            .mime_str(image.mime_type.as_str())
            .map_err(network_error)?;
        let uploaded: UploadedPhoto = self
            .client
            .post(&server.upload_url)
            .multipart(Form::new().part("photo", part))
            .send()
            .await
            .map_err(network_error)?
            .json()
            .await
            .map_err(network_error)?;

        if uploaded.photo.is_empty() || uploaded.photo == "[]" {
            return Err(PlatformError::Upstream {
                code: 0,
                message: "VK upload server did not accept the photo".to_string(),
            });
        }

        let mut save_params = scope;
        save_params.push(("photo", uploaded.photo));
        save_params.push(("server", uploaded.server.to_string()));
        save_params.push(("hash", uploaded.hash));

        let saved: Vec<SavedPhoto> = self
            .call_plain("photos.saveWallPhoto", token, &save_params)
            .await?;
        let photo = saved.first().ok_or_else(|| PlatformError::Upstream {
            code: 0,
            message: "photos.saveWallPhoto returned no photo".to_string(),
        })?;

        Ok(format!("photo{}_{}", photo.owner_id, photo.id))
    }

    async fn attachment_for(
        &self,
        token: &str,
        owner: OwnerId,
        image: Option<&ImagePayload>,
    ) -> Option<String> {
        let inline = match image? {
            ImagePayload::Inline(inline) => inline,
            ImagePayload::Remote(_) => {
                tracing::warn!("VK only accepts inline image data; posting without the image");
                return None;
            }
        };

        match self.upload_photo(token, owner, inline).await {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                tracing::warn!(error = %e, "VK photo upload failed; posting text only");
                None
            }
        }
    }
}

#[async_trait]
impl PlatformAdapter for VkAdapter {
    fn platform(&self) -> PlatformKind {
        PlatformKind::Vk
    }

    async fn publish(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        credentials: &Credentials,
    ) -> Result<String, PlatformError> {
        let Credentials::Vk(creds) = credentials else {
            return Err(PlatformError::Credential(
                "account credentials are not VK credentials".to_string(),
            ));
        };

        let token = creds.access_token.expose_secret().trim();
        if token.is_empty() {
            return Err(PlatformError::Credential(
                "VK access token is required".to_string(),
            ));
        }
        if creds.owner_id.trim().is_empty() {
            return Err(PlatformError::Credential("VK owner id is required".to_string()));
        }
        let owner = OwnerId::parse_with_hint(&creds.owner_id, creds.community)?;

        let attachment = self.attachment_for(token, owner, image).await;
        if text.trim().is_empty() && attachment.is_none() {
            return Err(PlatformError::Validation(
                "Nothing to post: text is empty and there is no attachment".to_string(),
            ));
        }

        let params = vec![
            ("owner_id", owner.id.to_string()),
            ("from_group", if owner.is_group { "1" } else { "0" }.to_string()),
            ("message", text.to_string()),
            ("attachments", attachment.unwrap_or_default()),
        ];

        let post: WallPost = self
            .call("wall.post", token, &params)
            .await?
            .map_err(map_wall_error)?;

        Ok(post.post_id.to_string())
    }
}
