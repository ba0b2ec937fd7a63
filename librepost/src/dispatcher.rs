//! Fan-out of one article to every active account of a user
//!
//! Each account is attempted independently: a failing, slow, or panicking
//! adapter produces a `failed` result for that account only. Every account
//! considered gets exactly one [`PublishResult`] and one [`HistoryRecord`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::AdapterRegistry;
use crate::store::{CredentialStore, HistoryLog};
use crate::types::{Account, Credentials, HistoryRecord, ImagePayload, PublishResult};

/// What to publish
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Correlation id written to every history record
    pub article_id: String,
    pub text: String,
    /// `data:` URL or `http(s)` URL
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Upper bound on one adapter call
    pub adapter_timeout: Duration,
    /// Skip accounts that already received this article successfully
    pub skip_delivered: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            skip_delivered: false,
        }
    }
}

impl DispatchOptions {
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Ok(Self {
            adapter_timeout: config.adapter_timeout()?,
            skip_delivered: config.skip_delivered,
        })
    }
}

pub struct Dispatcher {
    accounts: Arc<dyn CredentialStore>,
    history: Arc<dyn HistoryLog>,
    registry: AdapterRegistry,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        accounts: Arc<dyn CredentialStore>,
        history: Arc<dyn HistoryLog>,
        registry: AdapterRegistry,
        options: DispatchOptions,
    ) -> Self {
        Self {
            accounts,
            history,
            registry,
            options,
        }
    }

    /// Publish `request` to every active account of `user_id`.
    ///
    /// Results come back in account enumeration order. Zero active accounts
    /// is an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Only when the active accounts cannot be loaded. Per-account failures
    /// are reported in the returned results.
    pub async fn dispatch(&self, user_id: &str, request: &DispatchRequest) -> Result<Vec<PublishResult>> {
        let accounts = self.accounts.list_active_accounts(user_id).await?;
        if accounts.is_empty() {
            info!("No active accounts for user {}, nothing to publish", user_id);
            return Ok(Vec::new());
        }

        let image = request.image.as_deref().and_then(|raw| {
            let parsed = ImagePayload::parse(raw);
            if parsed.is_none() {
                warn!("Ignoring image that is neither a data URL nor an http(s) URL");
            }
            parsed
        });

        info!(
            "Dispatching article {} to {} account(s)",
            request.article_id,
            accounts.len()
        );

        let futures: Vec<_> = accounts
            .iter()
            .map(|account| self.dispatch_one(user_id, request, image.as_ref(), account))
            .collect();

        Ok(join_all(futures).await)
    }

    /// Attempt one account and record the outcome
    async fn dispatch_one(
        &self,
        user_id: &str,
        request: &DispatchRequest,
        image: Option<&ImagePayload>,
        account: &Account,
    ) -> PublishResult {
        let result = self.attempt(request, image, account).await;

        let record = HistoryRecord::from_result(user_id, &request.article_id, &result);
        if let Err(e) = self.history.append(&record).await {
            warn!(
                platform = %account.platform,
                account = %account.name,
                "Failed to write history record: {}",
                e
            );
        }

        result
    }

    async fn attempt(
        &self,
        request: &DispatchRequest,
        image: Option<&ImagePayload>,
        account: &Account,
    ) -> PublishResult {
        let Some(adapter) = self.registry.get(account.platform) else {
            info!(
                "No adapter for {}, account '{}' is pending integration",
                account.platform, account.name
            );
            return PublishResult::pending_integration(account);
        };

        if let Credentials::Unreadable(reason) = &account.credentials {
            let error = PlatformError::Credential(reason.clone());
            warn!(
                platform = %account.platform,
                account = %account.name,
                kind = error.kind(),
                "Not publishing: {}",
                error
            );
            return PublishResult::failed(account, &error);
        }

        if self.options.skip_delivered {
            match self.history.was_delivered(&request.article_id, &account.id).await {
                Ok(true) => {
                    info!(
                        "Article {} already delivered to {} account '{}', skipping",
                        request.article_id, account.platform, account.name
                    );
                    return PublishResult::skipped(account, &request.article_id);
                }
                Ok(false) => {}
                // Publishing again beats silently dropping the post
                Err(e) => warn!("Could not check delivery history: {}", e),
            }
        }

        debug!("Publishing to {} account '{}'", account.platform, account.name);

        let publish = adapter.publish(&request.text, image, &account.credentials);
        let outcome = timeout(
            self.options.adapter_timeout,
            AssertUnwindSafe(publish).catch_unwind(),
        )
        .await;

        let error = match outcome {
            Ok(Ok(Ok(post_id))) => {
                info!(
                    "Published to {} account '{}': {}",
                    account.platform, account.name, post_id
                );
                return PublishResult::success(account, post_id);
            }
            Ok(Ok(Err(e))) => e,
            Ok(Err(_panic)) => PlatformError::Network(format!(
                "{} adapter crashed while publishing",
                account.platform
            )),
            Err(_elapsed) => PlatformError::Timeout(self.options.adapter_timeout),
        };

        warn!(
            platform = %account.platform,
            account = %account.name,
            kind = error.kind(),
            "Failed to publish: {}",
            error
        );
        PublishResult::failed(account, &error)
    }
}
