//! Authenticated publish entry point
//!
//! `PublishService` is what front ends call: it resolves the caller's token,
//! validates the request, runs the [`Dispatcher`] and moves the article to
//! `posted` when the configured [`StatusPolicy`] is satisfied.
//!
//! # Example
//!
//! ```no_run
//! use librepost::dispatcher::DispatchRequest;
//! use librepost::service::PublishService;
//! use librepost::Config;
//!
//! # async fn example() -> librepost::Result<()> {
//! let service = PublishService::from_config(&Config::load()?).await?;
//!
//! let response = service
//!     .publish(
//!         "user-token",
//!         DispatchRequest {
//!             article_id: "article-1".to_string(),
//!             text: "Hello channels".to_string(),
//!             image: None,
//!         },
//!     )
//!     .await?;
//! println!("{} account(s) attempted", response.results.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, StatusPolicy};
use crate::db::Database;
use crate::dispatcher::{DispatchOptions, DispatchRequest, Dispatcher};
use crate::error::{RepostError, Result};
use crate::platforms::AdapterRegistry;
use crate::store::{ArticleStore, IdentityResolver};
use crate::types::{ArticleStatus, PublishResult, PublishStatus};

/// Aggregate outcome of one publish call
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    /// Verdict of the configured status policy
    pub success: bool,
    pub results: Vec<PublishResult>,
}

impl StatusPolicy {
    /// Whether `results` satisfy this policy.
    ///
    /// `skipped` counts as delivered. With no results only `Attempted` holds.
    pub fn is_satisfied(&self, results: &[PublishResult]) -> bool {
        let delivered =
            |r: &PublishResult| matches!(r.status, PublishStatus::Success | PublishStatus::Skipped);

        match self {
            StatusPolicy::Attempted => true,
            StatusPolicy::AnySucceeded => results.iter().any(delivered),
            StatusPolicy::AllSucceeded => !results.is_empty() && results.iter().all(delivered),
        }
    }
}

pub struct PublishService {
    identity: Arc<dyn IdentityResolver>,
    articles: Arc<dyn ArticleStore>,
    dispatcher: Dispatcher,
    policy: StatusPolicy,
}

impl PublishService {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        articles: Arc<dyn ArticleStore>,
        dispatcher: Dispatcher,
        policy: StatusPolicy,
    ) -> Self {
        Self {
            identity,
            articles,
            dispatcher,
            policy,
        }
    }

    /// Open the configured database and wire every store and built-in adapter
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened or migrated.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let db = Arc::new(Database::new(&config.database_path()).await?);
        let registry = AdapterRegistry::from_config(config)?;
        let options = DispatchOptions::from_config(&config.dispatch)?;

        let dispatcher = Dispatcher::new(db.clone(), db.clone(), registry, options);
        Ok(Self::new(
            db.clone(),
            db,
            dispatcher,
            config.dispatch.status_policy,
        ))
    }

    /// Publish on behalf of the user identified by `token`
    ///
    /// # Errors
    ///
    /// - [`RepostError::Authentication`] when the token is unknown; nothing
    ///   is dispatched or recorded
    /// - [`RepostError::InvalidInput`] for blank text or article id
    /// - storage errors while loading the user's accounts
    pub async fn publish(&self, token: &str, request: DispatchRequest) -> Result<DispatchResponse> {
        let user_id = self
            .identity
            .resolve_token(token.trim())
            .await?
            .ok_or_else(|| RepostError::Authentication("unknown or expired token".to_string()))?;

        if request.text.trim().is_empty() {
            return Err(RepostError::InvalidInput("Text cannot be empty".to_string()));
        }
        if request.article_id.trim().is_empty() {
            return Err(RepostError::InvalidInput("Article id cannot be empty".to_string()));
        }

        let results = self.dispatcher.dispatch(&user_id, &request).await?;
        let success = self.policy.is_satisfied(&results);

        if success && !results.is_empty() {
            self.mark_posted(&user_id, &request.article_id).await;
        }

        info!(
            "Article {}: {} succeeded, {} attempted",
            request.article_id,
            results.iter().filter(|r| r.is_success()).count(),
            results.len()
        );

        Ok(DispatchResponse { success, results })
    }

    async fn mark_posted(&self, user_id: &str, article_id: &str) {
        match self
            .articles
            .update_article_status(user_id, article_id, ArticleStatus::Posted)
            .await
        {
            Ok(true) => debug!("Article {} marked as posted", article_id),
            Ok(false) => debug!("Article {} is not tracked, status left alone", article_id),
            Err(e) => warn!("Failed to mark article {} as posted: {}", article_id, e),
        }
    }
}
