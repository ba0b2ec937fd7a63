//! Platform adapters and the registry that selects them
//!
//! An adapter turns `(text, optional image)` into a post on one platform
//! family, using the credential bundle of the account being published to.
//! Adding a platform means implementing [`PlatformAdapter`] and registering
//! it; the dispatcher never branches on platform names.
//!
//! ```no_run
//! use std::sync::Arc;
//! use librepost::config::Config;
//! use librepost::platforms::{AdapterRegistry, mock::MockAdapter};
//! use librepost::types::PlatformKind;
//!
//! # fn example() -> librepost::Result<()> {
//! let mut registry = AdapterRegistry::from_config(&Config::default())?;
//! registry.register(Arc::new(MockAdapter::success(PlatformKind::Instagram)));
//! assert!(registry.get(PlatformKind::Instagram).is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{PlatformError, Result};
use crate::types::{Credentials, ImagePayload, PlatformKind};

pub mod telegram;
pub mod vk;

// Available for all builds (not just tests) to support integration tests
pub mod mock;

/// Publishes content to one platform family
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter serves
    fn platform(&self) -> PlatformKind;

    /// Publish `text` (and `image`, when given) with the account's credentials.
    ///
    /// Returns the platform-specific id of the created post or message.
    ///
    /// # Errors
    ///
    /// - `PlatformError::Credential` when the bundle is incomplete or belongs
    ///   to another platform
    /// - `PlatformError::Upstream` when the platform API rejects the request
    /// - `PlatformError::Network` when the platform cannot be reached
    async fn publish(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        credentials: &Credentials,
    ) -> std::result::Result<String, PlatformError>;
}

/// Maps platform identifiers to their adapters
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<PlatformKind, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter, sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("repost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PlatformError::from)?;

        let mut registry = Self::new();
        registry.register(Arc::new(telegram::TelegramAdapter::new(
            client.clone(),
            &config.telegram,
        )));
        registry.register(Arc::new(vk::VkAdapter::new(client, &config.vk)));
        Ok(registry)
    }

    /// Register `adapter`, replacing and returning any previous one for its platform
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.insert(adapter.platform(), adapter)
    }

    pub fn get(&self, platform: PlatformKind) -> Option<&Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform)
    }

    /// Platforms with a registered adapter, sorted
    pub fn platforms(&self) -> Vec<PlatformKind> {
        let mut platforms: Vec<PlatformKind> = self.adapters.keys().copied().collect();
        platforms.sort();
        platforms
    }
}
