//! Configurable adapter for tests
//!
//! Simulates successes, failures and slow platforms, and records every call
//! so tests can assert on what the dispatcher sent.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::platforms::PlatformAdapter;
use crate::types::{Credentials, ImagePayload, PlatformKind};

/// One recorded `publish` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub text: String,
    pub had_image: bool,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub platform: PlatformKind,

    /// Error to return instead of a post id
    pub error: Option<PlatformError>,

    /// Simulated network latency
    pub delay: Duration,

    /// Check the credential bundle the way real adapters do
    pub check_credentials: bool,

    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockConfig {
    fn new(platform: PlatformKind) -> Self {
        Self {
            platform,
            error: None,
            delay: Duration::ZERO,
            check_credentials: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub struct MockAdapter {
    config: MockConfig,
}

impl MockAdapter {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Always succeeds
    pub fn success(platform: PlatformKind) -> Self {
        Self::new(MockConfig::new(platform))
    }

    /// Always fails with `error`
    pub fn failure(platform: PlatformKind, error: PlatformError) -> Self {
        Self::new(MockConfig {
            error: Some(error),
            ..MockConfig::new(platform)
        })
    }

    /// Succeeds after `delay`
    pub fn with_delay(platform: PlatformKind, delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..MockConfig::new(platform)
        })
    }

    /// Succeeds only when the account's credentials are complete
    pub fn strict(platform: PlatformKind) -> Self {
        Self::new(MockConfig {
            check_credentials: true,
            ..MockConfig::new(platform)
        })
    }

    /// Shared handle to the call log, usable after the adapter is boxed
    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.config.calls)
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> PlatformKind {
        self.config.platform
    }

    async fn publish(
        &self,
        text: &str,
        image: Option<&ImagePayload>,
        credentials: &Credentials,
    ) -> Result<String, PlatformError> {
        let call_number = {
            let mut calls = self.config.calls.lock().unwrap();
            calls.push(RecordedCall {
                text: text.to_string(),
                had_image: image.is_some(),
            });
            calls.len()
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if self.config.check_credentials {
            credentials.validate(self.config.platform)?;
        }

        match &self.config.error {
            Some(error) => Err(error.clone()),
            None => Ok(format!("mock-{}-{}", self.config.platform, call_number)),
        }
    }
}
