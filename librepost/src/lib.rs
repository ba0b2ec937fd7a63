//! Repost - cross-post articles to Telegram channels and VK walls
//!
//! This library holds the publishing core shared by the `repost-*` tools:
//! account storage, the per-platform adapters, the concurrent dispatcher
//! and the content pipeline that turns source messages into articles.

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod platforms;
pub mod service;
pub mod sources;
pub mod store;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use config::{Config, StatusPolicy};
pub use db::{Database, HistoryQuery, User};
pub use dispatcher::{DispatchOptions, DispatchRequest, Dispatcher};
pub use error::{PlatformError, RepostError, Result};
pub use service::{DispatchResponse, PublishService};
pub use types::{
    Account, Article, ArticleStatus, Credentials, HistoryRecord, ImagePayload, PlatformKind,
    PublishResult, PublishStatus,
};
