//! Persistence seams used by the dispatcher and the content pipeline
//!
//! The core only talks to these traits. [`crate::db::Database`] implements
//! them on SQLite; [`MemoryStore`] keeps everything in process and is
//! available in all builds so integration tests can drive the dispatcher
//! without a database file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Account, Article, ArticleStatus, HistoryRecord, PublishStatus};

/// Resolves an opaque bearer token to a user id
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_token(&self, token: &str) -> Result<Option<String>>;
}

/// Read side of the account registry
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active accounts of `user_id`, in creation order
    async fn list_active_accounts(&self, user_id: &str) -> Result<Vec<Account>>;
}

/// Append-only log of publish attempts
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> Result<()>;

    /// Whether `article_id` has a successful record for `account_id`
    async fn was_delivered(&self, article_id: &str, account_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert or replace
    async fn save_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>>;

    /// Newest first
    async fn list_articles(
        &self,
        user_id: &str,
        status: Option<ArticleStatus>,
        limit: usize,
    ) -> Result<Vec<Article>>;

    /// Returns `false` when `user_id` owns no such article
    async fn update_article_status(
        &self,
        user_id: &str,
        article_id: &str,
        status: ArticleStatus,
    ) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    tokens: HashMap<String, String>,
    accounts: Vec<Account>,
    articles: Vec<Article>,
    history: Vec<HistoryRecord>,
}

/// In-process implementation of every store trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, token: &str, user_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.tokens.insert(token.to_string(), user_id.to_string());
    }

    pub fn add_account(&self, account: Account) {
        self.state.lock().unwrap().accounts.push(account);
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.state.lock().unwrap().history.clone()
    }
}

#[async_trait]
impl IdentityResolver for MemoryStore {
    async fn resolve_token(&self, token: &str) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().tokens.get(token).cloned())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn list_active_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id && a.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistoryLog for MemoryStore {
    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut record = record.clone();
        record.id = Some(state.history.len() as i64 + 1);
        state.history.push(record);
        Ok(())
    }

    async fn was_delivered(&self, article_id: &str, account_id: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.history.iter().any(|r| {
            r.article_id == article_id
                && r.account_id == account_id
                && r.status == PublishStatus::Success
        }))
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn save_article(&self, article: &Article) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.articles.iter_mut().find(|a| a.id == article.id) {
            Some(existing) => *existing = article.clone(),
            None => state.articles.push(article.clone()),
        }
        Ok(())
    }

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        let state = self.state.lock().unwrap();
        Ok(state.articles.iter().find(|a| a.id == article_id).cloned())
    }

    async fn list_articles(
        &self,
        user_id: &str,
        status: Option<ArticleStatus>,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let state = self.state.lock().unwrap();
        let mut articles: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.user_id == user_id && status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        articles.truncate(limit);
        Ok(articles)
    }

    async fn update_article_status(
        &self,
        user_id: &str,
        article_id: &str,
        status: ArticleStatus,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .articles
            .iter_mut()
            .find(|a| a.id == article_id && a.user_id == user_id)
        {
            Some(article) => {
                article.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
