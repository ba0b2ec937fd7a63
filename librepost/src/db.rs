//! SQLite persistence for users, accounts, articles and publish history

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, RepostError, Result};
use crate::store::{ArticleStore, CredentialStore, HistoryLog, IdentityResolver};
use crate::types::{
    Account, Article, ArticleStatus, Credentials, HistoryRecord, PlatformKind, PublishStatus,
};

/// A registered user and the bearer token that identifies them
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub token: String,
    pub created_at: i64,
}

/// Filters for reading the history log
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub article_id: Option<String>,
    pub platform: Option<PlatformKind>,
    pub limit: usize,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn corrupt(table: &'static str, reason: impl ToString) -> RepostError {
    DbError::Corrupt {
        table,
        reason: reason.to_string(),
    }
    .into()
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes work on both Windows and Unix; mode=rwc creates the file
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    /// Register a user and mint their permanent token
    pub async fn create_user(&self, name: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(RepostError::InvalidInput("User name cannot be empty".to_string()));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            token: uuid::Uuid::new_v4().simple().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        };

        sqlx::query("INSERT INTO users (id, name, token, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.token)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(user)
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    /// Store a new account after checking its credentials are complete
    pub async fn create_account(&self, account: &Account) -> Result<()> {
        account.credentials.validate(account.platform)?;
        if account.name.trim().is_empty() {
            return Err(RepostError::InvalidInput("Account name cannot be empty".to_string()));
        }

        let credentials = serde_json::to_string(&account.credentials)
            .map_err(|e| corrupt("accounts", e))?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, platform, name, credentials, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.user_id)
        .bind(account.platform.as_str())
        .bind(&account.name)
        .bind(credentials)
        .bind(account.is_active)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Replace name, credentials and active flag of an existing account
    pub async fn update_account(&self, account: &Account) -> Result<()> {
        account.credentials.validate(account.platform)?;

        let credentials = serde_json::to_string(&account.credentials)
            .map_err(|e| corrupt("accounts", e))?;

        let result = sqlx::query(
            r#"
            UPDATE accounts SET name = ?, credentials = ?, is_active = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&account.name)
        .bind(credentials)
        .bind(account.is_active)
        .bind(&account.id)
        .bind(&account.user_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Account {}", account.id)).into());
        }
        Ok(())
    }

    /// Returns `false` when the account does not exist for this user
    pub async fn delete_account(&self, user_id: &str, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ? AND user_id = ?")
            .bind(account_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_account_active(
        &self,
        user_id: &str,
        account_id: &str,
        active: bool,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ? AND user_id = ?")
            .bind(active)
            .bind(account_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(result.rows_affected() > 0)
    }

    /// All accounts of a user, active or not, in creation order
    pub async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, platform, name, credentials, is_active, created_at
            FROM accounts WHERE user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows.iter().filter_map(account_from_row).collect())
    }

    /// Look up an account by id, or by name when `platform` is given
    pub async fn find_account(
        &self,
        user_id: &str,
        id_or_name: &str,
        platform: Option<PlatformKind>,
    ) -> Result<Option<Account>> {
        let accounts = self.list_accounts(user_id).await?;
        Ok(accounts.into_iter().find(|a| {
            a.id == id_or_name
                || (a.name == id_or_name && platform.map_or(true, |p| a.platform == p))
        }))
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    /// Most recent history records of a user
    pub async fn query_history(
        &self,
        user_id: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryRecord>> {
        let mut sql = String::from(
            "SELECT id, user_id, article_id, account_id, platform, status, error_log, created_at \
             FROM history WHERE user_id = ?",
        );
        if query.article_id.is_some() {
            sql.push_str(" AND article_id = ?");
        }
        if query.platform.is_some() {
            sql.push_str(" AND platform = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query(&sql).bind(user_id);
        if let Some(ref article_id) = query.article_id {
            q = q.bind(article_id);
        }
        if let Some(platform) = query.platform {
            q = q.bind(platform.as_str());
        }
        let limit = if query.limit == 0 { 20 } else { query.limit };
        q = q.bind(limit as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(DbError::SqlxError)?;
        rows.iter().map(history_from_row).collect()
    }
}

/// Decode an account row.
///
/// A row with an unknown platform is skipped. Credentials that fail to
/// decode become [`Credentials::Unreadable`] so only that account fails.
/// Decoder messages can quote stored values, so they are never logged.
fn account_from_row(row: &SqliteRow) -> Option<Account> {
    let id: String = row.get("id");
    let name: String = row.get("name");
    let platform: String = row.get("platform");

    let platform: PlatformKind = match platform.parse() {
        Ok(platform) => platform,
        Err(_) => {
            tracing::warn!(account = %name, "Skipping account {} with unknown platform '{}'", id, platform);
            return None;
        }
    };

    let raw: String = row.get("credentials");
    let credentials = serde_json::from_str::<Credentials>(&raw).unwrap_or_else(|_| {
        tracing::warn!(%platform, account = %name, "Stored credentials do not decode");
        Credentials::Unreadable(format!(
            "stored {} credentials for '{}' could not be read; remove and re-add the account",
            platform, name
        ))
    });

    Some(Account {
        id,
        user_id: row.get("user_id"),
        platform,
        name,
        credentials,
        is_active: row.get::<bool, _>("is_active"),
        created_at: row.get("created_at"),
    })
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let status: String = row.get("status");
    let variants: String = row.get("variants");
    let platforms: String = row.get("platforms");
    let selected: Option<i64> = row.get("selected_variant");

    Ok(Article {
        id: row.get("id"),
        user_id: row.get("user_id"),
        source: row.get("source"),
        original_text: row.get("original_text"),
        timestamp: row.get("timestamp"),
        status: status.parse().map_err(|e| corrupt("articles", e))?,
        variants: serde_json::from_str(&variants).map_err(|e| corrupt("articles", e))?,
        selected_variant: selected.map(|i| i as usize),
        generated_image: row.get("generated_image"),
        platforms: serde_json::from_str(&platforms).map_err(|e| corrupt("articles", e))?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
    let platform: String = row.get("platform");
    let status: String = row.get("status");

    Ok(HistoryRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        article_id: row.get("article_id"),
        account_id: row.get("account_id"),
        platform: platform.parse().map_err(|e| corrupt("history", e))?,
        status: status.parse().map_err(|e| corrupt("history", e))?,
        error_log: row.get("error_log"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl IdentityResolver for Database {
    async fn resolve_token(&self, token: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT id FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(row.map(|r| r.get("id")))
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn list_active_accounts(&self, user_id: &str) -> Result<Vec<Account>> {
        let accounts = self.list_accounts(user_id).await?;
        Ok(accounts.into_iter().filter(|a| a.is_active).collect())
    }
}

#[async_trait]
impl HistoryLog for Database {
    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (user_id, article_id, account_id, platform, status, error_log, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.article_id)
        .bind(&record.account_id)
        .bind(record.platform.as_str())
        .bind(record.status.as_str())
        .bind(&record.error_log)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn was_delivered(&self, article_id: &str, account_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM history WHERE article_id = ? AND account_id = ? AND status = ?",
        )
        .bind(article_id)
        .bind(account_id)
        .bind(PublishStatus::Success.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.get::<i64, _>("n") > 0)
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn save_article(&self, article: &Article) -> Result<()> {
        let variants = serde_json::to_string(&article.variants).map_err(|e| corrupt("articles", e))?;
        let platforms =
            serde_json::to_string(&article.platforms).map_err(|e| corrupt("articles", e))?;

        sqlx::query(
            r#"
            INSERT INTO articles
                (id, user_id, source, original_text, timestamp, status, variants,
                 selected_variant, generated_image, platforms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                variants = excluded.variants,
                selected_variant = excluded.selected_variant,
                generated_image = excluded.generated_image,
                platforms = excluded.platforms
            "#,
        )
        .bind(&article.id)
        .bind(&article.user_id)
        .bind(&article.source)
        .bind(&article.original_text)
        .bind(article.timestamp)
        .bind(article.status.as_str())
        .bind(variants)
        .bind(article.selected_variant.map(|i| i as i64))
        .bind(&article.generated_image)
        .bind(platforms)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn get_article(&self, article_id: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(
        &self,
        user_id: &str,
        status: Option<ArticleStatus>,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM articles WHERE user_id = ? AND status = ? \
                     ORDER BY timestamp DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(status.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM articles WHERE user_id = ? ORDER BY timestamp DESC LIMIT ?")
                    .bind(user_id)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(DbError::SqlxError)?;

        rows.iter().map(article_from_row).collect()
    }

    async fn update_article_status(
        &self,
        user_id: &str,
        article_id: &str,
        status: ArticleStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE articles SET status = ? WHERE id = ? AND user_id = ?")
            .bind(status.as_str())
            .bind(article_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RewriteVariant;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    async fn test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_database_initialization_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("repost.db");
        let result = Database::new(&db_path.to_string_lossy()).await;
        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_token_resolves_to_user() {
        let (_dir, db) = test_db().await;
        let user = db.create_user("alice").await.unwrap();

        assert_eq!(db.resolve_token(&user.token).await.unwrap(), Some(user.id));
        assert_eq!(db.resolve_token("bogus").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_account_round_trips_losslessly() {
        let (_dir, db) = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let account = Account::new(
            &user.id,
            PlatformKind::Vk,
            "community",
            Credentials::vk("vk1.a.token", "club123"),
        );
        db.create_account(&account).await.unwrap();

        let stored = db.list_accounts(&user.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, account.id);
        assert_eq!(stored[0].platform, PlatformKind::Vk);
        assert_eq!(stored[0].name, "community");
        match &stored[0].credentials {
            Credentials::Vk(vk) => {
                assert_eq!(vk.access_token.expose_secret(), "vk1.a.token");
                assert_eq!(vk.owner_id, "club123");
            }
            _ => panic!("Expected vk credentials"),
        }
    }

    #[tokio::test]
    async fn test_create_account_rejects_incomplete_credentials() {
        let (_dir, db) = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let account = Account::new(
            &user.id,
            PlatformKind::Telegram,
            "bot",
            Credentials::telegram("", "@chan"),
        );

        let err = db.create_account(&account).await.unwrap_err();
        assert!(matches!(
            err,
            RepostError::Platform(crate::error::PlatformError::Credential(_))
        ));
        assert!(db.list_accounts(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_accounts_are_not_listed_as_active() {
        let (_dir, db) = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let first = Account::new(&user.id, PlatformKind::Telegram, "a", Credentials::telegram("1:A", "1"));
        let second = Account::new(&user.id, PlatformKind::Telegram, "b", Credentials::telegram("1:A", "2"));
        db.create_account(&first).await.unwrap();
        db.create_account(&second).await.unwrap();

        assert!(db.set_account_active(&user.id, &first.id, false).await.unwrap());
        let active = db.list_active_accounts(&user.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "b");
    }

    #[tokio::test]
    async fn test_update_and_delete_account() {
        let (_dir, db) = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let mut account = Account::new(&user.id, PlatformKind::Telegram, "a", Credentials::telegram("1:A", "1"));
        db.create_account(&account).await.unwrap();

        account.name = "renamed".to_string();
        account.credentials = Credentials::telegram("2:B", "-100");
        db.update_account(&account).await.unwrap();

        let found = db
            .find_account(&user.id, "renamed", Some(PlatformKind::Telegram))
            .await
            .unwrap()
            .unwrap();
        match found.credentials {
            Credentials::Telegram(t) => assert_eq!(t.chat_id, "-100"),
            _ => panic!("Expected telegram credentials"),
        }

        assert!(db.delete_account(&user.id, &account.id).await.unwrap());
        assert!(!db.delete_account(&user.id, &account.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_accounts_are_scoped_to_their_user() {
        let (_dir, db) = test_db().await;
        let alice = db.create_user("alice").await.unwrap();
        let bob = db.create_user("bob").await.unwrap();
        let account = Account::new(&alice.id, PlatformKind::Telegram, "a", Credentials::telegram("1:A", "1"));
        db.create_account(&account).await.unwrap();

        assert!(!db.delete_account(&bob.id, &account.id).await.unwrap());
        assert!(db.list_accounts(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_append_and_delivery_check() {
        let (_dir, db) = test_db().await;
        let record = HistoryRecord {
            id: None,
            user_id: "u1".to_string(),
            article_id: "art-1".to_string(),
            account_id: "acc-1".to_string(),
            platform: PlatformKind::Telegram,
            status: PublishStatus::Failed,
            error_log: Some("Network error: refused".to_string()),
            created_at: 100,
        };
        db.append(&record).await.unwrap();
        assert!(!db.was_delivered("art-1", "acc-1").await.unwrap());

        let success = HistoryRecord {
            status: PublishStatus::Success,
            error_log: None,
            created_at: 200,
            ..record.clone()
        };
        db.append(&success).await.unwrap();
        assert!(db.was_delivered("art-1", "acc-1").await.unwrap());

        let history = db
            .query_history("u1", &HistoryQuery { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, PublishStatus::Success);
        assert_eq!(history[1].error_log.as_deref(), Some("Network error: refused"));
    }

    #[tokio::test]
    async fn test_history_filters() {
        let (_dir, db) = test_db().await;
        for (article, platform) in [
            ("a1", PlatformKind::Telegram),
            ("a1", PlatformKind::Vk),
            ("a2", PlatformKind::Vk),
        ] {
            db.append(&HistoryRecord {
                id: None,
                user_id: "u1".to_string(),
                article_id: article.to_string(),
                account_id: "x".to_string(),
                platform,
                status: PublishStatus::Success,
                error_log: None,
                created_at: 1,
            })
            .await
            .unwrap();
        }

        let by_article = db
            .query_history("u1", &HistoryQuery { article_id: Some("a1".to_string()), limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_article.len(), 2);

        let by_platform = db
            .query_history("u1", &HistoryQuery { platform: Some(PlatformKind::Vk), limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_platform.len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_credentials_fail_only_that_account() {
        use crate::dispatcher::{DispatchOptions, DispatchRequest, Dispatcher};
        use crate::platforms::mock::MockAdapter;
        use crate::platforms::AdapterRegistry;
        use crate::types::PublishStatus;
        use std::sync::Arc;

        let (_dir, db) = test_db().await;
        let user = db.create_user("editor").await.unwrap();
        db.create_account(&Account::new(
            &user.id,
            PlatformKind::Telegram,
            "good",
            Credentials::telegram("1:A", "@good"),
        ))
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO accounts (id, user_id, platform, name, credentials, is_active, created_at) \
             VALUES ('broken-1', ?, 'telegram', 'broken', ?, 1, 0)",
        )
        .bind(&user.id)
        .bind(r#"{"kind":"telegram","chat_id":"@c"}"#)
        .execute(&db.pool)
        .await
        .unwrap();

        let accounts = db.list_active_accounts(&user.id).await.unwrap();
        assert_eq!(accounts.len(), 2);
        let broken = accounts.iter().find(|a| a.name == "broken").unwrap();
        assert!(matches!(broken.credentials, Credentials::Unreadable(_)));

        let db = Arc::new(db);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::strict(PlatformKind::Telegram)));
        let dispatcher =
            Dispatcher::new(db.clone(), db.clone(), registry, DispatchOptions::default());
        let request = DispatchRequest {
            article_id: "a1".to_string(),
            text: "Hello".to_string(),
            image: None,
        };

        let results = dispatcher.dispatch(&user.id, &request).await.unwrap();

        assert_eq!(results.len(), 2);
        let failed = results.iter().find(|r| r.account_name == "broken").unwrap();
        assert_eq!(failed.status, PublishStatus::Failed);
        assert!(failed.error_message.as_deref().unwrap().starts_with("Credential error"));
        let ok = results.iter().find(|r| r.account_name == "good").unwrap();
        assert_eq!(ok.status, PublishStatus::Success);

        let history = db
            .query_history(&user.id, &HistoryQuery { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_article_save_get_and_status_update() {
        let (_dir, db) = test_db().await;
        let mut article = Article::new("u1", "@news", "Original text".to_string(), 1_700_000_000);
        db.save_article(&article).await.unwrap();

        article.variants = vec![RewriteVariant {
            title: "Short".to_string(),
            content: "Rewritten".to_string(),
        }];
        article.selected_variant = Some(0);
        article.status = ArticleStatus::Approved;
        article.platforms = vec![PlatformKind::Telegram];
        db.save_article(&article).await.unwrap();

        let stored = db.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Approved);
        assert_eq!(stored.postable_text(), Some("Rewritten"));
        assert_eq!(stored.platforms, vec![PlatformKind::Telegram]);

        assert!(!db
            .update_article_status("u2", &article.id, ArticleStatus::Posted)
            .await
            .unwrap());
        assert!(db
            .update_article_status("u1", &article.id, ArticleStatus::Posted)
            .await
            .unwrap());
        let approved = db
            .list_articles("u1", Some(ArticleStatus::Approved), 10)
            .await
            .unwrap();
        assert!(approved.is_empty());
        let posted = db.list_articles("u1", Some(ArticleStatus::Posted), 10).await.unwrap();
        assert_eq!(posted.len(), 1);
    }
}
