//! From source message to publishable article
//!
//! `ingest` pulls raw messages into `pending` articles, `prepare` rewrites
//! (and optionally illustrates) them into `approved` ones. The selected
//! variant is what [`ContentPipeline::dispatch_request`] hands to the
//! publish service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::dispatcher::DispatchRequest;
use crate::error::{DbError, RepostError, Result};
use crate::sources::SourceFetcher;
use crate::store::ArticleStore;
use crate::transform::{AspectRatio, ContentTransform, LengthProfile};
use crate::types::{Article, ArticleStatus};

pub struct ContentPipeline {
    sources: Arc<dyn SourceFetcher>,
    transform: Arc<dyn ContentTransform>,
    articles: Arc<dyn ArticleStore>,
}

impl ContentPipeline {
    pub fn new(
        sources: Arc<dyn SourceFetcher>,
        transform: Arc<dyn ContentTransform>,
        articles: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            sources,
            transform,
            articles,
        }
    }

    /// Fetch every source and store its messages as `pending` articles.
    ///
    /// A source that cannot be fetched is skipped.
    pub async fn ingest(&self, user_id: &str, sources: &[String]) -> Result<Vec<Article>> {
        let mut created = Vec::new();

        for source in sources {
            let messages = match self.sources.fetch_recent(source).await {
                Ok(messages) => messages,
                Err(e) => {
                    warn!("Skipping source {}: {}", source, e);
                    continue;
                }
            };

            for message in messages {
                let article = Article::new(user_id, &message.source, message.text, message.timestamp);
                self.articles.save_article(&article).await?;
                created.push(article);
            }
        }

        info!("Ingested {} article(s) from {} source(s)", created.len(), sources.len());
        Ok(created)
    }

    /// Rewrite an article and approve its first variant
    ///
    /// # Errors
    ///
    /// [`RepostError::ContentTransform`] when the rewrite fails or yields
    /// nothing; the article is back in `pending` in that case. Image
    /// generation failures are not errors.
    pub async fn prepare(
        &self,
        article_id: &str,
        length: LengthProfile,
        with_image: bool,
    ) -> Result<Article> {
        let mut article = self.load(article_id).await?;
        article.status = ArticleStatus::Processing;
        self.articles.save_article(&article).await?;

        let variants = match self.transform.rewrite(&article.original_text, length).await {
            Ok(variants) if !variants.is_empty() => variants,
            outcome => {
                article.status = ArticleStatus::Pending;
                self.articles.save_article(&article).await?;
                let reason = match outcome {
                    Err(e) => e.to_string(),
                    Ok(_) => "rewrite produced no variants".to_string(),
                };
                return Err(RepostError::ContentTransform(reason));
            }
        };

        article.variants = variants;
        article.selected_variant = Some(0);
        article.status = ArticleStatus::Approved;

        if with_image {
            let text = article.postable_text().unwrap_or(&article.original_text).to_string();
            match self.illustrate(&text).await {
                Ok(image) => article.generated_image = Some(image),
                Err(e) => warn!("Image generation failed for article {}: {}", article.id, e),
            }
        }

        self.articles.save_article(&article).await?;
        Ok(article)
    }

    async fn illustrate(&self, text: &str) -> Result<String> {
        let prompt = self.transform.visual_prompt(text).await?;
        self.transform.generate_image(&prompt, AspectRatio::default()).await
    }

    pub async fn select_variant(&self, article_id: &str, index: usize) -> Result<Article> {
        let mut article = self.load(article_id).await?;
        if index >= article.variants.len() {
            return Err(RepostError::InvalidInput(format!(
                "article {} has {} variant(s), no index {}",
                article_id,
                article.variants.len(),
                index
            )));
        }
        article.selected_variant = Some(index);
        self.articles.save_article(&article).await?;
        Ok(article)
    }

    pub async fn reject(&self, article_id: &str) -> Result<()> {
        let article = self.load(article_id).await?;
        if !self
            .articles
            .update_article_status(&article.user_id, article_id, ArticleStatus::Rejected)
            .await?
        {
            return Err(DbError::NotFound(format!("article {}", article_id)).into());
        }
        Ok(())
    }

    /// Publish request for an approved article, `None` until a variant is selected
    pub fn dispatch_request(article: &Article) -> Option<DispatchRequest> {
        article.postable_text().map(|text| DispatchRequest {
            article_id: article.id.clone(),
            text: text.to_string(),
            image: article.generated_image.clone(),
        })
    }

    async fn load(&self, article_id: &str) -> Result<Article> {
        self.articles
            .get_article(article_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("article {}", article_id)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::RawMessage;
    use crate::store::MemoryStore;
    use crate::types::RewriteVariant;
    use async_trait::async_trait;

    struct FakeSources;

    #[async_trait]
    impl SourceFetcher for FakeSources {
        async fn fetch_recent(&self, source: &str) -> Result<Vec<RawMessage>> {
            if source == "broken" {
                return Err(RepostError::Source("HTTP 500".to_string()));
            }
            Ok(vec![
                RawMessage {
                    source: source.to_string(),
                    text: "one".to_string(),
                    timestamp: 1,
                },
                RawMessage {
                    source: source.to_string(),
                    text: "two".to_string(),
                    timestamp: 2,
                },
            ])
        }
    }

    #[derive(Default)]
    struct FakeTransform {
        fail_rewrite: bool,
        empty_rewrite: bool,
        fail_image: bool,
    }

    #[async_trait]
    impl ContentTransform for FakeTransform {
        async fn rewrite(&self, text: &str, length: LengthProfile) -> Result<Vec<RewriteVariant>> {
            if self.fail_rewrite {
                return Err(RepostError::ContentTransform("model unavailable".to_string()));
            }
            if self.empty_rewrite {
                return Ok(Vec::new());
            }
            Ok(vec![
                RewriteVariant {
                    title: "A".to_string(),
                    content: format!("{} ({})", text, length),
                },
                RewriteVariant {
                    title: "B".to_string(),
                    content: format!("{}!", text),
                },
            ])
        }

        async fn visual_prompt(&self, text: &str) -> Result<String> {
            Ok(format!("picture of {}", text))
        }

        async fn generate_image(&self, _prompt: &str, _aspect: AspectRatio) -> Result<String> {
            if self.fail_image {
                return Err(RepostError::ContentTransform("quota".to_string()));
            }
            Ok("https://img.example/1.png".to_string())
        }
    }

    fn pipeline(store: &MemoryStore, transform: FakeTransform) -> ContentPipeline {
        ContentPipeline::new(Arc::new(FakeSources), Arc::new(transform), Arc::new(store.clone()))
    }

    async fn seeded(store: &MemoryStore) -> Article {
        let article = Article::new("u1", "news", "original".to_string(), 1);
        store.save_article(&article).await.unwrap();
        article
    }

    #[tokio::test]
    async fn test_ingest_skips_failing_source() {
        let store = MemoryStore::new();
        let p = pipeline(&store, FakeTransform::default());

        let created = p
            .ingest("u1", &["broken".to_string(), "news".to_string()])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|a| a.status == ArticleStatus::Pending));
        let stored = store.list_articles("u1", None, 10).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].original_text, "two");
    }

    #[tokio::test]
    async fn test_prepare_approves_first_variant_with_image() {
        let store = MemoryStore::new();
        let article = seeded(&store).await;
        let p = pipeline(&store, FakeTransform::default());

        let prepared = p.prepare(&article.id, LengthProfile::Short, true).await.unwrap();

        assert_eq!(prepared.status, ArticleStatus::Approved);
        assert_eq!(prepared.postable_text(), Some("original (short)"));
        assert_eq!(prepared.generated_image.as_deref(), Some("https://img.example/1.png"));

        let request = ContentPipeline::dispatch_request(&prepared).unwrap();
        assert_eq!(request.article_id, article.id);
        assert_eq!(request.text, "original (short)");
    }

    #[tokio::test]
    async fn test_prepare_failure_reverts_to_pending() {
        let store = MemoryStore::new();
        let article = seeded(&store).await;

        for transform in [
            FakeTransform {
                fail_rewrite: true,
                ..Default::default()
            },
            FakeTransform {
                empty_rewrite: true,
                ..Default::default()
            },
        ] {
            let p = pipeline(&store, transform);
            let err = p.prepare(&article.id, LengthProfile::Medium, false).await.unwrap_err();
            assert!(matches!(err, RepostError::ContentTransform(_)));

            let stored = store.get_article(&article.id).await.unwrap().unwrap();
            assert_eq!(stored.status, ArticleStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_image_failure_keeps_article_approved() {
        let store = MemoryStore::new();
        let article = seeded(&store).await;
        let p = pipeline(
            &store,
            FakeTransform {
                fail_image: true,
                ..Default::default()
            },
        );

        let prepared = p.prepare(&article.id, LengthProfile::Long, true).await.unwrap();
        assert_eq!(prepared.status, ArticleStatus::Approved);
        assert!(prepared.generated_image.is_none());
    }

    #[tokio::test]
    async fn test_select_variant_and_reject() {
        let store = MemoryStore::new();
        let article = seeded(&store).await;
        let p = pipeline(&store, FakeTransform::default());
        p.prepare(&article.id, LengthProfile::Medium, false).await.unwrap();

        let selected = p.select_variant(&article.id, 1).await.unwrap();
        assert_eq!(selected.postable_text(), Some("original!"));
        assert!(matches!(
            p.select_variant(&article.id, 5).await,
            Err(RepostError::InvalidInput(_))
        ));

        p.reject(&article.id).await.unwrap();
        let stored = store.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ArticleStatus::Rejected);
        assert!(p.reject("missing").await.is_err());
    }

    #[test]
    fn test_dispatch_request_requires_selection() {
        let article = Article::new("u1", "news", "original".to_string(), 1);
        assert!(ContentPipeline::dispatch_request(&article).is_none());
    }
}
