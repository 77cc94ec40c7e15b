use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{Result, ShelfError};
use crate::config::OmnivoreConfig;
use crate::domain::{Article, ArticleItem, Marker};
use crate::extract::body_fragment;
use crate::source::{ArticleSource, Renderable};

const SEARCH_QUERY: &str = "query Search($after: String, $first: Int, $query: String) { search(first: $first, after: $after, query: $query) { ... on SearchSuccess { edges { node { id title author slug pageType publishedAt savedAt url labels { id name } } } } ... on SearchError { errorCodes } } }";
const ARTICLE_QUERY: &str = "query GetArticle($username: String! $slug: String!) { article(username: $username, slug: $slug) { ... on ArticleSuccess { article { id url title author content labels { id name } } } ... on ArticleError { errorCodes } } }";
const LABELS_QUERY: &str = "query GetLabels { labels { ... on LabelsSuccess { labels { ...LabelFields } } ... on LabelsError { errorCodes } } } fragment LabelFields on Label { id name }";
const SET_LABELS_MUTATION: &str = "mutation SetLabels($input: SetLabelsInput!) { setLabels(input: $input) { ... on SetLabelsSuccess { labels { id name } } ... on SetLabelsError { errorCodes } } }";

/// Omnivore GraphQL client.
pub struct OmnivoreSource {
    client: Client,
    config: OmnivoreConfig,
    /// Label name to id, fetched once per run.
    labels: OnceCell<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Label {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorCodes {
    #[serde(default)]
    error_codes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    edges: Vec<SearchEdge>,
    #[serde(flatten)]
    errors: ErrorCodes,
}

#[derive(Debug, Deserialize)]
struct SearchEdge {
    node: SearchNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNode {
    id: String,
    #[serde(default)]
    title: String,
    slug: String,
    #[serde(default)]
    saved_at: Option<String>,
    url: String,
    #[serde(default)]
    labels: Option<Vec<Label>>,
}

#[derive(Debug, Deserialize)]
struct ArticleData {
    article: ArticleResult,
}

#[derive(Debug, Deserialize)]
struct ArticleResult {
    article: Option<OmnivoreArticle>,
    #[serde(flatten)]
    errors: ErrorCodes,
}

#[derive(Debug, Deserialize)]
struct OmnivoreArticle {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct LabelsData {
    labels: LabelsResult,
}

#[derive(Debug, Deserialize)]
struct LabelsResult {
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(flatten)]
    errors: ErrorCodes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetLabelsData {
    set_labels: SetLabelsResult,
}

#[derive(Debug, Deserialize)]
struct SetLabelsResult {
    #[serde(default)]
    labels: Option<Vec<Label>>,
    #[serde(flatten)]
    errors: ErrorCodes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetLabelsInput<'a> {
    page_id: &'a str,
    label_ids: Vec<&'a str>,
}

impl ErrorCodes {
    fn check(&self, operation: &str) -> Result<()> {
        match &self.error_codes {
            Some(codes) => Err(ShelfError::Other(format!(
                "omnivore {} failed: {}",
                operation,
                codes.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

impl SearchNode {
    fn into_article_item(self) -> Option<ArticleItem> {
        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping omnivore item {} with bad URL {:?}: {}", self.id, self.url, e);
                return None;
            }
        };

        let added_at = self
            .saved_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default();

        let mut item = ArticleItem::new(self.id, url, self.title, added_at);
        item.slug = Some(self.slug);
        item.markers = self
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| Marker::new(l.id, l.name))
            .collect();
        Some(item)
    }
}

impl OmnivoreSource {
    pub fn new(config: OmnivoreConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
            labels: OnceCell::new(),
        })
    }

    async fn request<V, T>(&self, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-Accept", "application/json")
            .header(AUTHORIZATION, &self.config.api_key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        if !response.status().is_success() {
            let detail = response
                .headers()
                .get("X-Error")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(ShelfError::Provider {
                provider: self.name().to_string(),
                status: response.status().as_u16(),
                detail,
            });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        match body.data {
            Some(data) => Ok(data),
            None => {
                let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
                Err(ShelfError::Other(format!(
                    "omnivore returned no data: {}",
                    messages.join("; ")
                )))
            }
        }
    }

    async fn label_ids(&self) -> Result<&HashMap<String, String>> {
        self.labels
            .get_or_try_init(|| async move {
                debug!("Fetching omnivore label list");
                let data: LabelsData = self.request(LABELS_QUERY, json!({})).await?;
                data.labels.errors.check("GetLabels")?;
                Ok::<_, ShelfError>(
                    data.labels
                        .labels
                        .into_iter()
                        .map(|l| (l.name, l.id))
                        .collect::<HashMap<_, _>>(),
                )
            })
            .await
    }

    /// Add the label called `label` to the item, keeping its current labels.
    async fn add_label(&self, item: &ArticleItem, label: &str) -> Result<()> {
        let label_id = self
            .label_ids()
            .await?
            .get(label)
            .ok_or_else(|| ShelfError::Other(format!("omnivore label {:?} does not exist", label)))?;

        let mut label_ids: Vec<&str> = item.markers.iter().map(|m| m.id.as_str()).collect();
        if !label_ids.contains(&label_id.as_str()) {
            label_ids.push(label_id);
        }

        let input = SetLabelsInput {
            page_id: &item.id,
            label_ids,
        };
        let data: SetLabelsData = self
            .request(SET_LABELS_MUTATION, json!({ "input": input }))
            .await?;
        data.set_labels.errors.check("SetLabels")?;

        let applied = data
            .set_labels
            .labels
            .unwrap_or_default()
            .iter()
            .any(|l| l.id == *label_id);
        if !applied {
            return Err(ShelfError::Other(format!(
                "omnivore did not apply label {:?} to {}",
                label, item.id
            )));
        }

        info!("Added label '{}' to article {}", label, item.id);
        Ok(())
    }
}

#[async_trait]
impl ArticleSource for OmnivoreSource {
    fn name(&self) -> &str {
        "omnivore"
    }

    async fn list(&self) -> Result<Vec<ArticleItem>> {
        let variables = json!({
            "after": "0",
            "first": self.config.page_size,
            "query": self.config.query,
        });
        let data: SearchData = self.request(SEARCH_QUERY, variables).await?;
        data.search.errors.check("Search")?;

        Ok(data
            .search
            .edges
            .into_iter()
            .filter_map(|edge| edge.node.into_article_item())
            .collect())
    }

    fn is_handled(&self, item: &ArticleItem) -> bool {
        item.has_marker(&self.config.handled_label) || item.has_marker(&self.config.skipped_label)
    }

    async fn mark_handled(&self, item: &ArticleItem) -> Result<()> {
        self.add_label(item, &self.config.handled_label).await
    }

    async fn mark_skipped(&self, item: &ArticleItem) -> Result<()> {
        self.add_label(item, &self.config.skipped_label).await
    }

    async fn fetch_renderable(&self, item: &ArticleItem) -> Result<Renderable> {
        let slug = item.slug.as_deref().unwrap_or(&item.id);
        let variables = json!({
            "username": self.config.username,
            "slug": slug,
        });
        let data: ArticleData = self.request(ARTICLE_QUERY, variables).await?;
        data.article.errors.check("GetArticle")?;

        let found = data
            .article
            .article
            .ok_or_else(|| ShelfError::Extract(format!("omnivore has no content for {}", slug)))?;

        let source = Url::parse(&found.url).unwrap_or_else(|_| item.url.clone());
        let title = if found.title.is_empty() {
            item.title.clone()
        } else {
            found.title
        };

        let mut article = Article::with_header(&title, &source, &body_fragment(&found.content));
        article.author = found.author.filter(|a| !a.trim().is_empty());
        Ok(Renderable::Html(article))
    }
}
