use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::app::{Result, ShelfError};
use crate::config::PocketConfig;
use crate::domain::{ArticleItem, Marker};
use crate::extract::ReadableExtractor;
use crate::source::{ArticleSource, Renderable};

/// Pocket v3 API client.
pub struct PocketSource {
    client: Client,
    config: PocketConfig,
    extractor: ReadableExtractor,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    /// Pocket sends `[]` instead of `{}` when nothing matches.
    #[serde(default, deserialize_with = "list_or_empty")]
    list: HashMap<String, PocketItem>,
}

#[derive(Debug, Deserialize)]
struct PocketItem {
    #[serde(default)]
    item_id: String,
    #[serde(default)]
    given_url: String,
    #[serde(default)]
    resolved_url: String,
    #[serde(default)]
    given_title: String,
    #[serde(default)]
    resolved_title: String,
    #[serde(default)]
    time_added: String,
    #[serde(default, deserialize_with = "list_or_empty")]
    tags: HashMap<String, PocketTag>,
}

#[derive(Debug, Deserialize)]
struct PocketTag {
    tag: String,
}

#[derive(Debug, Serialize)]
struct ModifyRequest<'a> {
    consumer_key: &'a str,
    access_token: &'a str,
    actions: Vec<ModifyAction<'a>>,
}

#[derive(Debug, Serialize)]
struct ModifyAction<'a> {
    action: &'a str,
    item_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a str>,
}

fn list_or_empty<'de, D, T>(deserializer: D) -> std::result::Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(HashMap<String, T>),
        List(Vec<Value>),
    }

    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => map,
        MapOrList::List(_) => HashMap::new(),
    })
}

impl PocketItem {
    fn into_article_item(self, key: String) -> Option<ArticleItem> {
        let raw_url = if self.resolved_url.is_empty() {
            &self.given_url
        } else {
            &self.resolved_url
        };
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping pocket item {} with bad URL {:?}: {}", key, raw_url, e);
                return None;
            }
        };

        let title = if self.resolved_title.is_empty() {
            self.given_title
        } else {
            self.resolved_title
        };

        let added_at = self
            .time_added
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_default();

        let id = if self.item_id.is_empty() { key } else { self.item_id };

        let mut item = ArticleItem::new(id, url, title, added_at);
        item.markers = self
            .tags
            .into_values()
            .map(|t| Marker::new(t.tag.clone(), t.tag))
            .collect();
        Some(item)
    }
}

impl PocketSource {
    pub fn new(config: PocketConfig, extractor: ReadableExtractor) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
            extractor,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v3/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("X-Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
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

        Ok(response)
    }
}

#[async_trait]
impl ArticleSource for PocketSource {
    fn name(&self) -> &str {
        "pocket"
    }

    async fn list(&self) -> Result<Vec<ArticleItem>> {
        let mut body: Map<String, Value> = self
            .config
            .request_params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        body.insert("consumer_key".into(), self.config.consumer_key.clone().into());
        body.insert("access_token".into(), self.config.access_token.clone().into());

        let retrieved: RetrieveResponse = self.post("get", &body).await?.json().await?;

        let mut items: Vec<ArticleItem> = retrieved
            .list
            .into_iter()
            .filter_map(|(key, item)| item.into_article_item(key))
            .collect();

        // Latest added article first
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        debug!("Pocket returned {} items", items.len());

        Ok(items)
    }

    fn is_handled(&self, item: &ArticleItem) -> bool {
        item.has_marker(&self.config.handled_tag)
    }

    async fn mark_handled(&self, item: &ArticleItem) -> Result<()> {
        let request = ModifyRequest {
            consumer_key: &self.config.consumer_key,
            access_token: &self.config.access_token,
            actions: vec![
                ModifyAction {
                    action: "tags_add",
                    item_id: &item.id,
                    tags: Some(&self.config.handled_tag),
                },
                ModifyAction {
                    action: "archive",
                    item_id: &item.id,
                    tags: None,
                },
            ],
        };

        self.post("send", &request).await?;
        debug!("Tagged pocket item {} as {}", item.id, self.config.handled_tag);
        Ok(())
    }

    async fn fetch_renderable(&self, item: &ArticleItem) -> Result<Renderable> {
        self.extractor.extract(&item.url, &item.title).await
    }
}
