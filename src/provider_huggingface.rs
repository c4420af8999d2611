//! Hugging Face provider.
//!
//! Lists an author's public models, datasets and spaces from the Hub API.
//! The Hub returns each listing in a single response capped by `limit`. A
//! listing that reaches the cap is reported as [`FetchError::Truncated`]
//! so its kind keeps the records it already has.
//!
//! A model, a dataset and a space may share the same `author/name` id, so
//! datasets and spaces carry their URL namespace in `full_name`:
//!
//! | Kind | `full_name` | `url` | `language` |
//! |------|-------------|-------|------------|
//! | Model | `author/name` | `{web}/author/name` | `pipeline_tag` |
//! | Dataset | `datasets/author/name` | `{web}/datasets/author/name` | none |
//! | Space | `spaces/author/name` | `{web}/spaces/author/name` | `sdk` |

use anyhow::Result;
use async_trait::async_trait;
use globset::GlobSet;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::config::{build_globset, resolve_kinds, HttpConfig, HuggingFaceConfig};
use crate::error::FetchError;
use crate::http::{join_url, token_from_env, HttpClient};
use crate::models::{non_blank, parse_timestamp, ProjectKind, ProjectRecord, Source};
use crate::traits::Provider;

pub struct HuggingFaceProvider {
    config: HuggingFaceConfig,
    kinds: Vec<ProjectKind>,
    exclude: GlobSet,
    http: HttpClient,
    author: OnceCell<String>,
}

impl HuggingFaceProvider {
    pub fn new(config: HuggingFaceConfig, http: &HttpConfig) -> Result<Self> {
        let kinds = resolve_kinds(Source::HuggingFace, &config.kinds)?;
        let exclude = build_globset(&config.exclude_globs)?;
        let authorization = token_from_env(&config.token_env).map(|t| format!("Bearer {}", t));
        let http = HttpClient::new(Source::HuggingFace, http, authorization)?;

        Ok(Self {
            config,
            kinds,
            exclude,
            http,
            author: OnceCell::new(),
        })
    }

    async fn author(&self) -> Result<&str, FetchError> {
        let name = self
            .author
            .get_or_try_init(|| async {
                if let Some(name) = non_blank(self.config.author.clone()) {
                    return Ok(name);
                }
                if !self.http.has_credentials() {
                    return Err(FetchError::Config {
                        provider: Source::HuggingFace,
                        message: format!(
                            "no author configured and {} is not set",
                            self.config.token_env
                        ),
                    });
                }
                let who: ApiWhoAmI = self
                    .http
                    .get_json(&join_url(&self.config.api_url, "whoami-v2"), &[])
                    .await?;
                Ok::<String, FetchError>(who.name)
            })
            .await?;
        Ok(name.as_str())
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn source(&self) -> Source {
        Source::HuggingFace
    }

    fn description(&self) -> &str {
        "Public Hugging Face models, datasets and spaces"
    }

    fn kinds(&self) -> Vec<ProjectKind> {
        self.kinds.clone()
    }

    async fn fetch_kind(&self, kind: ProjectKind) -> Result<Vec<ProjectRecord>, FetchError> {
        if kind.source() != Source::HuggingFace {
            return Err(FetchError::Config {
                provider: Source::HuggingFace,
                message: format!("Hugging Face does not host {} records", kind),
            });
        }

        let author = self.author().await?;
        let url = join_url(&self.config.api_url, kind.plural());
        let query = [
            ("author", author.to_string()),
            ("limit", self.config.limit.to_string()),
        ];
        let items: Vec<ApiHubItem> = self.http.get_json(&url, &query).await?;

        // A listing at the cap may be truncated.
        if items.len() >= self.config.limit as usize {
            return Err(FetchError::Truncated {
                provider: Source::HuggingFace,
                url,
                limit: self.config.limit,
            });
        }

        Ok(items
            .into_iter()
            .filter(|item| !item.private.unwrap_or(false))
            .map(|item| map_item(kind, &self.config.web_url, item))
            .filter(|r| !self.exclude.is_match(&r.full_name))
            .collect())
    }
}

// ============ API payloads ============

#[derive(Deserialize)]
struct ApiWhoAmI {
    name: String,
}

#[derive(Deserialize)]
struct ApiHubItem {
    id: Option<String>,
    private: Option<bool>,
    #[serde(rename = "cardData")]
    card_data: Option<ApiCardData>,
    description: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    #[serde(rename = "lastModified")]
    last_modified: Option<String>,
    pipeline_tag: Option<String>,
    sdk: Option<String>,
    tags: Option<Vec<String>>,
    likes: Option<u64>,
    downloads: Option<u64>,
}

#[derive(Deserialize)]
struct ApiCardData {
    description: Option<String>,
}

fn map_item(kind: ProjectKind, web_url: &str, item: ApiHubItem) -> ProjectRecord {
    let id = item.id.unwrap_or_default();
    let name = id.rsplit('/').next().unwrap_or_default().to_string();

    let (full_name, language) = match kind {
        ProjectKind::Dataset => (namespaced("datasets", &id), None),
        ProjectKind::Space => (namespaced("spaces", &id), non_blank(item.sdk)),
        _ => (id.clone(), non_blank(item.pipeline_tag)),
    };
    let url = if full_name.is_empty() {
        String::new()
    } else {
        join_url(web_url, &full_name)
    };

    let description = non_blank(item.card_data.and_then(|c| c.description))
        .or_else(|| non_blank(item.description));

    ProjectRecord {
        source: Source::HuggingFace,
        kind,
        name,
        full_name,
        description,
        url,
        created_at: parse_timestamp(item.created_at.as_deref()),
        updated_at: parse_timestamp(item.last_modified.as_deref()),
        language,
        topics: item.tags.unwrap_or_default(),
        stars: None,
        forks: None,
        likes: item.likes,
        downloads: item.downloads,
    }
}

fn namespaced(prefix: &str, id: &str) -> String {
    if id.is_empty() {
        String::new()
    } else {
        format!("{}/{}", prefix, id)
    }
}
