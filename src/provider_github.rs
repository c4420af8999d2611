//! GitHub provider.
//!
//! Lists a user's public repositories and public gists through the REST
//! API, following page-number pagination until a short page is returned.
//!
//! # Configuration
//!
//! ```toml
//! [providers.github]
//! username = "octocat"          # optional when a token is available
//! token_env = "GITHUB_TOKEN"
//! kinds = ["repository", "gist"]
//! exclude_globs = ["octocat/scratch-*"]
//! ```
//!
//! # Record mapping
//!
//! | Kind | `full_name` | `url` |
//! |------|-------------|-------|
//! | Repository | `owner/name` | `html_url` |
//! | Gist | `owner/gist:<id>` | `html_url` |
//!
//! A listing still returning full pages after `max_pages` is an error
//! rather than a partial batch.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use globset::GlobSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::config::{build_globset, resolve_kinds, GitHubConfig, HttpConfig};
use crate::error::FetchError;
use crate::http::{join_url, token_from_env, HttpClient};
use crate::models::{non_blank, parse_timestamp, ProjectKind, ProjectRecord, Source};
use crate::traits::{Provider, RateLimit};

pub struct GitHubProvider {
    config: GitHubConfig,
    kinds: Vec<ProjectKind>,
    exclude: GlobSet,
    http: HttpClient,
    username: OnceCell<String>,
}

impl GitHubProvider {
    pub fn new(config: GitHubConfig, http: &HttpConfig) -> Result<Self> {
        let kinds = resolve_kinds(Source::GitHub, &config.kinds)?;
        let exclude = build_globset(&config.exclude_globs)?;
        let authorization = token_from_env(&config.token_env).map(|t| format!("Bearer {}", t));
        let http = HttpClient::new(Source::GitHub, http, authorization)?;

        Ok(Self {
            config,
            kinds,
            exclude,
            http,
            username: OnceCell::new(),
        })
    }

    /// The configured username, or the token owner's login.
    async fn username(&self) -> Result<&str, FetchError> {
        let name = self
            .username
            .get_or_try_init(|| async {
                if let Some(name) = non_blank(self.config.username.clone()) {
                    return Ok(name);
                }
                if !self.http.has_credentials() {
                    return Err(FetchError::Config {
                        provider: Source::GitHub,
                        message: format!(
                            "no username configured and {} is not set",
                            self.config.token_env
                        ),
                    });
                }
                let user: ApiUser = self
                    .http
                    .get_json(&join_url(&self.config.api_url, "user"), &[])
                    .await?;
                Ok::<String, FetchError>(user.login)
            })
            .await?;
        Ok(name.as_str())
    }

    async fn fetch_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let url = join_url(&self.config.api_url, path);
        let per_page = self.config.per_page;
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query = extra.to_vec();
            query.push(("per_page", per_page.to_string()));
            query.push(("page", page.to_string()));

            let batch: Vec<T> = self.http.get_json(&url, &query).await?;
            let n = batch.len();
            tracing::debug!(%url, page, items = n, "fetched page");
            items.extend(batch);

            if n < per_page as usize {
                break;
            }
            if page >= self.config.max_pages {
                return Err(FetchError::Config {
                    provider: Source::GitHub,
                    message: format!(
                        "{} still returned full pages after {} pages; raise providers.github.max_pages",
                        url, page
                    ),
                });
            }
            page += 1;
        }

        Ok(items)
    }

    async fn fetch_repositories(&self) -> Result<Vec<ProjectRecord>, FetchError> {
        let user = self.username().await?;
        let repos: Vec<ApiRepo> = self
            .fetch_paged(
                &format!("users/{}/repos", user),
                &[("type", "public".to_string()), ("sort", "updated".to_string())],
            )
            .await?;

        Ok(repos
            .into_iter()
            .filter(|r| !r.private.unwrap_or(false))
            .map(map_repo)
            .collect())
    }

    async fn fetch_gists(&self) -> Result<Vec<ProjectRecord>, FetchError> {
        let user = self.username().await?;
        let gists: Vec<ApiGist> = self
            .fetch_paged(&format!("users/{}/gists", user), &[])
            .await?;

        Ok(gists
            .into_iter()
            .filter(|g| g.public.unwrap_or(true))
            .map(|g| map_gist(user, g))
            .collect())
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    fn source(&self) -> Source {
        Source::GitHub
    }

    fn description(&self) -> &str {
        "Public GitHub repositories and gists"
    }

    fn kinds(&self) -> Vec<ProjectKind> {
        self.kinds.clone()
    }

    async fn rate_limit(&self) -> Result<Option<RateLimit>, FetchError> {
        let status: ApiRateLimit = self
            .http
            .get_json(&join_url(&self.config.api_url, "rate_limit"), &[])
            .await?;
        Ok(Some(RateLimit {
            limit: status.rate.limit,
            remaining: status.rate.remaining,
            reset: status
                .rate
                .reset
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
        }))
    }

    async fn fetch_kind(&self, kind: ProjectKind) -> Result<Vec<ProjectRecord>, FetchError> {
        let records = match kind {
            ProjectKind::Repository => self.fetch_repositories().await?,
            ProjectKind::Gist => self.fetch_gists().await?,
            other => {
                return Err(FetchError::Config {
                    provider: Source::GitHub,
                    message: format!("GitHub does not host {} records", other),
                })
            }
        };

        Ok(records
            .into_iter()
            .filter(|r| !self.exclude.is_match(&r.full_name))
            .collect())
    }
}

// ============ API payloads ============

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiRateLimit {
    rate: ApiRate,
}

#[derive(Deserialize)]
struct ApiRate {
    limit: u64,
    remaining: u64,
    reset: Option<i64>,
}

#[derive(Deserialize)]
struct ApiRepo {
    name: Option<String>,
    full_name: Option<String>,
    description: Option<String>,
    html_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    language: Option<String>,
    topics: Option<Vec<String>>,
    private: Option<bool>,
    stargazers_count: Option<u64>,
    forks_count: Option<u64>,
}

#[derive(Deserialize)]
struct ApiGist {
    id: Option<String>,
    description: Option<String>,
    html_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    public: Option<bool>,
    files: Option<BTreeMap<String, ApiGistFile>>,
}

#[derive(Deserialize)]
struct ApiGistFile {
    language: Option<String>,
}

fn map_repo(repo: ApiRepo) -> ProjectRecord {
    ProjectRecord {
        source: Source::GitHub,
        kind: ProjectKind::Repository,
        name: repo.name.unwrap_or_default(),
        full_name: repo.full_name.unwrap_or_default(),
        description: non_blank(repo.description),
        url: repo.html_url.unwrap_or_default(),
        created_at: parse_timestamp(repo.created_at.as_deref()),
        updated_at: parse_timestamp(repo.updated_at.as_deref()),
        language: non_blank(repo.language),
        topics: repo.topics.unwrap_or_default(),
        stars: repo.stargazers_count,
        forks: repo.forks_count,
        likes: None,
        downloads: None,
    }
}

/// Gists have no name: the id serves as name, the first file (by name)
/// supplies the language and a fallback description.
fn map_gist(user: &str, gist: ApiGist) -> ProjectRecord {
    let id = gist.id.unwrap_or_default();
    let files = gist.files.unwrap_or_default();
    let first = files.iter().next();

    let description = non_blank(gist.description)
        .or_else(|| first.map(|(filename, _)| format!("Gist containing {}", filename)));
    let language = first.and_then(|(_, file)| non_blank(file.language.clone()));

    ProjectRecord {
        source: Source::GitHub,
        kind: ProjectKind::Gist,
        full_name: if id.is_empty() {
            String::new()
        } else {
            format!("{}/gist:{}", user, id)
        },
        name: id,
        description,
        url: gist.html_url.unwrap_or_default(),
        created_at: parse_timestamp(gist.created_at.as_deref()),
        updated_at: parse_timestamp(gist.updated_at.as_deref()),
        language,
        topics: Vec::new(),
        stars: None,
        forks: None,
        likes: None,
        downloads: None,
    }
}
