//! TOML configuration.
//!
//! ```toml
//! [index]
//! path = "./data/project_index.json"
//! organized_dir = "./data/organized"   # optional
//!
//! [http]
//! timeout_secs = 30
//! max_retries = 3
//!
//! [providers.github]
//! username = "octocat"
//! kinds = ["repository", "gist"]
//! exclude_globs = ["octocat/*.github.io"]
//!
//! [providers.huggingface]
//! author = "octocat"
//! ```
//!
//! Credentials are never stored in the file. Each provider names the
//! environment variable holding its token (`token_env`).

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::{ProjectKind, Source};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub organized_dir: Option<PathBuf>,
}

impl IndexConfig {
    /// Directory for the per-`(source, type)` files. Defaults to
    /// `organized/` next to the unified index.
    pub fn organized_dir(&self) -> PathBuf {
        match &self.organized_dir {
            Some(dir) => dir.clone(),
            None => self
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("organized"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay of the exponential backoff between retries.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    concat!("pidx/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    pub github: Option<GitHubConfig>,
    pub huggingface: Option<HuggingFaceConfig>,
}

impl ProvidersConfig {
    pub fn is_configured(&self, source: Source) -> bool {
        match source {
            Source::GitHub => self.github.is_some(),
            Source::HuggingFace => self.huggingface.is_some(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// Account to index. Resolved from the token via `GET /user` when unset.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_github_kinds")]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Pages fetched per listing before giving up on it as unbounded.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_github_kinds() -> Vec<String> {
    vec!["repository".to_string(), "gist".to_string()]
}
fn default_per_page() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct HuggingFaceConfig {
    /// Author to index. Resolved from the token via `GET /whoami-v2` when unset.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "default_hf_token_env")]
    pub token_env: String,
    #[serde(default = "default_hf_api_url")]
    pub api_url: String,
    #[serde(default = "default_hf_web_url")]
    pub web_url: String,
    #[serde(default = "default_hf_kinds")]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_hf_token_env() -> String {
    "HF_TOKEN".to_string()
}
fn default_hf_api_url() -> String {
    "https://huggingface.co/api".to_string()
}
fn default_hf_web_url() -> String {
    "https://huggingface.co".to_string()
}
fn default_hf_kinds() -> Vec<String> {
    vec![
        "model".to_string(),
        "dataset".to_string(),
        "space".to_string(),
    ]
}
fn default_limit() -> u32 {
    500
}

/// Parse configured kind names for `source`, rejecting kinds that belong
/// to another provider.
pub fn resolve_kinds(source: Source, names: &[String]) -> Result<Vec<ProjectKind>> {
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: ProjectKind = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!("providers.{}.kinds: {}", source.slug(), e))?;
        if kind.source() != source {
            bail!(
                "providers.{}.kinds: '{}' is a {} type",
                source.slug(),
                name,
                kind.source()
            );
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.index.path.as_os_str().is_empty() {
        bail!("index.path must not be empty");
    }

    if config.providers.github.is_none() && config.providers.huggingface.is_none() {
        bail!("at least one provider must be configured under [providers]");
    }

    if config.http.timeout_secs == 0 {
        bail!("http.timeout_secs must be > 0");
    }

    if let Some(gh) = &config.providers.github {
        resolve_kinds(Source::GitHub, &gh.kinds)?;
        if !(1..=100).contains(&gh.per_page) {
            bail!("providers.github.per_page must be in [1, 100]");
        }
        if gh.max_pages == 0 {
            bail!("providers.github.max_pages must be >= 1");
        }
        validate_globs("providers.github.exclude_globs", &gh.exclude_globs)?;
    }

    if let Some(hf) = &config.providers.huggingface {
        resolve_kinds(Source::HuggingFace, &hf.kinds)?;
        if hf.limit == 0 {
            bail!("providers.huggingface.limit must be >= 1");
        }
        validate_globs("providers.huggingface.exclude_globs", &hf.exclude_globs)?;
    }

    Ok(config)
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        Glob::new(pattern).with_context(|| format!("{}: invalid pattern '{}'", field, pattern))?;
    }
    Ok(())
}

/// Build a [`GlobSet`] from a list of glob pattern strings.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
