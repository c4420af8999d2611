//! Provider listing for `pidx sources`.

use anyhow::Result;

use crate::config::{resolve_kinds, Config};
use crate::http::token_from_env;
use crate::models::{ProjectKind, Source};

/// Configuration status of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub source: Source,
    pub configured: bool,
    /// Configured account, if any. When absent it is resolved from the token.
    pub account: Option<String>,
    pub token_env: Option<String>,
    pub has_token: bool,
    pub kinds: Vec<ProjectKind>,
}

impl SourceStatus {
    /// Whether a sync can resolve which account to index.
    pub fn is_ready(&self) -> bool {
        self.configured && (self.account.is_some() || self.has_token)
    }
}

pub fn get_sources(config: &Config) -> Result<Vec<SourceStatus>> {
    let mut statuses = Vec::new();
    for source in Source::ALL {
        let (account, token_env, kinds) = match source {
            Source::GitHub => match &config.providers.github {
                Some(gh) => (
                    gh.username.clone(),
                    Some(gh.token_env.clone()),
                    resolve_kinds(source, &gh.kinds)?,
                ),
                None => (None, None, Vec::new()),
            },
            Source::HuggingFace => match &config.providers.huggingface {
                Some(hf) => (
                    hf.author.clone(),
                    Some(hf.token_env.clone()),
                    resolve_kinds(source, &hf.kinds)?,
                ),
                None => (None, None, Vec::new()),
            },
        };

        let has_token = token_env
            .as_deref()
            .map(|var| token_from_env(var).is_some())
            .unwrap_or(false);

        statuses.push(SourceStatus {
            source,
            configured: config.providers.is_configured(source),
            account: account.filter(|a| !a.trim().is_empty()),
            token_env,
            has_token,
            kinds,
        });
    }
    Ok(statuses)
}

pub fn list_sources(config: &Config) -> Result<()> {
    let statuses = get_sources(config)?;

    println!(
        "{:<14} {:<16} {:<16} {:<8} KINDS",
        "PROVIDER", "STATUS", "ACCOUNT", "TOKEN"
    );
    for s in &statuses {
        let status = if !s.configured {
            "NOT CONFIGURED"
        } else if s.is_ready() {
            "OK"
        } else {
            "NO ACCOUNT"
        };
        let account = s.account.as_deref().unwrap_or(if s.configured {
            "(from token)"
        } else {
            "-"
        });
        let token = match (&s.token_env, s.has_token) {
            (Some(_), true) => "set",
            (Some(_), false) => "unset",
            (None, _) => "-",
        };
        let kinds: Vec<&str> = s.kinds.iter().map(|k| k.plural()).collect();
        println!(
            "{:<14} {:<16} {:<16} {:<8} {}",
            s.source.slug(),
            status,
            account,
            token,
            if kinds.is_empty() {
                "-".to_string()
            } else {
                kinds.join(", ")
            }
        );
    }

    Ok(())
}
