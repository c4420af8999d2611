//! Canonical record model shared by every provider.
//!
//! Providers normalize their native payloads into [`ProjectRecord`]s. The
//! merge engine and the index only ever deal with this shape.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A remote catalog provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    GitHub,
    HuggingFace,
}

impl Source {
    /// Every known provider, in processing order.
    pub const ALL: [Source; 2] = [Source::GitHub, Source::HuggingFace];

    /// Lowercase identifier used on the command line, in config keys and
    /// in categorized file names.
    pub fn slug(self) -> &'static str {
        match self {
            Source::GitHub => "github",
            Source::HuggingFace => "huggingface",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::GitHub => "GitHub",
            Source::HuggingFace => "HuggingFace",
        }
    }

    /// The project kinds this provider can produce.
    pub fn kinds(self) -> &'static [ProjectKind] {
        match self {
            Source::GitHub => &[ProjectKind::Repository, ProjectKind::Gist],
            Source::HuggingFace => &[
                ProjectKind::Model,
                ProjectKind::Dataset,
                ProjectKind::Space,
            ],
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "github" | "gh" => Ok(Source::GitHub),
            "huggingface" | "hf" => Ok(Source::HuggingFace),
            _ => Err(format!(
                "unknown provider '{}'. Available: github, huggingface",
                s
            )),
        }
    }
}

/// The kind of artifact a record describes. Each kind belongs to exactly
/// one [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProjectKind {
    Repository,
    Gist,
    Model,
    Dataset,
    Space,
}

impl ProjectKind {
    pub fn source(self) -> Source {
        match self {
            ProjectKind::Repository | ProjectKind::Gist => Source::GitHub,
            ProjectKind::Model | ProjectKind::Dataset | ProjectKind::Space => Source::HuggingFace,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ProjectKind::Repository => "repository",
            ProjectKind::Gist => "gist",
            ProjectKind::Model => "model",
            ProjectKind::Dataset => "dataset",
            ProjectKind::Space => "space",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ProjectKind::Repository => "repositories",
            ProjectKind::Gist => "gists",
            ProjectKind::Model => "models",
            ProjectKind::Dataset => "datasets",
            ProjectKind::Space => "spaces",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::Repository => "Repository",
            ProjectKind::Gist => "Gist",
            ProjectKind::Model => "Model",
            ProjectKind::Dataset => "Dataset",
            ProjectKind::Space => "Space",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let kind = match lowered.as_str() {
            "repository" | "repositories" | "repo" | "repos" => ProjectKind::Repository,
            "gist" | "gists" => ProjectKind::Gist,
            "model" | "models" => ProjectKind::Model,
            "dataset" | "datasets" => ProjectKind::Dataset,
            "space" | "spaces" => ProjectKind::Space,
            _ => {
                return Err(format!(
                    "unknown project type '{}'. Available: repository, gist, model, dataset, space",
                    s
                ))
            }
        };
        Ok(kind)
    }
}

/// Identity of a record across the whole index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey {
    pub source: Source,
    pub full_name: String,
}

impl ProjectKey {
    pub fn new(source: Source, full_name: impl Into<String>) -> Self {
        Self {
            source,
            full_name: full_name.into(),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.full_name)
    }
}

/// One entry in the project index.
///
/// Absent optional fields serialize as `null`; missing fields in stored
/// JSON deserialize as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub source: Source,
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub likes: Option<u64>,
    pub downloads: Option<u64>,
}

impl ProjectRecord {
    /// A record with only its required fields set.
    pub fn new(
        kind: ProjectKind,
        name: impl Into<String>,
        full_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source: kind.source(),
            kind,
            name: name.into(),
            full_name: full_name.into(),
            description: None,
            url: url.into(),
            created_at: None,
            updated_at: None,
            language: None,
            topics: Vec::new(),
            stars: None,
            forks: None,
            likes: None,
            downloads: None,
        }
    }

    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(self.source, self.full_name.clone())
    }

    /// Best available raw identifier, used in diagnostics.
    pub fn raw_id(&self) -> &str {
        [&self.full_name, &self.name, &self.url]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("<unidentified>")
    }

    /// Check that the required fields are present and that the record's
    /// type belongs to its source.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("name", &self.name),
            ("full_name", &self.full_name),
            ("url", &self.url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    provider: self.source,
                    id: self.raw_id().to_string(),
                    field,
                });
            }
        }

        let owner = self.kind.source();
        if owner != self.source {
            return Err(ValidationError::KindMismatch {
                provider: self.source,
                id: self.raw_id().to_string(),
                kind: self.kind,
                owner,
            });
        }

        Ok(())
    }
}

/// Canonical display order: newest `created_at` first, records without a
/// creation time last, then `full_name` ascending, then source.
pub fn canonical_cmp(a: &ProjectRecord, b: &ProjectRecord) -> Ordering {
    let by_created = match (&a.created_at, &b.created_at) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_created
        .then_with(|| a.full_name.cmp(&b.full_name))
        .then_with(|| a.source.cmp(&b.source))
}

/// Parse a provider timestamp (RFC 3339, `Z` or offset, optional
/// fractional seconds). Unparseable values become `None`.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Trim a provider-supplied optional string, treating blank as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
