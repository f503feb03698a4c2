use super::category::BlockingCategory;
use super::hash::DomainHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a block-list entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Curated,
    Imported,
    User,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Curated => "curated",
            EntrySource::Imported => "imported",
            EntrySource::User => "user",
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntrySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "curated" => Ok(EntrySource::Curated),
            "imported" => Ok(EntrySource::Imported),
            "user" => Ok(EntrySource::User),
            other => Err(format!("unknown entry source: {}", other)),
        }
    }
}

/// A persisted block-list row.
///
/// For plain entries `domain_hash` is the hash of the blocked domain and
/// `pattern` the wildcard pattern. For regex entries `domain_hash` is the
/// hash of the expression source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub domain_hash: DomainHash,
    pub pattern: String,
    pub category: BlockingCategory,
    pub confidence: f32,
    pub is_regex: bool,
    pub source: EntrySource,
    pub added_by_user: bool,
    pub is_active: bool,
}

impl SiteEntry {
    pub fn curated(domain: &str, category: BlockingCategory) -> Self {
        Self {
            domain_hash: DomainHash::of(domain),
            pattern: domain.trim().to_lowercase(),
            category,
            confidence: 1.0,
            is_regex: false,
            source: EntrySource::Curated,
            added_by_user: false,
            is_active: true,
        }
    }

    pub fn user(domain: &str, category: BlockingCategory) -> Self {
        Self {
            source: EntrySource::User,
            added_by_user: true,
            ..Self::curated(domain, category)
        }
    }

    pub fn regex(source: &str, category: BlockingCategory, confidence: f32) -> Self {
        Self {
            domain_hash: DomainHash::of(source),
            pattern: source.to_string(),
            category,
            confidence: confidence.clamp(0.0, 1.0),
            is_regex: true,
            source: EntrySource::Curated,
            added_by_user: false,
            is_active: true,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Curated guidance shown alongside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    pub category: BlockingCategory,
    pub locale: String,
    pub text: String,
    pub reference: String,
}

/// A user's claim that an address was blocked wrongly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FalsePositiveReport {
    pub url_hash: DomainHash,
    pub original_url: String,
    pub reason: String,
    pub reported_at: i64,
}
