//! Core data models used throughout Research Exchange.
//!
//! These types represent the indexed research entries, their scored query
//! results, and the compact shapes handed to the chat backend.

use serde::{Deserialize, Serialize};

/// One indexed research item: a citation plus its annotation and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique, non-empty identifier; also the URL fragment.
    pub id: String,
    /// Display title, at most 100 characters plus `...`.
    pub title: String,
    /// Annotation excerpt, at most 200 characters plus `...`.
    pub snippet: String,
    /// Lowercased search text. Scoring only, never sent to clients.
    #[serde(skip)]
    pub full_text: String,
    pub citation_text: String,
    pub annotation_text: String,
    /// Contributor name with the trailing date stripped.
    pub author: String,
    pub tags: Vec<String>,
    /// Heading of the enclosing section.
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic_id: Option<String>,
    /// Navigable link back to the entry on the site.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Entry {
    /// The `{id, title, url, snippet, author}` view passed to the chat backend.
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            snippet: self.snippet.clone(),
            author: self.author.clone(),
        }
    }
}

/// An [`Entry`] together with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub score: u64,
}

/// Compact entry shape used as grounding context for a chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub author: String,
}

impl From<&ScoredEntry> for EntrySummary {
    fn from(scored: &ScoredEntry) -> Self {
        scored.entry.summary()
    }
}

/// A contributor listed on the site together with their entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub contributions: u32,
}

/// Contributor statistics read from the team list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamData {
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub total_members: usize,
    #[serde(default)]
    pub total_contributions: u32,
}

impl TeamData {
    pub fn from_members(members: Vec<TeamMember>) -> Self {
        let total_contributions = members
            .iter()
            .fold(0u32, |total, m| total.saturating_add(m.contributions));
        Self {
            total_members: members.len(),
            total_contributions,
            members,
        }
    }
}
