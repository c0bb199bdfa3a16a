//! Entry extraction: rendered content tree → flat [`Entry`] collection.
//!
//! # Algorithm
//!
//! For every candidate node (class [`ExtractorConfig::entry_class`]), in
//! document order:
//!
//! 1. Resolve the id: the node's own `id`, else a slug of the citation's
//!    source title, else `entry-{index}`. Ids already used in this build fall
//!    back to the positional form. A synthesized id is written back onto the
//!    node so the next extraction reads it instead of regenerating it.
//! 2. Require the citation sub-node; without one the entry is skipped.
//! 3. Title from the source-title attribute, else the citation's first
//!    sentence.
//! 4. Annotation text (empty when absent).
//! 5. Author: the author line up to its first digit (dates start with one).
//! 6. Tags: comma-separated attribute, trimmed, empties and duplicates dropped.
//! 7. Section: the nearest identified ancestor. If a subtopic control
//!    (`showSubtopicPage('topic', 'subtopic')`) targets that section, the
//!    entry lives on a subtopic page; otherwise the section is the topic.
//! 8. URL from `(topic, subtopic, id)`.
//! 9. Lowercased full text for scoring.
//!
//! A failure on one entry is logged and counted in [`Extraction::skipped`];
//! the remaining entries are still extracted.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::{Entry, TeamData, TeamMember};
use crate::tree::{ContentTree, Predicate};

/// Maximum title length in characters before truncation.
pub const TITLE_MAX_CHARS: usize = 100;
/// Maximum snippet length in characters before truncation.
pub const SNIPPET_MAX_CHARS: usize = 200;
/// Maximum slug length in characters.
pub const SLUG_MAX_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

static SUBTOPIC_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"showSubtopicPage\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)"#)
        .expect("subtopic pattern is valid")
});

/// Class and attribute names the extractor looks for.
///
/// Every field has a default matching the site's markup, so an empty
/// `[extractor]` table (or none at all) is valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractorConfig {
    pub entry_class: String,
    pub citation_class: String,
    pub annotation_class: String,
    pub author_class: String,
    pub tags_attr: String,
    pub source_title_attr: String,
    pub source_url_attr: String,
    pub header_class: String,
    pub header_tag: String,
    pub subtopic_class: String,
    pub navigation_attr: String,
    /// Path prefix for entry URLs.
    pub base_path: String,
    /// `id` of the element holding the contributor list.
    pub team_list_id: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            entry_class: "bib-entry".to_string(),
            citation_class: "bib-citation".to_string(),
            annotation_class: "annotation-text".to_string(),
            author_class: "annotation-author".to_string(),
            tags_attr: "data-tags".to_string(),
            source_title_attr: "data-source-title".to_string(),
            source_url_attr: "data-source-url".to_string(),
            header_class: "topic-page-header".to_string(),
            header_tag: "h1".to_string(),
            subtopic_class: "subtopic-card".to_string(),
            navigation_attr: "onclick".to_string(),
            base_path: "/".to_string(),
            team_list_id: "team-members-list".to_string(),
        }
    }
}

/// Result of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted entries in document order.
    pub entries: Vec<Entry>,
    /// Candidate nodes that were skipped.
    pub skipped: usize,
}

/// A `(topic, subtopic)` pair read from one subtopic navigation control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicLink {
    pub topic: String,
    pub subtopic: String,
}

impl SubtopicLink {
    /// Parse `showSubtopicPage('topic', 'subtopic')` out of a handler string.
    pub fn parse(handler: &str) -> Option<Self> {
        let caps = SUBTOPIC_CALL.captures(handler)?;
        Some(Self {
            topic: caps[1].to_string(),
            subtopic: caps[2].to_string(),
        })
    }

    /// Whether this control navigates to the section with `section_id`.
    ///
    /// Subtopic pages are rendered either under the bare subtopic id or
    /// under `{topic}-{subtopic}`.
    pub fn targets(&self, section_id: &str) -> bool {
        if self.subtopic == section_id {
            return true;
        }
        section_id
            .strip_prefix(self.topic.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|rest| rest == self.subtopic)
    }
}

/// Extract every entry from `tree`.
///
/// Synthesized ids are written back onto their nodes, hence `&mut`.
pub fn extract_entries<T: ContentTree>(tree: &mut T, config: &ExtractorConfig) -> Extraction {
    let candidates = tree.select_all(&Predicate::Class(&config.entry_class));
    let links = collect_subtopic_links(tree, config);

    let mut taken: HashSet<String> = HashSet::new();
    let mut extraction = Extraction::default();

    for (index, node) in candidates.into_iter().enumerate() {
        let id = resolve_id(tree, config, node, index, &mut taken);
        match extract_entry(tree, config, &links, node, id) {
            Ok(entry) => extraction.entries.push(entry),
            Err(e) => {
                warn!(index, error = %e, "skipping bibliography entry");
                extraction.skipped += 1;
            }
        }
    }

    debug!(
        entries = extraction.entries.len(),
        skipped = extraction.skipped,
        subtopic_links = links.len(),
        "extraction finished"
    );
    extraction
}

/// Read every subtopic navigation control in the document.
pub fn collect_subtopic_links<T: ContentTree>(tree: &T, config: &ExtractorConfig) -> Vec<SubtopicLink> {
    let predicates = [
        Predicate::Class(&config.subtopic_class),
        Predicate::HasAttribute(&config.navigation_attr),
    ];
    tree.select_all(&Predicate::All(&predicates))
        .into_iter()
        .filter_map(|n| tree.attribute(n, &config.navigation_attr))
        .filter_map(SubtopicLink::parse)
        .collect()
}

fn resolve_id<T: ContentTree>(
    tree: &mut T,
    config: &ExtractorConfig,
    node: T::Node,
    index: usize,
    taken: &mut HashSet<String>,
) -> String {
    let existing = tree
        .attribute(node, "id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let candidate = existing.clone().or_else(|| {
        tree.select_first(node, &Predicate::Class(&config.citation_class))
            .and_then(|c| tree.attribute(c, &config.source_title_attr))
            .map(slugify)
            .filter(|slug| !slug.is_empty())
    });

    let id = match candidate {
        Some(c) if !taken.contains(&c) => c,
        _ => positional_id(index, taken),
    };

    if existing.as_deref() != Some(id.as_str()) {
        tree.set_attribute(node, "id", &id);
    }
    taken.insert(id.clone());
    id
}

fn positional_id(index: usize, taken: &HashSet<String>) -> String {
    let base = format!("entry-{}", index);
    if !taken.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|id| !taken.contains(id))
        .unwrap_or(base)
}

fn extract_entry<T: ContentTree>(
    tree: &T,
    config: &ExtractorConfig,
    links: &[SubtopicLink],
    node: T::Node,
    id: String,
) -> Result<Entry, ExtractError> {
    let citation = tree
        .select_first(node, &Predicate::Class(&config.citation_class))
        .ok_or_else(|| ExtractError::MissingCitation {
            id: id.clone(),
            class: config.citation_class.clone(),
        })?;

    let source_title = tree
        .attribute(citation, &config.source_title_attr)
        .map(str::trim)
        .unwrap_or_default();
    let source_url = tree
        .attribute(citation, &config.source_url_attr)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let citation_text = tree.text(citation).trim().to_string();

    let annotation_text = tree
        .select_first(node, &Predicate::Class(&config.annotation_class))
        .map(|n| tree.text(n).trim().to_string())
        .unwrap_or_default();

    let author = tree
        .select_first(node, &Predicate::Class(&config.author_class))
        .map(|n| author_name(&tree.text(n)))
        .unwrap_or_default();

    let tags = tree
        .attribute(node, &config.tags_attr)
        .map(parse_tags)
        .unwrap_or_default();

    let (context, topic_id, subtopic_id) = match tree.closest_with_id(node) {
        Some(section) => {
            let section_id = tree.attribute(section, "id").unwrap_or_default();
            let (topic, subtopic) = resolve_topic(section_id, links);
            (section_heading(tree, config, section), topic, subtopic)
        }
        None => (String::new(), None, None),
    };

    let title = if source_title.is_empty() {
        first_sentence(&citation_text).to_string()
    } else {
        source_title.to_string()
    };
    let title = truncate_chars(&title, TITLE_MAX_CHARS);
    let snippet = truncate_chars(&annotation_text, SNIPPET_MAX_CHARS);

    let full_text = compose_full_text(&title, &citation_text, &annotation_text, &tags, &context);
    let url = entry_url(
        &config.base_path,
        topic_id.as_deref(),
        subtopic_id.as_deref(),
        &id,
    );

    Ok(Entry {
        id,
        title,
        snippet,
        full_text,
        citation_text,
        annotation_text,
        author,
        tags,
        context,
        topic_id,
        subtopic_id,
        url,
        source_url,
    })
}

fn section_heading<T: ContentTree>(tree: &T, config: &ExtractorConfig, section: T::Node) -> String {
    tree.select_first(section, &Predicate::Class(&config.header_class))
        .and_then(|header| tree.select_first(header, &Predicate::Tag(&config.header_tag)))
        .map(|h| tree.text(h).trim().to_string())
        .unwrap_or_default()
}

/// Map a section id to `(topic, subtopic)` using the subtopic controls.
pub fn resolve_topic(section_id: &str, links: &[SubtopicLink]) -> (Option<String>, Option<String>) {
    if section_id.is_empty() {
        return (None, None);
    }
    match links.iter().find(|link| link.targets(section_id)) {
        Some(link) => (Some(link.topic.clone()), Some(link.subtopic.clone())),
        None => (Some(section_id.to_string()), None),
    }
}

/// Lowercase, collapse non-alphanumeric runs to `-`, trim dashes, cap length.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    let capped: String = slug.chars().take(SLUG_MAX_CHARS).collect();
    capped.trim_end_matches('-').to_string()
}

/// Cut to `max` characters, appending `...` when anything was removed.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// The author line up to its first digit, trimmed.
pub fn author_name(author_line: &str) -> String {
    author_line
        .split(|c: char| c.is_ascii_digit())
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Split a comma-separated tag attribute.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn first_sentence(citation_text: &str) -> &str {
    citation_text.split('.').next().unwrap_or_default().trim()
}

/// Lowercased join of the scoring fields.
pub fn compose_full_text(
    title: &str,
    citation_text: &str,
    annotation_text: &str,
    tags: &[String],
    context: &str,
) -> String {
    [title, citation_text, annotation_text, &tags.join(","), context]
        .join(" ")
        .to_lowercase()
}

/// Build the navigable URL for an entry.
///
/// Degrades to a fragment-only link when the topic is unknown.
pub fn entry_url(base: &str, topic: Option<&str>, subtopic: Option<&str>, id: &str) -> String {
    match (topic, subtopic) {
        (Some(t), Some(s)) => format!(
            "{}?topic={}&subtopic={}#{}",
            base,
            encode_uri_component(t),
            encode_uri_component(s),
            id
        ),
        (Some(t), None) => format!("{}?topic={}#{}", base, encode_uri_component(t), id),
        _ => format!("{}#{}", base, id),
    }
}

/// Percent-encode everything except the URI-component unreserved set.
pub fn encode_uri_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Read contributor statistics from the team list.
///
/// Each list item contributes a member when it has a name link and a
/// count badge (a `span` styled with a background color).
pub fn extract_team<T: ContentTree>(tree: &T, config: &ExtractorConfig) -> TeamData {
    let Some(list) = tree.element_by_id(&config.team_list_id) else {
        return TeamData::default();
    };

    let badge = Predicate::All(&[
        Predicate::Tag("span"),
        Predicate::AttributeContains("style", "background-color"),
    ]);

    let members = tree
        .select_within(list, &Predicate::Tag("li"))
        .into_iter()
        .filter_map(|item| {
            let name_link = tree.select_first(item, &Predicate::Tag("a"))?;
            let count_badge = tree.select_first(item, &badge)?;
            Some(TeamMember {
                name: tree.text(name_link).trim().to_string(),
                contributions: leading_count(&tree.text(count_badge)),
            })
        })
        .collect();

    TeamData::from_members(members)
}

fn leading_count(text: &str) -> u32 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}
