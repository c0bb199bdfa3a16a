//! In-memory relevance index over extracted entries.
//!
//! [`EntriesIndex`] holds one extraction snapshot and answers scored top-K
//! queries against it. [`ResearchIndex`] pairs an index with the content
//! tree it is built from, building lazily on first read.
//!
//! # Scoring
//!
//! Every signal is additive and independent; there is no length
//! normalization. With `q` the lowercased query and `t` each query token
//! longer than two characters:
//!
//! | Signal | Weight |
//! |--------|--------|
//! | `q` in title | +100 |
//! | `q` in snippet | +50 |
//! | `q` in full text | +20 |
//! | occurrences of `t` in title | ×15 |
//! | occurrences of `t` in snippet | ×10 |
//! | occurrences of `t` in full text | ×3 |
//! | any tag contains `t` | +30 |
//! | context contains `t` | +5 |
//!
//! Occurrences are counted with a literal, non-overlapping substring scan,
//! so tokens such as `c++` or `(ai` are matched as typed. Scores saturate
//! at `u64::MAX` rather than overflow.
//!
//! Zero-score entries are dropped, the rest sorted by descending score
//! (stable, so ties keep collection order) and truncated to `k`.

use tracing::info;

use crate::extract::{extract_entries, extract_team, ExtractorConfig};
use crate::models::{Entry, ScoredEntry, TeamData};
use crate::tree::ContentTree;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Query tokens of this many characters or fewer are ignored.
const MIN_TOKEN_CHARS: usize = 2;

const TITLE_PHRASE: u64 = 100;
const SNIPPET_PHRASE: u64 = 50;
const FULL_TEXT_PHRASE: u64 = 20;
const TITLE_TOKEN: u64 = 15;
const SNIPPET_TOKEN: u64 = 10;
const FULL_TEXT_TOKEN: u64 = 3;
const TAG_TOKEN: u64 = 30;
const CONTEXT_TOKEN: u64 = 5;

/// Extracted entries plus a readiness flag.
#[derive(Debug, Clone)]
pub struct EntriesIndex {
    config: ExtractorConfig,
    entries: Vec<Entry>,
    skipped: usize,
    ready: bool,
}

impl EntriesIndex {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            skipped: 0,
            ready: false,
        }
    }

    /// Extract from `tree` and replace the held collection wholesale.
    ///
    /// Returns the number of entries indexed.
    pub fn build<T: ContentTree>(&mut self, tree: &mut T) -> usize {
        let extraction = extract_entries(tree, &self.config);
        self.entries = extraction.entries;
        self.skipped = extraction.skipped;
        self.ready = true;
        info!(
            entries = self.entries.len(),
            skipped = self.skipped,
            "indexed research entries"
        );
        self.entries.len()
    }

    /// Same as [`build`](Self::build); named for callers reacting to content changes.
    pub fn rebuild<T: ContentTree>(&mut self, tree: &mut T) -> usize {
        self.build(tree)
    }

    /// Whether a build has completed at least once.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Candidate nodes skipped by the most recent build.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Score every entry against `text` and return the best `k`.
    ///
    /// Empty or whitespace-only queries return no results.
    pub fn query(&self, text: &str, k: usize) -> Vec<ScoredEntry> {
        let query = Query::parse(text);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredEntry> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = query.score(entry);
                (score > 0).then(|| ScoredEntry {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// A parsed query: the lowercased phrase and its scoring tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub phrase: String,
    pub tokens: Vec<String>,
}

impl Query {
    pub fn parse(text: &str) -> Self {
        let phrase = text.to_lowercase();
        let tokens = phrase
            .split_whitespace()
            .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
            .map(str::to_string)
            .collect();
        Self { phrase, tokens }
    }

    /// True for empty or whitespace-only input.
    pub fn is_empty(&self) -> bool {
        self.phrase.trim().is_empty()
    }

    /// Additive relevance score of `entry` for this query.
    pub fn score(&self, entry: &Entry) -> u64 {
        if self.is_empty() {
            return 0;
        }

        let title = entry.title.to_lowercase();
        let snippet = entry.snippet.to_lowercase();
        let context = entry.context.to_lowercase();

        let mut score = 0u64;
        let mut add = |weight: u64| score = score.saturating_add(weight);

        if title.contains(&self.phrase) {
            add(TITLE_PHRASE);
        }
        if snippet.contains(&self.phrase) {
            add(SNIPPET_PHRASE);
        }
        if entry.full_text.contains(&self.phrase) {
            add(FULL_TEXT_PHRASE);
        }

        for token in &self.tokens {
            add(count_occurrences(&title, token).saturating_mul(TITLE_TOKEN));
            add(count_occurrences(&snippet, token).saturating_mul(SNIPPET_TOKEN));
            add(count_occurrences(&entry.full_text, token).saturating_mul(FULL_TEXT_TOKEN));

            if entry
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(token.as_str()))
            {
                add(TAG_TOKEN);
            }
            if context.contains(token.as_str()) {
                add(CONTEXT_TOKEN);
            }
        }

        score
    }
}

/// Non-overlapping literal occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    if needle.is_empty() {
        return 0;
    }
    u64::try_from(haystack.matches(needle).count()).unwrap_or(u64::MAX)
}

/// A content tree together with the index built from it.
///
/// This is the surface handed to callers: reads build the index on first
/// use, and [`rebuild_index`](Self::rebuild_index) re-extracts after the
/// tree changes (for example once asynchronously loaded entries have been
/// appended through [`tree_mut`](Self::tree_mut)).
#[derive(Debug, Clone)]
pub struct ResearchIndex<T: ContentTree> {
    tree: T,
    index: EntriesIndex,
}

impl<T: ContentTree> ResearchIndex<T> {
    pub fn new(tree: T, config: ExtractorConfig) -> Self {
        Self {
            tree,
            index: EntriesIndex::new(config),
        }
    }

    /// Construct and build immediately.
    pub fn built(tree: T, config: ExtractorConfig) -> Self {
        let mut index = Self::new(tree, config);
        index.rebuild_index();
        index
    }

    /// Top `max_results` entries for `query`, building first if needed.
    pub fn get_relevant_entries(&mut self, query: &str, max_results: usize) -> Vec<ScoredEntry> {
        self.ensure_built();
        self.index.query(query, max_results)
    }

    /// Every indexed entry in document order, building first if needed.
    pub fn get_all_entries(&mut self) -> &[Entry] {
        self.ensure_built();
        self.index.entries()
    }

    /// Re-extract from the current tree. Returns the entry count.
    pub fn rebuild_index(&mut self) -> usize {
        self.index.rebuild(&mut self.tree)
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    /// Read-only access to the last built snapshot (no implicit build).
    pub fn index(&self) -> &EntriesIndex {
        &self.index
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Mutable tree access; call [`rebuild_index`](Self::rebuild_index) afterwards.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    /// Swap in a new tree and rebuild from it.
    pub fn replace_tree(&mut self, tree: T) -> usize {
        self.tree = tree;
        self.rebuild_index()
    }

    /// Contributor statistics from the current tree.
    pub fn team_data(&self) -> TeamData {
        extract_team(&self.tree, self.index.config())
    }

    fn ensure_built(&mut self) {
        if !self.index.is_ready() {
            self.rebuild_index();
        }
    }
}
