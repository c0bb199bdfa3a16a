//! HTML loading using the `scraper` crate.
//!
//! Parses a rendered page with html5ever and copies its element and text
//! nodes into a [`DocumentTree`], the in-memory tree the extractor reads.
//! Bodies of `script`, `style`, `noscript` and `template` elements are
//! dropped, as are comments and doctypes.

use anyhow::{Context, Result};
use research_exchange_core::index::ResearchIndex;
use research_exchange_core::tree::{DocumentTree, NodeId};
use scraper::{ElementRef, Html};
use std::path::Path;

use crate::config::Config;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Parse an HTML document into a [`DocumentTree`].
pub fn parse_html(source: &str) -> DocumentTree {
    let document = Html::parse_document(source);
    let mut tree = DocumentTree::new();
    let root = tree.root();
    copy_element(&mut tree, root, document.root_element());
    tree
}

/// Read and parse the site page at `path`.
pub async fn load_site(path: &Path) -> Result<DocumentTree> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read site page: {}", path.display()))?;
    let tree = parse_html(&source);
    tracing::debug!(path = %path.display(), nodes = tree.len(), "parsed site page");
    Ok(tree)
}

/// Load the configured site page and build its index.
pub async fn load_index(config: &Config) -> Result<ResearchIndex<DocumentTree>> {
    let tree = load_site(&config.site.index).await?;
    Ok(ResearchIndex::built(tree, config.extractor_config()))
}

fn copy_element(tree: &mut DocumentTree, parent: NodeId, element: ElementRef<'_>) {
    let value = element.value();
    let attrs: Vec<(&str, &str)> = value.attrs().collect();
    let node = tree.append_element(parent, value.name(), &attrs);

    if SKIPPED_TAGS.contains(&value.name()) {
        return;
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            copy_element(tree, node, child_element);
        } else if let Some(text) = child.value().as_text() {
            tree.append_text(node, text);
        }
    }
}
