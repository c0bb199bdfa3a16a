//! # Research Exchange Core
//!
//! Shared, I/O-free logic for Research Exchange: the entry data model, the
//! content-tree abstraction, the entry extractor, the relevance index, and
//! chat-context assembly.
//!
//! This crate contains no tokio, HTTP, filesystem I/O, or HTML parser
//! dependencies. Callers hand it a [`tree::ContentTree`] (the application
//! crate builds one from rendered HTML) and get back scored entries.
//!
//! ```rust
//! use research_exchange_core::extract::ExtractorConfig;
//! use research_exchange_core::index::ResearchIndex;
//! use research_exchange_core::tree::DocumentTree;
//!
//! let mut tree = DocumentTree::new();
//! let root = tree.root();
//! let section = tree.append_element(root, "section", &[("id", "ai-ethics")]);
//! let entry = tree.append_element(section, "div", &[("class", "bib-entry")]);
//! let citation = tree.append_element(
//!     entry,
//!     "p",
//!     &[("class", "bib-citation"), ("data-source-title", "Ethics of AI Tutors")],
//! );
//! tree.append_text(citation, "Doe, J. (2024). Ethics of AI Tutors.");
//!
//! let mut index = ResearchIndex::new(tree, ExtractorConfig::default());
//! let hits = index.get_relevant_entries("ethics", 5);
//! assert_eq!(hits[0].entry.id, "ethics-of-ai-tutors");
//! ```

pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod prompt;
pub mod tree;
