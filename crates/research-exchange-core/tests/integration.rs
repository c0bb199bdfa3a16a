//! End-to-end extraction and retrieval over in-memory content trees.

use research_exchange_core::extract::{extract_entries, ExtractorConfig};
use research_exchange_core::index::{ResearchIndex, DEFAULT_MAX_RESULTS};
use research_exchange_core::models::EntrySummary;
use research_exchange_core::prompt::build_system_prompt;
use research_exchange_core::tree::{ContentTree, DocumentTree, NodeId};

struct EntrySpec<'a> {
    title: &'a str,
    citation: &'a str,
    annotation: &'a str,
    tags: &'a str,
    author: &'a str,
}

fn add_section(tree: &mut DocumentTree, id: &str, heading: &str) -> NodeId {
    let root = tree.root();
    let section = tree.append_element(root, "div", &[("id", id), ("class", "topic-page")]);
    let header = tree.append_element(section, "div", &[("class", "topic-page-header")]);
    let h1 = tree.append_element(header, "h1", &[]);
    tree.append_text(h1, heading);
    section
}

fn add_entry(tree: &mut DocumentTree, section: NodeId, spec: &EntrySpec<'_>) -> NodeId {
    let entry = tree.append_element(section, "div", &[("class", "bib-entry"), ("data-tags", spec.tags)]);
    let citation = tree.append_element(
        entry,
        "p",
        &[
            ("class", "bib-citation"),
            ("data-source-title", spec.title),
            ("data-source-url", "https://doi.org/10.1000/example"),
        ],
    );
    tree.append_text(citation, spec.citation);
    let annotation = tree.append_element(entry, "div", &[("class", "annotation-text")]);
    tree.append_text(annotation, spec.annotation);
    let author = tree.append_element(entry, "div", &[("class", "annotation-author")]);
    tree.append_text(author, spec.author);
    entry
}

fn ethics_site() -> DocumentTree {
    let mut tree = DocumentTree::new();
    let section = add_section(&mut tree, "ai-ethics", "AI Ethics");
    add_entry(
        &mut tree,
        section,
        &EntrySpec {
            title: "Ethics of AI Tutors",
            citation: "Doe, J. (2024). Ethics of AI Tutors. Journal of AI in Education.",
            annotation: "This study examines fairness in automated tutoring systems.",
            tags: "ethics,fairness",
            author: "Jane Doe 5/1/2024",
        },
    );
    add_entry(
        &mut tree,
        section,
        &EntrySpec {
            title: "Chatbots in the Writing Classroom",
            citation: "Roe, R. (2023). Chatbots in the Writing Classroom.",
            annotation: "A survey of student attitudes toward chatbot feedback.",
            tags: "writing, chatbots",
            author: "Rick Roe 2/14/2023",
        },
    );
    tree
}

#[test]
fn test_ethics_entry_extracted() {
    let mut tree = ethics_site();
    let extraction = extract_entries(&mut tree, &ExtractorConfig::default());
    assert_eq!(extraction.skipped, 0);
    assert_eq!(extraction.entries.len(), 2);

    let e = &extraction.entries[0];
    assert_eq!(e.id, "ethics-of-ai-tutors");
    assert_eq!(e.title, "Ethics of AI Tutors");
    assert_eq!(e.author, "Jane Doe");
    assert_eq!(e.tags, vec!["ethics", "fairness"]);
    assert_eq!(e.context, "AI Ethics");
    assert_eq!(e.topic_id.as_deref(), Some("ai-ethics"));
    assert!(e.subtopic_id.is_none());
    assert!(e.url.contains("topic=ai-ethics"));
    assert!(e.url.ends_with("#ethics-of-ai-tutors"));
    assert_eq!(e.source_url.as_deref(), Some("https://doi.org/10.1000/example"));
    assert_eq!(
        e.full_text,
        format!(
            "{} {} {} {} {}",
            e.title, e.citation_text, e.annotation_text, "ethics,fairness", e.context
        )
        .to_lowercase()
    );

    let second = &extraction.entries[1];
    assert_eq!(second.tags, vec!["writing", "chatbots"]);
    assert_eq!(second.author, "Rick Roe");
}

#[test]
fn test_fairness_query_hits_tag_signal() {
    let mut index = ResearchIndex::new(ethics_site(), ExtractorConfig::default());
    let hits = index.get_relevant_entries("fairness", DEFAULT_MAX_RESULTS);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.id, "ethics-of-ai-tutors");
    assert!(hits[0].score >= 30);
}

#[test]
fn test_exact_title_substring_scores_at_least_100() {
    let mut index = ResearchIndex::new(ethics_site(), ExtractorConfig::default());
    for query in ["Ethics of AI", "writing classroom", "Chatbots in the Writing Classroom"] {
        let hits = index.get_relevant_entries(query, 10);
        assert!(
            hits.iter().any(|h| h.entry.title.to_lowercase().contains(&query.to_lowercase())
                && h.score >= 100),
            "query {:?} did not surface its title",
            query
        );
    }
}

#[test]
fn test_blank_queries_return_nothing() {
    let mut index = ResearchIndex::new(ethics_site(), ExtractorConfig::default());
    for k in [0, 1, 5, 100] {
        assert!(index.get_relevant_entries("", k).is_empty());
        assert!(index.get_relevant_entries("   ", k).is_empty());
    }
}

#[test]
fn test_results_sorted_and_bounded() {
    let mut tree = DocumentTree::new();
    let section = add_section(&mut tree, "feedback", "Feedback");
    for (i, annotation) in [
        "feedback",
        "feedback feedback feedback",
        "nothing relevant",
        "feedback feedback",
        "feedback",
    ]
    .into_iter()
    .enumerate()
    {
        let title = format!("Study {}", i);
        add_entry(
            &mut tree,
            section,
            &EntrySpec {
                title: &title,
                citation: "Citation.",
                annotation,
                tags: "",
                author: "",
            },
        );
    }
    let mut index = ResearchIndex::new(tree, ExtractorConfig::default());

    let all = index.get_relevant_entries("feedback", 10);
    // every entry shares the "Feedback" section heading
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(all.iter().all(|h| h.score > 0));
    // equal-scoring "Study 0" and "Study 4" keep document order
    let pos0 = all.iter().position(|h| h.entry.title == "Study 0").unwrap();
    let pos4 = all.iter().position(|h| h.entry.title == "Study 4").unwrap();
    assert_eq!(all[pos0].score, all[pos4].score);
    assert!(pos0 < pos4);

    assert_eq!(index.get_relevant_entries("feedback", 2).len(), 2);
    assert!(index.get_relevant_entries("feedback", 0).is_empty());
    assert_eq!(all[0].entry.title, "Study 1");
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut tree = DocumentTree::new();
    let section = add_section(&mut tree, "topic", "Topic");
    add_entry(
        &mut tree,
        section,
        &EntrySpec {
            title: "",
            citation: "No title attribute. Second sentence.",
            annotation: "",
            tags: "",
            author: "",
        },
    );
    let entry = add_entry(
        &mut tree,
        section,
        &EntrySpec {
            title: "Slugged Title",
            citation: "Cite.",
            annotation: "",
            tags: "",
            author: "",
        },
    );
    assert_eq!(tree.attribute(entry, "id"), None);

    let mut index = ResearchIndex::new(tree, ExtractorConfig::default());
    index.rebuild_index();
    let first = index.get_all_entries().to_vec();
    assert_eq!(index.tree().attribute(entry, "id"), Some("slugged-title"));

    index.rebuild_index();
    let second = index.get_all_entries().to_vec();
    assert_eq!(first, second);
    assert_eq!(first[0].id, "entry-0");
    assert_eq!(first[0].title, "No title attribute");
}

#[test]
fn test_subtopic_resolution() {
    let mut tree = DocumentTree::new();
    let parent = add_section(&mut tree, "parent", "Parent Topic");
    let card = tree.append_element(
        parent,
        "div",
        &[
            ("class", "subtopic-card"),
            ("onclick", "showSubtopicPage('parent','child')"),
        ],
    );
    tree.append_text(card, "Child");
    let child = add_section(&mut tree, "parent-child", "Child Subtopic");
    add_entry(
        &mut tree,
        child,
        &EntrySpec {
            title: "Nested Study",
            citation: "Nested.",
            annotation: "",
            tags: "",
            author: "",
        },
    );

    let extraction = extract_entries(&mut tree, &ExtractorConfig::default());
    let e = &extraction.entries[0];
    assert_eq!(e.topic_id.as_deref(), Some("parent"));
    assert_eq!(e.subtopic_id.as_deref(), Some("child"));
    assert!(e.url.contains("topic=parent&subtopic=child"));
    assert_eq!(e.context, "Child Subtopic");
}

#[test]
fn test_missing_citation_skipped() {
    let mut tree = ethics_site();
    let section = tree.element_by_id("ai-ethics").unwrap();
    let broken = tree.append_element(section, "div", &[("class", "bib-entry")]);
    let annotation = tree.append_element(broken, "div", &[("class", "annotation-text")]);
    tree.append_text(annotation, "Orphan annotation with no citation.");

    let extraction = extract_entries(&mut tree, &ExtractorConfig::default());
    assert_eq!(extraction.entries.len(), 2);
    assert_eq!(extraction.skipped, 1);
    assert!(extraction
        .entries
        .iter()
        .all(|e| !e.annotation_text.contains("Orphan")));
}

#[test]
fn test_lazy_build_and_readiness() {
    let mut index = ResearchIndex::new(ethics_site(), ExtractorConfig::default());
    assert!(!index.is_ready());
    assert_eq!(index.get_all_entries().len(), 2);
    assert!(index.is_ready());
}

#[test]
fn test_appended_content_visible_after_rebuild() {
    let mut index = ResearchIndex::built(ethics_site(), ExtractorConfig::default());
    assert_eq!(index.index().entries().len(), 2);

    let tree = index.tree_mut();
    let section = add_section(tree, "late", "Late Arrivals");
    add_entry(
        tree,
        section,
        &EntrySpec {
            title: "Loaded Later",
            citation: "Later.",
            annotation: "Fetched after first render.",
            tags: "async",
            author: "Lee Later 1/1/2025",
        },
    );

    // not visible until rebuilt
    assert!(index.get_relevant_entries("loaded later", 5).is_empty());
    assert_eq!(index.rebuild_index(), 3);
    let hits = index.get_relevant_entries("loaded later", 5);
    assert_eq!(hits[0].entry.url, "/?topic=late#loaded-later");
}

#[test]
fn test_replace_tree_rebuilds_from_new_content() {
    let mut index = ResearchIndex::built(ethics_site(), ExtractorConfig::default());
    assert_eq!(index.index().entries().len(), 2);

    assert_eq!(index.replace_tree(DocumentTree::new()), 0);
    assert!(index.is_ready());
    assert!(index.get_all_entries().is_empty());
    assert!(index.get_relevant_entries("ethics", 5).is_empty());
}

#[test]
fn test_prompt_from_retrieved_entries() {
    let mut index = ResearchIndex::new(ethics_site(), ExtractorConfig::default());
    let summaries: Vec<EntrySummary> = index
        .get_relevant_entries("fairness", 10)
        .iter()
        .map(EntrySummary::from)
        .collect();
    let prompt = build_system_prompt(&summaries, Some(&index.team_data()));
    assert!(prompt.contains("RESEARCH ENTRIES (1 relevant entries):"));
    assert!(prompt.contains("1. Title: Ethics of AI Tutors"));
    assert!(prompt.contains("Author/Contributor: Jane Doe"));
    assert!(!prompt.contains("TEAM MEMBER INFORMATION"));
}
