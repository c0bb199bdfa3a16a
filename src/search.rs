//! Index-reading CLI commands: `rx index`, `rx search`, `rx list`, `rx team`.

use anyhow::Result;
use research_exchange_core::models::{Entry, ScoredEntry, TeamData};

use crate::config::Config;
use crate::html::load_index;

pub async fn run_index(config: &Config) -> Result<()> {
    let index = load_index(config).await?;
    println!("Indexed {}", config.site.index.display());
    println!("  entries: {}", index.index().entries().len());
    println!("  skipped: {}", index.index().skipped());
    println!("ok");
    Ok(())
}

pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.retrieval.default_limit);
    if limit == 0 {
        anyhow::bail!("--limit must be >= 1");
    }

    let index = load_index(config).await?;
    let results = index.index().query(query, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        print_result(i, result);
    }
    Ok(())
}

fn print_result(i: usize, result: &ScoredEntry) {
    let entry = &result.entry;
    println!("{}. [{}] {}", i + 1, result.score, entry.title);
    if !entry.author.is_empty() {
        println!("    author: {}", entry.author);
    }
    if !entry.context.is_empty() {
        println!("    section: {}", entry.context);
    }
    if !entry.tags.is_empty() {
        println!("    tags: {}", entry.tags.join(", "));
    }
    println!("    url: {}", entry.url);
    if let Some(ref source) = entry.source_url {
        println!("    source: {}", source);
    }
    if !entry.snippet.is_empty() {
        println!("    excerpt: \"{}\"", entry.snippet.replace('\n', " ").trim());
    }
    println!("    id: {}", entry.id);
    println!();
}

pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let index = load_index(config).await?;
    let entries: &[Entry] = index.index().entries();

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in entries {
        let author = if entry.author.is_empty() {
            "(unknown)"
        } else {
            entry.author.as_str()
        };
        println!("{}  {} / {}", entry.id, author, entry.title);
    }
    println!();
    println!("{} entries", entries.len());
    Ok(())
}

pub async fn run_team(config: &Config) -> Result<()> {
    let index = load_index(config).await?;
    print_team(&index.team_data());
    Ok(())
}

fn print_team(team: &TeamData) {
    if team.members.is_empty() {
        println!("No team members found.");
        return;
    }
    println!("Total team members: {}", team.total_members);
    println!("Total contributions: {}", team.total_contributions);
    println!();
    for (i, member) in team.members.iter().enumerate() {
        println!("{}. {}: {} contribution(s)", i + 1, member.name, member.contributions);
    }
}
