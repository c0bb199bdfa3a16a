//! Chat-context assembly.
//!
//! Turns retrieved entries and contributor statistics into the system
//! message that grounds the assistant, and defines the conversation
//! message shape shared by the server and the chat backend.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::models::{EntrySummary, TeamData};

const INSTRUCTIONS: &str = "\
You are a helpful AI assistant for the AI in Education VIP Research Exchange website. \
Your role is to answer questions about AI in education research, team members, and the site content.

IMPORTANT CAPABILITIES:
- Answer questions about research entries, team members, contributions, and site content
- Use reasoning and inference to answer questions even if the answer isn't explicitly stated
- Count and aggregate data (e.g., \"how many contributions does X have?\")
- Compare and analyze information across multiple entries
- Provide insights based on the available data

When answering questions:
1. Provide clear, concise, and accurate information
2. Use the provided data to infer answers even if not explicitly stated
3. For questions about team members, use the team member data provided
4. For questions requiring counting or aggregation, calculate from the available data
5. IMPORTANT: When asked about a specific team member's contributions, ONLY reference entries where that person is listed as the \"Author/Contributor\"
6. Do NOT include entries where the person's name appears in the content but they are not the author
7. When referencing research entries, mention the title and author, but DO NOT include clickable links
8. Keep responses conversational and informative without URLs or link formatting

";

/// Who sent a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Content of the most recent user message, if any.
pub fn last_user_message(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

/// Build the assistant's system message.
///
/// The team block appears only when `team` lists members; the entries block
/// only when `entries` is non-empty. Empty author and snippet lines are
/// omitted per entry.
pub fn build_system_prompt(entries: &[EntrySummary], team: Option<&TeamData>) -> String {
    let mut out = String::from(INSTRUCTIONS);

    if let Some(team) = team.filter(|t| !t.members.is_empty()) {
        out.push_str("\nTEAM MEMBER INFORMATION:\n");
        let _ = writeln!(out, "Total team members: {}", team.total_members);
        let _ = writeln!(out, "Total contributions: {}\n", team.total_contributions);
        out.push_str("Team members and their contributions:\n");
        for (idx, member) in team.members.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {}: {} contribution(s)",
                idx + 1,
                member.name,
                member.contributions
            );
        }
        out.push('\n');
    }

    if !entries.is_empty() {
        let _ = write!(
            out,
            "\nRESEARCH ENTRIES ({} relevant entries):\n\n",
            entries.len()
        );
        for (idx, entry) in entries.iter().enumerate() {
            let _ = writeln!(out, "{}. Title: {}", idx + 1, entry.title);
            if !entry.author.is_empty() {
                let _ = writeln!(out, "   Author/Contributor: {}", entry.author);
            }
            let _ = writeln!(out, "   URL: {}", entry.url);
            if !entry.snippet.is_empty() {
                let _ = writeln!(out, "   Summary: {}", entry.snippet);
            }
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamMember;

    fn summary(id: &str, author: &str, snippet: &str) -> EntrySummary {
        EntrySummary {
            id: id.to_string(),
            title: format!("Title {}", id),
            url: format!("/#{}", id),
            snippet: snippet.to_string(),
            author: author.to_string(),
        }
    }

    #[test]
    fn test_instructions_only_without_context() {
        let prompt = build_system_prompt(&[], None);
        assert_eq!(prompt, INSTRUCTIONS);
        assert!(!prompt.contains("RESEARCH ENTRIES"));
    }

    #[test]
    fn test_entries_block_in_order() {
        let entries = vec![summary("a", "Jane Doe", "About A"), summary("b", "", "")];
        let prompt = build_system_prompt(&entries, None);
        assert!(prompt.contains("RESEARCH ENTRIES (2 relevant entries):"));
        let a = prompt.find("1. Title: Title a").unwrap();
        let b = prompt.find("2. Title: Title b").unwrap();
        assert!(a < b);
        assert!(prompt.contains("   Author/Contributor: Jane Doe\n"));
        assert!(prompt.contains("   Summary: About A\n"));
        assert_eq!(prompt.matches("Author/Contributor:").count(), 1);
        assert_eq!(prompt.matches("   Summary:").count(), 1);
        assert!(prompt.contains("   URL: /#b\n"));
    }

    #[test]
    fn test_team_block() {
        let team = TeamData::from_members(vec![TeamMember {
            name: "Jane Doe".to_string(),
            contributions: 4,
        }]);
        let prompt = build_system_prompt(&[], Some(&team));
        assert!(prompt.contains("TEAM MEMBER INFORMATION:"));
        assert!(prompt.contains("Total team members: 1\n"));
        assert!(prompt.contains("Total contributions: 4\n"));
        assert!(prompt.contains("1. Jane Doe: 4 contribution(s)\n"));
    }

    #[test]
    fn test_empty_team_omitted() {
        let prompt = build_system_prompt(&[], Some(&TeamData::default()));
        assert!(!prompt.contains("TEAM MEMBER INFORMATION"));
    }

    #[test]
    fn test_last_user_message() {
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
            ChatMessage::assistant("reply 2"),
        ];
        assert_eq!(last_user_message(&messages), Some("second"));
        assert_eq!(last_user_message(&[ChatMessage::assistant("x")]), None);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
