//! Rendering of entry pages for tool output.
//!
//! Everything here is pure: it takes entries the store already filtered,
//! ordered and paginated, and turns them into a string that fits a
//! character budget.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::store::KnowledgeEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

/// A page of entries plus the numbers needed to describe where it sits.
#[derive(Debug, Clone, Copy)]
pub struct EntryPage<'a> {
    pub title: &'a str,
    pub entries: &'a [KnowledgeEntry],
    /// Entries matching the filter before pagination.
    pub total: usize,
    pub offset: usize,
}

impl EntryPage<'_> {
    fn has_more(&self, shown: usize) -> bool {
        self.offset + shown < self.total
    }
}

pub fn render(page: &EntryPage<'_>, format: ResponseFormat, character_limit: usize) -> String {
    match format {
        ResponseFormat::Markdown => truncate_markdown(markdown(page), character_limit),
        ResponseFormat::Json => json_within(page, character_limit),
    }
}

pub fn markdown(page: &EntryPage<'_>) -> String {
    let mut out = format!("# {}\n\n", page.title);

    if page.entries.is_empty() {
        if page.total == 0 {
            out.push_str("No knowledge entries found.\n");
        } else {
            out.push_str(&format!(
                "No entries at offset {}; {} entries match in total.\n",
                page.offset, page.total
            ));
        }
        return out;
    }

    let first = page.offset + 1;
    let last = page.offset + page.entries.len();
    out.push_str(&format!("Showing entries {first}-{last} of {}.\n", page.total));

    for entry in page.entries {
        out.push_str(&format!("\n## {} · {}\n\n", entry.feature, entry.agent));
        out.push_str(&format!("- **ID**: `{}`\n", entry.id));
        out.push_str(&format!("- **Timestamp**: {}\n", entry.timestamp.to_rfc3339()));
        if let Some(branch) = &entry.branch {
            out.push_str(&format!("- **Branch**: {branch}\n"));
        }
        out.push_str(&format!("\n{}\n", entry.summary));
        if let Some(metadata) = &entry.metadata {
            let pretty = serde_json::to_string_pretty(metadata).unwrap_or_default();
            out.push_str(&format!("\n**Metadata**:\n```json\n{pretty}\n```\n"));
        }
    }

    if page.has_more(page.entries.len()) {
        out.push_str(&format!(
            "\n---\nMore entries available: pass `offset: {last}` to see the next page.\n"
        ));
    }
    out
}

/// Structured form of the first `shown` entries of `page`.
fn json_document(page: &EntryPage<'_>, shown: usize) -> Value {
    let entries = &page.entries[..shown];
    let has_more = page.has_more(shown);
    let mut doc = json!({
        "total": page.total,
        "count": entries.len(),
        "offset": page.offset,
        "has_more": has_more,
        "entries": entries,
    });
    if has_more {
        doc["next_offset"] = json!(page.offset + shown);
    }
    doc
}

pub fn json(page: &EntryPage<'_>) -> Value {
    json_document(page, page.entries.len())
}

/// Serialize `page` as JSON, dropping trailing entries until it fits.
pub fn json_within(page: &EntryPage<'_>, character_limit: usize) -> String {
    let full = pretty(&json(page));
    if full.chars().count() <= character_limit {
        return full;
    }

    let mut shown = page.entries.len();
    loop {
        shown = shown.saturating_sub(1);
        let mut doc = json_document(page, shown);
        doc["truncated"] = json!(true);
        doc["truncation_message"] = json!(format!(
            "Response truncated from {} to {shown} entries to stay within {character_limit} characters. \
             Use a smaller limit, an offset, or narrower filters.",
            page.entries.len()
        ));
        let text = pretty(&doc);
        if shown == 0 || text.chars().count() <= character_limit {
            return text;
        }
    }
}

/// Clip `text` so that it and the note explaining the cut together fit in
/// `character_limit` characters.
///
/// A budget smaller than the note alone yields just the note.
pub fn truncate_markdown(mut text: String, character_limit: usize) -> String {
    let total = text.chars().count();
    if total <= character_limit {
        return text;
    }

    let note = |kept: usize| {
        format!(
            "\n\n---\n*Response truncated: showing {kept} of {total} characters. \
             Use a smaller `limit`, an `offset`, or add filters to narrow the results.*\n"
        )
    };
    // `kept <= character_limit`, so the final note is never longer than this one.
    let kept = character_limit.saturating_sub(note(character_limit).chars().count());

    if let Some((byte_index, _)) = text.char_indices().nth(kept) {
        text.truncate(byte_index);
    }
    text.push_str(&note(kept));
    text
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
