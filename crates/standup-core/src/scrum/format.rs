//! Canonical scrum-update text block: formatter and legacy parser.
//!
//! The block is the one wire shape whose exact layout matters; a
//! format -> parse round trip must recover all five fields. The parser is
//! the fallback detection path for transcripts without structured
//! metadata, so it rejects anything that is not unmistakably the block.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use standup_types::scrum::ScrumDraft;

/// Render a draft to the canonical multi-line block.
pub fn format_draft(draft: &ScrumDraft) -> String {
    format!(
        "Scrum update for {}\nGenerated at: {}\n\nYesterday: {}\nToday: {}\nBlocker: {}",
        draft.scrum_date.format("%Y-%m-%d"),
        draft.generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        draft.yesterday,
        draft.today,
        draft.blocker,
    )
}

/// Recover a draft from the canonical block, or `None`.
///
/// Tolerant of blank lines and per-line whitespace; intolerant of
/// reordered or renamed labels. Routinely returns `None` for ordinary
/// assistant replies -- that is the expected path, not an error.
pub fn parse_draft(text: &str) -> Option<ScrumDraft> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 5 {
        return None;
    }

    let date_text = strip_prefix_ignore_case(lines[0], "Scrum update for ")?;
    let scrum_date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d").ok()?;

    let generated_text = extract_field(&lines, "Generated at:")?;
    let generated_at = DateTime::parse_from_rfc3339(&generated_text)
        .ok()?
        .with_timezone(&Utc);

    let yesterday = extract_field(&lines, "Yesterday:")?;
    let today = extract_field(&lines, "Today:")?;
    let blocker = extract_field(&lines, "Blocker:")?;

    Some(ScrumDraft {
        scrum_date,
        generated_at,
        yesterday,
        today,
        blocker,
    })
}

/// First line starting with `prefix` (ASCII case-insensitive), minus the
/// prefix, trimmed.
fn extract_field(lines: &[&str], prefix: &str) -> Option<String> {
    lines
        .iter()
        .find_map(|line| strip_prefix_ignore_case(line, prefix))
        .map(|rest| rest.trim().to_string())
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}
