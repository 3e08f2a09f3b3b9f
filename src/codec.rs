use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Heading that marks the start of the QA table section.
pub const TABLE_MARKER: &str = "## 问答";

/// Prefix used when a document carries no marker of its own.
pub const DEFAULT_PREFIX: &str = "# QA笔记\n\n## 问答\n";

/// Placeholder for literal newlines inside a table cell. Tables are one
/// physical line per row, so cells can never contain a raw line break.
pub const NEWLINE_PLACEHOLDER: &str = "[换行]";

const HEADER_QUESTION: &str = "问题";
const HEADER_ANSWER: &str = "答案";
const HEADER_USER_ANSWER: &str = "用户回答";

const TWO_COLUMN_HEADER: &str = "| 问题 | 答案 |";
const TWO_COLUMN_SEPARATOR: &str = "|------|------|";
const THREE_COLUMN_HEADER: &str = "| 问题 | 答案 | 用户回答 |";
const THREE_COLUMN_SEPARATOR: &str = "|------|------|----------|";

/// A single question/answer pair, optionally carrying the learner's own
/// answer. Identity is positional within its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
}

impl QaRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            user_answer: None,
        }
    }
}

/// Replace literal newlines with the placeholder so the text fits in a
/// single table cell.
pub fn encode_cell(text: &str) -> String {
    text.replace('\n', NEWLINE_PLACEHOLDER)
}

/// Restore placeholder-escaped newlines and trim surrounding whitespace.
pub fn decode_cell(text: &str) -> String {
    text.replace(NEWLINE_PLACEHOLDER, "\n").trim().to_string()
}

fn is_marker_line(line: &str) -> bool {
    line.trim()
        .strip_prefix("##")
        .is_some_and(|rest| rest.trim_start().starts_with("问答"))
}

fn is_separator_row(line: &str) -> bool {
    let inner = line.trim().trim_matches('|');
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|' | ' ') )
        && inner.contains('-')
}

/// Everything up to and including the table-section marker.
///
/// Preserved verbatim across rewrites so hand-written titles and notes
/// above the table survive machine edits. Falls back to the canonical
/// default when the marker is absent.
pub fn extract_prefix(content: &str) -> String {
    match content.find(TABLE_MARKER) {
        Some(pos) => format!("{}{}\n", &content[..pos], TABLE_MARKER),
        None => DEFAULT_PREFIX.to_string(),
    }
}

/// Parse the QA table following the section marker.
///
/// Tolerant by contract: a malformed document yields an empty or partial
/// record list, never an error. The table region ends at the first blank
/// line or heading after the marker; a row that cannot be split into at
/// least question and answer cells ends the scan with whatever rows were
/// assembled before it.
pub fn parse(content: &str) -> Vec<QaRecord> {
    let mut records = Vec::new();
    let mut in_section = false;
    let mut has_user_answer = false;
    let mut header_seen = false;

    for line in content.lines() {
        if !in_section {
            if is_marker_line(line) {
                in_section = true;
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            if header_seen {
                break;
            }
            if trimmed.is_empty() {
                continue;
            }
            // Another section begins before any table appeared.
            break;
        }
        if !trimmed.starts_with('|') {
            continue;
        }

        if !header_seen {
            has_user_answer = trimmed.contains(HEADER_USER_ANSWER);
            if trimmed.contains(HEADER_QUESTION)
                || trimmed.contains(HEADER_ANSWER)
            {
                header_seen = true;
                continue;
            }
            // No header row; treat the table as starting directly with data.
            header_seen = true;
        }
        if is_separator_row(trimmed) {
            continue;
        }

        match parse_row(trimmed, has_user_answer) {
            Some(Some(record)) => records.push(record),
            Some(None) => {} // both cells empty, dropped
            None => {
                tracing::debug!(row = %trimmed, "unparseable table row, stopping");
                break;
            }
        }
    }

    records
}

/// Split one data row into a record.
///
/// Returns `None` when the row cannot be split into at least two cells,
/// `Some(None)` when question and answer are both empty after trimming.
fn parse_row(line: &str, has_user_answer: bool) -> Option<Option<QaRecord>> {
    let mut cells: Vec<&str> = line.split('|').collect();

    // A leading/trailing delimiter produces an empty edge cell.
    if cells.first().is_some_and(|c| c.trim().is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.trim().is_empty()) && cells.len() > 2 {
        cells.pop();
    }
    if cells.len() < 2 {
        return None;
    }

    let question = decode_cell(cells[0]);
    let answer = decode_cell(cells[1]);
    if question.is_empty() && answer.is_empty() {
        return Some(None);
    }

    let user_answer = if has_user_answer {
        cells
            .get(2)
            .map(|c| decode_cell(c))
            .filter(|ua| !ua.is_empty())
    } else {
        None
    };

    Some(Some(QaRecord {
        question,
        answer,
        user_answer,
    }))
}

/// Render records back into a table, concatenated with `prefix` (or the
/// canonical default). The user-answer column appears iff any record
/// carries a non-empty user answer; when it does, every row gets a
/// (possibly empty) third cell.
pub fn render(records: &[QaRecord], prefix: Option<&str>) -> String {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX);
    let has_user_answer = records
        .iter()
        .any(|r| r.user_answer.as_deref().is_some_and(|ua| !ua.trim().is_empty()));

    let mut lines = Vec::with_capacity(records.len() + 2);
    if has_user_answer {
        lines.push(THREE_COLUMN_HEADER.to_string());
        lines.push(THREE_COLUMN_SEPARATOR.to_string());
    } else {
        lines.push(TWO_COLUMN_HEADER.to_string());
        lines.push(TWO_COLUMN_SEPARATOR.to_string());
    }

    for record in records {
        let question = encode_cell(&record.question);
        let answer = encode_cell(&record.answer);
        if has_user_answer {
            let user_answer =
                encode_cell(record.user_answer.as_deref().unwrap_or(""));
            lines.push(format!("| {question} | {answer} | {user_answer} |"));
        } else {
            lines.push(format!("| {question} | {answer} |"));
        }
    }

    format!("{prefix}{}\n", lines.join("\n"))
}

/// Canonical content for a newly created document.
pub fn empty_template(name: &str) -> String {
    let title = name.strip_suffix(".md").unwrap_or(name);
    format!(
        "# {title}\nQA速记笔记本\n\n## 问答\n| 问题 | 答案 |\n|------|------|\n"
    )
}
