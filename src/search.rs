use serde::Serialize;

use crate::{codec::NEWLINE_PLACEHOLDER, error::Result, file_store::FileStore};

/// One exact-search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactMatch {
    pub document: String,
    pub question: String,
    pub answer: String,
}

/// Case-insensitive substring search over every document's records.
///
/// A blank query returns immediately without touching the store. A
/// document that fails to read is logged and skipped; the scan
/// continues with the rest.
pub fn exact_search(store: &FileStore, query: &str) -> Result<Vec<ExactMatch>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for name in store.list()? {
        let records = match store.read(&name) {
            Ok((_, records)) => records,
            Err(e) => {
                tracing::warn!(document = %name, error = %e, "skipping unreadable document");
                continue;
            }
        };
        for record in records {
            if record.question.to_lowercase().contains(&query)
                || record.answer.to_lowercase().contains(&query)
            {
                matches.push(ExactMatch {
                    document: name.clone(),
                    question: record.question,
                    answer: record.answer,
                });
            }
        }
    }
    Ok(matches)
}

/// Substitute table-hostile characters with display-safe equivalents.
///
/// Applied at the output boundary only; stored data keeps the raw
/// delimiter and placeholder forms.
pub fn display_cell(text: &str) -> String {
    text.replace('|', "｜")
        .replace(NEWLINE_PLACEHOLDER, "<br>")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::QaRecord;

    fn seeded_store() -> (tempfile::TempDir, FileStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store
            .create(
                "rust",
                Some(&[
                    QaRecord::new("What is Ownership?", "A memory discipline"),
                    QaRecord::new("What is Borrowing?", "Temporary access"),
                ]),
            )
            .unwrap();
        store
            .create(
                "math",
                Some(&[QaRecord::new("What is 2+2?", "The answer is 4")]),
            )
            .unwrap();
        (tmp, store)
    }

    #[test]
    fn blank_query_returns_empty_without_scanning() {
        let tmp = tempfile::tempdir().unwrap();
        // A root that does not exist would make list() fail; a blank
        // query must short-circuit before that.
        let store = FileStore::open(tmp.path()).unwrap();
        drop(std::fs::remove_dir(tmp.path()));
        assert!(exact_search(&store, "").unwrap().is_empty());
        assert!(exact_search(&store, "   ").unwrap().is_empty());
    }

    #[test]
    fn matches_are_case_insensitive_across_documents() {
        let (_tmp, store) = seeded_store();
        let matches = exact_search(&store, "what is").unwrap();
        assert_eq!(matches.len(), 3);

        let matches = exact_search(&store, "OWNERSHIP").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document, "rust.md");
    }

    #[test]
    fn answer_text_is_searched_too() {
        let (_tmp, store) = seeded_store();
        let matches = exact_search(&store, "answer is 4").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].question, "What is 2+2?");
    }

    #[test]
    fn no_match_yields_empty() {
        let (_tmp, store) = seeded_store();
        assert!(exact_search(&store, "zzz_nothing").unwrap().is_empty());
    }

    #[test]
    fn display_cell_substitutions() {
        assert_eq!(display_cell("a|b"), "a｜b");
        assert_eq!(display_cell("a[换行]b"), "a<br>b");
        assert_eq!(display_cell("a\nb"), "a<br>b");
    }
}
