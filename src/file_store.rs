use std::path::{Path, PathBuf};

use crate::{
    codec::{self, QaRecord},
    error::{Error, Result},
};

/// Authoritative file-backed store of QA documents.
///
/// One markdown file per document under a single root directory. Every
/// mutation is a full-content read-modify-write; the durability unit is
/// the whole document. There is no inter-request locking: concurrent
/// writers to the same name race and the last full rewrite wins.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|_| Error::DataDir(root.to_path_buf()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reduce a caller-supplied name to a bare `.md` file name.
    pub fn normalize_name(name: &str) -> String {
        let base = Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        if base.ends_with(".md") {
            base
        } else {
            format!("{base}.md")
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(Self::normalize_name(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Sorted list of document names.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(".md") && entry.path().is_file() {
                names.push(file_name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read a document, returning its raw content and parsed records.
    pub fn read(&self, name: &str) -> Result<(String, Vec<QaRecord>)> {
        let name = Self::normalize_name(name);
        let path = self.root.join(&name);
        if !path.is_file() {
            return Err(Error::NotFound {
                kind: "document",
                name,
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let records = codec::parse(&content);
        Ok((content, records))
    }

    /// Create a new document. With no records, the canonical empty
    /// template is written.
    pub fn create(
        &self,
        name: &str,
        records: Option<&[QaRecord]>,
    ) -> Result<String> {
        let name = Self::normalize_name(name);
        if self.exists(&name) {
            return Err(Error::Conflict {
                kind: "document",
                name,
            });
        }
        let content = match records {
            Some(records) => codec::render(records, None),
            None => codec::empty_template(&name),
        };
        std::fs::write(self.root.join(&name), &content)?;
        Ok(content)
    }

    /// Rewrite a document with a new record list, preserving the existing
    /// prefix verbatim.
    pub fn replace(&self, name: &str, records: &[QaRecord]) -> Result<String> {
        let name = Self::normalize_name(name);
        let (current, _) = self.read(&name)?;
        let prefix = codec::extract_prefix(&current);
        let content = codec::render(records, Some(&prefix));
        std::fs::write(self.root.join(&name), &content)?;
        Ok(content)
    }

    /// Delete a document.
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = Self::normalize_name(name);
        if !self.exists(&name) {
            return Err(Error::NotFound {
                kind: "document",
                name,
            });
        }
        std::fs::remove_file(self.path_for(&name))?;
        Ok(())
    }

    /// Append one record, creating the document from the empty template
    /// when it does not exist yet.
    pub fn append_record(
        &self,
        name: &str,
        question: &str,
        answer: &str,
    ) -> Result<Vec<QaRecord>> {
        let name = Self::normalize_name(name);
        let mut records = if self.exists(&name) {
            self.read(&name)?.1
        } else {
            tracing::debug!(document = %name, "creating document on first append");
            std::fs::write(
                self.root.join(&name),
                codec::empty_template(&name),
            )?;
            Vec::new()
        };
        records.push(QaRecord::new(question, answer));
        self.replace(&name, &records)?;
        Ok(records)
    }

    /// Delete the record at `index`, rewriting the document.
    pub fn delete_record_at(
        &self,
        name: &str,
        index: usize,
    ) -> Result<Vec<QaRecord>> {
        let name = Self::normalize_name(name);
        let (_, mut records) = self.read(&name)?;
        if index >= records.len() {
            return Err(Error::InvalidArgument(format!(
                "record index {index} out of range for {name} ({} records)",
                records.len()
            )));
        }
        records.remove(index);
        self.replace(&name, &records)?;
        Ok(records)
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, FileStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn normalize_name_variants() {
        assert_eq!(FileStore::normalize_name("notes"), "notes.md");
        assert_eq!(FileStore::normalize_name("notes.md"), "notes.md");
        assert_eq!(FileStore::normalize_name("dir/notes.md"), "notes.md");
    }

    #[test]
    fn create_and_read_empty_template() {
        let (_tmp, store) = test_store();
        let content = store.create("biology", None).unwrap();
        assert!(content.contains("# biology"));

        let (raw, records) = store.read("biology.md").unwrap();
        assert_eq!(raw, content);
        assert!(records.is_empty());
    }

    #[test]
    fn create_conflict_leaves_content_untouched() {
        let (_tmp, store) = test_store();
        let original = store
            .create("dup", Some(&[QaRecord::new("Q", "A")]))
            .unwrap();

        match store.create("dup", None) {
            Err(Error::Conflict { kind, name }) => {
                assert_eq!(kind, "document");
                assert_eq!(name, "dup.md");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert_eq!(store.read("dup").unwrap().0, original);
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_tmp, store) = test_store();
        assert!(matches!(
            store.read("ghost"),
            Err(Error::NotFound { kind: "document", .. })
        ));
    }

    #[test]
    fn append_creates_document_with_single_record() {
        let (_tmp, store) = test_store();
        let records = store.append_record("new.md", "Q1", "A1").unwrap();
        assert_eq!(records, vec![QaRecord::new("Q1", "A1")]);
        assert_eq!(store.read("new.md").unwrap().1, records);
    }

    #[test]
    fn append_extends_existing_document() {
        let (_tmp, store) = test_store();
        store.append_record("n", "Q1", "A1").unwrap();
        let records = store.append_record("n", "Q2", "A2").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], QaRecord::new("Q2", "A2"));
    }

    #[test]
    fn replace_preserves_hand_written_prefix() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.root().join("mine.md"),
            "# My title\n\nintro text\n\n## 问答\n| 问题 | 答案 |\n|---|---|\n| Q | A |\n",
        )
        .unwrap();

        store
            .replace("mine", &[QaRecord::new("Q2", "A2")])
            .unwrap();
        let (raw, records) = store.read("mine").unwrap();
        assert!(raw.starts_with("# My title\n\nintro text\n\n## 问答\n"));
        assert_eq!(records, vec![QaRecord::new("Q2", "A2")]);
    }

    #[test]
    fn delete_record_out_of_range_changes_nothing() {
        let (_tmp, store) = test_store();
        store.append_record("n", "Q1", "A1").unwrap();
        let before = store.read("n").unwrap().0;

        assert!(matches!(
            store.delete_record_at("n", 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(store.read("n").unwrap().0, before);
    }

    #[test]
    fn delete_last_record_restores_empty_table_with_prefix() {
        let (_tmp, store) = test_store();
        std::fs::write(
            store.root().join("notes.md"),
            "# Notes\n\n## 问答\n| 问题 | 答案 |\n|---|---|\n| What is 2+2? | 4 |\n",
        )
        .unwrap();

        let (_, records) = store.read("notes").unwrap();
        assert_eq!(records, vec![QaRecord::new("What is 2+2?", "4")]);

        let remaining = store.delete_record_at("notes", 0).unwrap();
        assert!(remaining.is_empty());

        let (raw, records) = store.read("notes").unwrap();
        assert!(records.is_empty());
        assert_eq!(
            raw,
            "# Notes\n\n## 问答\n| 问题 | 答案 |\n|------|------|\n"
        );
    }

    #[test]
    fn delete_document() {
        let (_tmp, store) = test_store();
        store.create("gone", None).unwrap();
        store.delete("gone").unwrap();
        assert!(matches!(
            store.delete("gone"),
            Err(Error::NotFound { .. })
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_is_sorted() {
        let (_tmp, store) = test_store();
        store.create("b", None).unwrap();
        store.create("a", None).unwrap();
        std::fs::write(store.root().join("ignored.txt"), "x").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a.md", "b.md"]);
    }
}
