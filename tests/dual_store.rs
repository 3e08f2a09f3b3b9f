use qalite::{
    FileStore, IndexDb, QaRecord, SemanticIndex,
    codec,
    embedder::Embedder,
    error::Error,
    semantic::ImportPolicy,
};

/// Deterministic embedder so index behavior is testable without a model.
struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, texts: &[String]) -> qalite::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![1.0f32; 8];
                for (i, b) in text.bytes().enumerate() {
                    v[(b as usize + i) % 8] += f32::from(b) / 16.0;
                }
                v
            })
            .collect())
    }
}

fn setup() -> (tempfile::TempDir, FileStore, SemanticIndex) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(&tmp.path().join("qa_files")).unwrap();
    let index = SemanticIndex::new(
        IndexDb::open(&tmp.path().join("index.redb")).unwrap(),
        Box::new(StubEmbedder),
    );
    (tmp, store, index)
}

#[test]
fn document_flows_into_index_and_back_out() {
    let (_tmp, store, index) = setup();

    store
        .append_record("rust", "What is ownership?", "A memory discipline")
        .unwrap();
    store
        .append_record("rust", "What is borrowing?", "Temporary\naccess")
        .unwrap();

    let (_, records) = store.read("rust").unwrap();
    let outcome = index.import(&records, "rust", ImportPolicy::Append).unwrap();
    assert_eq!(outcome.added, 2);

    // Export regenerates a parseable two-column table with the same pairs.
    let exported = index.export("rust").unwrap();
    let round_tripped = codec::parse(&exported);
    assert_eq!(round_tripped.len(), 2);
    assert!(round_tripped.iter().any(|r| r.answer == "Temporary\naccess"));
}

#[test]
fn stores_diverge_until_explicit_reimport() {
    let (_tmp, store, index) = setup();

    let records = store.append_record("notes", "Q1", "A1").unwrap();
    index.import(&records, "notes", ImportPolicy::Append).unwrap();

    // Editing the file does not touch the index.
    store.append_record("notes", "Q2", "A2").unwrap();
    assert_eq!(index.list_page(Some("notes"), 1, 10).unwrap().total, 1);

    // Deleting the document leaves entries orphaned but queryable.
    store.delete("notes").unwrap();
    assert_eq!(index.sources().unwrap(), vec!["notes"]);

    // A fresh upsert import from a recreated document reconverges.
    store.append_record("notes", "Q1", "A1").unwrap();
    let (_, records) = store.read("notes").unwrap();
    let outcome = index.import(&records, "notes", ImportPolicy::Upsert).unwrap();
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.skipped, 1);
}

#[test]
fn reimport_with_append_policy_duplicates() {
    let (_tmp, store, index) = setup();

    let records = store.append_record("dup", "Q", "A").unwrap();
    index.import(&records, "dup", ImportPolicy::Append).unwrap();
    index.import(&records, "dup", ImportPolicy::Append).unwrap();

    assert_eq!(index.list_page(Some("dup"), 1, 10).unwrap().total, 2);
}

#[test]
fn deleting_entries_never_edits_the_source_file() {
    let (_tmp, store, index) = setup();

    let records = store.append_record("keep", "Q", "A").unwrap();
    index.import(&records, "keep", ImportPolicy::Append).unwrap();
    let before = store.read("keep").unwrap().0;

    let page = index.list_page(Some("keep"), 1, 10).unwrap();
    let removed = index.remove(&page.items[0].id).unwrap().unwrap();
    assert_eq!(removed.source, "keep");

    assert_eq!(store.read("keep").unwrap().0, before);
    assert!(matches!(
        index.export("keep"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn hand_edited_document_survives_machine_edits() {
    let (_tmp, store, index) = setup();

    let content = "# 生物笔记\n\n自由笔记区域\n\n## 问答\n\
        | 问题 | 答案 | 用户回答 |\n\
        |------|------|----------|\n\
        | 什么是细胞? | 生命的基本单位 | 我的答案 |\n";
    std::fs::write(store.root().join("bio.md"), content).unwrap();

    let records = store.append_record("bio", "Q2", "A2").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].user_answer.as_deref(), Some("我的答案"));

    let (raw, _) = store.read("bio").unwrap();
    assert!(raw.starts_with("# 生物笔记\n\n自由笔记区域\n\n## 问答\n"));
    assert!(raw.contains("| 用户回答 |"));

    // The user-answer column stays in the file but never reaches the index.
    index.import(&records, "bio", ImportPolicy::Append).unwrap();
    let exported = index.export("bio").unwrap();
    assert!(!exported.contains("我的答案"));
}
