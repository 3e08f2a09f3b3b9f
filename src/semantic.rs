use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    codec::{self, QaRecord},
    embedder::Embedder,
    error::{Error, Result},
    index_db::{EntryMeta, IndexDb},
};

pub const DEFAULT_TOP_K: usize = 3;
pub const MAX_TOP_K: usize = 10;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Source tag assigned to entries added outside any import.
pub const MANUAL_SOURCE: &str = "manual";

/// How an import treats records already present for the same source.
///
/// `Append` mints fresh ids unconditionally (repeated imports of the
/// same document duplicate every entry); `Upsert` dedupes by trimmed
/// `(question, answer)` value against existing entries with the same
/// source and within the batch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    #[default]
    Append,
    Upsert,
}

/// Result of a batch add or import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub added: usize,
    pub skipped: usize,
    pub added_ids: Vec<String>,
}

/// One nearest-neighbor hit, distances ascending.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHit {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub source: String,
    pub distance: f32,
}

/// A stored entry as seen by listing callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub source: String,
}

/// One page of entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<EntryView>,
}

/// Before/after view of a pending entry update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreview {
    pub old_question: String,
    pub old_answer: String,
    pub new_question: String,
    pub new_answer: String,
}

/// Embedding-indexed store of QA entries, derived from but never kept
/// consistent with the file store. Entries reference their origin only
/// through the free-text source tag; ids are minted once and never
/// reused.
pub struct SemanticIndex {
    db: IndexDb,
    embedder: Box<dyn Embedder>,
}

impl SemanticIndex {
    pub fn new(db: IndexDb, embedder: Box<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    /// Text handed to the embedding function for one entry.
    fn embed_text(meta: &EntryMeta) -> String {
        format!("{}\n{}", meta.question, meta.answer)
    }

    /// Trimmed (question, answer) pairs already stored for `source`.
    fn existing_pairs(&self, source: &str) -> Result<HashSet<(String, String)>> {
        Ok(self
            .db
            .list(Some(source))?
            .into_iter()
            .map(|(_, m)| {
                (m.question.trim().to_string(), m.answer.trim().to_string())
            })
            .collect())
    }

    /// Embed and store a batch of prepared entries in one backend call.
    fn embed_and_put(&self, metas: Vec<EntryMeta>) -> Result<Vec<String>> {
        if metas.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = metas.iter().map(Self::embed_text).collect();
        let vectors = self.embedder.embed(&texts)?;
        if vectors.len() != metas.len() {
            return Err(Error::Backend(format!(
                "expected {} vectors, got {}",
                metas.len(),
                vectors.len()
            )));
        }

        let entries: Vec<(String, EntryMeta, Vec<f32>)> = metas
            .into_iter()
            .zip(vectors)
            .map(|(meta, vector)| {
                (Uuid::new_v4().to_string(), meta, vector)
            })
            .collect();
        let ids = entries.iter().map(|(id, _, _)| id.clone()).collect();
        self.db.batch_put(&entries)?;
        Ok(ids)
    }

    /// Copy records into the index under `source`.
    ///
    /// The user-answer field never enters the index. Records with both
    /// question and answer empty after trimming are skipped regardless
    /// of policy.
    pub fn import(
        &self,
        records: &[QaRecord],
        source: &str,
        policy: ImportPolicy,
    ) -> Result<BatchOutcome> {
        let mut seen = match policy {
            ImportPolicy::Append => HashSet::new(),
            ImportPolicy::Upsert => self.existing_pairs(source)?,
        };

        let mut metas = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            let question = codec::encode_cell(record.question.trim());
            let answer = codec::encode_cell(record.answer.trim());
            if question.is_empty() && answer.is_empty() {
                skipped += 1;
                continue;
            }
            if policy == ImportPolicy::Upsert {
                let key = (question.clone(), answer.clone());
                if !seen.insert(key) {
                    skipped += 1;
                    continue;
                }
            }
            metas.push(EntryMeta {
                question,
                answer,
                source: source.to_string(),
            });
        }

        let added_ids = self.embed_and_put(metas)?;
        tracing::info!(
            source,
            added = added_ids.len(),
            skipped,
            "imported records into semantic index"
        );
        Ok(BatchOutcome {
            added: added_ids.len(),
            skipped,
            added_ids,
        })
    }

    /// Add a single entry, returning its freshly minted id.
    pub fn add_one(
        &self,
        question: &str,
        answer: &str,
        source: &str,
    ) -> Result<String> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return Err(Error::InvalidArgument(
                "question and answer must both be non-empty".to_string(),
            ));
        }

        let meta = EntryMeta {
            question: codec::encode_cell(question),
            answer: codec::encode_cell(answer),
            source: source.to_string(),
        };
        let ids = self.embed_and_put(vec![meta])?;
        ids.into_iter().next().ok_or_else(|| {
            Error::Backend("embedding backend returned no vector".to_string())
        })
    }

    /// Add a batch of entries, skipping pairs already stored under
    /// `source` or duplicated within the batch.
    pub fn add_many(
        &self,
        records: &[QaRecord],
        source: &str,
    ) -> Result<BatchOutcome> {
        if records.is_empty() {
            return Err(Error::InvalidArgument(
                "record list must be non-empty".to_string(),
            ));
        }

        let mut seen = self.existing_pairs(source)?;
        let mut metas = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            // Dedupe on the encoded form: stored pairs carry the newline
            // placeholder, so raw text would never match them.
            let question = codec::encode_cell(record.question.trim());
            let answer = codec::encode_cell(record.answer.trim());
            if question.is_empty() || answer.is_empty() {
                skipped += 1;
                continue;
            }
            if !seen.insert((question.clone(), answer.clone())) {
                skipped += 1;
                continue;
            }
            metas.push(EntryMeta {
                question,
                answer,
                source: source.to_string(),
            });
        }

        let added_ids = self.embed_and_put(metas)?;
        Ok(BatchOutcome {
            added: added_ids.len(),
            skipped,
            added_ids,
        })
    }

    /// Read-only diff of a pending update. `None` when the id is absent.
    /// Both sides of the diff are shown in stored (placeholder-encoded)
    /// form, exactly what `confirm_update` would write.
    pub fn preview_update(
        &self,
        id: &str,
        new_question: Option<&str>,
        new_answer: Option<&str>,
    ) -> Result<Option<UpdatePreview>> {
        let Some(meta) = self.db.get(id)? else {
            return Ok(None);
        };
        Ok(Some(UpdatePreview {
            new_question: new_question
                .map(|q| codec::encode_cell(q.trim()))
                .unwrap_or_else(|| meta.question.clone()),
            new_answer: new_answer
                .map(|a| codec::encode_cell(a.trim()))
                .unwrap_or_else(|| meta.answer.clone()),
            old_question: meta.question,
            old_answer: meta.answer,
        }))
    }

    /// Apply an update: merge omitted fields from the stored entry,
    /// re-embed, and overwrite. Returns false when the id is absent.
    pub fn confirm_update(
        &self,
        id: &str,
        new_question: Option<&str>,
        new_answer: Option<&str>,
    ) -> Result<bool> {
        let Some(old) = self.db.get(id)? else {
            return Ok(false);
        };

        let meta = EntryMeta {
            question: new_question
                .map(|q| codec::encode_cell(q.trim()))
                .unwrap_or(old.question),
            answer: new_answer
                .map(|a| codec::encode_cell(a.trim()))
                .unwrap_or(old.answer),
            source: old.source,
        };
        let vectors = self.embedder.embed(&[Self::embed_text(&meta)])?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            Error::Backend("embedding backend returned no vector".to_string())
        })?;
        self.db.put(id, &meta, &vector)?;
        Ok(true)
    }

    /// Remove an entry permanently. Deletion is terminal: the id is
    /// never reused and the source document, if any, is not touched.
    pub fn remove(&self, id: &str) -> Result<Option<EntryMeta>> {
        self.db.remove(id)
    }

    /// Nearest-neighbor query, ascending by cosine distance.
    ///
    /// `top_k` is clamped to `[1, 10]`; the query text is embedded once.
    pub fn query(
        &self,
        text: &str,
        source: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let query_vectors = self.embedder.embed(&[text.to_string()])?;
        let query_vector = query_vectors.first().ok_or_else(|| {
            Error::Backend("embedding backend returned no vector".to_string())
        })?;

        let mut hits: Vec<QueryHit> = self
            .db
            .scan(source)?
            .into_iter()
            .map(|(id, meta, vector)| QueryHit {
                distance: cosine_distance(query_vector, &vector),
                id,
                question: meta.question,
                answer: meta.answer,
                source: meta.source,
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);
        Ok(hits)
    }

    /// One page of entries in the backing store's native order.
    ///
    /// `page` is clamped up to 1 and `page_size` to `[1, 100]`.
    pub fn list_page(
        &self,
        source: Option<&str>,
        page: usize,
        page_size: usize,
    ) -> Result<Page> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let all = self.db.list(source)?;
        let total = all.len();
        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = (start + page_size).min(total);

        let items = all[start..end]
            .iter()
            .map(|(id, meta)| EntryView {
                id: id.clone(),
                question: meta.question.clone(),
                answer: meta.answer.clone(),
                source: meta.source.clone(),
            })
            .collect();

        Ok(Page {
            total,
            page,
            page_size,
            items,
        })
    }

    /// Regenerate a two-column document for every entry tagged `source`.
    /// The user-answer column is never exported.
    pub fn export(&self, source: &str) -> Result<String> {
        let entries = self.db.list(Some(source))?;
        if entries.is_empty() {
            return Err(Error::NotFound {
                kind: "imported source",
                name: source.to_string(),
            });
        }

        let records: Vec<QaRecord> = entries
            .into_iter()
            .map(|(_, meta)| {
                QaRecord::new(
                    codec::decode_cell(&meta.question),
                    codec::decode_cell(&meta.answer),
                )
            })
            .collect();
        Ok(codec::render(&records, None))
    }

    /// Distinct source tags, sorted.
    pub fn sources(&self) -> Result<Vec<String>> {
        self.db.sources()
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        self.db.len()
    }
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex").finish_non_exhaustive()
    }
}

/// Cosine distance in `[0, 2]`; zero-magnitude vectors are maximally
/// distant from everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
