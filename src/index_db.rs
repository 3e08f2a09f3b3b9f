use std::path::Path;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
const VECTORS: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");

/// Metadata stored alongside each indexed entry.
///
/// `source` is a free-text tag naming the originating document; it is
/// never a foreign key into the file store. Question and answer are
/// stored newline-escaped, symmetric with the table codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub question: String,
    pub answer: String,
    pub source: String,
}

/// Persistent entry + vector collection backing the semantic index.
///
/// Two tables keyed by entry id: JSON-encoded metadata and raw f32 LE
/// vector bytes. Iteration order is the redb key order, stable absent
/// mutation. redb provides its own concurrency safety; this layer adds
/// none.
pub struct IndexDb {
    db: Database,
}

impl IndexDb {
    /// Open or create the index database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(ENTRIES)?;
        txn.open_table(VECTORS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or overwrite one entry with its vector.
    pub fn put(&self, id: &str, meta: &EntryMeta, vector: &[f32]) -> Result<()> {
        let encoded = serde_json::to_vec(meta)?;
        let txn = self.db.begin_write()?;
        {
            let mut entries = txn.open_table(ENTRIES)?;
            entries.insert(id, encoded.as_slice())?;
            let mut vectors = txn.open_table(VECTORS)?;
            vectors.insert(id, bytemuck::cast_slice::<f32, u8>(vector))?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Insert multiple entries in a single transaction.
    pub fn batch_put(
        &self,
        entries: &[(String, EntryMeta, Vec<f32>)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write()?;
        {
            let mut meta_table = txn.open_table(ENTRIES)?;
            let mut vector_table = txn.open_table(VECTORS)?;
            for (id, meta, vector) in entries {
                let encoded = serde_json::to_vec(meta)?;
                meta_table.insert(id.as_str(), encoded.as_slice())?;
                vector_table.insert(
                    id.as_str(),
                    bytemuck::cast_slice::<f32, u8>(vector),
                )?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Fetch one entry's metadata.
    pub fn get(&self, id: &str) -> Result<Option<EntryMeta>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let Some(guard) = table.get(id)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(guard.value())?))
    }

    /// Remove an entry, returning its metadata if it existed.
    pub fn remove(&self, id: &str) -> Result<Option<EntryMeta>> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut entries = txn.open_table(ENTRIES)?;
            let meta = match entries.remove(id)? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value())?)
                }
                None => None,
            };
            let mut vectors = txn.open_table(VECTORS)?;
            vectors.remove(id)?;
            meta
        };
        txn.commit()?;
        Ok(removed)
    }

    /// All entries, optionally restricted to one source tag, in the
    /// backing store's native order.
    pub fn list(
        &self,
        source: Option<&str>,
    ) -> Result<Vec<(String, EntryMeta)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            let meta: EntryMeta = serde_json::from_slice(v.value())?;
            if source.is_none_or(|s| meta.source == s) {
                result.push((k.value().to_string(), meta));
            }
        }
        Ok(result)
    }

    /// All entries with their vectors, optionally restricted to one
    /// source tag. This is the brute-force scan behind nearest-neighbor
    /// queries.
    pub fn scan(
        &self,
        source: Option<&str>,
    ) -> Result<Vec<(String, EntryMeta, Vec<f32>)>> {
        let txn = self.db.begin_read()?;
        let entries = txn.open_table(ENTRIES)?;
        let vectors = txn.open_table(VECTORS)?;

        let mut result = Vec::new();
        for entry in entries.iter()? {
            let (k, v) = entry?;
            let id = k.value().to_string();
            let meta: EntryMeta = serde_json::from_slice(v.value())?;
            if source.is_some_and(|s| meta.source != s) {
                continue;
            }
            let Some(guard) = vectors.get(id.as_str())? else {
                tracing::warn!(id = %id, "entry has no stored vector, skipping");
                continue;
            };
            let vector: Vec<f32> =
                bytemuck::pod_collect_to_vec(guard.value());
            result.push((id, meta, vector));
        }
        Ok(result)
    }

    /// Distinct source tags, sorted.
    pub fn sources(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let mut sources = std::collections::BTreeSet::new();
        for entry in table.iter()? {
            let (_, v) = entry?;
            let meta: EntryMeta = serde_json::from_slice(v.value())?;
            sources.insert(meta.source);
        }
        Ok(sources.into_iter().collect())
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        Ok(table.len()? as usize)
    }
}

impl std::fmt::Debug for IndexDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexDb").finish_non_exhaustive()
    }
}
