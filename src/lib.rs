//! qalite - a question/answer notebook with exact and semantic search.
//!
//! qalite keeps QA notes as human-editable markdown tables (one file per
//! notebook) and maintains a derived, embedding-indexed semantic store
//! over them. The two stores are deliberately decoupled: documents are
//! authoritative, the index is a cache refreshed only by explicit
//! import/export calls, and edits to one never propagate to the other.
//!
//! # Quick start
//!
//! ```no_run
//! use qalite::{DataDir, FileStore, IndexDb, SemanticIndex};
//! use qalite::embedder::ColbertEmbedder;
//! use qalite::semantic::ImportPolicy;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = FileStore::open(&data_dir.notes_dir().unwrap()).unwrap();
//! let index = SemanticIndex::new(
//!     IndexDb::open(&data_dir.index_db()).unwrap(),
//!     Box::new(ColbertEmbedder::default()),
//! );
//!
//! let records = store.append_record("rust.md", "What is ownership?", "A memory discipline").unwrap();
//! index.import(&records, "rust", ImportPolicy::Append).unwrap();
//!
//! for hit in index.query("memory safety", None, 3).unwrap() {
//!     println!("{} {:.3} {}", hit.id, hit.distance, hit.question);
//! }
//! ```

pub mod codec;
pub mod data_dir;
pub mod embedder;
pub mod error;
pub mod file_store;
pub mod index_db;
pub mod mcp;
pub mod model_manager;
pub mod search;
pub mod semantic;

pub use codec::QaRecord;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use file_store::FileStore;
pub use index_db::IndexDb;
pub use model_manager::ModelManager;
pub use semantic::SemanticIndex;
