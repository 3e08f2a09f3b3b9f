use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    codec::{self, QaRecord},
    data_dir::DataDir,
    embedder::ColbertEmbedder,
    error::{self, Error},
    file_store::FileStore,
    index_db::IndexDb,
    model_manager::ModelManager,
    search,
    semantic::{ImportPolicy, MANUAL_SOURCE, SemanticIndex},
};

struct QaState {
    store: FileStore,
    index: SemanticIndex,
}

#[derive(Clone)]
pub struct QaMcpServer {
    state: Arc<QaState>,
    tool_router: ToolRouter<Self>,
}

impl QaMcpServer {
    fn new(state: QaState) -> Self {
        Self {
            state: Arc::new(state),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl QaMcpServer {
    // -- Record store tools --

    /// List all QA documents in the file store.
    #[tool(
        name = "list_documents",
        description = "List the names of all QA documents in the file store."
    )]
    pub async fn list_documents(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        reply(self.state.store.list().map(|names| {
            let summary = if names.is_empty() {
                "No documents in the store.".to_string()
            } else {
                names.join("\n")
            };
            ok(summary, json!({ "documents": names }))
        }))
    }

    /// Read one document's raw content and parsed records.
    #[tool(
        name = "get_document",
        description = "Read a QA document, returning its raw markdown and parsed records."
    )]
    pub async fn get_document(
        &self,
        params: Parameters<DocumentNameArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let name = params.0.name;
        reply(self.state.store.read(&name).map(|(content, records)| {
            let summary =
                format!("{name}: {} record(s)", records.len());
            ok(
                summary,
                json!({
                    "name": FileStore::normalize_name(&name),
                    "content": content,
                    "records": records,
                }),
            )
        }))
    }

    /// Create a new document, optionally seeded with records.
    #[tool(
        name = "create_document",
        description = "Create a new QA document. Fails when a document with that name already exists."
    )]
    pub async fn create_document(
        &self,
        params: Parameters<CreateDocumentArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let name = FileStore::normalize_name(&args.name);
        reply(
            self.state
                .store
                .create(&args.name, args.records.as_deref())
                .map(|content| {
                    ok(
                        format!("Created {name}"),
                        json!({ "name": name, "content": content }),
                    )
                }),
        )
    }

    /// Replace a document's records wholesale, keeping its prefix.
    #[tool(
        name = "replace_document",
        description = "Rewrite a QA document with a new record list. The text above the table is preserved."
    )]
    pub async fn replace_document(
        &self,
        params: Parameters<ReplaceDocumentArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let name = FileStore::normalize_name(&args.name);
        reply(
            self.state
                .store
                .replace(&args.name, &args.records)
                .map(|content| {
                    ok(
                        format!(
                            "Rewrote {name} with {} record(s)",
                            args.records.len()
                        ),
                        json!({ "name": name, "content": content }),
                    )
                }),
        )
    }

    /// Delete a document from the file store.
    #[tool(
        name = "delete_document",
        description = "Delete a QA document. Previously imported index entries are not touched."
    )]
    pub async fn delete_document(
        &self,
        params: Parameters<DocumentNameArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let name = FileStore::normalize_name(&params.0.name);
        reply(self.state.store.delete(&name).map(|()| {
            ok(
                format!("Deleted {name}"),
                json!({ "name": name, "deleted": true }),
            )
        }))
    }

    /// Append one record, creating the document when absent.
    #[tool(
        name = "append_record",
        description = "Append a question/answer pair to a document, creating the document if it does not exist."
    )]
    pub async fn append_record(
        &self,
        params: Parameters<AppendRecordArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let name = FileStore::normalize_name(&args.name);
        reply(
            self.state
                .store
                .append_record(&args.name, &args.question, &args.answer)
                .map(|records| {
                    ok(
                        format!(
                            "Appended to {name}; now {} record(s)",
                            records.len()
                        ),
                        json!({ "name": name, "records": records }),
                    )
                }),
        )
    }

    /// Delete the record at a zero-based index.
    #[tool(
        name = "delete_record",
        description = "Delete the record at a zero-based index from a document."
    )]
    pub async fn delete_record(
        &self,
        params: Parameters<DeleteRecordArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let name = FileStore::normalize_name(&args.name);
        if args.index < 0 {
            return Ok(fail(format!(
                "invalid argument: record index {} is negative",
                args.index
            )));
        }
        reply(
            self.state
                .store
                .delete_record_at(&args.name, args.index as usize)
                .map(|records| {
                    ok(
                        format!(
                            "Deleted record {} from {name}; {} record(s) remain",
                            args.index,
                            records.len()
                        ),
                        json!({ "name": name, "records": records }),
                    )
                }),
        )
    }

    /// Case-insensitive substring search over all documents.
    #[tool(
        name = "exact_search",
        description = "Search every document for records whose question or answer contains the query (case-insensitive)."
    )]
    pub async fn exact_search(
        &self,
        params: Parameters<ExactSearchArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let query = params.0.query;
        reply(search::exact_search(&self.state.store, &query).map(|matches| {
            let summary = if matches.is_empty() {
                format!("No matches for \"{query}\"")
            } else {
                let suffix = if matches.len() == 1 { "" } else { "es" };
                format!("Found {} match{suffix} for \"{query}\"", matches.len())
            };
            ok(summary, json!({ "query": query, "matches": matches }))
        }))
    }

    // -- Semantic index tools --

    /// Import a document's records into the semantic index.
    #[tool(
        name = "import_document",
        description = "Parse a QA document and copy its records into the semantic index, tagged with the document name. Policy 'append' (default) always adds new entries; 'upsert' skips pairs already imported."
    )]
    pub async fn import_document(
        &self,
        params: Parameters<ImportDocumentArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = source_tag(&args.name);
        reply((|| {
            let (_, records) = self.state.store.read(&args.name)?;
            if records.is_empty() {
                return Ok(fail(format!(
                    "no QA records found in {}, nothing imported",
                    args.name
                )));
            }
            let outcome = self.state.index.import(
                &records,
                &source,
                args.policy.unwrap_or_default(),
            )?;
            Ok(ok(
                format!(
                    "Imported {} record(s) from {source} ({} skipped)",
                    outcome.added, outcome.skipped
                ),
                json!({ "source": source, "outcome": outcome }),
            ))
        })())
    }

    /// List the distinct source tags present in the index.
    #[tool(
        name = "list_sources",
        description = "List the source tags of all entries in the semantic index."
    )]
    pub async fn list_sources(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        reply(self.state.index.sources().map(|sources| {
            let summary = if sources.is_empty() {
                "No sources imported yet.".to_string()
            } else {
                sources.join("\n")
            };
            ok(summary, json!({ "sources": sources }))
        }))
    }

    /// Nearest-neighbor search over the semantic index.
    #[tool(
        name = "semantic_query",
        description = "Return the entries most similar to the query text, optionally restricted to one source tag. topK defaults to 3, maximum 10."
    )]
    pub async fn semantic_query(
        &self,
        params: Parameters<SemanticQueryArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = args.source.as_deref().map(source_tag);
        reply(
            self.state
                .index
                .query(
                    &args.query,
                    source.as_deref(),
                    args.top_k.unwrap_or(crate::semantic::DEFAULT_TOP_K),
                )
                .map(|hits| {
                    let summary = if hits.is_empty() {
                        "No related entries found.".to_string()
                    } else {
                        hits.iter()
                            .map(|h| {
                                format!(
                                    "{} [{:.4}] {} -> {}",
                                    h.id,
                                    h.distance,
                                    search::display_cell(&h.question),
                                    search::display_cell(&h.answer)
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("\n")
                    };
                    ok(summary, json!({ "query": args.query, "hits": hits }))
                }),
        )
    }

    /// Preview an entry update without applying it.
    #[tool(
        name = "preview_update",
        description = "Show the before/after diff of changing an entry's question and/or answer, without saving anything."
    )]
    pub async fn preview_update(
        &self,
        params: Parameters<UpdateEntryArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        reply(
            self.state
                .index
                .preview_update(
                    &args.id,
                    args.question.as_deref(),
                    args.answer.as_deref(),
                )
                .map(|preview| match preview {
                    None => fail(format!("entry not found: {}", args.id)),
                    Some(preview) => ok(
                        format!(
                            "old question: {}\nold answer: {}\nnew question: {}\nnew answer: {}\nCall confirm_update with the same arguments to apply.",
                            preview.old_question,
                            preview.old_answer,
                            preview.new_question,
                            preview.new_answer
                        ),
                        json!({ "id": args.id, "preview": preview }),
                    ),
                }),
        )
    }

    /// Apply an entry update previously previewed.
    #[tool(
        name = "confirm_update",
        description = "Apply a change to an entry's question and/or answer. Omitted fields keep their stored value; the entry is re-embedded."
    )]
    pub async fn confirm_update(
        &self,
        params: Parameters<UpdateEntryArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        reply(
            self.state
                .index
                .confirm_update(
                    &args.id,
                    args.question.as_deref(),
                    args.answer.as_deref(),
                )
                .map(|applied| {
                    if applied {
                        ok(
                            "Update applied.".to_string(),
                            json!({ "id": args.id, "applied": true }),
                        )
                    } else {
                        fail(format!("entry not found: {}", args.id))
                    }
                }),
        )
    }

    /// Delete one entry from the semantic index.
    #[tool(
        name = "delete_entry",
        description = "Delete an entry from the semantic index by id. The source document, if any, is not modified."
    )]
    pub async fn delete_entry(
        &self,
        params: Parameters<EntryIdArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let id = params.0.id;
        reply(self.state.index.remove(&id).map(|removed| match removed {
            None => fail(format!("entry not found: {id}")),
            Some(meta) => {
                let mut summary = format!("Deleted entry {id}.");
                if meta.source != MANUAL_SOURCE {
                    summary.push_str(&format!(
                        " The source document '{}' was not modified; remove the pair there manually if needed.",
                        meta.source
                    ));
                }
                ok(
                    summary,
                    json!({
                        "id": id,
                        "question": meta.question,
                        "answer": meta.answer,
                        "source": meta.source,
                    }),
                )
            }
        }))
    }

    /// Page through stored entries.
    #[tool(
        name = "list_entries",
        description = "List semantic index entries page by page, optionally filtered by source tag. pageSize defaults to 10, maximum 100."
    )]
    pub async fn list_entries(
        &self,
        params: Parameters<ListEntriesArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = args.source.as_deref().map(source_tag);
        reply(
            self.state
                .index
                .list_page(
                    source.as_deref(),
                    args.page.unwrap_or(1),
                    args.page_size
                        .unwrap_or(crate::semantic::DEFAULT_PAGE_SIZE),
                )
                .map(|page| {
                    let summary = format!(
                        "{} entr(ies) total, page {} of size {}",
                        page.total, page.page, page.page_size
                    );
                    let items: Vec<_> = page
                        .items
                        .iter()
                        .map(|item| {
                            json!({
                                "id": item.id,
                                "question": search::display_cell(&item.question),
                                "answer": search::display_cell(&item.answer),
                                "source": item.source,
                            })
                        })
                        .collect();
                    ok(
                        summary,
                        json!({
                            "total": page.total,
                            "page": page.page,
                            "pageSize": page.page_size,
                            "items": items,
                        }),
                    )
                }),
        )
    }

    /// Add one entry directly to the semantic index.
    #[tool(
        name = "add_entry",
        description = "Add a single question/answer entry to the semantic index. Source tag defaults to 'manual'."
    )]
    pub async fn add_entry(
        &self,
        params: Parameters<AddEntryArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = args
            .source
            .as_deref()
            .map_or_else(|| MANUAL_SOURCE.to_string(), source_tag);
        reply(
            self.state
                .index
                .add_one(&args.question, &args.answer, &source)
                .map(|id| {
                    ok(
                        format!("Added entry {id} (source {source})"),
                        json!({ "id": id, "source": source }),
                    )
                }),
        )
    }

    /// Add a batch of entries, skipping duplicates.
    #[tool(
        name = "add_entries",
        description = "Add several question/answer entries at once. Pairs already stored under the same source tag, or repeated within the batch, are skipped."
    )]
    pub async fn add_entries(
        &self,
        params: Parameters<AddEntriesArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = args
            .source
            .as_deref()
            .map_or_else(|| MANUAL_SOURCE.to_string(), source_tag);
        reply(
            self.state
                .index
                .add_many(&args.records, &source)
                .map(|outcome| {
                    ok(
                        format!(
                            "Added {} entr(ies), skipped {} duplicate(s).",
                            outcome.added, outcome.skipped
                        ),
                        json!({ "source": source, "outcome": outcome }),
                    )
                }),
        )
    }

    /// Export all entries of one source back into a markdown document.
    #[tool(
        name = "export_document",
        description = "Write every entry tagged with a source back out as a two-column QA markdown file. Defaults to <source>.md in the working directory."
    )]
    pub async fn export_document(
        &self,
        params: Parameters<ExportDocumentArgs>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let args = params.0;
        let source = source_tag(&args.source);
        reply((|| {
            let content = self.state.index.export(&source)?;
            let count = codec::parse(&content).len();
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| format!("{source}.md"));
            std::fs::write(&output, &content)?;
            Ok(ok(
                format!("Exported {count} record(s) to {output}"),
                json!({ "source": source, "output": output, "records": count }),
            ))
        })())
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for QaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("qalite", env!("CARGO_PKG_VERSION"))
                    .with_title("qalite MCP"),
            )
            .with_instructions(
                "QA notebook tools. Document tools edit markdown files; index tools edit the \
                 semantic store. The two are synchronized only by explicit import_document or \
                 export_document calls.",
            )
    }
}

// -- Tool arguments --

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNameArgs {
    /// Document name, with or without the .md suffix.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentArgs {
    /// Document name, with or without the .md suffix.
    pub name: String,
    /// Initial records; omitted means an empty template.
    pub records: Option<Vec<QaRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceDocumentArgs {
    /// Document name, with or without the .md suffix.
    pub name: String,
    /// Full replacement record list.
    pub records: Vec<QaRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppendRecordArgs {
    /// Document name; created when absent.
    pub name: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordArgs {
    /// Document name.
    pub name: String,
    /// Zero-based record index.
    pub index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExactSearchArgs {
    /// Substring to look for; blank returns no results.
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocumentArgs {
    /// Document name to import from the file store.
    pub name: String,
    /// Duplicate handling: 'append' (default) or 'upsert'.
    pub policy: Option<ImportPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SemanticQueryArgs {
    /// Query text.
    pub query: String,
    /// Restrict to entries with this source tag.
    pub source: Option<String>,
    /// Number of results (default 3, maximum 10).
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryIdArgs {
    /// Entry id.
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryArgs {
    /// Entry id.
    pub id: String,
    /// New question; omitted keeps the stored one.
    pub question: Option<String>,
    /// New answer; omitted keeps the stored one.
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesArgs {
    /// Restrict to entries with this source tag.
    pub source: Option<String>,
    /// Page number, clamped up to 1.
    pub page: Option<usize>,
    /// Page size (default 10, maximum 100).
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddEntryArgs {
    pub question: String,
    pub answer: String,
    /// Source tag (default 'manual').
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddEntriesArgs {
    /// Records to add.
    pub records: Vec<QaRecord>,
    /// Source tag (default 'manual').
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocumentArgs {
    /// Source tag to export.
    pub source: String,
    /// Output file path (default <source>.md).
    pub output: Option<String>,
}

// -- Helpers --

/// Source tags are bare document names without the .md suffix.
fn source_tag(name: &str) -> String {
    let base = FileStore::normalize_name(name);
    base.strip_suffix(".md").unwrap_or(&base).to_string()
}

fn ok(summary: String, structured: serde_json::Value) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(summary)]);
    result.structured_content = Some(structured);
    result
}

fn fail(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

/// Domain outcomes become tool-level failures the caller can read;
/// infrastructure failures become protocol errors.
fn reply(
    result: error::Result<CallToolResult>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    match result {
        Ok(r) => Ok(r),
        Err(
            e @ (Error::NotFound { .. }
            | Error::Conflict { .. }
            | Error::InvalidArgument(_)),
        ) => Ok(fail(e.to_string())),
        Err(e) => Err(rmcp::ErrorData::internal_error(
            e.to_string(),
            Some(json!({ "error": e.to_string() })),
        )),
    }
}

/// Run the MCP server over stdio until the peer disconnects.
pub fn run_mcp(data_dir: DataDir, model: Option<String>) -> error::Result<()> {
    let store = FileStore::open(&data_dir.notes_dir()?)?;
    let index_db = IndexDb::open(&data_dir.index_db())?;
    let manager = match model {
        Some(id) => ModelManager::with_model_id(id),
        None => ModelManager::default(),
    };
    let index =
        SemanticIndex::new(index_db, Box::new(ColbertEmbedder::new(manager)));

    let server = QaMcpServer::new(QaState { store, index });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            Error::Config(format!("MCP server initialization failed: {e}"))
        })?;
        running
            .waiting()
            .await
            .map_err(|e| Error::Config(format!("MCP server error: {e}")))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{embedder::Embedder, error::Result};

    struct StubEmbedder;

    impl Embedder for StubEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
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

    fn test_server() -> (tempfile::TempDir, QaMcpServer) {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(&tmp.path().join("qa_files")).unwrap();
        let index_db = IndexDb::open(&tmp.path().join("index.redb")).unwrap();
        let index = SemanticIndex::new(index_db, Box::new(StubEmbedder));
        (tmp, QaMcpServer::new(QaState { store, index }))
    }

    #[tokio::test]
    async fn append_then_import_then_query() {
        let (_tmp, server) = test_server();

        server
            .append_record(Parameters(AppendRecordArgs {
                name: "rust.md".to_string(),
                question: "What is ownership?".to_string(),
                answer: "A memory discipline".to_string(),
            }))
            .await
            .unwrap();

        let result = server
            .import_document(Parameters(ImportDocumentArgs {
                name: "rust".to_string(),
                policy: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["outcome"]["added"], 1);

        let result = server
            .semantic_query(Parameters(SemanticQueryArgs {
                query: "ownership".to_string(),
                source: Some("rust".to_string()),
                top_k: None,
            }))
            .await
            .unwrap();
        let structured = result.structured_content.unwrap();
        let hits = structured["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["source"], "rust");
    }

    #[tokio::test]
    async fn missing_document_is_tool_failure_not_protocol_error() {
        let (_tmp, server) = test_server();
        let result = server
            .get_document(Parameters(DocumentNameArgs {
                name: "ghost".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn negative_index_is_rejected() {
        let (_tmp, server) = test_server();
        server
            .append_record(Parameters(AppendRecordArgs {
                name: "n".to_string(),
                question: "Q".to_string(),
                answer: "A".to_string(),
            }))
            .await
            .unwrap();

        let result = server
            .delete_record(Parameters(DeleteRecordArgs {
                name: "n".to_string(),
                index: -1,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));

        let result = server
            .delete_record(Parameters(DeleteRecordArgs {
                name: "n".to_string(),
                index: 1,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn delete_entry_warns_about_source_document() {
        let (_tmp, server) = test_server();
        server
            .append_record(Parameters(AppendRecordArgs {
                name: "notes".to_string(),
                question: "Q".to_string(),
                answer: "A".to_string(),
            }))
            .await
            .unwrap();
        server
            .import_document(Parameters(ImportDocumentArgs {
                name: "notes".to_string(),
                policy: None,
            }))
            .await
            .unwrap();

        let page = server
            .list_entries(Parameters(ListEntriesArgs {
                source: Some("notes".to_string()),
                page: None,
                page_size: None,
            }))
            .await
            .unwrap();
        let structured = page.structured_content.unwrap();
        let id = structured["items"][0]["id"].as_str().unwrap().to_string();

        let result = server
            .delete_entry(Parameters(EntryIdArgs { id }))
            .await
            .unwrap();
        let summary = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default();
        assert!(summary.contains("was not modified"));

        // The file itself is untouched.
        let doc = server
            .get_document(Parameters(DocumentNameArgs {
                name: "notes".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(doc.is_error, Some(false));
    }
}
