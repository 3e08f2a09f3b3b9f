use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
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

use cli::{Cli, Command, EntriesAction, NotesAction};
use data_dir::DataDir;
use embedder::ColbertEmbedder;
use file_store::FileStore;
use index_db::IndexDb;
use model_manager::ModelManager;
use semantic::{ImportPolicy, SemanticIndex};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("QALITE_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn open_store(data_dir: &DataDir) -> error::Result<FileStore> {
    FileStore::open(&data_dir.notes_dir()?)
}

fn open_index(
    data_dir: &DataDir,
    model: Option<&str>,
) -> error::Result<SemanticIndex> {
    let db = IndexDb::open(&data_dir.index_db())?;
    let manager = match model {
        Some(id) => ModelManager::with_model_id(id.to_string()),
        None => ModelManager::default(),
    };
    Ok(SemanticIndex::new(
        db,
        Box::new(ColbertEmbedder::new(manager)),
    ))
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Notes { action } => {
            let store = open_store(&data_dir)?;
            match action {
                NotesAction::List { json } => notes_list(&store, json)?,
                NotesAction::Show { name, json } => {
                    notes_show(&store, &name, json)?;
                }
                NotesAction::Create { name } => {
                    store.create(&name, None)?;
                    println!("Created {}", FileStore::normalize_name(&name));
                }
                NotesAction::Delete { name } => {
                    store.delete(&name)?;
                    println!("Deleted {}", FileStore::normalize_name(&name));
                }
                NotesAction::Add {
                    name,
                    question,
                    answer,
                } => {
                    let records =
                        store.append_record(&name, &question, &answer)?;
                    println!(
                        "Appended to {}; now {} record(s)",
                        FileStore::normalize_name(&name),
                        records.len()
                    );
                }
                NotesAction::RemoveRecord { name, index } => {
                    let index = usize::try_from(index).map_err(|_| {
                        error::Error::InvalidArgument(format!(
                            "record index {index} is negative"
                        ))
                    })?;
                    let records = store.delete_record_at(&name, index)?;
                    println!(
                        "Removed record {index}; {} record(s) remain",
                        records.len()
                    );
                }
            }
        }
        Command::Search(args) => {
            let store = open_store(&data_dir)?;
            let matches = search::exact_search(&store, &args.query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No matches for \"{}\"", args.query);
            } else {
                for m in &matches {
                    println!(
                        "{}\t{}\t{}",
                        m.document,
                        search::display_cell(&m.question),
                        search::display_cell(&m.answer)
                    );
                }
            }
        }
        Command::Query(args) => {
            let index = open_index(&data_dir, cli.model.as_deref())?;
            let hits =
                index.query(&args.query, args.source.as_deref(), args.top_k)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No related entries found.");
            } else {
                for hit in &hits {
                    println!(
                        "{}\t{:.4}\t{}\t{}",
                        hit.id,
                        hit.distance,
                        search::display_cell(&hit.question),
                        search::display_cell(&hit.answer)
                    );
                }
            }
        }
        Command::Import(args) => {
            let store = open_store(&data_dir)?;
            let index = open_index(&data_dir, cli.model.as_deref())?;
            let (_, records) = store.read(&args.name)?;
            if records.is_empty() {
                println!("No QA records found in {}, nothing imported.", args.name);
                return Ok(());
            }
            let base = FileStore::normalize_name(&args.name);
            let source = base.strip_suffix(".md").unwrap_or(&base).to_string();
            let policy = if args.upsert {
                ImportPolicy::Upsert
            } else {
                ImportPolicy::Append
            };
            let outcome = index.import(&records, &source, policy)?;
            println!(
                "Imported {} record(s) from {source} ({} skipped)",
                outcome.added, outcome.skipped
            );
        }
        Command::Export(args) => {
            let index = open_index(&data_dir, cli.model.as_deref())?;
            let content = index.export(&args.source)?;
            let output = args
                .output
                .unwrap_or_else(|| format!("{}.md", args.source).into());
            std::fs::write(&output, &content)?;
            println!(
                "Exported {} record(s) to {}",
                codec::parse(&content).len(),
                output.display()
            );
        }
        Command::Entries { action } => {
            let index = open_index(&data_dir, cli.model.as_deref())?;
            match action {
                EntriesAction::List {
                    source,
                    page,
                    page_size,
                    json,
                } => {
                    let page =
                        index.list_page(source.as_deref(), page, page_size)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&page)?);
                    } else {
                        println!(
                            "{} entr(ies) total, page {} of size {}",
                            page.total, page.page, page.page_size
                        );
                        for item in &page.items {
                            println!(
                                "{}\t{}\t{}\t{}",
                                item.id,
                                search::display_cell(&item.question),
                                search::display_cell(&item.answer),
                                item.source
                            );
                        }
                    }
                }
                EntriesAction::Add {
                    question,
                    answer,
                    source,
                } => {
                    let id = index.add_one(&question, &answer, &source)?;
                    println!("Added entry {id} (source {source})");
                }
                EntriesAction::Delete { id } => match index.remove(&id)? {
                    None => println!("Entry not found: {id}"),
                    Some(meta) => {
                        println!("Deleted entry {id}.");
                        if meta.source != semantic::MANUAL_SOURCE {
                            println!(
                                "The source document '{}' was not modified; \
                                 remove the pair there manually if needed.",
                                meta.source
                            );
                        }
                    }
                },
                EntriesAction::Update {
                    id,
                    question,
                    answer,
                    yes,
                } => {
                    if !yes {
                        match index.preview_update(
                            &id,
                            question.as_deref(),
                            answer.as_deref(),
                        )? {
                            None => println!("Entry not found: {id}"),
                            Some(preview) => {
                                println!("old question: {}", preview.old_question);
                                println!("old answer:   {}", preview.old_answer);
                                println!("new question: {}", preview.new_question);
                                println!("new answer:   {}", preview.new_answer);
                                println!("Re-run with --yes to apply.");
                            }
                        }
                    } else if index.confirm_update(
                        &id,
                        question.as_deref(),
                        answer.as_deref(),
                    )? {
                        println!("Update applied.");
                    } else {
                        println!("Entry not found: {id}");
                    }
                }
            }
        }
        Command::Sources => {
            let index = open_index(&data_dir, cli.model.as_deref())?;
            let sources = index.sources()?;
            if sources.is_empty() {
                println!("No sources imported yet.");
            } else {
                for source in sources {
                    println!("{source}");
                }
            }
        }
        Command::Status(args) => {
            let store = open_store(&data_dir)?;
            let index = open_index(&data_dir, cli.model.as_deref())?;
            let documents = store.list()?;
            let entries = index.len()?;
            let sources = index.sources()?;
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "dataDir": data_dir.root().display().to_string(),
                        "documents": documents.len(),
                        "entries": entries,
                        "sources": sources,
                    })
                );
            } else {
                println!("Data directory: {}", data_dir.root().display());
                println!("Documents: {}", documents.len());
                println!("Index entries: {entries}");
                println!("Imported sources: {}", sources.len());
                for source in &sources {
                    println!("  {source}");
                }
            }
        }
        Command::Mcp => {
            mcp::run_mcp(data_dir, cli.model)?;
        }
        Command::Completions(args) => {
            args.generate();
        }
    }

    Ok(())
}

fn notes_list(store: &FileStore, json: bool) -> error::Result<()> {
    let names = store.list()?;
    if json {
        println!("{}", serde_json::to_string(&names)?);
    } else if names.is_empty() {
        println!("No documents in the store.");
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(())
}

fn notes_show(store: &FileStore, name: &str, json: bool) -> error::Result<()> {
    let (content, records) = store.read(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{content}");
    }
    Ok(())
}
