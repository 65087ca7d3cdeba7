//! pagestore CLI - Command line interface for a pagestore content root
//!
//! Every command prints one JSON object on stdout. Logs go to stderr and
//! are controlled with RUST_LOG.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pagestore::{
    BackendKind, Config, ContentStore, Document, Kind, Page, Part, DEFAULT_CONTENT_TYPE,
};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pagestore")]
#[command(about = "A path-addressed store for pages and reusable content parts")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.config/pagestore/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content root directory (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Use an in-memory store; nothing is persisted
    #[arg(long)]
    memory: bool,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the content root and write the config file
    Init,

    /// Show store status
    Status,

    /// Manage pages
    #[command(subcommand)]
    Page(DocCommand),

    /// Manage parts
    #[command(subcommand)]
    Part(DocCommand),
}

#[derive(Subcommand)]
enum DocCommand {
    /// Create or replace a document
    Write {
        /// Document path
        path: String,
        /// Contents (read from --file or stdin when omitted)
        contents: Option<String>,
        /// Content type
        #[arg(short = 't', long = "type", default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,
        /// Read contents from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Read a document
    Read {
        /// Document path
        path: String,
    },

    /// Delete a document
    Delete {
        /// Document path
        path: String,
    },

    /// Rename a document
    Move {
        /// Current path
        from: String,
        /// New path (must not exist)
        to: String,
    },

    /// List documents below a directory
    List {
        /// Directory (defaults to everything)
        dir: Option<String>,
        /// Only print paths, without reading documents
        #[arg(long)]
        paths_only: bool,
        /// Maximum number of entries to return
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(err) = run(cli) {
        let kind = err.downcast_ref::<pagestore::Error>().map(|e| e.kind());
        output(
            &format,
            &serde_json::json!({
                "status": "error",
                "kind": kind.map_or("internal", |k| k.as_str()),
                "message": format!("{:#}", err)
            }),
        );
        std::process::exit(kind.map_or(1, |k| k.exit_code()));
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Init => {
            let store = config.open_store()?;
            // Only an explicit -c file is written; overrides never leak
            // into the user's default config
            let saved = match &cli.config {
                Some(path) => {
                    config.save(path)?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "backend": store.backend_name(),
                    "root": config.root.display().to_string(),
                    "config": saved
                }),
            );
        }

        Commands::Status => {
            let store = config.open_store()?;
            let stats = store.stats()?;
            output(
                &cli.format,
                &serde_json::json!({
                    "backend": store.backend_name(),
                    "root": config.root.display().to_string(),
                    "pages": stats.pages,
                    "parts": stats.parts
                }),
            );
        }

        Commands::Page(cmd) => {
            let store = config.open_store()?;
            run_doc::<Page>(&store, Kind::Page, cmd, &cli.format)?;
        }

        Commands::Part(cmd) => {
            let store = config.open_store()?;
            run_doc::<Part>(&store, Kind::Part, cmd, &cli.format)?;
        }
    }

    Ok(())
}

fn run_doc<D: Document + Default>(
    store: &ContentStore,
    kind: Kind,
    cmd: DocCommand,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        DocCommand::Write {
            path,
            contents,
            content_type,
            file,
        } => {
            let contents = match (contents, file) {
                (Some(contents), _) => contents,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, None) => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading contents from stdin")?;
                    buf
                }
            };
            let mut doc = D::default();
            doc.set_path(path);
            doc.set_content_type(content_type);
            doc.set_contents(contents);
            store.write_doc(kind, &doc)?;
            output(
                format,
                &serde_json::json!({
                    "status": "ok",
                    "kind": kind.to_string(),
                    "path": doc.path()
                }),
            );
        }

        DocCommand::Read { path } => {
            let mut doc = D::default();
            store.read_into(kind, &path, &mut doc)?;
            output(format, &doc_json(kind, &doc));
        }

        DocCommand::Delete { path } => {
            store.delete(kind, &path)?;
            output(
                format,
                &serde_json::json!({
                    "status": "ok",
                    "kind": kind.to_string(),
                    "path": path
                }),
            );
        }

        DocCommand::Move { from, to } => {
            store.move_doc(kind, &from, &to)?;
            output(
                format,
                &serde_json::json!({
                    "status": "ok",
                    "kind": kind.to_string(),
                    "from": from,
                    "to": to
                }),
            );
        }

        DocCommand::List {
            dir,
            paths_only,
            limit,
        } => {
            let dir = dir.unwrap_or_default();
            let limit = limit.unwrap_or(usize::MAX);
            let mut cursor = store.iterate::<D>(kind, &dir)?;
            let mut items = Vec::new();

            while items.len() < limit {
                let item = if paths_only {
                    cursor
                        .next_path()
                        .map(|p| serde_json::json!({ "path": p.to_string() }))
                } else {
                    cursor.next_doc().map(|doc| doc_json(kind, &doc))
                };
                match item {
                    Ok(item) => items.push(item),
                    Err(e) if e.is_end_of_sequence() => break,
                    Err(e) => return Err(e.into()),
                }
            }

            output(
                format,
                &serde_json::json!({
                    "kind": kind.to_string(),
                    "dir": dir,
                    "count": items.len(),
                    "entries": items
                }),
            );
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Config::default_path().ok(),
    };
    let mut config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(root) = &cli.root {
        config.root = root.clone();
        config.backend = BackendKind::Fs;
    }
    if cli.memory {
        config.backend = BackendKind::Memory;
    }
    Ok(config)
}

fn doc_json(kind: Kind, doc: &impl Document) -> serde_json::Value {
    serde_json::json!({
        "kind": kind.to_string(),
        "path": doc.path(),
        "content_type": doc.content_type(),
        "contents": doc.contents()
    })
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => println!("{}", value),
        OutputFormat::Text => println!("{:#}", value),
    }
}
