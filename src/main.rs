use std::path::PathBuf;
use std::process::ExitCode;

use blockboard::block::BlockKind;
use blockboard::codec::{self, CodecError};
use blockboard::config::{Config, ConfigError};
use blockboard::editor::{EditorError, GridEditor};
use blockboard::flow::{FlowEditor, FlowError, NodeTemplate, Position};
use blockboard::grid::GridPos;
use blockboard::layout::Breakpoint;
use blockboard::store::{DashboardKind, DashboardStore, FileBackend, StoreError, StoredDashboard};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("dashboard not found: {0}")]
    NotFound(String),
    #[error("dashboard {id} is a {actual} dashboard, expected {expected}")]
    WrongKind { id: String, actual: DashboardKind, expected: DashboardKind },
    #[error("could not load {}; check the file format", .0.display())]
    Import(PathBuf),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blockboard", about = "Dashboard layout and persistence engine")]
struct Cli {
    /// Directory of the file-backed store.
    #[arg(long, env = "BLOCKBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Store key holding the dashboard collection.
    #[arg(long, env = "BLOCKBOARD_STORE_KEY")]
    store_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long)]
        kind: Option<DashboardKind>,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
    NewGrid {
        #[arg(long, default_value = blockboard::consts::DEFAULT_GRID_TITLE)]
        title: String,
    },
    NewFlow {
        #[arg(long, default_value = blockboard::consts::DEFAULT_FLOW_TITLE)]
        title: String,
    },
    AddBlock {
        id: String,
        kind: BlockKind,
        #[arg(long, default_value = "lg")]
        breakpoint: Breakpoint,
    },
    DropBlock {
        id: String,
        kind: BlockKind,
        x: u32,
        y: u32,
        #[arg(long, default_value = "lg")]
        breakpoint: Breakpoint,
    },
    AddNode {
        id: String,
        template: NodeTemplate,
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
    },
    Connect {
        id: String,
        source: String,
        target: String,
    },
    Export {
        id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    Import {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenv {
        debug!(error = %e, "no .env loaded");
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(key) = cli.store_key {
        config.store_key = key;
    }
    let mut store = DashboardStore::new(FileBackend::new(&config.data_dir), config.store_key.clone());

    match cli.command {
        Command::List { kind } => {
            let dashboards = match kind {
                Some(kind) => store.list_kind(kind),
                None => store.list(),
            };
            for d in dashboards {
                println!("{}\t{}\t{}\t{}", d.id(), d.kind(), d.last_modified(), d.title());
            }
        }
        Command::Show { id } => {
            let dashboard = store.get(&id).ok_or(CliError::NotFound(id))?;
            print_json(&dashboard)?;
        }
        Command::Delete { id } => {
            if !store.delete(&id)? {
                println!("no dashboard with id {id}");
            }
        }
        Command::NewGrid { title } => {
            let saved = store.save(GridEditor::new(&title).snapshot())?;
            println!("{}", saved.id());
        }
        Command::NewFlow { title } => {
            let saved = store.save(FlowEditor::new(&title).snapshot())?;
            println!("{}", saved.id());
        }
        Command::AddBlock { id, kind, breakpoint } => {
            let mut editor = load_grid(&store, &id, config.max_rows)?;
            editor.set_breakpoint(breakpoint);
            let block = editor.add_block(kind)?;
            store.save(editor.snapshot())?;
            print_json(&block)?;
        }
        Command::DropBlock { id, kind, x, y, breakpoint } => {
            let mut editor = load_grid(&store, &id, config.max_rows)?;
            editor.set_breakpoint(breakpoint);
            let block = editor.drop_block(kind, GridPos { x, y })?;
            store.save(editor.snapshot())?;
            print_json(&block)?;
        }
        Command::AddNode { id, template, x, y } => {
            let mut editor = load_flow(&store, &id)?;
            let position = match (x, y) {
                (None, None) => None,
                (x, y) => Some(Position { x: x.unwrap_or(0.0), y: y.unwrap_or(0.0) }),
            };
            let node = editor.add_node(template, position)?;
            store.save(editor.snapshot())?;
            print_json(&node)?;
        }
        Command::Connect { id, source, target } => {
            let mut editor = load_flow(&store, &id)?;
            let edge = editor.connect(&source, &target, None, None)?;
            store.save(editor.snapshot())?;
            print_json(&edge)?;
        }
        Command::Export { id, out } => {
            let dashboard = store.get(&id).ok_or(CliError::NotFound(id))?;
            let file = codec::export_stored(&dashboard)?;
            let path = codec::write_export(&out, &file).await?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let import = codec::read_import(&file).await.ok_or(CliError::Import(file))?;
            let saved = store.save(import.into_stored())?;
            println!("{}", saved.id());
        }
    }
    Ok(())
}

fn load_grid(store: &DashboardStore<FileBackend>, id: &str, max_rows: u32) -> Result<GridEditor, CliError> {
    match store.get(id) {
        Some(StoredDashboard::Grid(grid)) => Ok(GridEditor::from_stored(grid).with_max_rows(max_rows)),
        Some(other) => Err(wrong_kind(&other, DashboardKind::Grid)),
        None => Err(CliError::NotFound(id.to_owned())),
    }
}

fn load_flow(store: &DashboardStore<FileBackend>, id: &str) -> Result<FlowEditor, CliError> {
    match store.get(id) {
        Some(StoredDashboard::Flow(flow)) => Ok(FlowEditor::from_stored(flow)),
        Some(other) => Err(wrong_kind(&other, DashboardKind::Flow)),
        None => Err(CliError::NotFound(id.to_owned())),
    }
}

fn wrong_kind(dashboard: &StoredDashboard, expected: DashboardKind) -> CliError {
    CliError::WrongKind { id: dashboard.id().to_owned(), actual: dashboard.kind(), expected }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
