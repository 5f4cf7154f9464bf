use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mindspire_core::assist::build_prompt;
use mindspire_core::query::creation_parent;
use mindspire_core::{
    AiAction, Engine, ItemType, Language, MindspireError, MoveOutcome, MovePosition,
};
use mindspire_store::{markdown, resolve_root, Library, LibraryStore};

// ── CLI Definition ──

#[derive(Parser)]
#[command(name = "mindspire", about = "Hierarchical markdown knowledge bases")]
struct Cli {
    /// Library directory (default: ./mindspire)
    #[arg(long, global = true, env = "MINDSPIRE_LIBRARY")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a library directory with the default knowledge bases
    Init,
    /// Knowledge base management
    Kb {
        #[command(subcommand)]
        command: KbCommands,
    },
    /// Print the folder tree of one knowledge base, or of all of them
    Tree {
        kb_id: Option<String>,
    },
    /// Print an item's path and content
    Show {
        id: String,
    },
    /// Create a folder or file at the end of its sibling list
    Add {
        kb_id: String,
        name: String,
        /// Create a folder instead of a file
        #[arg(long)]
        folder: bool,
        /// Parent folder id
        #[arg(long, conflicts_with = "near")]
        parent: Option<String>,
        /// Create inside this folder, or next to this file
        #[arg(long)]
        near: Option<String>,
    },
    /// Rename an item
    Rename {
        id: String,
        name: String,
    },
    /// Delete an item and everything inside it
    Rm {
        id: String,
    },
    /// Move an item: into <folder>, before/after <sibling>, or root
    Mv {
        id: String,
        position: MovePosition,
        target: Option<String>,
    },
    /// Replace a file's content (from --content, --file, or stdin)
    Edit {
        id: String,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the AI prompt for a writing action on a file
    Prompt {
        id: String,
        action: AiAction,
        /// Extra instructions for the generator
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        language: Option<Language>,
    },
    /// Fold generated text (from --text or stdin) into a file
    ApplyAi {
        id: String,
        action: AiAction,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        language: Option<Language>,
    },
    /// Export a knowledge base as a directory of markdown files
    Export {
        kb_id: String,
        dir: PathBuf,
    },
    /// Import a directory of markdown files as a new knowledge base
    Import {
        dir: PathBuf,
        /// Knowledge base name (default: the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show settings, or change one with `settings set <key> <value>`
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Serve the library over MCP on stdio
    Mcp,
}

#[derive(Subcommand)]
enum KbCommands {
    /// List knowledge bases
    List,
    /// Create an empty knowledge base
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    Set { key: String, value: String },
}

// ── Helpers ──

fn open(root: &Path) -> Result<(LibraryStore, Library<LibraryStore>)> {
    let store = LibraryStore::new(root);
    if !store.is_initialized() {
        bail!("no library at {} (run `mindspire init`)", root.display());
    }
    let settings = store.read_settings()?;
    let library = Library::open(store.clone(), &settings)?;
    Ok((store, library))
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("reading stdin")?;
    Ok(buf)
}

fn render_tree(engine: &Engine, kb_id: &str) -> Result<String> {
    let kb = engine
        .knowledge_bases()
        .iter()
        .find(|kb| kb.id == kb_id)
        .with_context(|| format!("unknown knowledge base: {kb_id}"))?;

    let mut lines = vec![format!("{} [{}]", kb.name, kb.id)];
    for entry in engine.tree(kb_id) {
        let indent = "  ".repeat(entry.depth + 1);
        let slash = if entry.item.is_folder() { "/" } else { "" };
        lines.push(format!("{indent}{}{slash} [{}]", entry.item.name, entry.item.id));
    }
    Ok(lines.join("\n"))
}

// ── Commands ──

fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let root = resolve_root(cli.library.as_deref());

    match cli.command {
        Commands::Init => {
            let store = LibraryStore::new(&root);
            store.init()?;
            let settings = store.read_settings()?;
            let library = Library::open(store, &settings)?;
            writeln!(
                out,
                "initialized library at {} ({} knowledge bases)",
                root.display(),
                library.engine().knowledge_bases().len()
            )?;
        }
        Commands::Kb { command: KbCommands::List } => {
            let (_, library) = open(&root)?;
            for kb in library.engine().knowledge_bases() {
                writeln!(out, "{}\t{}\t{}", kb.id, kb.name, kb.description)?;
            }
        }
        Commands::Kb {
            command: KbCommands::Create { name, description },
        } => {
            let (_, mut library) = open(&root)?;
            let kb = library.create_knowledge_base(&name, description.as_deref())?;
            writeln!(out, "{}", kb.id)?;
        }
        Commands::Tree { kb_id } => {
            let (_, library) = open(&root)?;
            let engine = library.engine();
            let ids: Vec<String> = match kb_id {
                Some(id) => vec![id],
                None => engine.knowledge_bases().iter().map(|kb| kb.id.clone()).collect(),
            };
            let rendered = ids
                .iter()
                .map(|id| render_tree(engine, id))
                .collect::<Result<Vec<_>>>()?;
            writeln!(out, "{}", rendered.join("\n\n"))?;
        }
        Commands::Show { id } => {
            let (_, library) = open(&root)?;
            let engine = library.engine();
            let item = engine.get(&id).ok_or_else(|| MindspireError::ItemNotFound(id.clone()))?;
            let path: Vec<String> = engine.breadcrumbs(&id).into_iter().map(|b| b.name).collect();
            writeln!(out, "{}", path.join(" / "))?;
            match &item.content {
                Some(content) => writeln!(out, "\n{content}")?,
                None => {
                    for child in engine.children_of(&item.kb_id, Some(&item.id)) {
                        writeln!(out, "  {} [{}] ({})", child.name, child.id, child.item_type)?;
                    }
                }
            }
        }
        Commands::Add {
            kb_id,
            name,
            folder,
            parent,
            near,
        } => {
            let (_, mut library) = open(&root)?;
            let parent_id = match near {
                Some(selected) => creation_parent(library.engine().store(), Some(&selected)),
                None => parent,
            };
            let item_type = if folder { ItemType::Folder } else { ItemType::File };
            let item = library.create_item(&kb_id, parent_id.as_deref(), item_type, &name)?;
            writeln!(out, "{}", item.id)?;
        }
        Commands::Rename { id, name } => {
            let (_, mut library) = open(&root)?;
            if !library.rename_item(&id, &name)? {
                return Err(MindspireError::ItemNotFound(id).into());
            }
        }
        Commands::Rm { id } => {
            let (_, mut library) = open(&root)?;
            let removed = library.delete_item(&id)?;
            if removed.is_empty() {
                return Err(MindspireError::ItemNotFound(id).into());
            }
            writeln!(out, "removed {} item(s)", removed.len())?;
        }
        Commands::Mv { id, position, target } => {
            let (_, mut library) = open(&root)?;
            match library.move_item(&id, target.as_deref(), position)? {
                MoveOutcome::Moved(moved) => writeln!(
                    out,
                    "moved {} to {} at {}",
                    moved.id,
                    moved.parent_id.as_deref().unwrap_or("root"),
                    moved.order
                )?,
                MoveOutcome::Rejected(reason) => bail!("move rejected: {reason}"),
            }
        }
        Commands::Edit { id, content, file } => {
            let content = match (content, file) {
                (Some(c), _) => c,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => read_stdin()?,
            };
            let (_, mut library) = open(&root)?;
            if !library.edit_content(&id, content)? {
                bail!("not a file: {id}");
            }
            library.flush()?;
        }
        Commands::Prompt {
            id,
            action,
            context,
            language,
        } => {
            let (store, library) = open(&root)?;
            let language = language.unwrap_or(store.read_settings()?.language);
            let item = library
                .engine()
                .get(&id)
                .filter(|i| i.is_file())
                .with_context(|| format!("not a file: {id}"))?;
            let prompt = build_prompt(
                item.content.as_deref().unwrap_or_default(),
                action,
                language,
                context.as_deref(),
            );
            writeln!(out, "{}\n\n{}", prompt.system_instruction, prompt.prompt)?;
        }
        Commands::ApplyAi {
            id,
            action,
            text,
            language,
        } => {
            let generated = match text {
                Some(t) => t,
                None => read_stdin()?,
            };
            let (store, mut library) = open(&root)?;
            let language = language.unwrap_or(store.read_settings()?.language);
            if !library.apply_generated(&id, action, generated.trim_end(), language)? {
                bail!("not a file: {id}");
            }
            library.flush()?;
        }
        Commands::Export { kb_id, dir } => {
            let (_, library) = open(&root)?;
            let written = markdown::export_markdown(library.engine(), &kb_id, &dir)?;
            writeln!(out, "exported {written} item(s) to {}", dir.display())?;
        }
        Commands::Import { dir, name } => {
            let name = match name {
                Some(n) => n,
                None => dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("cannot derive a name from the directory; pass --name")?,
            };
            let (_, mut library) = open(&root)?;
            let summary = library.import_markdown(&dir, &name)?;
            writeln!(
                out,
                "{}: {} folder(s), {} file(s), {} skipped",
                summary.kb_id, summary.folders, summary.files, summary.skipped
            )?;
        }
        Commands::Settings { command } => {
            let store = LibraryStore::new(&root);
            let mut settings = store.read_settings()?;
            if let Some(SettingsCommands::Set { key, value }) = command {
                settings.set(&key, &value)?;
                store.write_settings(&settings)?;
            }
            write!(out, "{}", settings.to_yaml()?)?;
        }
        Commands::Mcp => {
            let (store, library) = open(&root)?;
            drop(library);
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            runtime.block_on(mindspire_mcp::run_mcp_server(store))?;
        }
    }

    Ok(())
}

// ── Main ──

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut stdout = io::stdout().lock();
    if let Err(e) = execute(cli, &mut stdout) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

// ── Tests ──
