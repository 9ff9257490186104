use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use plotcontinuum::config::{AppConfig, ConfigError};
use plotcontinuum::editor::{self, AiMode, Editor, EditorError, EditorEvent, OpenTarget};
use plotcontinuum::llm::{self, LlmError};
use plotcontinuum::services::documents::DocumentError;
use plotcontinuum::services::files::{self, FileError};
use plotcontinuum::services::library::Library;
use plotcontinuum::services::settings::AiSettingsPatch;
use plotcontinuum::storage::{FileStore, StorageError};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("API key rejected by {0}")]
    KeyRejected(String),
}

#[derive(Parser, Debug)]
#[command(name = "plotcontinuum", about = "Markdown writing with streamed AI continuation")]
struct Cli {
    /// Directory of the key-value store.
    #[arg(long, env = "PLOTCONTINUUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for exported Markdown files.
    #[arg(long, env = "PLOTCONTINUUM_DOCUMENTS_DIR")]
    documents_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Committed documents.
    Docs(DocsCommand),
    /// The in-progress draft.
    Draft(DraftCommand),
    /// AI settings and API key.
    Settings(SettingsCommand),
    /// User-managed model list.
    Models(ModelsCommand),
    /// Markdown files in the documents directory.
    Files(FilesCommand),
    /// Stream an AI continuation into a document and save it.
    Continue(ContinueArgs),
    /// Rewrite a document (or a span of it) following an instruction.
    Edit(EditArgs),
    /// Check that the configured API key is accepted.
    ValidateKey,
}

#[derive(Args, Debug)]
struct DocsCommand {
    #[command(subcommand)]
    command: DocsSubcommand,
}

#[derive(Subcommand, Debug)]
enum DocsSubcommand {
    List,
    Show {
        id: String,
    },
    /// Create (or, with --upsert, update by title) a document. Content is read
    /// from --content, --file, or stdin.
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        upsert: bool,
    },
    Delete {
        id: String,
    },
    /// Write a document to `<title>.md`.
    Export {
        id: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct DraftCommand {
    #[command(subcommand)]
    command: DraftSubcommand,
}

#[derive(Subcommand, Debug)]
enum DraftSubcommand {
    Show,
    Clear,
}

#[derive(Args, Debug)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SettingsSubcommand {
    Show,
    Set {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        base_url: Option<String>,
    },
    ApiKey {
        key: String,
    },
}

#[derive(Args, Debug)]
struct ModelsCommand {
    #[command(subcommand)]
    command: ModelsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ModelsSubcommand {
    List,
    Add { name: String, value: String },
    Remove { id: String },
    Reset,
}

#[derive(Args, Debug)]
struct FilesCommand {
    #[command(subcommand)]
    command: FilesSubcommand,
}

#[derive(Subcommand, Debug)]
enum FilesSubcommand {
    List,
    Read { title: String },
}

#[derive(Args, Debug)]
struct ContinueArgs {
    /// Document id; a new document when omitted.
    id: Option<String>,
    /// Byte offset where the selection starts (insert mode).
    #[arg(long, requires = "end")]
    start: Option<usize>,
    /// Byte offset where the selection ends (insert mode).
    #[arg(long, requires = "start")]
    end: Option<usize>,
    /// Wait for the whole reply instead of streaming it.
    #[arg(long)]
    no_stream: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    instruction: String,
    #[arg(long, requires = "end")]
    start: Option<usize>,
    #[arg(long, requires = "start")]
    end: Option<usize>,
    /// Wait for the whole reply instead of streaming it.
    #[arg(long)]
    no_stream: bool,
}

struct CliContext {
    config: AppConfig,
    library: Library,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.documents_dir {
        config.documents_dir = dir;
    }
    let library = Library::with_store(Arc::new(FileStore::new(&config.data_dir)));
    let ctx = CliContext { config, library };

    match cli.command {
        Command::Docs(docs) => run_docs(&ctx, docs),
        Command::Draft(draft) => run_draft(&ctx, draft),
        Command::Settings(settings) => run_settings(&ctx, settings),
        Command::Models(models) => run_models(&ctx, models),
        Command::Files(files) => run_files(&ctx, files),
        Command::Continue(args) => run_continue(&ctx, args).await,
        Command::Edit(args) => run_edit(&ctx, args).await,
        Command::ValidateKey => run_validate_key(&ctx).await,
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_docs(ctx: &CliContext, docs: DocsCommand) -> Result<(), CliError> {
    let library = &ctx.library;
    match docs.command {
        DocsSubcommand::List => {
            for doc in library.documents.list()? {
                println!("{}\t{}\t{}", doc.id, doc.updated_at, doc.title);
            }
            Ok(())
        }
        DocsSubcommand::Show { id } => print_json(&library.documents.get(&id)?),
        DocsSubcommand::New { title, content, file, upsert } => {
            let content = match (content, file) {
                (Some(content), None) => content,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
                (Some(_), Some(_)) => {
                    return Err(CliError::InvalidArgs("pass either --content or --file".into()));
                }
            };
            let doc = if upsert {
                library.save_by_title(&title, &content)?
            } else {
                library.save_document(None, &title, &content)?
            };
            println!("{}", doc.id);
            Ok(())
        }
        DocsSubcommand::Delete { id } => {
            if library.delete_document(&id)? {
                println!("deleted");
                Ok(())
            } else {
                Err(DocumentError::NotFound(id).into())
            }
        }
        DocsSubcommand::Export { id, dir } => {
            let doc = library.documents.get(&id)?;
            let dir = dir.unwrap_or_else(|| ctx.config.documents_dir.clone());
            let path = files::export_markdown(&dir, &doc.title, &doc.content)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_draft(ctx: &CliContext, draft: DraftCommand) -> Result<(), CliError> {
    match draft.command {
        DraftSubcommand::Show => match ctx.library.drafts.get()? {
            Some(draft) => print_json(&draft),
            None => {
                println!("no draft");
                Ok(())
            }
        },
        DraftSubcommand::Clear => {
            let cleared = ctx.library.drafts.clear()?;
            println!("{}", if cleared { "cleared" } else { "no draft" });
            Ok(())
        }
    }
}

fn run_settings(ctx: &CliContext, settings: SettingsCommand) -> Result<(), CliError> {
    let store = &ctx.library.settings;
    match settings.command {
        SettingsSubcommand::Show => {
            print_json(&store.load()?)?;
            let key_state = if store.api_key()?.is_some() { "stored" } else { "not set" };
            println!("api key: {key_state}");
            Ok(())
        }
        SettingsSubcommand::Set { model, temperature, max_tokens, base_url } => {
            if let Some(t) = temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(CliError::InvalidArgs(format!("temperature must be within 0..=2, got {t}")));
                }
            }
            let patch = AiSettingsPatch { model, temperature, max_tokens, base_url };
            print_json(&store.update(patch)?)
        }
        SettingsSubcommand::ApiKey { key } => {
            store.set_api_key(&key)?;
            println!("api key stored");
            Ok(())
        }
    }
}

fn run_models(ctx: &CliContext, models: ModelsCommand) -> Result<(), CliError> {
    let store = &ctx.library.settings;
    let list = match models.command {
        ModelsSubcommand::List => store.models()?,
        ModelsSubcommand::Add { name, value } => store.add_model(&name, &value)?,
        ModelsSubcommand::Remove { id } => store.remove_model(&id)?,
        ModelsSubcommand::Reset => store.reset_models()?,
    };
    let selected = store.load()?.model;
    for model in list {
        let marker = if model.value == selected { "*" } else { " " };
        println!("{marker} {}\t{}\t{}", model.id, model.name, model.value);
    }
    Ok(())
}

fn run_files(ctx: &CliContext, files_cmd: FilesCommand) -> Result<(), CliError> {
    let dir = &ctx.config.documents_dir;
    match files_cmd.command {
        FilesSubcommand::List => {
            for file in files::list_markdown(dir)? {
                println!("{}\t{}", file.title, file.path.display());
            }
            Ok(())
        }
        FilesSubcommand::Read { title } => {
            print!("{}", files::read_markdown(dir, &title)?);
            Ok(())
        }
    }
}

fn selection(start: Option<usize>, end: Option<usize>) -> Option<std::ops::Range<usize>> {
    start.zip(end).map(|(start, end)| start..end)
}

async fn run_continue(ctx: &CliContext, args: ContinueArgs) -> Result<(), CliError> {
    let mode = match selection(args.start, args.end) {
        Some(selection) => AiMode::Insert { selection },
        None => AiMode::Append,
    };
    run_generation(ctx, args.id.as_deref(), mode, !args.no_stream).await
}

async fn run_edit(ctx: &CliContext, args: EditArgs) -> Result<(), CliError> {
    let mode = AiMode::Edit { selection: selection(args.start, args.end), instruction: args.instruction };
    run_generation(ctx, Some(&args.id), mode, !args.no_stream).await
}

/// Open the document, run the generation (streamed to stdout unless
/// `stream` is false), then save. A stale id is refused before anything runs.
async fn run_generation(ctx: &CliContext, id: Option<&str>, mode: AiMode, stream: bool) -> Result<(), CliError> {
    let settings = ctx.library.settings.load()?;
    let client = llm::client_for(&settings, ctx.library.settings.api_key()?)?;

    let editor = Editor::new(ctx.library.clone());
    let mut events = editor.subscribe();
    match id {
        Some(id) => editor.open_existing(id).await?,
        None => editor.load(OpenTarget::New).await?,
    };
    let timers = editor::spawn_timers(&editor, ctx.config.autosave_interval, ctx.config.draft_interval);

    let printer = tokio::spawn(async move {
        let mut stdout = io::stdout();
        loop {
            match events.recv().await {
                Ok(EditorEvent::AiChunk { text, .. }) => {
                    let _ = write!(stdout, "{text}");
                    let _ = stdout.flush();
                }
                Ok(EditorEvent::Notice(notice)) => eprintln!("{}", notice.message),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let generated = if stream {
        editor.generate(&client, mode, cancel).await
    } else {
        editor.complete(&client, mode).await
    };
    timers.shutdown();
    let saved = editor.save().await;
    let flushed = editor.flush().await;
    drop(editor);
    let _ = printer.await;
    println!();

    let doc = saved?;
    flushed?;
    generated?;
    eprintln!("saved {}", doc.id);
    Ok(())
}

async fn run_validate_key(ctx: &CliContext) -> Result<(), CliError> {
    let settings = ctx.library.settings.load()?;
    let client = llm::client_for(&settings, ctx.library.settings.api_key()?)?;
    if client.validate_key(&settings.model).await {
        println!("api key valid");
        Ok(())
    } else {
        Err(CliError::KeyRejected(client.base_url().to_string()))
    }
}
