//! CLI binary for edgequake-pdfchat.
//!
//! A thin shim over the library crate: maps CLI flags to `ChatConfig`,
//! loads the PDF, and runs a question/answer loop on stdin.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfchat::pipeline::{extract, format, input, llm};
use edgequake_pdfchat::{
    export_default_pdf, load_documents, reply_stream, Answer, Backend, ChatConfig, ChatEngine,
    ChatProgressCallback, ChatSession, ChunkMode, ProgressCallback, ReplyFormat, Role,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const TITLE: &str = "Ethical Agent with PDF";
const FOOTER: &str = "This application utilizes Anthropic Claude's AI model, OpenAI's GPT model or the \
Reflection-Llama model to provide ethical reasoning and guidance based on content from PDF documents.";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Spinner callback using indicatif ─────────────────────────────────────────

/// Shows a spinner while the reference page is fetched and the model thinks.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn spin(&self, message: String) {
        let mut guard = match self.bar.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        bar.set_message(message);
    }

    fn stop(&self) {
        let mut guard = match self.bar.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(bar) = guard.take() {
            bar.finish_and_clear();
        }
    }
}

impl ChatProgressCallback for CliProgressCallback {
    fn on_fetch_start(&self, url: &str) {
        self.spin(format!("Fetching {}", dim(url)));
    }

    fn on_request_start(&self, backend: &str) {
        self.spin(format!("Waiting for {}…", bold(backend)));
    }

    fn on_reply(&self, _backend: &str, _reply_len: usize) {
        self.stop();
    }

    fn on_error(&self, _error: &str) {
        self.stop();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Chat about the default PDF (principals_ethic_ai.pdf in the current directory)
  pdfchat

  # Chat about another PDF with OpenAI
  pdfchat --pdf report.pdf --backend openai

  # One question, Markdown bullets, no web augmentation
  pdfchat -q "What are the key principles?" --format markdown --no-web

  # Save a copy of the default PDF
  pdfchat --export-default ./principals_ethic_ai.pdf

COMMANDS (inside the chat):
  /backend <name>   switch to anthropic, openai or reflection-llama
  /history          show the conversation with the current backend
  /clear            forget the current backend's conversation
  /help             show this list
  /quit             leave

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key
  OPENAI_API_KEY          OpenAI API key
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
"#;

/// Chat with a PDF document using hosted LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfchat",
    version,
    about = "Ask questions about a PDF document using Anthropic, OpenAI or Reflection-Llama",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF to chat about (path or HTTP/HTTPS URL). Defaults to the default PDF.
    #[arg(long, env = "PDFCHAT_PDF")]
    pdf: Option<String>,

    /// Default PDF used when --pdf is not given.
    #[arg(long, env = "PDFCHAT_DEFAULT_PDF", default_value = edgequake_pdfchat::config::DEFAULT_PDF_NAME)]
    default_pdf: PathBuf,

    /// Model backend: anthropic, openai, reflection-llama.
    #[arg(short, long, env = "PDFCHAT_BACKEND", default_value = "anthropic")]
    backend: String,

    /// Model ID overriding the backend default.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Reference page appended to every prompt.
    #[arg(long, env = "PDFCHAT_URL", default_value = edgequake_pdfchat::config::DEFAULT_REFERENCE_URL)]
    url: String,

    /// Do not fetch the reference page.
    #[arg(long, env = "PDFCHAT_NO_WEB")]
    no_web: bool,

    /// Reply format: bullets, markdown, plain. Defaults to the backend's usual format.
    #[arg(long, env = "PDFCHAT_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Split the PDF into pages or sentences.
    #[arg(long, env = "PDFCHAT_CHUNK", value_enum, default_value = "pages")]
    chunk: ChunkArg,

    /// Print replies word by word.
    #[arg(long, env = "PDFCHAT_STREAM")]
    stream: bool,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDFCHAT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDFCHAT_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max output tokens per answer.
    #[arg(long, env = "PDFCHAT_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per question on model failure.
    #[arg(long, env = "PDFCHAT_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "PDFCHAT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Reference page / PDF download timeout in seconds.
    #[arg(long, env = "PDFCHAT_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Copy the default PDF to this path and exit.
    #[arg(long)]
    export_default: Option<PathBuf>,

    /// Write the conversation as JSON to this path on exit.
    #[arg(long, env = "PDFCHAT_TRANSCRIPT")]
    transcript: Option<PathBuf>,

    /// Print PDF page counts only, no chat.
    #[arg(long)]
    inspect_only: bool,

    /// Ask one question and exit.
    #[arg(short, long)]
    question: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCHAT_VERBOSE")]
    verbose: bool,

    /// Suppress everything except answers and errors.
    #[arg(long, env = "PDFCHAT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Bullets,
    Markdown,
    Plain,
}

impl From<FormatArg> for ReplyFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Bullets => ReplyFormat::Bullets,
            FormatArg::Markdown => ReplyFormat::Markdown,
            FormatArg::Plain => ReplyFormat::Plain,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ChunkArg {
    Pages,
    Sentences,
}

impl From<ChunkArg> for ChunkMode {
    fn from(v: ChunkArg) -> Self {
        match v {
            ChunkArg::Pages => ChunkMode::Pages,
            ChunkArg::Sentences => ChunkMode::Sentences,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep the library quiet
    // unless asked.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let backend: Backend = cli.backend.parse()?;
    let progress: Option<ProgressCallback> = if cli.quiet {
        None
    } else {
        Some(CliProgressCallback::new() as Arc<dyn ChatProgressCallback>)
    };
    let config = build_config(&cli, backend, progress).await?;

    // ── Export-only mode ─────────────────────────────────────────────────
    if let Some(ref dest) = cli.export_default {
        let bytes = export_default_pdf(&config, dest)
            .await
            .context("Failed to export the default PDF")?;
        eprintln!("{} Saved {} ({} bytes)", green("✔"), dest.display(), bytes);
        return Ok(());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let source = input::resolve_pdf(&config, cli.pdf.as_deref(), cli.fetch_timeout)
            .await
            .context("Failed to load PDF")?;
        let summary = extract::inspect(&source).await.context("Failed to inspect PDF")?;
        println!("File:        {}", summary.source_name);
        println!("Pages:       {}", summary.page_count);
        println!("Text pages:  {}", summary.text_pages);
        println!("Size:        {} bytes", summary.byte_len);
        return Ok(());
    }

    if !cli.quiet {
        eprintln!("{}\n", bold(TITLE));
    }

    // ── Credentials ──────────────────────────────────────────────────────
    llm::check_credentials(config.backend)?;

    // ── Documents ────────────────────────────────────────────────────────
    if cli.pdf.is_none() && !config.default_pdf.exists() {
        eprintln!("{}", red("Default PDF not found. Please upload a PDF file."));
        eprintln!(
            "{}",
            yellow("Please upload a PDF file to start the conversation (use --pdf <FILE>).")
        );
        anyhow::bail!(
            "no PDF available: {} does not exist",
            input::default_pdf_display(&config).display()
        );
    }

    let loaded = load_documents(&config, cli.pdf.as_deref())
        .await
        .context("Failed to load the PDF")?;
    if !cli.quiet {
        let status = if loaded.is_default {
            "Default PDF loaded and processed successfully!"
        } else {
            "PDF uploaded and processed successfully!"
        };
        eprintln!(
            "{} {}  {}",
            green("✔"),
            status,
            dim(&format!("({} documents from {})", loaded.documents.len(), loaded.source_name))
        );
    }

    let mut engine = ChatEngine::new(config, loaded.documents)
        .context("Please upload a PDF file to start the conversation.")?
        .connect()?;
    let mut session = ChatSession::new(&[backend]);

    // ── Chat ─────────────────────────────────────────────────────────────
    if let Some(ref question) = cli.question {
        ask_and_print(&engine, &mut session, question, &cli).await;
    } else {
        repl(&mut engine, &mut session, &cli).await?;
    }

    if let Some(ref path) = cli.transcript {
        session
            .write_transcript(path)
            .await
            .context("Failed to save transcript")?;
        if !cli.quiet {
            eprintln!("{} Transcript saved to {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if !cli.quiet {
        eprintln!("\n{}\n{}", dim("---"), dim(FOOTER));
    }
    Ok(())
}

/// Read questions from stdin until EOF or `/quit`.
async fn repl(engine: &mut ChatEngine, session: &mut ChatSession, cli: &Cli) -> Result<()> {
    if !cli.quiet {
        eprintln!("\n{}  {}", bold("## Chat"), dim(&format!("model: {}  (/help for commands)", session.current())));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !cli.quiet {
            eprint!("{} ", cyan("What is your question? ›"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let mut parts = command.splitn(2, ' ');
            match (parts.next().unwrap_or(""), parts.next().map(str::trim)) {
                ("quit" | "exit", _) => break,
                ("help", _) => eprintln!("{AFTER_HELP}"),
                ("history", _) => print_history(session),
                ("clear", _) => {
                    session.clear_current();
                    eprintln!("{} Cleared {} history", green("✔"), session.current());
                }
                ("backend", Some(name)) => match name.parse::<Backend>() {
                    Ok(choice) => match engine.ensure_backend(choice) {
                        Ok(()) => {
                            session.select(choice);
                            eprintln!("{} Now chatting with {}", green("✔"), bold(choice.label()));
                            print_history(session);
                        }
                        Err(e) => eprintln!("{} {}", red("✗"), e),
                    },
                    Err(e) => eprintln!("{} {}", red("✗"), e),
                },
                ("backend", None) => eprintln!("Current backend: {}", bold(session.current().label())),
                (other, _) => eprintln!("{} Unknown command '/{}' (try /help)", red("✗"), other),
            }
            continue;
        }

        ask_and_print(engine, session, line, cli).await;
    }
    Ok(())
}

/// Ask one question; errors are reported and the loop goes on.
async fn ask_and_print(engine: &ChatEngine, session: &mut ChatSession, question: &str, cli: &Cli) {
    match engine.ask(session, question).await {
        Ok(answer) => {
            if let Err(e) = print_answer(&answer, cli).await {
                eprintln!("{} {}", red("✗"), e);
            }
        }
        Err(e) => eprintln!("{}", red(&e.user_message())),
    }
}

async fn print_answer(answer: &Answer, cli: &Cli) -> io::Result<()> {
    let text = display_text(&answer.content, answer.format);
    let mut stdout = io::stdout();

    if cli.stream {
        let mut pieces = reply_stream(&text, Duration::from_millis(30));
        while let Some(piece) = pieces.next().await {
            stdout.write_all(piece.as_bytes())?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{text}")?;
    }

    if !cli.quiet {
        eprintln!(
            "{}",
            dim(&format!(
                "{} tokens in / {} tokens out  —  {}ms{}",
                answer.input_tokens,
                answer.output_tokens,
                answer.duration_ms,
                if answer.web_documents > 0 { "  (+web)" } else { "" }
            ))
        );
    }
    Ok(())
}

fn display_text(content: &str, format: ReplyFormat) -> String {
    match format {
        ReplyFormat::Bullets => format::strip_html(content),
        ReplyFormat::Markdown | ReplyFormat::Plain => content.to_string(),
    }
}

fn print_history(session: &ChatSession) {
    let history = session.history();
    if history.is_empty() {
        eprintln!("{}", dim("(no messages yet)"));
        return;
    }
    for message in history {
        let who = match message.role {
            Role::User => cyan("user"),
            Role::Assistant => green("assistant"),
            Role::System => dim("system"),
        };
        eprintln!("{}: {}", who, format::strip_html(&message.content));
    }
}

/// Map CLI args to `ChatConfig`.
async fn build_config(cli: &Cli, backend: Backend, progress: Option<ProgressCallback>) -> Result<ChatConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ChatConfig::builder()
        .backend(backend)
        .default_pdf(cli.default_pdf.clone())
        .reference_url(cli.url.clone())
        .augment_with_web(!cli.no_web)
        .chunk_mode(cli.chunk.clone().into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .fetch_timeout_secs(cli.fetch_timeout);

    if let Some(ref format) = cli.format {
        builder = builder.reply_format(format.clone().into());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
