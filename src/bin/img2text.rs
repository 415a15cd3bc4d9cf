//! CLI binary for edgequake-img2text.
//!
//! A thin shim over the library crate: `extract` runs a batch and writes the
//! Word document, `serve` starts the HTTP API.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_img2text::server::{self, AppState, ServerConfig};
use edgequake_img2text::{
    extract_to_file, load_uploads, order_batch, plan, resolve_extractor, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// image, printed above the bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_item_start(&self, _position: usize, _total: usize, filename: &str) {
        self.bar.set_message(format!("Processing {filename}…"));
    }

    fn on_item_complete(&self, position: usize, total: usize, filename: &str, text_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<32} {}",
            green("✓"),
            position,
            total,
            filename,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, position: usize, total: usize, filename: &str, error: &str) {
        // Keep long provider messages on one line.
        let msg = match error.char_indices().nth(80) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<32} {}",
            red("✗"),
            position,
            total,
            filename,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} Extraction complete! {} images", green("✔"), bold(&total.to_string()));
        } else {
            eprintln!(
                "{} {}/{} images extracted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a folder of numbered scans into a Word document
  img2text extract scans/ -o exam.docx

  # Show the processing order only (no API key needed)
  img2text extract --plan-only 10.jpg 2.jpg cover.png

  # Structured JSON of every result on stdout
  img2text extract --json scans/ > results.json

  # Use another provider through edgequake-llm
  img2text extract --provider openai --model gpt-4.1-mini scans/

  # Start the HTTP API
  img2text serve --addr 0.0.0.0:8000

HTTP API:
  GET  /               welcome message
  POST /extract-text   multipart field "file" (one image)  → {"extracted_text": …}
  POST /extract-docx   multipart fields "file" (1..n)      → extracted_exam_paper.docx

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (GEMINI_API_KEY also accepted)
  IMG2TEXT_PROVIDER   Provider: gemini (default), openai, anthropic, ollama, …
  IMG2TEXT_MODEL      Model ID (default gemini-2.5-flash)
  RUST_LOG            Log filter override, e.g. edgequake_img2text=debug
"#;

/// Extract text from images with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "img2text",
    version,
    about = "Extract text from images with Vision LLMs into Word documents or JSON",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMG2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMG2TEXT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from a batch of images into a Word document.
    Extract(ExtractArgs),
    /// Serve the HTTP API.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Provider: gemini (default) or any edgequake-llm provider name.
    #[arg(long, env = "IMG2TEXT_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "IMG2TEXT_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to a text file with a custom extraction instruction.
    #[arg(long, env = "IMG2TEXT_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IMG2TEXT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per image.
    #[arg(long, env = "IMG2TEXT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Per-image API timeout in seconds (default: none).
    #[arg(long, env = "IMG2TEXT_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Override the Generative Language API base URL.
    #[arg(long, env = "IMG2TEXT_GEMINI_BASE_URL")]
    gemini_base_url: Option<String>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Image files (.jpg, .jpeg, .png) or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the Word document.
    #[arg(short, long, env = "IMG2TEXT_OUTPUT", default_value = "extracted_exam_paper.docx")]
    output: PathBuf,

    /// Print every result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Print the processing order and exit.
    #[arg(long)]
    plan_only: bool,

    /// Disable the progress bar.
    #[arg(long, env = "IMG2TEXT_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "IMG2TEXT_ADDR", default_value = "127.0.0.1:8000")]
    addr: String,

    /// Maximum request body size in MiB.
    #[arg(long, env = "IMG2TEXT_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports per-image outcomes, so library INFO
    // logs are silenced while it is on screen.
    let progress_active = matches!(
        &cli.command,
        Command::Extract(a) if !a.no_progress && !a.json && !a.plan_only
    );
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || progress_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract(ref args) => run_extract(args, cli.quiet).await,
        Command::Serve(ref args) => run_serve(args).await,
    }
}

async fn run_extract(args: &ExtractArgs, quiet: bool) -> Result<()> {
    let items = load_uploads(&args.inputs)
        .await
        .context("Failed to load images")?;

    // ── Processing plan ──────────────────────────────────────────────────
    let ordered = order_batch(items);
    let entries = plan(&ordered);

    if args.plan_only && args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialise plan")?
        );
        return Ok(());
    }
    if !quiet || args.plan_only {
        eprintln!("{}", bold("Files will be processed in this order:"));
        for entry in &entries {
            eprintln!(
                "  {:>3}. `{}` → {}",
                entry.position,
                entry.filename,
                cyan(&entry.label)
            );
        }
    }
    if args.plan_only {
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if !quiet && !args.no_progress && !args.json {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&args.provider, progress_cb).await?;

    let output = extract_to_file(ordered, &args.output, &config)
        .await
        .context("Extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    }

    if !quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} images  {}ms  →  {}",
            if stats.failed == 0 { green("✔") } else { cyan("⚠") },
            stats.succeeded,
            stats.total_items,
            stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = build_config(&args.provider, None).await?;

    // Refuse to start without a usable extractor.
    let extractor = resolve_extractor(&config).context("Cannot start the API server")?;

    let server_config = ServerConfig {
        addr: args.addr.clone(),
        max_upload_bytes: args.max_upload_mb.max(1) * 1024 * 1024,
    };
    server::serve(&server_config, AppState::new(extractor, config))
        .await
        .with_context(|| format!("Server on {} failed", args.addr))
}

/// Map provider flags to `ExtractionConfig`.
async fn build_config(
    args: &ProviderArgs,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens);

    if let Some(ref path) = args.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction_text(text);
    }
    if let Some(ref name) = args.provider {
        builder = builder.provider_name(name.as_str());
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.as_str());
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref url) = args.gemini_base_url {
        builder = builder.gemini_base_url(url.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
