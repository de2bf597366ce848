//! CLI binary for pdf2report.
//!
//! A thin shim over the library crate: flags become a [`Session`] edit or a
//! report request, results are printed.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2report::pipeline::extract::preview;
use pdf2report::prompts::DEFAULT_INSTRUCTIONS;
use pdf2report::{ConfigStore, LlmSettings, Session, DEFAULT_CONFIG_FILE};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Report for the active document type, printed to stdout
  pdf2report generate export_holter.pdf

  # Explicit type, extra instructions, saved next to the PDF
  pdf2report generate echo.pdf --doc-type "Échographie cardiaque" \
      --instructions "Mentionne la FEVG en premier." -o ./

  # Point at another server / model (remembered after a successful run)
  pdf2report generate ecg.pdf --base-url http://localhost:11434 --model llama3.1

  # Check what the model will see
  pdf2report preview scan.pdf --chars 2000

  # Manage document types
  pdf2report types list
  pdf2report types add "IRM cardiaque" --template-file irm_prompt.txt
  pdf2report types remove "Holter tensionnel"

  # Settings
  pdf2report config show
  pdf2report config set --temperature 0.1 --max-chars 40000

SERVER:
  Any OpenAI-compatible endpoint serving POST /v1/chat/completions:
  LM Studio (default http://127.0.0.1:1234), Ollama, vLLM, llama.cpp server.
  Scanned PDFs without a text layer are not supported (no OCR).

ENVIRONMENT VARIABLES:
  PDF2REPORT_CONFIG     Configuration file (default: cr_config.json)
  PDF2REPORT_BASE_URL   Server root URL
  PDF2REPORT_MODEL      Model identifier
  PDF2REPORT_API_KEY    Bearer credential
  RUST_LOG              Overrides -v / -q log filtering
"#;

/// Draft medical examination reports from PDF exports with a local LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2report",
    version,
    about = "Draft medical examination reports from PDF exports with a local LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Configuration file holding document types and LLM settings.
    #[arg(
        long = "config",
        global = true,
        env = "PDF2REPORT_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    config_file: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(short, long, global = true, env = "PDF2REPORT_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report from a PDF.
    Generate(GenerateArgs),
    /// Show the beginning of the text extracted from a PDF.
    Preview {
        pdf: PathBuf,
        /// Number of characters to show.
        #[arg(long, default_value_t = 5000)]
        chars: usize,
    },
    /// Manage document types.
    #[command(subcommand)]
    Types(TypesCommand),
    /// Show or change LLM settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// PDF export to summarise.
    pdf: PathBuf,

    /// Document type; defaults to the first registered type.
    #[arg(short, long)]
    doc_type: Option<String>,

    /// Supplementary instructions appended to the request.
    #[arg(short, long, default_value = DEFAULT_INSTRUCTIONS)]
    instructions: String,

    /// Write the report to this file, or into this directory under its
    /// suggested name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report and its metadata as JSON on stdout.
    #[arg(long, conflicts_with = "output")]
    json: bool,

    #[command(flatten)]
    settings: SettingsArgs,
}

/// Overrides for [`LlmSettings`]; numeric values are clamped to their ranges.
#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Server root URL, e.g. http://127.0.0.1:1234.
    #[arg(long, env = "PDF2REPORT_BASE_URL")]
    base_url: Option<String>,

    /// Model identifier as loaded on the server.
    #[arg(long, env = "PDF2REPORT_MODEL")]
    model: Option<String>,

    /// Bearer credential (empty sends "lm-studio").
    #[arg(long, env = "PDF2REPORT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–1.0).
    #[arg(long)]
    temperature: Option<f64>,

    /// Maximum response length in tokens (256–4096).
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Maximum extracted characters sent to the model (5000–100000).
    #[arg(long)]
    max_chars: Option<usize>,
}

impl SettingsArgs {
    /// Apply the overrides; returns `true` if anything was set.
    fn apply(&self, settings: &mut LlmSettings) -> bool {
        let mut changed = false;
        if let Some(url) = &self.base_url {
            settings.base_url = url.clone();
            changed = true;
        }
        if let Some(model) = &self.model {
            settings.model_name = model.clone();
            changed = true;
        }
        if let Some(key) = &self.api_key {
            settings.api_key = key.clone();
            changed = true;
        }
        if let Some(t) = self.temperature {
            settings.set_temperature(t);
            changed = true;
        }
        if let Some(n) = self.max_tokens {
            settings.set_max_tokens(n);
            changed = true;
        }
        if let Some(n) = self.max_chars {
            settings.set_max_chars(n);
            changed = true;
        }
        changed
    }
}

#[derive(Subcommand, Debug)]
enum TypesCommand {
    /// List document types (the active one is marked with *).
    List,
    /// Print the template of a document type.
    Show { name: String },
    /// Register a new document type.
    Add {
        name: String,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Replace the template of a document type.
    Update {
        name: String,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Delete a document type (the last one cannot be removed).
    Remove { name: String },
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct TemplateArgs {
    /// Template text.
    #[arg(long)]
    template: Option<String>,
    /// Read the template from a file.
    #[arg(long)]
    template_file: Option<PathBuf>,
}

impl TemplateArgs {
    async fn read(&self) -> Result<Option<String>> {
        match (&self.template, &self.template_file) {
            (Some(t), _) => Ok(Some(t.clone())),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .map(Some)
                .with_context(|| format!("Failed to read template from {:?}", path)),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the current settings.
    Show,
    /// Change one or more settings.
    Set(SettingsArgs),
    /// Restore the default LLM settings (document types are kept).
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    let store = ConfigStore::new(&cli.config_file);
    let mut session = Session::open(store).context("Failed to initialise report pipeline")?;

    match &cli.command {
        Command::Generate(args) => generate(&mut session, args, cli.quiet).await,
        Command::Preview { pdf, chars } => preview_pdf(&session, pdf, *chars).await,
        Command::Types(cmd) => types(&mut session, cmd).await,
        Command::Config(cmd) => config(&mut session, cmd),
    }
}

async fn generate(session: &mut Session, args: &GenerateArgs, quiet: bool) -> Result<()> {
    args.settings.apply(session.settings_mut());

    let doc_type = match &args.doc_type {
        Some(name) => name.clone(),
        None => session.registry().active().name.clone(),
    };
    let pdf = tokio::fs::read(&args.pdf)
        .await
        .with_context(|| format!("Failed to read {:?}", args.pdf))?;

    let spinner = (!quiet && !args.json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Generating");
        bar.set_message(format!("{doc_type} via {}", session.settings().model_name));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = session
        .generate_report(&doc_type, Some(pdf), &args.instructions)
        .await;
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let delivery = result.context("Report generation failed")?;
    let report = &delivery.report;

    if let Err(e) = &delivery.autosave {
        eprintln!("{} settings not saved: {e}", yellow("⚠"));
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
    } else if let Some(output) = &args.output {
        let path = if output.is_dir() {
            output.join(report.suggested_file_name())
        } else {
            output.clone()
        };
        tokio::fs::write(&path, &report.text)
            .await
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        if !quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        write_text(&mut io::stdout().lock(), &report.text).context("Failed to write to stdout")?;
    }

    if !quiet && !args.json {
        if report.truncated {
            eprintln!(
                "{} document truncated: {} → {} characters sent",
                yellow("⚠"),
                report.extracted_chars,
                session.settings().max_chars
            );
        }
        let tokens = report
            .usage
            .map(|u| format!("{} tokens in  /  {} tokens out", u.prompt_tokens, u.completion_tokens))
            .unwrap_or_else(|| "no token usage reported".to_string());
        eprintln!("   {}  {}ms", dim(&tokens), report.duration_ms);
    }
    Ok(())
}

/// Write `text`, ending with exactly one trailing newline if it had none.
fn write_text(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

async fn preview_pdf(session: &Session, pdf: &Path, chars: usize) -> Result<()> {
    let bytes = tokio::fs::read(pdf)
        .await
        .with_context(|| format!("Failed to read {:?}", pdf))?;
    let text = session
        .pipeline()
        .extract_text(bytes)
        .await
        .context("Text extraction failed")?;

    if text.trim().is_empty() {
        bail!("No text layer found in {:?} (scanned PDFs are not supported)", pdf);
    }
    println!("{}", preview(&text, chars));
    eprintln!("{}", dim(&format!("{} characters extracted", text.chars().count())));
    Ok(())
}

async fn types(session: &mut Session, cmd: &TypesCommand) -> Result<()> {
    match cmd {
        TypesCommand::List => {
            let active = session.registry().active().name.clone();
            for name in session.registry().names() {
                let marker = if name == active { "*" } else { " " };
                println!("{marker} {name}");
            }
            return Ok(());
        }
        TypesCommand::Show { name } => {
            println!("{}", session.registry().get(name)?);
            return Ok(());
        }
        TypesCommand::Add { name, template } => {
            let template = template.read().await?.unwrap_or_default();
            session.registry_mut().add(name.clone(), template)?;
        }
        TypesCommand::Update { name, template } => {
            let Some(template) = template.read().await? else {
                bail!("Nothing to update: pass --template or --template-file");
            };
            session.registry_mut().update(name, template)?;
        }
        TypesCommand::Remove { name } => {
            session.registry_mut().remove(name)?;
        }
    }
    session.save().context("Failed to save configuration")?;
    eprintln!(
        "{} saved to {}",
        green("✔"),
        session.store().path().display()
    );
    Ok(())
}

fn config(session: &mut Session, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let s = session.settings();
            println!("File:         {}", session.store().path().display());
            println!("Base URL:     {}", s.base_url);
            println!("Model:        {}", s.model_name);
            println!(
                "API key:      {}",
                if s.api_key.is_empty() { "(empty)" } else { "(set)" }
            );
            println!("Temperature:  {}", s.temperature);
            println!("Max tokens:   {}", s.max_tokens);
            println!("Max chars:    {}", s.max_chars);
            println!("Doc types:    {}", session.registry().len());
            return Ok(());
        }
        ConfigCommand::Set(args) => {
            if !args.apply(session.settings_mut()) {
                bail!("Nothing to set: pass at least one option (see --help)");
            }
        }
        ConfigCommand::Reset => {
            *session.settings_mut() = LlmSettings::default();
        }
    }
    session.save().context("Failed to save configuration")?;
    eprintln!(
        "{} saved to {}",
        green("✔"),
        session.store().path().display()
    );
    Ok(())
}
