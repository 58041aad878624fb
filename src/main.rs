use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use forkdiff_core::{ForkdiffConfig, ForkdiffError};
use forkdiff_extract::document::PersistOutcome;
use forkdiff_extract::{extract_divergence, ExtractOptions, Extraction};

const CONFIG_FILE: &str = ".forkdiff.toml";
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const LOG_ENV: &str = "FORKDIFF_LOG";

#[derive(Parser)]
#[command(
    name = "forkdiff",
    version,
    about = "Extract the changes unique to a feature branch",
    long_about = "forkdiff finds where a feature branch forked from its base and renders\n\
                   everything the feature changed since then as one plain-text document,\n\
                   ready to read or to hand to an LLM for review.\n\n\
                   Examples:\n  \
                     forkdiff diff --base main --feature topic            Print the document\n  \
                     forkdiff diff --base main --feature topic -o d.txt   Save it to a file\n  \
                     forkdiff review --base main --feature topic          Review it with an LLM\n  \
                     forkdiff init                                        Write a default .forkdiff.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .forkdiff.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct RangeArgs {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Base revision the feature branch forked from
    #[arg(long)]
    base: String,

    /// Feature revision whose own changes are extracted
    #[arg(long)]
    feature: String,
}

#[derive(Subcommand)]
enum Command {
    /// Render the divergence document
    #[command(long_about = "Render the divergence document.\n\n\
        Resolves the merge base of --base and --feature and renders every file the\n\
        feature changed since then. Prints to stdout unless --output is given.\n\
        Nothing is written when the branches share no history or nothing changed.\n\n\
        Examples:\n  forkdiff diff --base main --feature topic\n  forkdiff diff --repo ../app --base v1.2 --feature HEAD -o changes.txt")]
    Diff {
        #[command(flatten)]
        range: RangeArgs,

        /// Write the document to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Render the divergence document and review it with an LLM
    #[command(long_about = "Render the divergence document and review it with an LLM.\n\n\
        Sends the document to an OpenAI-compatible chat completions endpoint and\n\
        prints the reviewer's answer. Reasoning text, when the provider returns it,\n\
        is printed first between <think> tags.\n\n\
        Examples:\n  forkdiff review --base main --feature topic\n  forkdiff review --base main --feature topic --api-base https://api.deepseek.com --model deepseek-reasoner")]
    Review {
        #[command(flatten)]
        range: RangeArgs,

        /// API key (default: OPENAI_API_KEY or [llm].api_key)
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL of the OpenAI-compatible API
        #[arg(long)]
        api_base: Option<String>,

        /// Model name (default: deepseek-chat)
        #[arg(long)]
        model: Option<String>,

        /// Also write the document to this file
        #[arg(long)]
        output_diff: Option<PathBuf>,
    },
    /// Create a default .forkdiff.toml configuration file
    #[command(long_about = "Create a default .forkdiff.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .forkdiff.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# forkdiff configuration

[llm]
# OpenAI-compatible endpoint; the key can also come from OPENAI_API_KEY
# base_url = "https://api.deepseek.com"
# model = "deepseek-chat"
# temperature = 0.3
# timeout_secs = 90

[extract]
# Encodings tried in order, then the single-byte fallback with substitution
# encodings = ["utf-8", "gbk"]
# fallback_encoding = "latin1"
# binary_extensions = ["png", "jpg", "zip", "exe", "pdf"]
# rename_threshold = 50
# ignore_whitespace_eol = true
# ignore_blank_lines = true
# omit_empty_modifications = false
# skip_patterns = ["*.lock", "vendor/**"]
"#;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ForkdiffConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ForkdiffError::FileNotFound(path.to_path_buf()).into());
            }
            ForkdiffConfig::from_file(path)?
        }
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                ForkdiffConfig::from_file(default_path)?
            } else {
                ForkdiffConfig::default()
            }
        }
    };

    if let Some(key) = non_empty_env(API_KEY_ENV) {
        config.llm.api_key = Some(key);
    }
    if let Some(url) = non_empty_env(BASE_URL_ENV) {
        config.llm.base_url = Some(url);
    }
    Ok(config)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn extract(range: &RangeArgs, config: &ForkdiffConfig, verbose: bool) -> Result<Extraction> {
    let options = ExtractOptions::from_config(&config.extract)?;
    let extraction = extract_divergence(&range.repo, &range.base, &range.feature, &options)?;

    if let Err(e) = extraction.require_fork_point() {
        eprintln!("{e}; nothing to compare");
    }

    if verbose {
        let stats = &extraction.stats;
        eprintln!("--- Extraction Stats ---");
        if let Some(fp) = &extraction.fork_point {
            eprintln!("Fork point: {}", fp.commit);
        }
        eprintln!(
            "Changes: {} | Rendered: {} | Skipped: {}",
            stats.changes,
            stats.rendered,
            extraction.skipped.len()
        );
        eprintln!(
            "Binary sides: {} | Lossy decodes: {}",
            stats.binary_sides, stats.lossy_sides
        );
        if !extraction.skipped.is_empty() {
            eprintln!("Skipped paths:");
            for skipped in &extraction.skipped {
                eprintln!("  {} ({})", skipped.path, skipped.reason);
            }
        }
    }

    Ok(extraction)
}

fn report_persist(outcome: &PersistOutcome, dest: &Path) {
    match outcome {
        PersistOutcome::Written { path, bytes } => {
            eprintln!("Wrote {bytes} bytes to {}", path.display());
        }
        PersistOutcome::NothingToPersist => {
            eprintln!("No differences found; {} was not written", dest.display());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Diff {
            ref range,
            ref output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let extraction = extract(range, &config, cli.verbose)?;
            match output {
                Some(path) => {
                    let outcome = extraction.document.persist(path)?;
                    report_persist(&outcome, path);
                }
                None => print!("{}", extraction.document),
            }
        }
        Command::Review {
            ref range,
            ref api_key,
            ref api_base,
            ref model,
            ref output_diff,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(key) = api_key {
                config.llm.api_key = Some(key.clone());
            }
            if let Some(base) = api_base {
                config.llm.base_url = Some(base.clone());
            }
            if let Some(model) = model {
                config.llm.model = model.clone();
            }

            let extraction = extract(range, &config, cli.verbose)?;

            if let Some(path) = output_diff {
                let outcome = extraction.document.persist(path)?;
                report_persist(&outcome, path);
                if outcome == PersistOutcome::NothingToPersist {
                    tracing::warn!("no differences found, skipping review");
                    return Ok(());
                }
            }

            let Some(messages) = forkdiff_review::prompt::review_messages(extraction.document.as_str())
            else {
                eprintln!("No differences found; nothing to review");
                return Ok(());
            };

            if config.llm.api_key.is_none() {
                miette::bail!(miette::miette!(
                    help = "Pass --api-key, set {API_KEY_ENV}, or add api_key under [llm] in {CONFIG_FILE}",
                    "No API key configured for the review model"
                ));
            }

            let llm_client = forkdiff_review::llm::LlmClient::new(&config.llm)?;

            let spinner = if std::io::stderr().is_terminal() {
                let pb = indicatif::ProgressBar::new_spinner();
                pb.set_style(
                    indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                        .into_diagnostic()?,
                );
                pb.set_message(format!("Reviewing with {}...", llm_client.model()));
                pb.enable_steady_tick(std::time::Duration::from_millis(120));
                Some(pb)
            } else {
                None
            };

            let reply = llm_client.chat(&messages).await.inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            })?;

            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            if let Some(reasoning) = &reply.reasoning {
                println!("<think>\n{reasoning}\n</think>");
            }
            println!("审查结果：");
            println!("{}", reply.content);
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "forkdiff", &mut std::io::stdout());
        }
    }

    Ok(())
}
