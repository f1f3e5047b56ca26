//! CLI binary for studygen.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `StudyGuideConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use studygen::{generate, generate_to_file, Backends, SourceKind, StudyGuideConfig};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Raw text (stdout)
  studygen "Vectors add componentwise." --kind text

  # Web page to file
  studygen https://example.edu/linear-algebra --kind url -o guide.md

  # Lecture recording (requires yt-dlp on PATH and OPENAI_API_KEY)
  studygen https://youtube.com/watch?v=... --kind youtube -o guide.md

  # Image-heavy PDF with diagram captions (requires a local Ollama host)
  studygen lecture_slides.pdf --kind pdf --images -o guide.md

  # Pin the clustering bandwidth and pace the generation calls
  studygen notes.pdf --kind pdf --bandwidth 0.8 --delay-ms 500

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY         Generation + embedding backend key (required)
  OPENAI_API_KEY          Speech-to-text backend key (youtube sources only)
  OLLAMA_HOST             Captioning host (default: http://localhost:11434)
  STUDYGEN_GEN_MODEL      Override the generation model
  STUDYGEN_EMBED_MODEL    Override the embedding model

SETUP:
  1. Set API key:     export MISTRAL_API_KEY=...
  2. Generate:        studygen document.pdf --kind pdf -o guide.md

  The youtube source kind additionally needs yt-dlp installed and an
  OPENAI_API_KEY for transcription.
"#;

/// Generate study guides (topic scores, notes, questions) from study material.
#[derive(Parser, Debug)]
#[command(
    name = "studygen",
    version,
    about = "Generate study guides from text, web pages, videos, and PDFs using LLMs",
    long_about = "Extract passages from study material, cluster them into topics via \
semantic embeddings, and synthesise per-topic study-guide sections (scored topics, \
lecture notes, exam questions) with a generative-text backend.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// The content itself (--kind text) or a URL / file path.
    content: String,

    /// Source kind: text, url, youtube, pdf.
    #[arg(short, long, env = "STUDYGEN_KIND", default_value = "text")]
    kind: String,

    /// Caption embedded PDF images (slow; needs a local Ollama host).
    #[arg(long, env = "STUDYGEN_IMAGES")]
    images: bool,

    /// Write markdown to this file instead of stdout.
    #[arg(short, long, env = "STUDYGEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Generation model.
    #[arg(long, env = "STUDYGEN_GEN_MODEL", default_value = "mistral-large-latest")]
    gen_model: String,

    /// Embedding model.
    #[arg(long, env = "STUDYGEN_EMBED_MODEL", default_value = "mistral-embed")]
    embed_model: String,

    /// Generation + embedding backend API key.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    mistral_api_key: Option<String>,

    /// Speech-to-text backend API key (youtube sources).
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Captioning host.
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    ollama_host: String,

    /// Document title (default: derived from the source).
    #[arg(long, env = "STUDYGEN_TITLE")]
    title: Option<String>,

    /// Mean-shift bandwidth (default: estimated from the data).
    #[arg(long, env = "STUDYGEN_BANDWIDTH")]
    bandwidth: Option<f32>,

    /// Fixed delay between generation calls, in milliseconds (0 = off).
    #[arg(long, env = "STUDYGEN_DELAY_MS", default_value_t = 0)]
    delay_ms: u64,

    /// Clusters synthesised concurrently.
    #[arg(short, long, env = "STUDYGEN_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Keep the downloaded audio artifact after transcription.
    #[arg(long, env = "STUDYGEN_KEEP_AUDIO")]
    keep_audio: bool,

    /// Retries per backend call on transient failure.
    #[arg(long, env = "STUDYGEN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output structured JSON (StudyGuideOutput) instead of markdown.
    #[arg(long, env = "STUDYGEN_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "STUDYGEN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STUDYGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STUDYGEN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active; verbose
    // mode always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config + backends ──────────────────────────────────────────
    let kind: SourceKind = cli.kind.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    let config = build_config(&cli)?;
    let backends = Backends::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;

    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Generating study guide from {kind} source…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let result = if let Some(ref output_path) = cli.output {
        let stats = generate_to_file(&cli.content, kind, &config, &backends, output_path)
            .await
            .context("Generation failed")?;
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
        if !cli.quiet {
            eprintln!(
                "✔ {} passages → {} topic sections in {}ms → {}",
                stats.passages,
                stats.clusters,
                stats.total_duration_ms,
                output_path.display()
            );
            if stats.skipped_captions > 0 {
                eprintln!("  {} PDF page(s) degraded to text-only content", stats.skipped_captions);
            }
        }
        return Ok(());
    } else {
        generate(&cli.content, kind, &config, &backends).await
    };

    let output = match result {
        Ok(output) => {
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            output
        }
        Err(e) => {
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            return Err(anyhow::anyhow!("{e}")).context("Generation failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} passages  /  {} topic sections  —  {}ms total",
            output.stats.passages, output.stats.clusters, output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `StudyGuideConfig`.
fn build_config(cli: &Cli) -> Result<StudyGuideConfig> {
    let mut builder = StudyGuideConfig::builder()
        .gen_model(&cli.gen_model)
        .embedding_model(&cli.embed_model)
        .ollama_host(&cli.ollama_host)
        .image_support(cli.images)
        .keep_audio(cli.keep_audio)
        .inter_call_delay_ms(cli.delay_ms)
        .cluster_concurrency(cli.concurrency)
        .max_retries(cli.max_retries);

    if let Some(key) = &cli.mistral_api_key {
        builder = builder.mistral_api_key(key);
    }
    if let Some(key) = &cli.openai_api_key {
        builder = builder.openai_api_key(key);
    }
    if let Some(title) = &cli.title {
        builder = builder.title(title);
    }
    if let Some(b) = cli.bandwidth {
        builder = builder.bandwidth(b);
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Invalid configuration")
}
