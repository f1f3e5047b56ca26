//! # studygen
//!
//! Turn heterogeneous study material — raw text, web pages, video
//! transcripts, PDFs with embedded diagrams — into a structured study guide:
//! scored topics, synthesised lecture notes, and exam questions, one section
//! per discovered topic cluster.
//!
//! ## Why this crate?
//!
//! Dumping a whole semester's material into one generation prompt produces
//! mush: the model blends unrelated topics and its attention dilutes. This
//! crate instead embeds each passage, lets mean-shift clustering discover
//! the latent topics (the cluster count is found, not chosen), and runs a
//! three-stage prompt pipeline per topic so every section is grounded in
//! exactly the passages that belong to it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source (text / url / youtube / pdf)
//!  │
//!  ├─ 1. Extract    per-kind branch → passages split on blank lines
//!  ├─ 2. Filter     drop whitespace-only passages
//!  ├─ 3. Embed      one embedding call per passage
//!  ├─ 4. Cluster    mean-shift → topic labels (count discovered)
//!  ├─ 5. Synthesise per cluster: topics → notes → questions (in order)
//!  └─ 6. Assemble   ordered markdown sections → document sink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studygen::{generate, Backends, SourceKind, StudyGuideConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudyGuideConfig::builder()
//!         .mistral_api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .build()?;
//!     let backends = Backends::from_config(&config)?;
//!
//!     let output = generate(
//!         "Vectors add componentwise.\n\nThe dot product is commutative.",
//!         SourceKind::Text,
//!         &config,
//!         &backends,
//!     )
//!     .await?;
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studygen` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! studygen = { version = "0.3", default-features = false }
//! ```
//!
//! ## Backends
//!
//! Every external service sits behind a single-method trait
//! ([`GenerativeBackend`], [`EmbeddingBackend`], [`TranscriptionBackend`],
//! [`CaptionBackend`]), so tests substitute deterministic doubles and never
//! touch the network. [`Backends::from_config`] wires the production
//! clients: Mistral for generation and embeddings, an OpenAI-compatible
//! whisper endpoint for transcription, and a local Ollama vision model for
//! diagram captions.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    Backends, CaptionBackend, ChatMessage, ChatRole, EmbeddingBackend, GenerativeBackend,
    TranscriptionBackend,
};
pub use config::{SourceKind, StudyGuideConfig, StudyGuideConfigBuilder};
pub use error::{CaptionOutcome, StudyGenError};
pub use generate::{generate, generate_to_file, generate_to_sink};
pub use output::{ClusterRecord, GenerationStats, Section, StudyGuideOutput};
pub use pipeline::assemble::{DocumentSink, MarkdownFileSink};
