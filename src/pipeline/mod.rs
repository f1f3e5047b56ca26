//! Pipeline stages for study-guide generation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different clustering algorithm) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ embed ──▶ cluster ──▶ synthesize ──▶ assemble
//! (passages)  (vectors) (labels)    (records)      (sections)
//! ```
//!
//! 1. [`extract`]    — turn one source (text/url/youtube/pdf) into passages
//!    and filter out blank ones; [`web`], [`media`], and [`pdf`] hold the
//!    per-kind extraction branches
//! 2. [`embed`]      — one embedding-backend call per passage, sequential
//! 3. [`cluster`]    — mean-shift over the vectors; labels discovered, not
//!    supplied
//! 4. [`synthesize`] — per cluster: topic scoring → note synthesis →
//!    question generation, strictly in that order
//! 5. [`assemble`]   — records to ordered markdown sections; the document
//!    sink consumes them

pub mod assemble;
pub mod cluster;
pub mod embed;
pub mod extract;
pub mod media;
pub mod pdf;
pub mod synthesize;
pub mod web;
