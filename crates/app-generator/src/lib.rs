//! `app-generator`: turns a natural-language brief into a single-page app.
//!
//! # Architecture
//!
//! ```text
//! brief + attachments
//!     │
//!     ▼
//! prompt.rs       ← system prompt, attachment listing
//!     │
//!     ▼
//! LlmGenerator    ← POST to Gemini generateContent or an
//!     │              OpenAI-compatible chat/completions endpoint
//!     ▼
//! extract.rs      ← raw text → index.html + README.md
//!     │
//!     ▼
//! GeneratedFiles  ← ordered path → content; empty on failure
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use app_generator::{CodeGenerator, LlmGenerator};
//! use pagesmith_core::config::LlmConfig;
//!
//! let generator = LlmGenerator::new(&LlmConfig { api_key: key, ..Default::default() })?;
//! let files = generator.generate("A tip calculator", &[]).await;
//! if files.is_empty() {
//!     // generation failed; the error has been logged
//! }
//! ```

pub mod error;
pub mod extract;
pub mod prompt;
pub mod runner;
pub mod types;

pub use error::{GeneratorError, Result};
pub use runner::{CodeGenerator, GeneratedFiles, LlmGenerator, INDEX_PATH, README_PATH};
pub use types::Attachment;
