//! # sift-inference
//!
//! Model backends for sift.
//!
//! This crate provides:
//! - Ollama embedding backend ([`OllamaBackend`])
//! - HTTP cross-encoder rerank backend ([`HttpRerankBackend`])
//! - Deterministic mocks (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use sift_inference::OllamaBackend;
//! use sift_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() -> sift_core::Result<()> {
//!     let backend = OllamaBackend::from_env()?;
//!     let embeddings = backend.embed_texts(&["Hello".to_string()]).await?;
//!     Ok(())
//! }
//! ```

pub mod ollama;
pub mod rerank;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use ollama::OllamaBackend;
pub use rerank::HttpRerankBackend;
