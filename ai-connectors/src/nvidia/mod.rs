//! NVIDIA connectors
//!
//! NIM backends implement [`crate::EmbedderBackend`] and
//! [`crate::GeneratorBackend`]; the components on top add prompt
//! decoration, batching and model checks.

mod embedder;
mod generator;
pub mod nim;

pub use embedder::{
    DocumentEmbedderOutput, EmbeddingTruncateMode, NvidiaDocumentEmbedder, NvidiaEmbedderConfig,
    NvidiaTextEmbedder, TextEmbedderOutput, DEFAULT_BATCH_SIZE, DEFAULT_EMBEDDING_MODEL,
};
pub use generator::{NvidiaGenerator, NvidiaGeneratorConfig};
pub use nim::{NimConfig, NimEmbedderBackend, NimGeneratorBackend};
