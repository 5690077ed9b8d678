//! wparchive: CLI archiver for WordPress translation sites, outputting EPUB and PDF.

pub mod checkpoint;
pub mod clean;
pub mod cli;
pub mod config;
pub mod epub;
pub mod extract;
pub mod harvest;
pub mod model;
pub mod pdf;

// Re-exports for CLI and consumers.
pub use checkpoint::{Checkpoint, CheckpointError, JsonCheckpoint, Keyed, MemoryCheckpoint};
pub use clean::clean;
pub use epub::{write_epub, EpubError};
pub use extract::{extract, Extracted};
pub use harvest::{HarvestError, PageSource, SessionClient, SessionClientBuilder};
pub use model::{build_chapters, Chapter, PostRecord, PostRef};
pub use pdf::{write_pdf, PdfError};
