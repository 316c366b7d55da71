//! The summarization engine and the metadata pass over its output.

pub mod chunker;
pub mod formatter;
pub mod hierarchical;
pub mod parser;
pub mod prompts;
pub mod sink;

pub use chunker::{Chunk, Chunker};
pub use formatter::SummaryFormatter;
pub use hierarchical::{HierarchicalSummarizer, SummaryOutcome};
pub use parser::{MetadataExtractor, SummaryMetadata, determine_status, extract_metadata};
pub use prompts::{DefaultPrompts, PromptTemplates};
pub use sink::{CallbackSink, NoopSink, PartialSummary, SummarySink};
