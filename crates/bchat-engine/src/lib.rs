pub mod context;
pub mod error;
pub mod processor;
pub mod query;
pub mod registry;
pub mod search;
pub mod tools;

pub use context::ContextExtractor;
pub use error::EngineError;
pub use processor::{ChatProcessor, ConsolidationReport, ProcessOutcome};
pub use query::{QueryAnalysis, QueryAnalyzer};
pub use registry::ToolRegistry;
pub use search::{IndexSearcher, DEFAULT_SEARCH_LIMIT};
