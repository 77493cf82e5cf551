pub mod echo;
pub mod search_context;

use std::sync::Arc;

use bchat_store::IndexStore;

use crate::context::ContextExtractor;
use crate::registry::ToolRegistry;

pub use echo::EchoTool;
pub use search_context::SearchContextTool;

/// Registry with the built-in tool set.
pub fn create_default_registry(
    index: Arc<IndexStore>,
    extractor: ContextExtractor,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(SearchContextTool::new(index, extractor)));
    registry
}
