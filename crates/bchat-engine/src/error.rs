use bchat_core::tools::ToolError;
use bchat_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("{0}")]
    Internal(String),
}
