pub mod config;
pub mod errors;
pub mod ids;
pub mod provider;
pub mod summary;
pub mod tools;

pub use config::Config;
pub use errors::GatewayError;
pub use ids::SessionId;
pub use provider::Provider;
pub use summary::SessionSummary;
