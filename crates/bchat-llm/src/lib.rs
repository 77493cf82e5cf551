pub mod mock;
pub mod parse;
pub mod provider;
pub mod reliable;

pub use mock::{MockProvider, MockResponse};
pub use provider::{AnthropicProvider, CompletionOptions, GeminiProvider, SummaryProvider};
pub use reliable::{CircuitBreaker, CircuitState, RateLimiter, ReliableClient, ResilienceConfig};
