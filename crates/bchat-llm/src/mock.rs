use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use bchat_core::errors::GatewayError;

use crate::provider::SummaryProvider;

/// Pre-programmed responses for deterministic testing without API calls.
pub enum MockResponse {
    /// Return this raw text.
    Text(String),
    /// Return an error from the complete() call.
    Error(GatewayError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence.
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times complete() was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SummaryProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut response = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| GatewayError::NetworkError("mock responses exhausted".into()))?;

        loop {
            match response {
                MockResponse::Text(text) => return Ok(text),
                MockResponse::Error(e) => return Err(e),
                MockResponse::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }
}
