#![allow(dead_code)]
//! Fakes shared by the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use condense::{Config, GenerateError, GenerationParams, Generator, MapReduce, Tokenizer};

/// One token per whitespace-separated word. Budgets become easy to count.
pub struct Words;

impl Tokenizer for Words {
    fn encode(&self, text: &str) -> condense::Result<Vec<u32>> {
        Ok(text.split_whitespace().map(|_| 0).collect())
    }

    fn decode(&self, _tokens: &[u32]) -> condense::Result<String> {
        Ok(String::new())
    }
}

/// `n` lines of two words each: `"line 0"`, `"line 1"`, ...
pub fn numbered_lines(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("line {i}")).collect()
}

/// The number in a `"line N"` prompt.
fn line_number(prompt: &str) -> usize {
    prompt
        .split_whitespace()
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// A config where `{{{chunk}}}` leaves exactly `map` and `reduce` word
/// tokens per chunk.
pub fn word_budgets(map: usize, reduce: usize) -> Config {
    let mut config = Config::default();
    config.map.max_total_tokens = config.map.reserved_for_completion + 1 + map;
    config.reduce.max_total_tokens = config.reduce.reserved_for_completion + 1 + reduce;
    config
}

pub fn engine(generator: Arc<dyn Generator>, config: Config) -> MapReduce {
    MapReduce::new(Arc::new(Words), generator, config)
}

/// Echoes each `"line N"` prompt after `delays[N]` milliseconds, tracking
/// how many calls are in flight at once.
#[derive(Default)]
pub struct Delayed {
    pub delays: Vec<u64>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl Delayed {
    pub fn new(delays: Vec<u64>) -> Self {
        Self {
            delays,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for Delayed {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(line_number(prompt)).copied().unwrap_or(1);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(prompt.to_string())
    }
}

/// Returns the same reply to every prompt and records the prompts.
pub struct Scripted {
    pub reply: String,
    pub fail_on: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail any prompt containing `needle` with a rate-limit error.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for Scripted {
    async fn generate(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.fail_on {
            Some(needle) if prompt.contains(needle.as_str()) => {
                Err(GenerateError::RateLimited { retry_after: None })
            }
            _ => Ok(self.reply.clone()),
        }
    }
}

/// Paused-clock runtime: sleeps resolve instantly, in deadline order.
pub fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}
