use metriken::{AtomicHistogram, Counter, LazyCounter, metric};
use std::time::Duration;

// Request metrics
#[metric(
    name = "requests",
    description = "Chat requests sent",
    metadata = { status = "sent" }
)]
pub static REQUESTS_SENT: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "requests",
    description = "Chat requests answered with a success status",
    metadata = { status = "success" }
)]
pub static REQUESTS_SUCCESS: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "requests",
    description = "Chat requests answered with an error status",
    metadata = { status = "failed" }
)]
pub static REQUESTS_FAILED: LazyCounter = LazyCounter::new(Counter::default);

// Error category metrics
#[metric(
    name = "errors",
    description = "HTTP 4xx responses",
    metadata = { "type" = "http_4xx" }
)]
pub static ERRORS_HTTP_4XX: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "errors",
    description = "HTTP 5xx responses",
    metadata = { "type" = "http_5xx" }
)]
pub static ERRORS_HTTP_5XX: LazyCounter = LazyCounter::new(Counter::default);

// Token metrics, as reported by the server's usage block
#[metric(
    name = "tokens",
    description = "Prompt tokens consumed",
    metadata = { direction = "input" }
)]
pub static TOKENS_INPUT: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "tokens",
    description = "Completion tokens generated",
    metadata = { direction = "output" }
)]
pub static TOKENS_OUTPUT: LazyCounter = LazyCounter::new(Counter::default);

// Latency histogram parameters: (grouping_power=5, max_value_power=64)
// This gives 32 buckets per power of 2, covering the full 64-bit range
#[metric(
    name = "request_latency",
    description = "Full request latency in nanoseconds",
    metadata = { unit = "nanoseconds" }
)]
pub static REQUEST_LATENCY: AtomicHistogram = AtomicHistogram::new(5, 64);

pub struct Metrics;

impl Metrics {
    pub fn record_request_sent() {
        REQUESTS_SENT.increment();
    }

    pub fn record_success(prompt_tokens: u64, completion_tokens: u64, elapsed: Duration) {
        REQUESTS_SUCCESS.increment();
        TOKENS_INPUT.add(prompt_tokens);
        TOKENS_OUTPUT.add(completion_tokens);
        let _ = REQUEST_LATENCY.increment(elapsed.as_nanos() as u64);
    }

    pub fn record_api_error(status: u16) {
        REQUESTS_FAILED.increment();
        if (400..500).contains(&status) {
            ERRORS_HTTP_4XX.increment();
        } else if (500..600).contains(&status) {
            ERRORS_HTTP_5XX.increment();
        }
    }
}
