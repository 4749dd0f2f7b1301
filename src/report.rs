use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

use crate::output::{output, section};

/// Round to two decimals, the precision all elapsed and rate fields are
/// stored at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The full evaluation report written to disk as pretty JSON.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    // Metadata
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: f64,
    pub version: String,
    pub endpoint: String,
    pub model: String,

    // Run-wide request accounting
    pub summary: Summary,

    // One entry per category; absent when the category was skipped or,
    // for tokens_per_second, when no run succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<SpeedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_context: Option<ContextReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<CodingResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factual: Option<FactualReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multimodal: Option<MultimodalReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Vec<ReasoningResult>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub request_p50_ms: f64,
    pub request_p90_ms: f64,
    pub request_p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedRun {
    pub run: usize,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub elapsed_seconds: f64,
    pub tokens_per_second: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedReport {
    pub runs: Vec<SpeedRun>,
    pub average_tps: f64,
}

impl SpeedReport {
    /// Mean of the recorded per-run rates. `None` when no run succeeded,
    /// so a dead server cannot masquerade as a slow one.
    pub fn from_runs(runs: Vec<SpeedRun>) -> Option<Self> {
        if runs.is_empty() {
            return None;
        }
        let sum: f64 = runs.iter().map(|r| r.tokens_per_second).sum();
        let average_tps = round2(sum / runs.len() as f64);
        Some(Self { runs, average_tps })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextReport {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub elapsed_seconds: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodingResult {
    pub test: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_type_hints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentions_worst_case: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactualResult {
    pub test: &'static str,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactualReport {
    pub questions: Vec<FactualResult>,
    pub accuracy: f64,
}

impl FactualReport {
    /// Accuracy is correct answers over questions asked, as a percentage.
    /// Errors count as incorrect.
    pub fn from_questions(questions: Vec<FactualResult>) -> Self {
        let accuracy = if questions.is_empty() {
            0.0
        } else {
            let correct = questions.iter().filter(|q| q.correct).count();
            correct as f64 / questions.len() as f64 * 100.0
        };
        Self { questions, accuracy }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultimodalReport {
    pub supports_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningResult {
    pub test: &'static str,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-category results accumulated by the runner.
#[derive(Debug, Default)]
pub struct CategoryResults {
    pub tokens_per_second: Option<SpeedReport>,
    pub large_context: Option<ContextReport>,
    pub coding: Option<Vec<CodingResult>>,
    pub factual: Option<FactualReport>,
    pub multimodal: Option<MultimodalReport>,
    pub reasoning: Option<Vec<ReasoningResult>>,
}

pub struct ReportBuilder {
    start_time: SystemTime,
    endpoint: String,
    model: String,
}

impl ReportBuilder {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            start_time: SystemTime::now(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }

    pub fn build(&self, results: CategoryResults) -> Result<EvalReport> {
        let duration = SystemTime::now().duration_since(self.start_time)?;
        let timestamp: DateTime<Utc> = self.start_time.into();

        Ok(EvalReport {
            timestamp,
            duration_seconds: round2(duration.as_secs_f64()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            summary: build_summary(),
            tokens_per_second: results.tokens_per_second,
            large_context: results.large_context,
            coding: results.coding,
            factual: results.factual,
            multimodal: results.multimodal,
            reasoning: results.reasoning,
        })
    }
}

fn build_summary() -> Summary {
    use crate::metrics::{
        REQUESTS_FAILED, REQUESTS_SENT, REQUESTS_SUCCESS, TOKENS_INPUT, TOKENS_OUTPUT,
    };

    let (p50, p90, p99) = latency_percentiles_ms();

    Summary {
        total_requests: REQUESTS_SENT.value(),
        successful_requests: REQUESTS_SUCCESS.value(),
        failed_requests: REQUESTS_FAILED.value(),
        total_prompt_tokens: TOKENS_INPUT.value(),
        total_completion_tokens: TOKENS_OUTPUT.value(),
        request_p50_ms: p50,
        request_p90_ms: p90,
        request_p99_ms: p99,
    }
}

fn latency_percentiles_ms() -> (f64, f64, f64) {
    use crate::metrics::REQUEST_LATENCY;

    let mut p50 = 0.0;
    let mut p90 = 0.0;
    let mut p99 = 0.0;

    // The histogram takes quantiles on the unit scale and hands them back
    // the same way
    if let Some(histogram) = REQUEST_LATENCY.load()
        && let Ok(Some(percentiles)) = histogram.percentiles(&[0.5, 0.9, 0.99])
    {
        for (percentile, bucket) in percentiles.iter() {
            let value_ms = bucket.end() as f64 / 1_000_000.0;
            match (percentile * 100.0).round() as u32 {
                50 => p50 = value_ms,
                90 => p90 = value_ms,
                99 => p99 = value_ms,
                _ => {}
            }
        }
    }

    (p50, p90, p99)
}

/// Console summary printed after the report file is written.
pub fn print_summary(report: &EvalReport, output_file: &Path) {
    section("SUMMARY");

    if let Some(speed) = &report.tokens_per_second {
        output!("Generation speed: {:.2} tokens/second average", speed.average_tps);
    }
    if let Some(context) = &report.large_context {
        output!(
            "Large context ({} prompt tokens): {}",
            context.prompt_tokens,
            if context.success { "OK" } else { "FAILED" }
        );
    }
    if let Some(coding) = &report.coding {
        let passed = coding.iter().filter(|t| t.success).count();
        output!("Coding tests: {}/{} passed", passed, coding.len());
    }
    if let Some(factual) = &report.factual {
        output!("Factual accuracy: {:.0}%", factual.accuracy);
    }
    if let Some(multimodal) = &report.multimodal {
        output!(
            "Image support: {}",
            if multimodal.supports_images { "YES" } else { "NO" }
        );
    }
    if let Some(reasoning) = &report.reasoning {
        let passed = reasoning.iter().filter(|t| t.correct).count();
        output!("Reasoning tests: {}/{} passed", passed, reasoning.len());
    }

    output!(
        "Requests: {} Ok: {} Err: {}",
        report.summary.total_requests,
        report.summary.successful_requests,
        report.summary.failed_requests
    );
    output!(
        "Request Latency (ms): p50: {:.0} p90: {:.0} p99: {:.0}",
        report.summary.request_p50_ms,
        report.summary.request_p90_ms,
        report.summary.request_p99_ms
    );
    output!("Full results saved to {}", output_file.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_summary() -> Summary {
        Summary {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_prompt_tokens: 0,
            total_completion_tokens: 0,
            request_p50_ms: 0.0,
            request_p90_ms: 0.0,
            request_p99_ms: 0.0,
        }
    }

    #[test]
    fn latency_percentiles_convert_to_ms() {
        use crate::metrics::REQUEST_LATENCY;
        use std::time::Duration;

        // The histogram is process-global, so only assert properties that
        // hold regardless of what other tests record into it
        for _ in 0..10 {
            let _ = REQUEST_LATENCY.increment(Duration::from_millis(150).as_nanos() as u64);
        }

        let (p50, p90, p99) = latency_percentiles_ms();
        assert!(p50 >= 100.0, "p50 = {}", p50);
        assert!(p90 >= p50);
        assert!(p99 >= p90);
        // Nanosecond recordings come back as milliseconds
        assert!(p99 < 10_000.0, "p99 = {}", p99);
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(38.73456), 38.73);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(99.999), 100.0);
    }

    #[test]
    fn speed_average_is_mean_of_recorded_runs() {
        let runs = vec![
            SpeedRun {
                run: 1,
                prompt_tokens: 20,
                completion_tokens: 300,
                elapsed_seconds: 10.0,
                tokens_per_second: 30.0,
            },
            SpeedRun {
                run: 3,
                prompt_tokens: 20,
                completion_tokens: 300,
                elapsed_seconds: 7.5,
                tokens_per_second: 40.0,
            },
        ];
        let report = SpeedReport::from_runs(runs).unwrap();
        assert_eq!(report.average_tps, 35.0);
        assert_eq!(report.runs.len(), 2);
    }

    #[test]
    fn speed_report_absent_without_successful_runs() {
        assert!(SpeedReport::from_runs(Vec::new()).is_none());
    }

    #[test]
    fn accuracy_counts_errors_as_incorrect() {
        let questions = vec![
            FactualResult {
                test: "a",
                correct: true,
                elapsed: Some(0.5),
                error: None,
            },
            FactualResult {
                test: "b",
                correct: true,
                elapsed: Some(0.5),
                error: None,
            },
            FactualResult {
                test: "c",
                correct: false,
                elapsed: None,
                error: Some("HTTP 500".to_string()),
            },
            FactualResult {
                test: "d",
                correct: false,
                elapsed: Some(0.5),
                error: None,
            },
            FactualResult {
                test: "e",
                correct: true,
                elapsed: Some(0.5),
                error: None,
            },
        ];
        let report = FactualReport::from_questions(questions);
        assert_eq!(report.accuracy, 60.0);
    }

    #[test]
    fn skipped_categories_are_absent_from_json() {
        let report = EvalReport {
            timestamp: Utc::now(),
            duration_seconds: 1.25,
            version: "0.1.0".to_string(),
            endpoint: "http://localhost:31245".to_string(),
            model: "test".to_string(),
            summary: empty_summary(),
            tokens_per_second: None,
            large_context: None,
            coding: None,
            factual: Some(FactualReport::from_questions(Vec::new())),
            multimodal: None,
            reasoning: None,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("tokens_per_second").is_none());
        assert!(value.get("large_context").is_none());
        assert!(value.get("coding").is_none());
        assert!(value.get("factual").is_some());
        assert_eq!(value["model"], "test");
        assert_eq!(value["endpoint"], "http://localhost:31245");
    }

    #[test]
    fn error_fields_are_skipped_when_absent() {
        let result = CodingResult {
            test: "binary_search_generation",
            success: true,
            has_type_hints: Some(true),
            mentions_worst_case: None,
            elapsed: Some(2.31),
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["test"], "binary_search_generation");
        assert_eq!(value["has_type_hints"], true);
        assert!(value.get("mentions_worst_case").is_none());
        assert!(value.get("error").is_none());
    }
}
