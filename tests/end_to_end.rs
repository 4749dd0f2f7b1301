//! Full-suite run against a stub server that answers every request well.

use llm_eval::EvalRunner;
use llm_eval::config::Config;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One canned completion whose text satisfies every category's checks.
fn stub_completion() -> Value {
    let content = "def binary_search(arr: list, target: int) -> int: return -1. \
        Quicksort averages O(n log n) but degrades to O(n^2); the fix is changing \
        fibonacci(n-3) to fibonacci(n-2). Light travels 299792458 m/s, water is H2O, \
        Shakespeare wrote Romeo and Juliet, Jupiter is the largest planet, and the \
        war ended in 1945. The train covers 240 miles total. No, not necessarily. \
        The image is red.";
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 0,
        "model": "stub-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 42, "completion_tokens": 12, "total_tokens": 54}
    })
}

#[tokio::test]
async fn full_suite_against_healthy_stub() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stub_completion()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "stub-model", "object": "model"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/model_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "stub-model",
            "supports_vision": true
        })))
        .mount(&server)
        .await;

    let dir = tempdir().expect("temp dir");
    let report_path = dir.path().join("eval_results.json");

    let mut config = Config::default();
    config.endpoint.base_url = server.uri();
    config.endpoint.model = None; // exercise auto-detection
    config.eval.speed_runs = 3;
    config.eval.context_target_tokens = 200; // keep the prompt small for the stub
    config.output.file = report_path.clone();
    config.output.quiet = true;

    let runner = EvalRunner::new(config).await.expect("runner init");
    runner.run().await.expect("suite run");

    let raw = std::fs::read_to_string(&report_path).expect("report file");
    let report: Value = serde_json::from_str(&raw).expect("report json");

    // Metadata
    assert_eq!(report["model"], "stub-model");
    assert_eq!(report["endpoint"], Value::String(server.uri()));
    assert!(report["timestamp"].is_string());
    assert!(report["version"].is_string());

    // Speed runs: all three recorded, average present and positive
    let speed = &report["tokens_per_second"];
    assert_eq!(speed["runs"].as_array().unwrap().len(), 3);
    assert_eq!(speed["runs"][0]["run"], 1);
    assert_eq!(speed["runs"][0]["completion_tokens"], 12);
    assert!(speed["average_tps"].as_f64().unwrap() > 0.0);

    // Large context: success with the server-reported usage
    assert_eq!(report["large_context"]["success"], true);
    assert_eq!(report["large_context"]["prompt_tokens"], 42);
    let preview = report["large_context"]["response_preview"]
        .as_str()
        .unwrap();
    assert!(preview.chars().count() <= 200);

    // Coding: all three tasks pass against the canned answer
    let coding = report["coding"].as_array().unwrap();
    assert_eq!(coding.len(), 3);
    assert_eq!(coding[0]["test"], "binary_search_generation");
    assert_eq!(coding[0]["has_type_hints"], true);
    assert_eq!(coding[1]["test"], "debug_fibonacci");
    assert_eq!(coding[2]["test"], "explain_quicksort");
    assert_eq!(coding[2]["mentions_worst_case"], true);
    assert!(coding.iter().all(|t| t["success"] == true));

    // Factual: five questions, all correct
    assert_eq!(report["factual"]["questions"].as_array().unwrap().len(), 5);
    assert_eq!(report["factual"]["accuracy"].as_f64().unwrap(), 100.0);

    // Multimodal: a plain 200 means the image was accepted
    assert_eq!(report["multimodal"]["supports_images"], true);
    assert!(report["multimodal"]["response"].is_string());
    assert!(report["multimodal"].get("reason").is_none());

    // Reasoning: both tasks pass
    let reasoning = report["reasoning"].as_array().unwrap();
    assert_eq!(reasoning.len(), 2);
    assert_eq!(reasoning[0]["test"], "math_word_problem");
    assert_eq!(reasoning[1]["test"], "logic_puzzle");
    assert!(reasoning.iter().all(|t| t["correct"] == true));

    // Run-wide accounting: 3 speed + 1 context + 3 coding + 5 factual
    // + 1 multimodal + 2 reasoning = 15 chat requests
    let summary = &report["summary"];
    assert_eq!(summary["total_requests"], 15);
    assert_eq!(summary["successful_requests"], 15);
    assert_eq!(summary["failed_requests"], 0);
    assert_eq!(summary["total_prompt_tokens"], 42 * 15);
    assert_eq!(summary["total_completion_tokens"], 12 * 15);
    assert!(summary["request_p50_ms"].as_f64().unwrap() > 0.0);
}
