//! Console output of a non-quiet run, captured from the spawned binary.

use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CANNED_ANSWER: &str = "def binary_search(arr: list, target: int) -> int: return -1. \
    Quicksort averages O(n log n) but degrades to O(n^2); the fix is changing \
    fibonacci(n-3) to fibonacci(n-2). Light travels 299792458 m/s, water is H2O, \
    Shakespeare wrote Romeo and Juliet, Jupiter is the largest planet, and the \
    war ended in 1945. The train covers 240 miles total. No, not necessarily. \
    The image is red.";

#[tokio::test]
async fn console_shows_previews_and_pretty_model_info() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": CANNED_ANSWER},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 42, "completion_tokens": 12, "total_tokens": 54}
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
    let config_path = dir.path().join("eval.toml");
    let report_path = dir.path().join("eval_results.json");
    std::fs::write(
        &config_path,
        format!(
            r#"
[endpoint]
base_url = "{}"
model = "stub-model"

[eval]
speed_runs = 1
context_target_tokens = 200

[output]
file = "{}"
"#,
            server.uri(),
            report_path.display()
        ),
    )
    .expect("config file");

    let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_llm-eval"))
        .arg(&config_path)
        .output()
        .await
        .expect("binary run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("LLM Evaluation Suite"));
    assert!(stdout.contains("TEST 3: Coding Capabilities"));

    // The binary-search answer is echoed as a 150-char preview
    let expected_preview: String = CANNED_ANSWER.chars().take(150).collect();
    assert!(
        stdout.contains(&format!("Response preview: {}...", expected_preview)),
        "missing or mangled preview line in:\n{}",
        stdout
    );

    // Model info is printed pretty, not as one compact line
    assert!(
        stdout.contains("Model info: {\n  \"model\": \"stub-model\""),
        "model info not pretty-printed in:\n{}",
        stdout
    );

    assert!(report_path.exists());
}
