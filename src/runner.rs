use anyhow::Result;
use log::{debug, info};
use std::time::Duration;

use crate::client::{self, ApiError, ChatClient, ChatOutcome, ClientConfig, Message};
use crate::config::{Category, Config};
use crate::grading;
use crate::output::{output, section, truncate};
use crate::prompts;
use crate::report::{
    self, CategoryResults, CodingResult, ContextReport, FactualReport, FactualResult,
    MultimodalReport, ReasoningResult, ReportBuilder, SpeedReport, SpeedRun, round2,
};
use crate::tokenizer::Tokenizer;

/// Drives the whole evaluation: one category at a time, one request at a
/// time, every outcome folded into a single report.
pub struct EvalRunner {
    client: ChatClient,
    config: Config,
    tokenizer: Tokenizer,
}

impl EvalRunner {
    /// Creates a runner ready to evaluate the configured deployment.
    ///
    /// Waits for the server when a health check is configured, resolves the
    /// model name (auto-detected from /v1/models when the config names
    /// none), and sets up the HTTP client and local tokenizer.
    pub async fn new(mut config: Config) -> Result<Self> {
        // Wait for server to be ready if timeout is set (> 0)
        if config.endpoint.health_check_timeout > 0 {
            client::check_server_ready(
                &config.endpoint.base_url,
                config.endpoint.api_key.as_deref(),
                Duration::from_secs(config.endpoint.health_check_timeout),
                Duration::from_secs(config.endpoint.health_check_interval),
            )
            .await?;
        }

        // Detect model from server if not provided
        let model = if let Some(model) = config.endpoint.model.clone() {
            model
        } else {
            info!("Model not specified, querying server for available models");
            let detected = client::detect_model(
                &config.endpoint.base_url,
                config.endpoint.api_key.as_deref(),
                Duration::from_secs(config.endpoint.timeout),
            )
            .await?;
            config.endpoint.model = Some(detected.clone());
            detected
        };

        let client = ChatClient::new(ClientConfig {
            base_url: config.endpoint.base_url.clone(),
            api_key: config.endpoint.api_key.clone(),
            model: model.clone(),
            timeout: Duration::from_secs(config.endpoint.timeout),
        })?;

        let tokenizer = Tokenizer::new(&model)?;

        Ok(Self {
            client,
            config,
            tokenizer,
        })
    }

    /// Runs every enabled category in order and writes the report file.
    ///
    /// Request failures the server reports (non-success statuses) are
    /// recorded and the run continues; transport failures abort the run
    /// with an error.
    pub async fn run(&self) -> Result<()> {
        let builder = ReportBuilder::new(&self.config.endpoint.base_url, self.client.model());

        debug!("Starting evaluation run");
        let mut results = CategoryResults::default();

        if self.enabled(Category::TokensPerSecond) {
            results.tokens_per_second = self.measure_tokens_per_second().await?;
        }
        if self.enabled(Category::LargeContext) {
            results.large_context = Some(self.eval_large_context().await?);
        }
        if self.enabled(Category::Coding) {
            results.coding = Some(self.eval_coding().await?);
        }
        if self.enabled(Category::Factual) {
            results.factual = Some(self.eval_factual().await?);
        }
        if self.enabled(Category::Multimodal) {
            results.multimodal = Some(self.eval_multimodal().await?);
        }
        if self.enabled(Category::Reasoning) {
            results.reasoning = Some(self.eval_reasoning().await?);
        }

        let report = builder.build(results)?;
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&self.config.output.file, json).await?;
        info!("Report written to {}", self.config.output.file.display());

        if !self.quiet() {
            report::print_summary(&report, &self.config.output.file);
        }

        Ok(())
    }

    fn enabled(&self, category: Category) -> bool {
        !self.config.eval.skip.contains(&category)
    }

    fn quiet(&self) -> bool {
        self.config.output.quiet
    }

    /// Generation speed: the same prompt `speed_runs` times. Failed runs
    /// are reported on the console but excluded from the average.
    async fn measure_tokens_per_second(&self) -> Result<Option<SpeedReport>> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 1: Tokens per Second Measurement");
        }

        let mut runs = Vec::new();
        for i in 0..self.config.eval.speed_runs {
            let outcome = self
                .client
                .chat(vec![Message::user(prompts::SPEED_PROMPT)], 300, Some(0.7))
                .await?;

            match outcome {
                ChatOutcome::Success(success) => {
                    let elapsed = success.elapsed.as_secs_f64();
                    let tps = success.completion_tokens as f64 / elapsed;
                    if chatty {
                        output!(
                            "Run {}: {} tokens in {:.2}s = {:.2} tok/s",
                            i + 1,
                            success.completion_tokens,
                            elapsed,
                            tps
                        );
                    }
                    runs.push(SpeedRun {
                        run: i + 1,
                        prompt_tokens: success.prompt_tokens,
                        completion_tokens: success.completion_tokens,
                        elapsed_seconds: round2(elapsed),
                        tokens_per_second: round2(tps),
                    });
                }
                ChatOutcome::ApiError(error) => {
                    if chatty {
                        output!("Run {}: ERROR - {}", i + 1, truncate(&error.message, 100));
                    }
                }
            }
        }

        let speed = SpeedReport::from_runs(runs);
        if chatty && let Some(speed) = &speed {
            output!("AVERAGE: {:.2} tokens/second", speed.average_tps);
        }
        Ok(speed)
    }

    /// Large context: one prompt inflated to the configured token target,
    /// with a short summary question at the end.
    async fn eval_large_context(&self) -> Result<ContextReport> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 2: Large Context Handling");
        }

        let target = self.config.eval.context_target_tokens;
        let prompt = prompts::large_context_prompt(&self.tokenizer, target);
        debug!(
            "large-context prompt holds ~{} tokens locally",
            self.tokenizer.count_tokens(&prompt)
        );
        if chatty {
            output!("Sending ~{} token prompt...", target);
        }

        let outcome = self
            .client
            .chat(vec![Message::user(prompt)], 100, Some(0.3))
            .await?;

        let result = match outcome {
            ChatOutcome::Success(success) => {
                let elapsed = success.elapsed.as_secs_f64();
                if chatty {
                    output!("Input: {} tokens", success.prompt_tokens);
                    output!(
                        "Output: {} tokens in {:.2}s",
                        success.completion_tokens,
                        elapsed
                    );
                    output!("Response: {}", truncate(&success.content, 200));
                }
                ContextReport {
                    prompt_tokens: success.prompt_tokens,
                    completion_tokens: success.completion_tokens,
                    elapsed_seconds: round2(elapsed),
                    success: true,
                    response_preview: Some(truncate(&success.content, 200)),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR: {}", truncate(&error.message, 200));
                }
                ContextReport {
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    elapsed_seconds: round2(error.elapsed.as_secs_f64()),
                    success: false,
                    response_preview: None,
                    error: Some(truncate(&error.message, 200)),
                }
            }
        };
        Ok(result)
    }

    /// Coding: generate a function, find a planted bug, explain an
    /// algorithm. Graded by marker substrings.
    async fn eval_coding(&self) -> Result<Vec<CodingResult>> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 3: Coding Capabilities");
        }

        let mut tests = Vec::new();

        if chatty {
            output!("3a. Code Generation - Binary Search");
        }
        let outcome = self
            .client
            .chat(
                vec![Message::user(prompts::BINARY_SEARCH_PROMPT)],
                300,
                Some(0.3),
            )
            .await?;
        tests.push(match outcome {
            ChatOutcome::Success(success) => {
                let elapsed = success.elapsed.as_secs_f64();
                let success_check = grading::looks_like_function(&success.content);
                if chatty {
                    output!("Generated in {:.2}s", elapsed);
                    output!("Response preview: {}...", truncate(&success.content, 150));
                }
                CodingResult {
                    test: "binary_search_generation",
                    success: success_check,
                    has_type_hints: Some(grading::has_type_hints(&success.content)),
                    mentions_worst_case: None,
                    elapsed: Some(round2(elapsed)),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR - {}", truncate(&error.message, 100));
                }
                coding_error("binary_search_generation", &error)
            }
        });

        if chatty {
            output!("3b. Code Debugging - Fibonacci");
        }
        let outcome = self
            .client
            .chat(vec![Message::user(prompts::debug_prompt())], 300, Some(0.3))
            .await?;
        tests.push(match outcome {
            ChatOutcome::Success(success) => {
                let elapsed = success.elapsed.as_secs_f64();
                let found_fix = grading::identifies_fibonacci_fix(&success.content);
                if chatty {
                    output!("Analyzed in {:.2}s", elapsed);
                    output!("Found the bug (n-3 should be n-2): {}", found_fix);
                }
                CodingResult {
                    test: "debug_fibonacci",
                    success: found_fix,
                    has_type_hints: None,
                    mentions_worst_case: None,
                    elapsed: Some(round2(elapsed)),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR - {}", truncate(&error.message, 100));
                }
                coding_error("debug_fibonacci", &error)
            }
        });

        if chatty {
            output!("3c. Algorithm Explanation - Quicksort");
        }
        let outcome = self
            .client
            .chat(
                vec![Message::user(prompts::QUICKSORT_PROMPT)],
                400,
                Some(0.3),
            )
            .await?;
        tests.push(match outcome {
            ChatOutcome::Success(success) => {
                let elapsed = success.elapsed.as_secs_f64();
                let average = grading::mentions_average_complexity(&success.content);
                let worst = grading::mentions_worst_case(&success.content);
                if chatty {
                    output!("Explained in {:.2}s", elapsed);
                    output!("Mentions O(n log n) average: {}", average);
                    output!("Mentions O(n^2) worst case: {}", worst);
                }
                CodingResult {
                    test: "explain_quicksort",
                    success: average,
                    has_type_hints: None,
                    mentions_worst_case: Some(worst),
                    elapsed: Some(round2(elapsed)),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR - {}", truncate(&error.message, 100));
                }
                coding_error("explain_quicksort", &error)
            }
        });

        Ok(tests)
    }

    /// Factual QA: five short questions with one verifiable answer each.
    async fn eval_factual(&self) -> Result<FactualReport> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 4: Factual Questions");
        }

        let mut questions = Vec::new();
        for (question, expected, name) in prompts::FACTUAL_QUESTIONS {
            let prompt = format!("{} Answer briefly.", question);
            let outcome = self
                .client
                .chat(vec![Message::user(prompt)], 100, Some(0.1))
                .await?;

            questions.push(match outcome {
                ChatOutcome::Success(success) => {
                    let correct = grading::contains_ci(&success.content, expected);
                    let elapsed = success.elapsed.as_secs_f64();
                    if chatty {
                        output!(
                            "{}: {} ({:.2}s)",
                            name,
                            if correct { "CORRECT" } else { "INCORRECT" },
                            elapsed
                        );
                        if !correct {
                            output!(
                                "Expected '{}', got: {}",
                                expected,
                                truncate(&success.content, 80)
                            );
                        }
                    }
                    FactualResult {
                        test: name,
                        correct,
                        elapsed: Some(round2(elapsed)),
                        error: None,
                    }
                }
                ChatOutcome::ApiError(error) => {
                    if chatty {
                        output!("{}: ERROR - {}", name, truncate(&error.message, 100));
                    }
                    FactualResult {
                        test: name,
                        correct: false,
                        elapsed: None,
                        error: Some(truncate(&error.message, 100)),
                    }
                }
            });
        }

        let report = FactualReport::from_questions(questions);
        if chatty {
            output!("Accuracy: {:.0}%", report.accuracy);
        }
        Ok(report)
    }

    /// Multimodal: probe /model_info for context, then send a tiny red PNG
    /// in the vision content format and see whether the server takes it.
    async fn eval_multimodal(&self) -> Result<MultimodalReport> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 5: Multimodal (Image) Support");
        }

        match self.client.model_info().await {
            Some(info) => {
                if chatty {
                    let pretty = serde_json::to_string_pretty(&info).unwrap_or_default();
                    output!("Model info: {}", truncate(&pretty, 500));
                }
            }
            None => {
                if chatty {
                    output!("Could not get model info");
                }
            }
        }

        if chatty {
            output!("Attempting image input (OpenAI vision format)...");
        }
        let message =
            Message::user_with_image(prompts::VISION_QUESTION, prompts::red_pixel_data_url());
        let outcome = self.client.chat(vec![message], 50, None).await?;

        let result = match outcome {
            ChatOutcome::Success(success) => {
                if chatty {
                    output!("SUCCESS! Model accepted image input.");
                    output!("Response: {}", success.content);
                }
                MultimodalReport {
                    supports_images: true,
                    response: Some(success.content),
                    error: None,
                    reason: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                let reason = grading::vision_error_reason(&error.message);
                if chatty {
                    output!("Image input not supported or failed.");
                    output!("Error: {}", truncate(&error.message, 300));
                    output!("{}", reason);
                }
                MultimodalReport {
                    supports_images: false,
                    response: None,
                    error: Some(truncate(&error.message, 300)),
                    reason: Some(reason),
                }
            }
        };
        Ok(result)
    }

    /// Reasoning: a worked arithmetic problem and a syllogistic fallacy.
    async fn eval_reasoning(&self) -> Result<Vec<ReasoningResult>> {
        let chatty = !self.quiet();
        if chatty {
            section("TEST 6: Reasoning Tasks");
        }

        let mut results = Vec::new();

        if chatty {
            output!("6a. Math Word Problem");
        }
        let outcome = self
            .client
            .chat(vec![Message::user(prompts::MATH_PROMPT)], 200, Some(0.1))
            .await?;
        results.push(match outcome {
            ChatOutcome::Success(success) => {
                // 60*2 + 80*1.5 = 240 miles
                let correct = success.content.contains("240");
                if chatty {
                    output!(
                        "Answer contains 240 miles: {} ({:.2}s)",
                        correct,
                        success.elapsed.as_secs_f64()
                    );
                }
                ReasoningResult {
                    test: "math_word_problem",
                    correct,
                    elapsed: Some(round2(success.elapsed.as_secs_f64())),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR - {}", truncate(&error.message, 100));
                }
                ReasoningResult {
                    test: "math_word_problem",
                    correct: false,
                    elapsed: None,
                    error: Some(truncate(&error.message, 100)),
                }
            }
        });

        if chatty {
            output!("6b. Logic Puzzle");
        }
        let outcome = self
            .client
            .chat(vec![Message::user(prompts::LOGIC_PROMPT)], 200, Some(0.1))
            .await?;
        results.push(match outcome {
            ChatOutcome::Success(success) => {
                let correct = grading::rejects_syllogism(&success.content);
                if chatty {
                    output!(
                        "Correctly declines the conclusion: {} ({:.2}s)",
                        correct,
                        success.elapsed.as_secs_f64()
                    );
                }
                ReasoningResult {
                    test: "logic_puzzle",
                    correct,
                    elapsed: Some(round2(success.elapsed.as_secs_f64())),
                    error: None,
                }
            }
            ChatOutcome::ApiError(error) => {
                if chatty {
                    output!("ERROR - {}", truncate(&error.message, 100));
                }
                ReasoningResult {
                    test: "logic_puzzle",
                    correct: false,
                    elapsed: None,
                    error: Some(truncate(&error.message, 100)),
                }
            }
        });

        Ok(results)
    }
}

fn coding_error(test: &'static str, error: &ApiError) -> CodingResult {
    CodingResult {
        test,
        success: false,
        has_type_hints: None,
        mentions_worst_case: None,
        elapsed: None,
        error: Some(truncate(&error.message, 100)),
    }
}
