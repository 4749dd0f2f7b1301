use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>, // If not provided, will auto-detect from server
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout: u64, // Total time to wait for server readiness in seconds (0 = disabled)
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64, // Interval between readiness check retries in seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_speed_runs")]
    pub speed_runs: usize,
    #[serde(default = "default_context_target_tokens")]
    pub context_target_tokens: usize,
    /// Categories to leave out of the run (e.g., ["multimodal"])
    #[serde(default)]
    pub skip: Vec<Category>,
}

/// One test category of the suite. Names match the report keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TokensPerSecond,
    LargeContext,
    Coding,
    Factual,
    Multimodal,
    Reasoning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
    #[serde(default)]
    pub quiet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Per-module log level overrides (e.g., ["hyper=info", "h2=warn"])
    #[serde(default)]
    pub filter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: None,
            timeout: default_timeout(),
            api_key: None,
            health_check_timeout: default_health_check_timeout(),
            health_check_interval: default_health_check_interval(),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            speed_runs: default_speed_runs(),
            context_target_tokens: default_context_target_tokens(),
            skip: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            quiet: false,
            trace_log: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:31245".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_health_check_timeout() -> u64 {
    0 // Disabled by default
}

fn default_health_check_interval() -> u64 {
    5 // 5 seconds
}

fn default_speed_runs() -> usize {
    5
}

fn default_context_target_tokens() -> usize {
    10000
}

fn default_output_file() -> PathBuf {
    PathBuf::from("eval_results.json")
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Config {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or fall back to the built-in defaults when no path
    /// was given.
    pub fn load_or_default(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.endpoint.base_url.is_empty() {
            anyhow::bail!("endpoint.base_url must not be empty");
        }

        if self.endpoint.timeout == 0 {
            anyhow::bail!("endpoint.timeout must be greater than 0");
        }

        if self.endpoint.health_check_timeout > 0 && self.endpoint.health_check_interval == 0 {
            anyhow::bail!("endpoint.health_check_interval must be greater than 0");
        }

        if self.eval.speed_runs == 0 {
            anyhow::bail!("eval.speed_runs must be greater than 0");
        }

        if self.eval.context_target_tokens == 0 {
            anyhow::bail!("eval.context_target_tokens must be greater than 0");
        }

        Ok(())
    }
}
