use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "llm-eval")]
#[command(author, version, about = "Evaluate OpenAI-compatible LLM deployments", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (built-in defaults when omitted)
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
