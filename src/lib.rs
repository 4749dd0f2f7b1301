pub mod cli;
pub mod client;
pub mod config;
pub mod grading;
pub mod metrics;
pub mod output;
pub mod prompts;
pub mod report;
pub mod runner;
pub mod tokenizer;

pub use cli::Cli;
pub use client::{ChatClient, ChatOutcome, ClientConfig, Message};
pub use config::Config;
pub use report::EvalReport;
pub use runner::EvalRunner;
