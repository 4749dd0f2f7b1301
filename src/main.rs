use anyhow::Result;
use llm_eval::{Cli, Config, EvalRunner};
use log::{LevelFilter, Metadata, Record, debug, info};
use ringlog::{File, LogBuilder, MultiLogBuilder, Output, Stderr};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

/// Maximum log file size before rotation (10MB)
const LOG_FILE_MAX_SIZE: u64 = 1024 * 1024 * 10;

/// Parse log filter strings like "hyper=info" into a map of module prefix to level filter
fn parse_log_filters(filters: &[String]) -> HashMap<String, LevelFilter> {
    let mut map = HashMap::new();
    for filter in filters {
        if let Some((module, level)) = filter.split_once('=') {
            let level_filter = match level.to_lowercase().as_str() {
                "error" => LevelFilter::Error,
                "warn" => LevelFilter::Warn,
                "info" => LevelFilter::Info,
                "debug" => LevelFilter::Debug,
                "trace" => LevelFilter::Trace,
                "off" => LevelFilter::Off,
                _ => continue,
            };
            map.insert(module.to_string(), level_filter);
        }
    }
    map
}

/// Check if a log record should be filtered based on per-module filters
fn should_log(metadata: &Metadata, filters: &HashMap<String, LevelFilter>) -> bool {
    let target = metadata.target();

    for (module_prefix, level_filter) in filters {
        if target.starts_with(module_prefix) {
            return metadata.level() <= *level_filter;
        }
    }

    // If no filter matched, allow the log (will be caught by global level filter)
    true
}

/// Custom logger with per-module filtering that wraps ringlog
struct FilteredLogger {
    output: Mutex<Box<dyn Output>>,
    max_level: LevelFilter,
    filters: HashMap<String, LevelFilter>,
}

impl log::Log for FilteredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && should_log(metadata, &self.filters)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut output) = self.output.lock() {
                let message = format!("{}\n", record.args());
                let _ = output.write_all(message.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut output) = self.output.lock() {
            let _ = output.flush();
        }
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration first to check verbosity setting
    let config = Config::load_or_default(cli.config.as_ref())?;

    // Set up logging with ringlog and per-module filtering
    let log_level = config.log.level.to_level_filter();

    // Configure output destination
    let output: Box<dyn Output> = if let Some(ref log_file) = config.output.trace_log {
        // Log to file with rotation
        let backup_file = log_file.with_extension("old");
        Box::new(File::new(log_file.clone(), backup_file, LOG_FILE_MAX_SIZE)?)
    } else {
        // Log to stderr
        Box::new(Stderr::new())
    };

    // Parse per-module filters from config
    let filters = parse_log_filters(&config.log.filter);

    // Create logger with per-module filtering if configured
    if filters.is_empty() {
        // No filters - use ringlog directly
        let base_log = LogBuilder::new()
            .output(output)
            .build()
            .expect("failed to initialize logger");

        let _drain = MultiLogBuilder::new()
            .level_filter(log_level)
            .default(base_log)
            .build()
            .start();
    } else {
        // Use custom filtered logger
        let logger = FilteredLogger {
            output: Mutex::new(output),
            max_level: log_level,
            filters,
        };

        log::set_boxed_logger(Box::new(logger)).expect("failed to set logger");
        log::set_max_level(log_level);
    }

    // Print clean startup message
    if !config.output.quiet {
        println!("LLM Evaluation Suite");
        match &cli.config {
            Some(path) => println!("   Config: {}", path.display()),
            None => println!("   Config: built-in defaults"),
        }
        println!("   Target: {}", config.endpoint.base_url);
        match &config.endpoint.model {
            Some(model) => println!("   Model: {}", model),
            None => println!("   Model: auto-detect"),
        }
        println!("   Report: {}", config.output.file.display());
        println!();
    }

    // The suite is strictly sequential, so a current-thread runtime is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async { run_eval(config).await })
}

async fn run_eval(config: Config) -> Result<()> {
    debug!("Initializing evaluation runner");
    let runner = EvalRunner::new(config).await?;
    info!("Starting evaluation suite");
    runner.run().await?;
    info!("Evaluation completed successfully");
    Ok(())
}
