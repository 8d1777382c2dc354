//! Logging utilities for production-ready colorful output

use colored::Colorize;

/// Log levels for the indexer
#[derive(Clone, Copy)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

/// Logs a message with color and formatting
pub fn log(level: LogLevel, message: &str) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    match level {
        LogLevel::Info => {
            println!(
                "{} {} {}",
                format!("[{timestamp}]").bright_black(),
                "ℹ".bright_blue(),
                message
            );
        }
        LogLevel::Success => {
            println!(
                "{} {} {}",
                format!("[{timestamp}]").bright_black(),
                "✓".bright_green(),
                message.green()
            );
        }
        LogLevel::Warning => {
            println!(
                "{} {} {}",
                format!("[{timestamp}]").bright_black(),
                "⚠".bright_yellow(),
                message.yellow()
            );
        }
        LogLevel::Error => {
            eprintln!(
                "{} {} {}",
                format!("[{timestamp}]").bright_black(),
                "✗".bright_red(),
                message.red()
            );
        }
        LogLevel::Debug => {
            println!(
                "{} {} {}",
                format!("[{timestamp}]").bright_black(),
                "🔍".bright_magenta(),
                message.bright_black()
            );
        }
    }
}

/// Logs indexer startup information
pub fn log_startup(network: &str, worker: &str, endpoints: &[String]) {
    println!("\n{}", "═".repeat(80).bright_blue());
    println!("{}", "  Arweave Indexer".bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_blue());
    println!("  {} {}", "Network:  ".bright_white(), network.cyan());
    println!("  {} {}", "Worker:   ".bright_white(), worker.cyan());
    println!(
        "  {} {}",
        "Endpoints:".bright_white(),
        endpoints.join(", ").cyan()
    );
    println!("{}\n", "═".repeat(80).bright_blue());
}

/// Logs batch processing summary
pub fn log_batch(collected: usize, total: usize, duration_ms: u64) {
    println!(
        "{} {} {} {} {} {}ms",
        "📦".bright_blue(),
        "Batch:".bright_white(),
        format!("{collected}/{total}").bright_cyan(),
        "activities".bright_white(),
        "in".bright_black(),
        duration_ms.to_string().bright_yellow()
    );
}

/// Logs a checkpoint commit
pub fn log_checkpoint(id: &str, state: &serde_json::Value) {
    println!(
        "{} {} {} {} {}",
        "✓".bright_green(),
        "Checkpoint".bright_white(),
        id.bright_cyan(),
        "│".bright_black(),
        state.to_string().bright_black()
    );
}

/// Logs an error with context
pub fn log_error(context: &str, error: &str) {
    eprintln!(
        "{} {} {} {}",
        "✗".bright_red(),
        context.red().bold(),
        "│".bright_black(),
        error.bright_red()
    );
}
