//! Logging setup: messages go to the terminal and to a file.

use anyhow::Result;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;

/// Initializes the combined terminal + file logger.
///
/// When the log file cannot be created (read-only filesystem, bad path)
/// the bot still starts with terminal logging only.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    match File::create(log_file_path) {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Info, Config::default(), file)),
        Err(e) => eprintln!("Failed to create log file {}: {}", log_file_path, e),
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}
