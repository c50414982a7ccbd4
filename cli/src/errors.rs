//! Helpful error context for common CLI failure modes.

use anyhow::Result;
use colored::Colorize;

/// Adds a suggestion list to an error, rendered under the error message.
pub trait EnhancedError<T> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T>;
}

impl<T> EnhancedError<T> for Result<T> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T> {
        self.map_err(|e| {
            let mut error_msg = format!("{}\n\n{}", msg.red().bold(), e);
            if !help.is_empty() {
                error_msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
                for (i, h) in help.iter().enumerate() {
                    error_msg.push_str(&format!("\n  {}. {}", i + 1, h));
                }
            }
            anyhow::anyhow!(error_msg)
        })
    }
}

pub mod helpers {
    pub const SESSION_NOT_FOUND_HELP: &[&str] = &[
        "Check that the session id is correct (use 'askdocs stats' to see recent activity)",
        "Verify the engine is pointed at the same database used by the original ask",
    ];

    pub const CHUNK_NOT_FOUND_HELP: &[&str] = &[
        "Check that the chunk id is correct",
        "Verify the ingester wrote to the same database this CLI is configured for",
    ];

    pub const STORE_CONNECTION_HELP: &[&str] = &[
        "Verify the database URL is correct in configuration or --database-url",
        "Check network connectivity if using a remote libsql:// database",
        "Try the in-memory demo store: omit --database-url entirely",
        "Validate configuration: 'askdocs config check'",
    ];
}
