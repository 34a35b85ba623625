use std::path::PathBuf;

/// Environment variable holding the `tracing` filter for the binary.
pub const LOG_ENV: &str = "SMALLSH_LOG";

/// Session settings that are fixed for the lifetime of an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Printed before every read.
    pub prompt: String,
    /// Standard input/output of background jobs that were not redirected.
    pub null_device: PathBuf,
    /// Filter used when [`LOG_ENV`] is unset.
    pub default_log_filter: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: ": ".to_string(),
            null_device: PathBuf::from("/dev/null"),
            default_log_filter: "warn".to_string(),
        }
    }
}

impl ShellConfig {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Raise the fallback log filter to `debug`.
    pub fn verbose(mut self) -> Self {
        self.default_log_filter = "debug".to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.prompt, ": ");
        assert_eq!(config.null_device, PathBuf::from("/dev/null"));
        assert_eq!(config.default_log_filter, "warn");
    }

    #[test]
    fn test_builders() {
        let config = ShellConfig::default().with_prompt("$ ").verbose();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.default_log_filter, "debug");
    }
}
