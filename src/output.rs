//! # Terminal Output
//!
//! Styling of the user-facing summary lines printed by the binary. Logging
//! goes through `log`; this module only decides whether those few lines are
//! colored.
//!
//! Colors follow `--color=always|never|auto`. In auto mode the usual
//! conventions are honored:
//! - `NO_COLOR` disables colors when set
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even in non-TTY
//! - `TERM=dumb` disables colors

use std::env;

use console::style;

/// Whether summary lines are colored.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve from the `--color` flag and the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stderr().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// A line reporting success.
pub fn success(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).green().bold().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

/// A line reporting failure.
pub fn failure(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).red().bold().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

/// Secondary detail, such as an artifact path.
pub fn detail(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).dim().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
    }

    #[test]
    fn test_color_never() {
        assert!(!OutputConfig::from_env_and_flag("NEVER").use_color);
    }

    #[test]
    fn test_plain_output_is_unchanged() {
        let config = OutputConfig::without_color();
        assert_eq!(success(&config, "Success!"), "Success!");
        assert_eq!(failure(&config, "Failed"), "Failed");
        assert_eq!(detail(&config, "spigot-1.8.jar"), "spigot-1.8.jar");
    }

    #[test]
    fn test_colored_output_wraps_text() {
        let config = OutputConfig::with_color();
        let line = success(&config, "Success!");
        assert!(line.contains("Success!"));
        assert_ne!(line, "Success!");
    }
}
