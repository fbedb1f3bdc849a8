//! Editor configuration from the environment.

use std::env;
use std::path::PathBuf;

use crate::console;
use crate::model::pattern::DEFAULT_PAD_STEPS;

pub const ENV_DEFAULT_PAD_STEPS: &str = "PADLOOP_DEFAULT_PAD_STEPS";
pub const ENV_HISTORY: &str = "PADLOOP_HISTORY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Pad length given to new tracks.
    pub default_pad_steps: u32,
    /// Where the REPL keeps its line history, if anywhere.
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_pad_steps: DEFAULT_PAD_STEPS,
            history_file: None,
        }
    }
}

impl Config {
    /// Read `.env` (if present) and then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Bad values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_DEFAULT_PAD_STEPS) {
            match parse_pad_steps(&raw) {
                Some(steps) => config.default_pad_steps = steps,
                None => console::warn(format!(
                    "{}={} is not a positive step count; using {}",
                    ENV_DEFAULT_PAD_STEPS, raw, config.default_pad_steps
                )),
            }
        }
        if let Some(raw) = lookup(ENV_HISTORY) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.history_file = Some(PathBuf::from(trimmed));
            }
        }
        config
    }
}

pub fn parse_pad_steps(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&v| v > 0)
}
